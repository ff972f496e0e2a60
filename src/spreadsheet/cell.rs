use crate::database::value::parse_datetime;
use crate::database::value::Value;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Storage kinds of cells in a worksheet part.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as 0/1
    Boolean,
    /// Plain numeric values
    Number,
    /// Numeric values whose number format is a date or time, 1900 epoch
    NumberDate1900,
    /// Numeric values whose number format is a date or time, 1904 epoch
    NumberDate1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline and formula string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#DIV/0!`
    Error,
}

impl CellType {
    fn date(is_1904: bool) -> Self {
        if is_1904 {
            Self::NumberDate1904
        } else {
            Self::NumberDate1900
        }
    }

    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "18" | "19" | "20" | "21" | "22" | "45" | "46" | "47" => Some(Self::date(is_1904)),
            _ => None,
        }
    }

    /// Parses custom number format strings, looking for date/time placeholders
    /// outside of literals and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => return Self::date(is_1904),
                _ => (),
            }
        }
        Self::Number
    }

    /// Decodes the raw `<v>`/`<is>` text of a cell into a value.
    pub(crate) fn decode(&self, raw: &str, shared_strings: &[String]) -> Value {
        match self {
            CellType::Empty => Value::Null,
            CellType::Boolean => Value::Bool(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
            CellType::Number => decode_number(raw),
            CellType::NumberDate1900 | CellType::NumberDate1904 => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|serial| serial_to_datetime(serial, *self == CellType::NumberDate1904))
                .map(Value::Date)
                .unwrap_or_else(|| decode_number(raw)),
            CellType::IsoDateTime => parse_datetime(raw)
                .map(Value::Date)
                .unwrap_or_else(|| Value::Text(raw.to_owned())),
            CellType::SharedString => raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|index| shared_strings.get(index))
                .map(|text| Value::Text(text.to_owned()))
                .unwrap_or(Value::Null),
            CellType::InlineString | CellType::Error => Value::Text(raw.to_owned()),
        }
    }
}

/// Integral numbers decode to `Int`, others to `Float`.
fn decode_number(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Value::Int(value);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.abs() < 9.0e15 => Value::Int(value as i64),
        Ok(value) => Value::Float(value),
        Err(_) => Value::Text(raw.to_owned()),
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Converts an Excel serial date to a date/time, rounding to whole seconds.
/// Serials below 60 in the 1900 system compensate for the Lotus 1-2-3 leap year bug.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    let date = epoch().checked_add_signed(Duration::days(days + offset))?;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::seconds(seconds))
}

/// Converts an A1-style reference to 0-based (row, col).
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for letter in letters.chars() {
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (letter.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    let row = digits.parse::<usize>().ok()?;
    (row > 0).then(|| (row - 1, col - 1))
}

/// Converts 0-based (row, col) to an A1-style reference.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut col = col + 1;
    while col > 0 {
        let remainder = (col - 1) % 26;
        letters.push((b'A' + remainder as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references() {
        assert_eq!(reference_to_index("A1"), Some((0, 0)));
        assert_eq!(reference_to_index("AB12"), Some((11, 27)));
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(11, 27), "AB12");
        assert_eq!(index_to_reference(3, 701), "ZZ4");
    }

    #[test]
    fn custom_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm", true), CellType::NumberDate1904);
        assert_eq!(CellType::parse_custom_number_format("0.00%", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.0\"days\"", false), CellType::Number);
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDate1900));
        assert_eq!(CellType::parse_builtin_number_format_id("2", false), None);
    }

    #[test]
    fn decode_values() {
        let shared = vec!["Widget".to_owned()];
        assert_eq!(CellType::Number.decode("1", &shared), Value::Int(1));
        assert_eq!(CellType::Number.decode("9.99", &shared), Value::Float(9.99));
        assert_eq!(CellType::Number.decode("3.0", &shared), Value::Int(3));
        assert_eq!(CellType::SharedString.decode("0", &shared), Value::Text("Widget".to_owned()));
        assert_eq!(CellType::Boolean.decode("1", &shared), Value::Bool(true));
        assert_eq!(
            CellType::NumberDate1900.decode("45351.5", &shared).to_string(),
            "2024-02-29 12:00:00"
        );
    }

    #[test]
    fn serial_dates() {
        let datetime = NaiveDate::from_ymd_opt(2023, 7, 4).unwrap().and_hms_opt(18, 0, 0).unwrap();
        assert_eq!(serial_to_datetime(45111.75, false), Some(datetime));
        assert_eq!(
            serial_to_datetime(0.0, true).map(|value| value.date()),
            NaiveDate::from_ymd_opt(1904, 1, 1)
        );
    }
}
