use crate::database::column::Column;
use crate::database::value::Value;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde::Serializer;

/// An ordered mapping from field name to value.
/// Field order follows the column order of the producing table or query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Replaces the value of an existing field or appends a new one.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_owned(), value)),
        }
    }

    /// Appends a field without checking for an existing one.
    pub fn push(&mut self, name: String, value: Value) {
        self.fields.push((name, value));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One sheet materialized as a typed table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Sheet name, used as the SQL table identifier
    pub name: String,
    /// Column definitions in source order
    pub columns: Vec<Column>,
    /// Data rows keyed by column name
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.to_owned(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Case-insensitive lookup, for identifiers typed by users.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.column(name)
            .or_else(|| self.columns.iter().find(|column| column.name.eq_ignore_ascii_case(name)))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.to_owned()).collect()
    }

    /// Appends a row from values given in column order. Missing trailing values become null.
    pub fn push_values(&mut self, values: Vec<Value>) {
        let mut values = values.into_iter();
        let row = self
            .columns
            .iter()
            .map(|column| (column.name.to_owned(), values.next().unwrap_or_default()))
            .collect();
        self.rows.push(row);
    }
}
