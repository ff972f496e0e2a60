use crate::database::value::Value;
use std::collections::HashMap;

static NULL: Value = Value::Null;

/// A sparse, 0-indexed grid of decoded cell values for one worksheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    /// Worksheet name
    pub name: String,
    cells: HashMap<(usize, usize), Value>,
    /// One past the last populated row
    row_count: usize,
    /// One past the last populated column
    col_count: usize,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Builds a sheet from dense rows, skipping null values.
    pub fn from_rows(name: &str, rows: Vec<Vec<Value>>) -> Self {
        let mut sheet = Self::new(name);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                sheet.set(row, col, value);
            }
        }
        sheet
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value at (row, col); absent cells read as null.
    pub fn get(&self, row: usize, col: usize) -> &Value {
        self.cells.get(&(row, col)).unwrap_or(&NULL)
    }

    /// Stores a value. Null clears the cell; bounds only grow.
    pub fn set(&mut self, row: usize, col: usize, value: Value) {
        if value.is_null() {
            self.cells.remove(&(row, col));
        } else {
            self.row_count = self.row_count.max(row + 1);
            self.col_count = self.col_count.max(col + 1);
            self.cells.insert((row, col), value);
        }
    }

    /// Removes every cell at or below `row`.
    pub fn truncate_rows(&mut self, row: usize) {
        self.cells.retain(|(r, _), _| *r < row);
        self.row_count = self.cells.keys().map(|(r, _)| r + 1).max().unwrap_or(0);
        self.col_count = self.cells.keys().map(|(_, c)| c + 1).max().unwrap_or(0);
    }

    /// Populated cells of one row in column order.
    pub fn row_cells(&self, row: usize) -> Vec<(usize, &Value)> {
        let mut cells: Vec<(usize, &Value)> = (0..self.col_count)
            .filter_map(|col| self.cells.get(&(row, col)).map(|value| (col, value)))
            .collect();
        cells.sort_by_key(|(col, _)| *col);
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("Items");
        assert_eq!(sheet.row_count(), 0);
        assert_eq!(sheet.col_count(), 0);
        assert!(sheet.is_empty());
        assert_eq!(sheet.get(3, 3), &Value::Null);
    }

    #[test]
    fn sheet_update() {
        let mut sheet = Sheet::new("Items");
        sheet.set(1, 1, Value::Int(1));
        sheet.set(3, 2, "x".into());
        sheet.set(5, 0, Value::Null);
        assert_eq!(sheet.row_count(), 4);
        assert_eq!(sheet.col_count(), 3);
        assert_eq!(sheet.get(1, 1), &Value::Int(1));
        assert_eq!(sheet.row_cells(3), vec![(2, &Value::Text("x".to_owned()))]);
    }

    #[test]
    fn sheet_truncate() {
        let mut sheet = Sheet::from_rows("Items", vec![
            vec!["ID".into(), "Name".into()],
            vec![Value::Int(1), "Widget".into()],
            vec![Value::Int(2)],
        ]);
        sheet.truncate_rows(1);
        assert_eq!(sheet.row_count(), 1);
        assert_eq!(sheet.col_count(), 2);
        assert_eq!(sheet.get(1, 0), &Value::Null);
    }
}
