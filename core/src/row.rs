//! Row mappings handed to the bulk writer.
//!
//! Producers build typed records; `TableRow` turns each record into an
//! ordered column → value mapping and declares the columns it fills, so
//! the orchestrator can check the shape against the schema catalog once.

use crate::types::Table;
use rusqlite::types::Value;

/// One ordered column → value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(&'static str, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Builder style.
    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.cells.push((column, value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(c, _)| *c)
    }

    /// Keep only the cells whose column satisfies `keep`.
    pub fn project(&self, keep: impl Fn(&str) -> bool) -> Row {
        Row {
            cells: self
                .cells
                .iter()
                .filter(|(c, _)| keep(c))
                .cloned()
                .collect(),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.cells.into_iter().map(|(_, v)| v).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

/// A generated record that maps onto one table.
pub trait TableRow {
    const TABLE: Table;

    /// Every column `to_row` fills, in the order it fills them.
    const COLUMNS: &'static [&'static str];

    fn to_row(&self) -> Row;
}

/// Convert a slice of records into row mappings.
pub fn rows_of<R: TableRow>(records: &[R]) -> Vec<Row> {
    records.iter().map(TableRow::to_row).collect()
}
