//! The uniform in-memory table model.

mod column;

pub use column::{Column, ColumnData, ColumnType};

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

use crate::error::{DataLensError, Result};

/// An ordered sequence of named, equal-length columns.
///
/// Tables are never mutated after construction: loaders and the cleaning
/// pipeline build new tables, analysis engines only borrow them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Create a table, enforcing the equal-length invariant.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            for col in &columns {
                if col.len() != expected {
                    return Err(DataLensError::InvalidConfig(format!(
                        "column '{}' has {} rows, expected {}",
                        col.name,
                        col.len(),
                        expected
                    )));
                }
            }
        }
        Ok(Self { columns })
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First column with the given name, if any.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// First column with the given name, or a `ColumnNotFound` error.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| DataLensError::ColumnNotFound(name.to_string()))
    }

    /// Columns with integer or float storage, in table order.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.is_numeric()).collect()
    }

    /// Hash-based identity of a full row, treating columns in order.
    pub(crate) fn row_key(&self, row: usize) -> u64 {
        let mut hasher = DefaultHasher::new();
        for col in &self.columns {
            hasher.write_u64(col.cell_hash(row));
        }
        hasher.finish()
    }

    /// Number of rows that duplicate an earlier row.
    pub fn duplicate_row_count(&self) -> usize {
        let mut seen: HashMap<u64, usize> = HashMap::new();
        let mut dups = 0;
        for row in 0..self.row_count() {
            let count = seen.entry(self.row_key(row)).or_insert(0);
            if *count > 0 {
                dups += 1;
            }
            *count += 1;
        }
        dups
    }

    /// A new table holding the rows in `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take_rows(indices)))
                .collect(),
        }
    }

    /// A new table keeping only rows where `keep` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Table {
        let indices: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        self.take_rows(&indices)
    }

    /// A new table without the named columns.
    pub fn without_columns(&self, names: &[String]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .filter(|c| !names.contains(&c.name))
                .cloned()
                .collect(),
        }
    }

    /// A new table with one column's storage replaced.
    pub(crate) fn with_column_data(&self, index: usize, data: ColumnData) -> Table {
        let mut columns = self.columns.clone();
        columns[index].data = data;
        Table { columns }
    }

    /// Estimated in-memory footprint of the table in bytes.
    pub fn estimated_memory_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.data.estimated_bytes()).sum()
    }
}
