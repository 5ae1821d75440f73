//! Column storage: tagged variants with typed backing arrays.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Whole numbers.
    Integer,
    /// Floating-point numbers.
    Float,
    /// Free text.
    Text,
    /// Low-cardinality values encoded against a level table.
    Categorical,
    /// Date and/or time values.
    DateTime,
    /// Boolean values.
    Boolean,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

/// Typed backing storage for a column. `None` is the missing state,
/// distinct from every valid value of the variant's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Categorical {
        levels: Vec<String>,
        codes: Vec<Option<u32>>,
    },
    DateTime(Vec<Option<NaiveDateTime>>),
    Boolean(Vec<Option<bool>>),
}

impl ColumnData {
    /// Number of cells, including missing ones.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
            ColumnData::DateTime(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The type tag for this storage.
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Integer(_) => ColumnType::Integer,
            ColumnData::Float(_) => ColumnType::Float,
            ColumnData::Text(_) => ColumnType::Text,
            ColumnData::Categorical { .. } => ColumnType::Categorical,
            ColumnData::DateTime(_) => ColumnType::DateTime,
            ColumnData::Boolean(_) => ColumnType::Boolean,
        }
    }

    /// Whether the cell at `idx` is missing.
    pub fn is_missing(&self, idx: usize) -> bool {
        match self {
            ColumnData::Integer(v) => v.get(idx).is_none_or(|c| c.is_none()),
            ColumnData::Float(v) => v.get(idx).is_none_or(|c| c.is_none()),
            ColumnData::Text(v) => v.get(idx).is_none_or(|c| c.is_none()),
            ColumnData::Categorical { codes, .. } => codes.get(idx).is_none_or(|c| c.is_none()),
            ColumnData::DateTime(v) => v.get(idx).is_none_or(|c| c.is_none()),
            ColumnData::Boolean(v) => v.get(idx).is_none_or(|c| c.is_none()),
        }
    }

    /// Count of missing cells.
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Count of non-missing cells.
    pub fn non_missing_count(&self) -> usize {
        self.len() - self.missing_count()
    }

    /// Numeric view of the cell at `idx` (integer and float variants only).
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            ColumnData::Integer(v) => v.get(idx).copied().flatten().map(|n| n as f64),
            ColumnData::Float(v) => v.get(idx).copied().flatten(),
            _ => None,
        }
    }

    /// Canonical display string of the cell at `idx`, `None` when missing.
    pub fn display_at(&self, idx: usize) -> Option<String> {
        match self {
            ColumnData::Integer(v) => v.get(idx).copied().flatten().map(|n| n.to_string()),
            ColumnData::Float(v) => v.get(idx).copied().flatten().map(|n| n.to_string()),
            ColumnData::Text(v) => v.get(idx).and_then(|c| c.clone()),
            ColumnData::Categorical { levels, codes } => codes
                .get(idx)
                .copied()
                .flatten()
                .and_then(|c| levels.get(c as usize).cloned()),
            ColumnData::DateTime(v) => v.get(idx).copied().flatten().map(|d| d.to_string()),
            ColumnData::Boolean(v) => v.get(idx).copied().flatten().map(|b| b.to_string()),
        }
    }

    /// Count of distinct non-missing values.
    pub fn distinct_count(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Float(v) => v
                .iter()
                .flatten()
                .map(|f| f.to_bits())
                .collect::<HashSet<_>>()
                .len(),
            ColumnData::Text(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Categorical { codes, .. } => {
                codes.iter().flatten().collect::<HashSet<_>>().len()
            }
            ColumnData::DateTime(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Boolean(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
        }
    }

    /// Hash the cell at `idx` into `hasher`, bit-exact for floats.
    pub(crate) fn hash_cell<H: Hasher>(&self, idx: usize, hasher: &mut H) {
        match self {
            ColumnData::Integer(v) => v.get(idx).copied().flatten().hash(hasher),
            ColumnData::Float(v) => v
                .get(idx)
                .copied()
                .flatten()
                .map(|f| f.to_bits())
                .hash(hasher),
            ColumnData::Text(v) => v.get(idx).and_then(|c| c.as_deref()).hash(hasher),
            ColumnData::Categorical { levels, codes } => codes
                .get(idx)
                .copied()
                .flatten()
                .and_then(|c| levels.get(c as usize).map(|s| s.as_str()))
                .hash(hasher),
            ColumnData::DateTime(v) => v.get(idx).copied().flatten().hash(hasher),
            ColumnData::Boolean(v) => v.get(idx).copied().flatten().hash(hasher),
        }
    }

    /// A new storage of the same variant holding the rows in `indices`.
    pub fn take_rows(&self, indices: &[usize]) -> ColumnData {
        fn take<T: Clone>(v: &[Option<T>], indices: &[usize]) -> Vec<Option<T>> {
            indices
                .iter()
                .map(|&i| v.get(i).cloned().flatten())
                .collect()
        }

        match self {
            ColumnData::Integer(v) => ColumnData::Integer(take(v, indices)),
            ColumnData::Float(v) => ColumnData::Float(take(v, indices)),
            ColumnData::Text(v) => ColumnData::Text(take(v, indices)),
            ColumnData::Categorical { levels, codes } => ColumnData::Categorical {
                levels: levels.clone(),
                codes: take(codes, indices),
            },
            ColumnData::DateTime(v) => ColumnData::DateTime(take(v, indices)),
            ColumnData::Boolean(v) => ColumnData::Boolean(take(v, indices)),
        }
    }

    /// Estimated in-memory footprint in bytes.
    pub fn estimated_bytes(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len() * std::mem::size_of::<Option<i64>>(),
            ColumnData::Float(v) => v.len() * std::mem::size_of::<Option<f64>>(),
            ColumnData::Text(v) => {
                v.len() * std::mem::size_of::<Option<String>>()
                    + v.iter().flatten().map(|s| s.len()).sum::<usize>()
            }
            ColumnData::Categorical { levels, codes } => {
                codes.len() * std::mem::size_of::<Option<u32>>()
                    + levels.iter().map(|s| s.len() + 24).sum::<usize>()
            }
            ColumnData::DateTime(v) => v.len() * std::mem::size_of::<Option<NaiveDateTime>>(),
            ColumnData::Boolean(v) => v.len() * std::mem::size_of::<Option<bool>>(),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn is_numeric(&self) -> bool {
        self.column_type().is_numeric()
    }

    /// All non-missing values as f64, in row order. Empty for non-numeric columns.
    pub fn numeric_values(&self) -> Vec<f64> {
        (0..self.len())
            .filter_map(|i| self.data.numeric_at(i))
            .collect()
    }

    /// Hash of the cell at `idx`, used for row identity.
    pub(crate) fn cell_hash(&self, idx: usize) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.data.hash_cell(idx, &mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_is_distinct_from_values() {
        let data = ColumnData::Integer(vec![Some(0), None, Some(1)]);
        assert!(!data.is_missing(0));
        assert!(data.is_missing(1));
        assert_eq!(data.missing_count(), 1);
        assert_eq!(data.non_missing_count(), 2);
    }

    #[test]
    fn test_distinct_count_ignores_missing() {
        let data = ColumnData::Text(vec![
            Some("a".into()),
            Some("b".into()),
            Some("a".into()),
            None,
        ]);
        assert_eq!(data.distinct_count(), 2);
    }

    #[test]
    fn test_categorical_display() {
        let data = ColumnData::Categorical {
            levels: vec!["low".into(), "high".into()],
            codes: vec![Some(1), Some(0), None],
        };
        assert_eq!(data.display_at(0).as_deref(), Some("high"));
        assert_eq!(data.display_at(2), None);
    }

    #[test]
    fn test_take_rows_preserves_variant() {
        let data = ColumnData::Float(vec![Some(1.0), Some(2.0), Some(3.0)]);
        let taken = data.take_rows(&[2, 0]);
        assert_eq!(taken, ColumnData::Float(vec![Some(3.0), Some(1.0)]));
    }

    #[test]
    fn test_numeric_at_for_integers() {
        let data = ColumnData::Integer(vec![Some(7), None]);
        assert_eq!(data.numeric_at(0), Some(7.0));
        assert_eq!(data.numeric_at(1), None);
    }
}
