//! Columnar storage for bulk numeric state.
//!
//! Units with many uniform sub-records (thousands of tree rows, say) pay
//! for attribute indirection on every read. A [`ColumnFrame`] keeps such
//! state as memory-contiguous columns instead and bypasses the overlay:
//! branching clones shared column handles, and the first write to a column
//! on a branch copies that one column, never the whole frame.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::payload::Branchable;

/// A struct-of-arrays frame of named f64 columns with a fixed row count.
///
/// # Examples
///
/// ```
/// use silvasim::ColumnFrame;
///
/// let mut frame = ColumnFrame::new(3);
/// frame.insert_column("height", vec![10.0, 12.0, 14.0]).unwrap();
///
/// let mut branch = frame.clone();
/// branch.set("height", 0, 11.0);
///
/// assert_eq!(frame.get("height", 0), Some(10.0));
/// assert_eq!(branch.get("height", 0), Some(11.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ColumnFrame {
    columns: BTreeMap<String, Arc<Vec<f64>>>,
    rows: usize,
}

impl ColumnFrame {
    /// Creates a frame with `rows` rows and no columns.
    #[must_use]
    pub fn new(rows: usize) -> Self {
        Self {
            columns: BTreeMap::new(),
            rows,
        }
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Returns true if `name` is a stored column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Adds or replaces a column.
    ///
    /// # Errors
    ///
    /// Returns the rejected values when their length does not match the
    /// frame's row count.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), Vec<f64>> {
        if values.len() != self.rows {
            return Err(values);
        }
        self.columns.insert(name.into(), Arc::new(values));
        Ok(())
    }

    /// The full column, if present.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|column| column.as_slice())
    }

    /// One cell, if the column exists and `row` is in range.
    #[must_use]
    pub fn get(&self, name: &str, row: usize) -> Option<f64> {
        self.columns.get(name)?.get(row).copied()
    }

    /// Writes one cell. Copies the column first when a sibling branch
    /// still shares it; other columns stay shared either way.
    ///
    /// Returns false when the column is missing or `row` is out of range.
    pub fn set(&mut self, name: &str, row: usize, value: f64) -> bool {
        match self.columns.get_mut(name) {
            Some(column) if row < column.len() => {
                Arc::make_mut(column)[row] = value;
                true
            }
            _ => false,
        }
    }

    /// Applies `f` to every cell of a column, copying it first when
    /// shared.
    ///
    /// Returns false when the column is missing.
    pub fn map_column(&mut self, name: &str, f: impl Fn(f64) -> f64) -> bool {
        match self.columns.get_mut(name) {
            Some(column) => {
                for cell in Arc::make_mut(column) {
                    *cell = f(*cell);
                }
                true
            }
            None => false,
        }
    }

    /// Column names in name order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

impl Branchable for ColumnFrame {
    fn branch(&self) -> Self {
        self.clone()
    }
}
