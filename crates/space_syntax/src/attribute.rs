//! The `AttributeTable`: a column-keyed-by-name table of rows
//! keyed by a map-specific key (`PixelRef` for `PointMap`, an integer
//! shape-ref for `ShapeMap`). Analyses write into it by column name;
//! they never see another analysis's columns unless they ask for them
//! by name.
//!
//! Kept host-agnostic and directly testable: an in-process concrete
//! type rather than a host-supplied trait, since every map
//! representation needs exactly this shape and there is no second
//! implementation to abstract over.

use std::collections::HashMap;
use std::hash::Hash;

pub type ColumnIndex = usize;

/// One row of attribute values, one `f64` per column in column-index
/// order. Missing values (a column added after this row existed) are
/// `f64::NAN`.
#[derive(Clone, Debug, Default)]
pub struct Row {
    values: Vec<f64>,
}

impl Row {
    pub fn get(&self, col: ColumnIndex) -> f64 {
        self.values.get(col).copied().unwrap_or(f64::NAN)
    }

    pub fn set(&mut self, col: ColumnIndex, value: f64) {
        if col >= self.values.len() {
            self.values.resize(col + 1, f64::NAN);
        }
        self.values[col] = value;
    }
}

/// Per-column display statistics, tracked incrementally as values are
/// set so a host can render a legend without a second pass.
#[derive(Clone, Copy, Debug)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub total: f64,
    pub count: usize,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            total: 0.0,
            count: 0,
        }
    }
}

impl ColumnStats {
    fn observe(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.total += value;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.total / self.count as f64
        }
    }
}

/// A column-keyed-by-name, row-keyed-by-`K` attribute table.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable<K> {
    columns: Vec<String>,
    column_index: HashMap<String, ColumnIndex>,
    stats: Vec<ColumnStats>,
    rows: HashMap<K, Row>,
    row_order: Vec<K>,
}

impl<K: Copy + Eq + Hash> AttributeTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `key` has a row, creating an all-NaN one if absent.
    pub fn ensure_row(&mut self, key: K) {
        if !self.rows.contains_key(&key) {
            self.rows.insert(key, Row::default());
            self.row_order.push(key);
        }
    }

    /// Creates (or resets to all-NaN) the named column, returning its
    /// index. Matches the host contract: re-running an analysis with
    /// the same column name wipes prior values rather than appending a
    /// duplicate column.
    pub fn insert_or_reset_column(&mut self, name: &str) -> ColumnIndex {
        if let Some(&idx) = self.column_index.get(name) {
            self.stats[idx] = ColumnStats::default();
            for row in self.rows.values_mut() {
                row.set(idx, f64::NAN);
            }
            return idx;
        }
        let idx = self.columns.len();
        self.columns.push(name.to_string());
        self.column_index.insert(name.to_string(), idx);
        self.stats.push(ColumnStats::default());
        idx
    }

    pub fn get_column_index(&self, name: &str) -> Option<ColumnIndex> {
        self.column_index.get(name).copied()
    }

    pub fn column_name(&self, idx: ColumnIndex) -> Option<&str> {
        self.columns.get(idx).map(String::as_str)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_order.len()
    }

    pub fn get_row(&mut self, key: K) -> &mut Row {
        self.ensure_row(key);
        self.rows.get_mut(&key).unwrap()
    }

    pub fn get(&self, key: K, col: ColumnIndex) -> Option<f64> {
        self.rows.get(&key).map(|r| r.get(col))
    }

    /// Sets a value and folds it into that column's running stats.
    /// Prefer this over `get_row(key).set(...)` when the caller wants
    /// display stats kept current.
    pub fn set(&mut self, key: K, col: ColumnIndex, value: f64) {
        self.ensure_row(key);
        self.rows.get_mut(&key).unwrap().set(col, value);
        self.stats[col].observe(value);
    }

    pub fn stats(&self, col: ColumnIndex) -> ColumnStats {
        self.stats[col]
    }

    /// Iterates rows in insertion order, yielding `(key, &Row)`.
    pub fn rows(&self) -> impl Iterator<Item = (K, &Row)> {
        self.row_order.iter().map(move |k| (*k, &self.rows[k]))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.row_order.iter().copied()
    }
}

/// A caller-owned bundle of columns produced by one analysis run,
/// merged into the destination `AttributeTable` after the run
/// completes (each worker emits an owned row vector that is merged
/// after the barrier; analyses never leave partial columns on
/// cancellation/failure).
#[derive(Clone, Debug, Default)]
pub struct ColumnBundle<K> {
    pub columns: Vec<String>,
    pub values: HashMap<K, Vec<f64>>,
}

impl<K: Copy + Eq + Hash> ColumnBundle<K> {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: K, col: usize, value: f64) {
        let row = self
            .values
            .entry(key)
            .or_insert_with(|| vec![f64::NAN; self.columns.len()]);
        row[col] = value;
    }

    /// Merges this bundle into `table`, creating/resetting each named
    /// column first.
    pub fn merge_into(self, table: &mut AttributeTable<K>) {
        let indices: Vec<ColumnIndex> = self
            .columns
            .iter()
            .map(|name| table.insert_or_reset_column(name))
            .collect();
        for (key, values) in self.values {
            for (local_col, value) in values.into_iter().enumerate() {
                table.set(key, indices[local_col], value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_or_reset_column_wipes_existing_values() {
        let mut t: AttributeTable<i32> = AttributeTable::new();
        let col = t.insert_or_reset_column("Depth");
        t.set(1, col, 5.0);
        assert_eq!(t.get(1, col), Some(5.0));
        let col2 = t.insert_or_reset_column("Depth");
        assert_eq!(col, col2);
        assert!(t.get(1, col).unwrap().is_nan());
    }

    #[test]
    fn stats_track_min_max_mean() {
        let mut t: AttributeTable<i32> = AttributeTable::new();
        let col = t.insert_or_reset_column("X");
        for (k, v) in [(1, 1.0), (2, 3.0), (3, 5.0)] {
            t.set(k, col, v);
        }
        let s = t.stats(col);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.mean(), 3.0);
    }

    #[test]
    fn column_bundle_merge_creates_columns() {
        let mut t: AttributeTable<i32> = AttributeTable::new();
        let mut bundle = ColumnBundle::new(vec!["A".into(), "B".into()]);
        bundle.set(1, 0, 1.0);
        bundle.set(1, 1, 2.0);
        bundle.merge_into(&mut t);
        let a = t.get_column_index("A").unwrap();
        let b = t.get_column_index("B").unwrap();
        assert_eq!(t.get(1, a), Some(1.0));
        assert_eq!(t.get(1, b), Some(2.0));
    }
}
