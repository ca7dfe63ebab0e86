//! A small column-named table used for raw and ingested customer records.
//!
//! Values are kept loosely typed (`Cell`) until the column transformer decides
//! how each column is encoded, which mirrors how the records arrive from the
//! document store and from CSV files.

use crate::error::{TrainingError, TrainingResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A single loosely typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parse a raw CSV/form field. Empty (after trimming) is null.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Number(v),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell; text is parsed when it looks like a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Key used by categorical encoders. `1.0` and `"1"` map to the same key.
    #[must_use]
    pub fn category_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(v) => Some(format_number(*v)),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(v) => f.write_str(&format_number(*v)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// A record as delivered by a document store: ordered `(field, value)` pairs.
pub type Record = Vec<(String, Cell)>;

/// Row-major table with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataFrame {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> TrainingResult<Self> {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    /// Build a frame from heterogeneous records. Columns are the union of all
    /// record fields in first-seen order; absent fields become null.
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for record in &records {
            for (name, _) in record {
                if !index.contains_key(name) {
                    index.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
        }

        let width = columns.len();
        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = vec![Cell::Null; width];
                for (name, value) in record {
                    row[index[&name]] = value;
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    /// A frame is empty when it holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require_column(&self, name: &str) -> TrainingResult<usize> {
        self.column_index(name)
            .ok_or_else(|| TrainingError::Schema(format!("column not found: {name}")))
    }

    pub fn column(&self, name: &str) -> TrainingResult<Vec<&Cell>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> TrainingResult<()> {
        if row.len() != self.columns.len() {
            return Err(TrainingError::Dataset(format!(
                "row has {} values but frame has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Drop the named columns. Every name must exist.
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> TrainingResult<Self> {
        let mut drop = Vec::with_capacity(names.len());
        for name in names {
            drop.push(self.require_column(name.as_ref())?);
        }
        let keep: Vec<usize> = (0..self.columns.len()).filter(|i| !drop.contains(i)).collect();
        Ok(self.project(&keep))
    }

    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> TrainingResult<Self> {
        let mut keep = Vec::with_capacity(names.len());
        for name in names {
            keep.push(self.require_column(name.as_ref())?);
        }
        Ok(self.project(&keep))
    }

    fn project(&self, keep: &[usize]) -> Self {
        Self {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Replace every text cell equal to `token` with null. Returns the number
    /// of replaced cells.
    pub fn normalize_missing(&mut self, token: &str) -> usize {
        let mut replaced = 0;
        for cell in self.rows.iter_mut().flatten() {
            if matches!(cell, Cell::Text(s) if s == token) {
                *cell = Cell::Null;
                replaced += 1;
            }
        }
        replaced
    }

    /// Separate the target column from the features.
    pub fn split_target(&self, target: &str) -> TrainingResult<(Self, Vec<Cell>)> {
        let idx = self.require_column(target)?;
        let labels = self.rows.iter().map(|row| row[idx].clone()).collect();
        let features = self.drop_columns(&[target])?;
        Ok((features, labels))
    }

    /// Shuffle rows with `seed` and move `ceil(n * test_ratio)` of them into
    /// the test frame.
    pub fn train_test_split(&self, test_ratio: f64, seed: u64) -> TrainingResult<(Self, Self)> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(TrainingError::Dataset(format!(
                "test ratio must be in (0, 1), got {test_ratio}"
            )));
        }
        let n = self.n_rows();
        let n_test = ((n as f64) * test_ratio).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(TrainingError::Dataset(format!(
                "splitting {n} rows with test ratio {test_ratio} leaves an empty train or test set"
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
        let (test_idx, train_idx) = indices.split_at(n_test);
        Ok((self.take_rows(train_idx), self.take_rows(test_idx)))
    }

    pub fn read_csv(path: &Path) -> TrainingResult<Self> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();
        let mut frame = Self::new(columns);
        for record in reader.records() {
            let record = record?;
            frame.push_row(record.iter().map(Cell::parse).collect())?;
        }
        Ok(frame)
    }

    pub fn write_csv(&self, path: &Path) -> TrainingResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(ToString::to_string))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(n: usize) -> DataFrame {
        let rows = (0..n)
            .map(|i| vec![Cell::Number(i as f64), Cell::Text(format!("c{}", i % 3))])
            .collect();
        DataFrame::from_rows(vec!["id".to_string(), "cat".to_string()], rows).unwrap()
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse(" "), Cell::Null);
        assert_eq!(Cell::parse("12.5"), Cell::Number(12.5));
        assert_eq!(Cell::parse("Yes"), Cell::Text("Yes".to_string()));
        assert_eq!(Cell::Number(1.0).category_key().as_deref(), Some("1"));
    }

    #[test]
    fn test_from_records_unions_columns_in_first_seen_order() {
        let records = vec![
            vec![("a".to_string(), Cell::Number(1.0))],
            vec![("b".to_string(), Cell::from("x")), ("a".to_string(), Cell::Number(2.0))],
        ];
        let frame = DataFrame::from_records(records);
        assert_eq!(frame.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(frame.rows()[0][1], Cell::Null);
        assert_eq!(frame.rows()[1][0], Cell::Number(2.0));
    }

    #[test]
    fn test_split_preserves_row_count() {
        let frame = sample(101);
        for ratio in [0.1, 0.2, 0.33, 0.5, 0.9] {
            let (train, test) = frame.train_test_split(ratio, 7).unwrap();
            assert_eq!(train.n_rows() + test.n_rows(), 101);
            assert_eq!(test.n_rows(), (101.0 * ratio).ceil() as usize);
        }
    }

    #[test]
    fn test_split_rejects_bad_ratio() {
        let frame = sample(10);
        assert!(frame.train_test_split(0.0, 1).is_err());
        assert!(frame.train_test_split(1.0, 1).is_err());
        assert!(sample(1).train_test_split(0.2, 1).is_err());
    }

    #[test]
    fn test_normalize_missing() {
        let mut frame = DataFrame::from_rows(
            vec!["a".to_string()],
            vec![vec![Cell::from("na")], vec![Cell::from("ok")]],
        )
        .unwrap();
        assert_eq!(frame.normalize_missing("na"), 1);
        assert!(frame.rows()[0][0].is_null());
    }

    #[test]
    fn test_drop_missing_column_fails() {
        let frame = sample(3);
        assert!(frame.drop_columns(&["nope"]).is_err());
        assert_eq!(frame.drop_columns(&["id"]).unwrap().columns(), &["cat".to_string()]);
    }

    #[test]
    fn test_csv_roundtrip_keeps_nulls() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/data.csv");
        let frame = DataFrame::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Cell::Number(1.5), Cell::Null], vec![Cell::Number(2.0), Cell::from("x")]],
        )
        .unwrap();
        frame.write_csv(&path).unwrap();
        let back = DataFrame::read_csv(&path).unwrap();
        assert_eq!(back, frame);
    }
}
