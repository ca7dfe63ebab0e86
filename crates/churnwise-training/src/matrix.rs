use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> TrainingResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let n = rows.len();
        let mut data = Vec::with_capacity(n * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(TrainingError::Dataset(format!(
                    "matrix row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self { rows: n, cols, data })
    }

    /// Create an empty matrix with a fixed column count, for appending rows.
    #[must_use]
    pub fn with_cols(cols: usize) -> Self {
        Self { rows: 0, cols, data: Vec::new() }
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    pub fn push_row(&mut self, row: &[f64]) -> TrainingResult<()> {
        if row.len() != self.cols {
            return Err(TrainingError::Dataset(format!(
                "cannot append row of {} values to matrix with {} columns",
                row.len(),
                self.cols
            )));
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self { rows: indices.len(), cols: self.cols, data }
    }

    /// Append `labels` as a final column (features ‖ label).
    pub fn with_label_column(&self, labels: &[f64]) -> TrainingResult<Self> {
        if labels.len() != self.rows {
            return Err(TrainingError::Dataset(format!(
                "{} labels for {} rows",
                labels.len(),
                self.rows
            )));
        }
        let mut out = Self::with_cols(self.cols + 1);
        for (row, label) in self.iter_rows().zip(labels) {
            out.data.extend_from_slice(row);
            out.data.push(*label);
            out.rows += 1;
        }
        Ok(out)
    }

    /// Split into (all but the last column, last column).
    pub fn split_label_column(&self) -> TrainingResult<(Self, Vec<f64>)> {
        if self.cols < 2 {
            return Err(TrainingError::Dataset(
                "matrix needs at least one feature column and a label column".to_string(),
            ));
        }
        let mut features = Self::with_cols(self.cols - 1);
        let mut labels = Vec::with_capacity(self.rows);
        for row in self.iter_rows() {
            let (x, y) = row.split_at(self.cols - 1);
            features.data.extend_from_slice(x);
            features.rows += 1;
            labels.push(y[0]);
        }
        Ok((features, labels))
    }
}

#[must_use]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Indices of the `k` rows of `data` closest to `point`, nearest first.
/// `exclude` skips one row (the query itself when it belongs to `data`).
#[must_use]
pub fn nearest_neighbors(data: &Matrix, point: &[f64], k: usize, exclude: Option<usize>) -> Vec<(usize, f64)> {
    let mut dists: Vec<(usize, f64)> = (0..data.n_rows())
        .filter(|&i| Some(i) != exclude)
        .map(|i| (i, squared_distance(data.row(i), point)))
        .collect();
    dists.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    dists.truncate(k);
    dists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_column_roundtrip() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let with = m.with_label_column(&[0.0, 1.0]).unwrap();
        assert_eq!(with.n_cols(), 3);
        assert_eq!(with.row(1), &[3.0, 4.0, 1.0]);
        let (x, y) = with.split_label_column().unwrap();
        assert_eq!(x, m);
        assert_eq!(y, vec![0.0, 1.0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(Matrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_nearest_neighbors_excludes_self() {
        let m = Matrix::from_rows(vec![vec![0.0], vec![1.0], vec![5.0]]).unwrap();
        let nn = nearest_neighbors(&m, &[0.0], 2, Some(0));
        assert_eq!(nn.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 2]);
    }
}
