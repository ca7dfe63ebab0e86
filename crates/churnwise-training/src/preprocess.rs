//! Feature encoders and the column transformer that composes them.
//!
//! Fitting always happens on the training split; the fitted objects are then
//! persisted and reused unchanged for the test split and online prediction.

use crate::error::{TrainingError, TrainingResult};
use crate::frame::{Cell, DataFrame};
use crate::matrix::Matrix;
use crate::schema::SchemaDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

fn category_of(column: &str, cell: &Cell) -> TrainingResult<String> {
    cell.category_key()
        .ok_or_else(|| TrainingError::Dataset(format!("null value in categorical feature {column}")))
}

#[derive(Debug, Clone, Default)]
pub struct OneHotEncoder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOneHot {
    pub column: String,
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit(&self, column: &str, values: &[&Cell]) -> TrainingResult<FittedOneHot> {
        let mut seen = BTreeSet::new();
        for cell in values {
            seen.insert(category_of(column, cell)?);
        }
        Ok(FittedOneHot { column: column.to_string(), categories: seen.into_iter().collect() })
    }
}

impl FittedOneHot {
    fn encode_into(&self, cell: &Cell, out: &mut Vec<f64>) -> TrainingResult<()> {
        let key = category_of(&self.column, cell)?;
        let pos = self.categories.iter().position(|c| *c == key).ok_or_else(|| {
            TrainingError::Dataset(format!("unknown category {key:?} for feature {}", self.column))
        })?;
        out.extend((0..self.categories.len()).map(|i| if i == pos { 1.0 } else { 0.0 }));
        Ok(())
    }

    fn output_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories.iter().map(|c| format!("{}_{c}", self.column))
    }
}

/// Maps categories to their position in a fixed order.
#[derive(Debug, Clone, Default)]
pub struct OrdinalEncoder {
    order: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedOrdinal {
    pub column: String,
    pub categories: Vec<String>,
}

impl OrdinalEncoder {
    #[must_use]
    pub fn with_order(order: Vec<String>) -> Self {
        Self { order: Some(order) }
    }

    pub fn fit(&self, column: &str, values: &[&Cell]) -> TrainingResult<FittedOrdinal> {
        let mut seen = BTreeSet::new();
        for cell in values {
            seen.insert(category_of(column, cell)?);
        }
        let categories = match &self.order {
            Some(order) => {
                if let Some(extra) = seen.iter().find(|c| !order.contains(c)) {
                    return Err(TrainingError::Dataset(format!(
                        "category {extra:?} of {column} is missing from its declared order"
                    )));
                }
                order.clone()
            }
            None => seen.into_iter().collect(),
        };
        Ok(FittedOrdinal { column: column.to_string(), categories })
    }
}

impl FittedOrdinal {
    fn encode(&self, cell: &Cell) -> TrainingResult<f64> {
        let key = category_of(&self.column, cell)?;
        self.categories
            .iter()
            .position(|c| *c == key)
            .map(|i| i as f64)
            .ok_or_else(|| {
                TrainingError::Dataset(format!("unknown category {key:?} for feature {}", self.column))
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StandardScaler;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

fn numeric_of(column: &str, cell: &Cell) -> TrainingResult<Option<f64>> {
    match cell {
        Cell::Null => Ok(None),
        other => other.as_f64().map(Some).ok_or_else(|| {
            TrainingError::Dataset(format!("non-numeric value {other:?} in numeric feature {column}"))
        }),
    }
}

impl StandardScaler {
    /// Population mean and standard deviation over non-null values.
    pub fn fit(&self, column: &str, values: &[&Cell]) -> TrainingResult<FittedScaler> {
        let mut present = Vec::with_capacity(values.len());
        for cell in values {
            if let Some(v) = numeric_of(column, cell)? {
                present.push(v);
            }
        }
        if present.is_empty() {
            return Ok(FittedScaler { column: column.to_string(), mean: 0.0, scale: 1.0 });
        }
        let n = present.len() as f64;
        let mean = present.iter().sum::<f64>() / n;
        let var = present.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > f64::EPSILON { std } else { 1.0 };
        Ok(FittedScaler { column: column.to_string(), mean, scale })
    }
}

impl FittedScaler {
    /// Nulls are imputed with the fitted mean, so they scale to zero.
    fn encode(&self, cell: &Cell) -> TrainingResult<f64> {
        let v = numeric_of(&self.column, cell)?.unwrap_or(self.mean);
        Ok((v - self.mean) / self.scale)
    }
}

/// Unfitted column transformer: one-hot, ordinal, then scaled numeric blocks.
/// Columns outside these groups are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTransformer {
    pub nominal: Vec<String>,
    pub ordinal: Vec<String>,
    pub numeric: Vec<String>,
    pub ordinal_categories: BTreeMap<String, Vec<String>>,
}

impl ColumnTransformer {
    #[must_use]
    pub fn from_schema(schema: &SchemaDescriptor) -> Self {
        Self {
            nominal: schema.nominal_features.clone(),
            ordinal: schema.ordinal_features.clone(),
            numeric: schema.numeric_features.clone(),
            ordinal_categories: schema.ordinal_categories.clone(),
        }
    }

    pub fn fit(&self, frame: &DataFrame) -> TrainingResult<FittedColumnTransformer> {
        if self.nominal.is_empty() && self.ordinal.is_empty() && self.numeric.is_empty() {
            return Err(TrainingError::Schema("column transformer has no features".to_string()));
        }
        let one_hot = self
            .nominal
            .iter()
            .map(|name| OneHotEncoder.fit(name, &frame.column(name)?))
            .collect::<TrainingResult<Vec<_>>>()?;
        let ordinal = self
            .ordinal
            .iter()
            .map(|name| {
                let encoder = self
                    .ordinal_categories
                    .get(name)
                    .map_or_else(OrdinalEncoder::default, |order| OrdinalEncoder::with_order(order.clone()));
                encoder.fit(name, &frame.column(name)?)
            })
            .collect::<TrainingResult<Vec<_>>>()?;
        let scalers = self
            .numeric
            .iter()
            .map(|name| StandardScaler.fit(name, &frame.column(name)?))
            .collect::<TrainingResult<Vec<_>>>()?;

        let fitted = FittedColumnTransformer { one_hot, ordinal, scalers };
        tracing::debug!(
            input_rows = frame.n_rows(),
            output_features = fitted.n_features_out(),
            "fitted column transformer"
        );
        Ok(fitted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformer {
    pub one_hot: Vec<FittedOneHot>,
    pub ordinal: Vec<FittedOrdinal>,
    pub scalers: Vec<FittedScaler>,
}

impl FittedColumnTransformer {
    #[must_use]
    pub fn n_features_out(&self) -> usize {
        self.one_hot.iter().map(|e| e.categories.len()).sum::<usize>()
            + self.ordinal.len()
            + self.scalers.len()
    }

    #[must_use]
    pub fn feature_names_out(&self) -> Vec<String> {
        self.one_hot
            .iter()
            .flat_map(FittedOneHot::output_names)
            .chain(self.ordinal.iter().map(|e| e.column.clone()))
            .chain(self.scalers.iter().map(|s| s.column.clone()))
            .collect()
    }

    pub fn transform(&self, frame: &DataFrame) -> TrainingResult<Matrix> {
        let resolve = |name: &str| {
            frame
                .column_index(name)
                .ok_or_else(|| TrainingError::Schema(format!("input is missing feature column {name}")))
        };
        let oh_idx = self.one_hot.iter().map(|e| resolve(&e.column)).collect::<TrainingResult<Vec<_>>>()?;
        let or_idx = self.ordinal.iter().map(|e| resolve(&e.column)).collect::<TrainingResult<Vec<_>>>()?;
        let sc_idx = self.scalers.iter().map(|s| resolve(&s.column)).collect::<TrainingResult<Vec<_>>>()?;

        let mut out = Matrix::with_cols(self.n_features_out());
        let mut buf = Vec::with_capacity(self.n_features_out());
        for row in frame.rows() {
            buf.clear();
            for (enc, &i) in self.one_hot.iter().zip(&oh_idx) {
                enc.encode_into(&row[i], &mut buf)?;
            }
            for (enc, &i) in self.ordinal.iter().zip(&or_idx) {
                buf.push(enc.encode(&row[i])?);
            }
            for (scaler, &i) in self.scalers.iter().zip(&sc_idx) {
                buf.push(scaler.encode(&row[i])?);
            }
            out.push_row(&buf)?;
        }
        Ok(out)
    }
}
