//! Candidate classifiers for model search.
//!
//! `EstimatorSpec` is the unfitted, parameterized form read from the model
//! search file; `FittedEstimator` is what gets persisted inside a model bundle.

mod forest;
mod knn;
mod logistic;
mod tree;

pub use forest::{ForestModel, RandomForestParams};
pub use knn::{KnnModel, KnnParams, KnnWeights};
pub use logistic::{LogisticModel, LogisticParams};
pub use tree::{Criterion, DecisionTreeParams, MaxFeatures, TreeModel};

use crate::error::{TrainingError, TrainingResult};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar hyperparameter value as written in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Null => f.write_str("none"),
        }
    }
}

pub type Params = BTreeMap<String, ParamValue>;

/// Typed accessors over a parameter map. Every key must be consumed, so a
/// misspelled hyperparameter fails instead of being ignored.
pub(crate) struct ParamReader<'a> {
    kind: EstimatorKind,
    params: &'a Params,
    used: Vec<&'a str>,
}

impl<'a> ParamReader<'a> {
    fn new(kind: EstimatorKind, params: &'a Params) -> Self {
        Self { kind, params, used: Vec::new() }
    }

    fn take(&mut self, key: &'a str) -> Option<&'a ParamValue> {
        self.used.push(key);
        self.params.get(key)
    }

    fn invalid(&self, key: &str, expected: &str, got: &ParamValue) -> TrainingError {
        TrainingError::InvalidSpec(format!("{}: {key} must be {expected}, got {got}", self.kind))
    }

    pub(crate) fn f64_or(&mut self, key: &'a str, default: f64) -> TrainingResult<f64> {
        match self.take(key) {
            None => Ok(default),
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(i)) => Ok(*i as f64),
            Some(other) => Err(self.invalid(key, "a number", other)),
        }
    }

    pub(crate) fn usize_or(&mut self, key: &'a str, default: usize) -> TrainingResult<usize> {
        match self.take(key) {
            None => Ok(default),
            Some(ParamValue::Int(i)) if *i >= 0 => Ok(*i as usize),
            Some(other) => Err(self.invalid(key, "a non-negative integer", other)),
        }
    }

    /// `null` or absent maps to `None`.
    pub(crate) fn opt_usize(&mut self, key: &'a str) -> TrainingResult<Option<usize>> {
        match self.take(key) {
            None | Some(ParamValue::Null) => Ok(None),
            Some(ParamValue::Int(i)) if *i > 0 => Ok(Some(*i as usize)),
            Some(other) => Err(self.invalid(key, "a positive integer or null", other)),
        }
    }

    pub(crate) fn bool_or(&mut self, key: &'a str, default: bool) -> TrainingResult<bool> {
        match self.take(key) {
            None => Ok(default),
            Some(ParamValue::Bool(b)) => Ok(*b),
            Some(other) => Err(self.invalid(key, "a boolean", other)),
        }
    }

    pub(crate) fn value(&mut self, key: &'a str) -> Option<&'a ParamValue> {
        self.take(key)
    }

    pub(crate) fn text_or(&mut self, key: &'a str, default: &'a str) -> TrainingResult<&'a str> {
        match self.take(key) {
            None => Ok(default),
            Some(ParamValue::Text(s)) => Ok(s.as_str()),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }

    pub(crate) fn finish(self) -> TrainingResult<()> {
        if let Some(unknown) = self.params.keys().find(|k| !self.used.contains(&k.as_str())) {
            return Err(TrainingError::InvalidSpec(format!(
                "{}: unknown hyperparameter {unknown}",
                self.kind
            )));
        }
        Ok(())
    }
}

/// Classifier families available to model search. YAML names follow the
/// conventional class names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimatorKind {
    LogisticRegression,
    KNeighborsClassifier,
    DecisionTreeClassifier,
    RandomForestClassifier,
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LogisticRegression => "LogisticRegression",
            Self::KNeighborsClassifier => "KNeighborsClassifier",
            Self::DecisionTreeClassifier => "DecisionTreeClassifier",
            Self::RandomForestClassifier => "RandomForestClassifier",
        };
        f.write_str(name)
    }
}

/// A validated, ready-to-fit estimator configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimatorSpec {
    Logistic(LogisticParams),
    Knn(KnnParams),
    Tree(DecisionTreeParams),
    Forest(RandomForestParams),
}

impl EstimatorSpec {
    pub fn from_params(kind: EstimatorKind, params: &Params) -> TrainingResult<Self> {
        let mut reader = ParamReader::new(kind, params);
        let spec = match kind {
            EstimatorKind::LogisticRegression => Self::Logistic(LogisticParams::read(&mut reader)?),
            EstimatorKind::KNeighborsClassifier => Self::Knn(KnnParams::read(&mut reader)?),
            EstimatorKind::DecisionTreeClassifier => Self::Tree(DecisionTreeParams::read(&mut reader)?),
            EstimatorKind::RandomForestClassifier => {
                Self::Forest(RandomForestParams::read(&mut reader)?)
            }
        };
        reader.finish()?;
        Ok(spec)
    }

    #[must_use]
    pub fn kind(&self) -> EstimatorKind {
        match self {
            Self::Logistic(_) => EstimatorKind::LogisticRegression,
            Self::Knn(_) => EstimatorKind::KNeighborsClassifier,
            Self::Tree(_) => EstimatorKind::DecisionTreeClassifier,
            Self::Forest(_) => EstimatorKind::RandomForestClassifier,
        }
    }

    pub fn fit(&self, x: &Matrix, y: &[f64]) -> TrainingResult<FittedEstimator> {
        check_training_data(x, y)?;
        Ok(match self {
            Self::Logistic(p) => FittedEstimator::Logistic(p.fit(x, y)?),
            Self::Knn(p) => FittedEstimator::Knn(p.fit(x, y)?),
            Self::Tree(p) => FittedEstimator::Tree(p.fit(x, y)?),
            Self::Forest(p) => FittedEstimator::Forest(p.fit(x, y)?),
        })
    }
}

fn check_training_data(x: &Matrix, y: &[f64]) -> TrainingResult<()> {
    if x.is_empty() {
        return Err(TrainingError::Model("cannot fit on an empty matrix".to_string()));
    }
    if x.n_rows() != y.len() {
        return Err(TrainingError::Model(format!(
            "{} training rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    Ok(())
}

/// Sorted distinct labels, used by every classifier to index classes.
pub(crate) fn distinct_classes(y: &[f64]) -> Vec<f64> {
    let mut classes: Vec<f64> = y.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    classes
}

pub(crate) fn class_indices(classes: &[f64], y: &[f64]) -> Vec<usize> {
    y.iter()
        .map(|label| classes.iter().position(|c| c == label).unwrap_or(0))
        .collect()
}

/// Position of the largest value; ties resolve to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// A fitted classifier, persisted inside the model bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FittedEstimator {
    Logistic(LogisticModel),
    Knn(KnnModel),
    Tree(TreeModel),
    Forest(ForestModel),
}

impl FittedEstimator {
    #[must_use]
    pub fn kind(&self) -> EstimatorKind {
        match self {
            Self::Logistic(_) => EstimatorKind::LogisticRegression,
            Self::Knn(_) => EstimatorKind::KNeighborsClassifier,
            Self::Tree(_) => EstimatorKind::DecisionTreeClassifier,
            Self::Forest(_) => EstimatorKind::RandomForestClassifier,
        }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Self::Logistic(m) => m.n_features(),
            Self::Knn(m) => m.n_features(),
            Self::Tree(m) => m.n_features(),
            Self::Forest(m) => m.n_features(),
        }
    }

    pub fn predict(&self, x: &Matrix) -> TrainingResult<Vec<f64>> {
        if x.n_cols() != self.n_features() {
            return Err(TrainingError::Model(format!(
                "{} expects {} features, got {}",
                self.kind(),
                self.n_features(),
                x.n_cols()
            )));
        }
        Ok(match self {
            Self::Logistic(m) => m.predict(x),
            Self::Knn(m) => m.predict(x),
            Self::Tree(m) => m.predict(x),
            Self::Forest(m) => m.predict(x),
        })
    }
}
