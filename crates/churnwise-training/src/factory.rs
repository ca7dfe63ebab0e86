//! Grid search over candidate classifiers with stratified k-fold
//! cross-validation.
//!
//! The search file lists candidates under `model_selection`, each with a
//! `class`, base `params` and a `search_param_grid` whose cartesian product is
//! evaluated. The best configuration overall is refit on the full training
//! data.

use crate::error::{TrainingError, TrainingResult};
use crate::estimators::{EstimatorKind, EstimatorSpec, FittedEstimator, ParamValue, Params};
use crate::matrix::Matrix;
use crate::metrics::Scoring;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchSettings {
    pub cv: usize,
    pub scoring: Scoring,
    pub seed: u64,
}

impl Default for GridSearchSettings {
    fn default() -> Self {
        Self { cv: 5, scoring: Scoring::Accuracy, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateConfig {
    pub class: EstimatorKind,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub search_param_grid: BTreeMap<String, Vec<ParamValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSearchConfig {
    #[serde(default)]
    pub grid_search: GridSearchSettings,
    pub model_selection: BTreeMap<String, CandidateConfig>,
}

impl ModelSearchConfig {
    pub fn from_yaml_str(raw: &str) -> TrainingResult<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> TrainingResult<Self> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> TrainingResult<()> {
        if self.model_selection.is_empty() {
            return Err(TrainingError::InvalidSpec("model_selection lists no candidates".to_string()));
        }
        if self.grid_search.cv < 2 {
            return Err(TrainingError::InvalidSpec(format!(
                "grid_search.cv must be at least 2, got {}",
                self.grid_search.cv
            )));
        }
        for (name, candidate) in &self.model_selection {
            if let Some((key, _)) = candidate.search_param_grid.iter().find(|(_, values)| values.is_empty()) {
                return Err(TrainingError::InvalidSpec(format!(
                    "{name}: search_param_grid.{key} has no values"
                )));
            }
        }
        Ok(())
    }
}

/// Best configuration found for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchedModel {
    pub name: String,
    pub kind: EstimatorKind,
    pub best_params: Params,
    pub best_score: f64,
}

/// Overall winner, refit on the full training data.
#[derive(Debug, Clone)]
pub struct BestModelDetail {
    pub name: String,
    pub kind: EstimatorKind,
    pub best_params: Params,
    pub best_score: f64,
    pub best_model: FittedEstimator,
    pub candidates: Vec<GridSearchedModel>,
}

impl BestModelDetail {
    /// `Kind(k=v, ...)`, used in logs and artifacts.
    #[must_use]
    pub fn describe(&self) -> String {
        let params: Vec<String> = self.best_params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}({})", self.kind, params.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct ModelFactory {
    config: ModelSearchConfig,
}

impl ModelFactory {
    #[must_use]
    pub fn new(config: ModelSearchConfig) -> Self {
        Self { config }
    }

    pub fn from_file(path: &Path) -> TrainingResult<Self> {
        Ok(Self::new(ModelSearchConfig::load(path)?))
    }

    #[must_use]
    pub fn config(&self) -> &ModelSearchConfig {
        &self.config
    }

    /// Search every candidate and return the overall best, refit on `x`/`y`.
    /// A best score below `base_score` is logged; callers decide whether to
    /// reject it.
    pub fn get_best_model(&self, x: &Matrix, y: &[f64], base_score: f64) -> TrainingResult<BestModelDetail> {
        let settings = &self.config.grid_search;
        if x.n_rows() != y.len() {
            return Err(TrainingError::Model(format!("{} rows but {} labels", x.n_rows(), y.len())));
        }
        if x.n_rows() < settings.cv {
            return Err(TrainingError::Model(format!(
                "{} training rows cannot be split into {} folds",
                x.n_rows(),
                settings.cv
            )));
        }
        let folds = stratified_folds(y, settings.cv, settings.seed);

        let mut searched = Vec::with_capacity(self.config.model_selection.len());
        let mut winner: Option<(GridSearchedModel, EstimatorSpec)> = None;
        for (name, candidate) in &self.config.model_selection {
            let mut best: Option<(f64, Params, EstimatorSpec)> = None;
            for params in parameter_grid(&candidate.params, &candidate.search_param_grid) {
                let spec = EstimatorSpec::from_params(candidate.class, &params)?;
                let score = cross_val_score(&spec, x, y, &folds, settings.scoring)?;
                tracing::debug!(candidate = %name, ?params, score, "evaluated grid point");
                if best.as_ref().is_none_or(|(s, _, _)| score > *s) {
                    best = Some((score, params, spec));
                }
            }
            let Some((score, params, spec)) = best else { continue };
            tracing::info!(candidate = %name, kind = %candidate.class, score, "best grid point for candidate");
            let model = GridSearchedModel {
                name: name.clone(),
                kind: candidate.class,
                best_params: params,
                best_score: score,
            };
            if winner.as_ref().is_none_or(|(w, _)| score > w.best_score) {
                winner = Some((model.clone(), spec));
            }
            searched.push(model);
        }

        let (best, spec) = winner
            .ok_or_else(|| TrainingError::Model("model search produced no candidates".to_string()))?;
        let best_model = spec.fit(x, y)?;
        if best.best_score < base_score {
            tracing::warn!(score = best.best_score, base_score, "best model is below the base score");
        }
        Ok(BestModelDetail {
            name: best.name,
            kind: best.kind,
            best_params: best.best_params,
            best_score: best.best_score,
            best_model,
            candidates: searched,
        })
    }
}

/// Base params overlaid with every combination of the grid values.
fn parameter_grid(base: &Params, grid: &BTreeMap<String, Vec<ParamValue>>) -> Vec<Params> {
    let mut combos = vec![base.clone()];
    for (key, values) in grid {
        combos = combos
            .into_iter()
            .flat_map(|combo| {
                values.iter().map(move |value| {
                    let mut next = combo.clone();
                    next.insert(key.clone(), value.clone());
                    next
                })
            })
            .collect();
    }
    combos
}

/// Fold id per row. Rows of each class are shuffled and dealt round-robin so
/// every fold keeps roughly the class proportions.
fn stratified_folds(y: &[f64], k: usize, seed: u64) -> Vec<usize> {
    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        by_class.entry(label.round() as i64).or_default().push(i);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0; y.len()];
    let mut next = 0;
    for members in by_class.values_mut() {
        members.shuffle(&mut rng);
        for &i in members.iter() {
            fold_of[i] = next % k;
            next += 1;
        }
    }
    fold_of
}

fn cross_val_score(
    spec: &EstimatorSpec,
    x: &Matrix,
    y: &[f64],
    folds: &[usize],
    scoring: Scoring,
) -> TrainingResult<f64> {
    let k = folds.iter().copied().max().map_or(0, |m| m + 1);
    let mut total = 0.0;
    for fold in 0..k {
        let (held, kept): (Vec<usize>, Vec<usize>) = (0..y.len()).partition(|&i| folds[i] == fold);
        let train_y: Vec<f64> = kept.iter().map(|&i| y[i]).collect();
        let held_y: Vec<f64> = held.iter().map(|&i| y[i]).collect();
        let model = spec.fit(&x.take_rows(&kept), &train_y)?;
        let pred = model.predict(&x.take_rows(&held))?;
        total += scoring.score(&held_y, &pred)?;
    }
    Ok(total / k as f64)
}
