use super::{ParamReader, ParamValue, argmax, class_indices, distinct_classes};
use crate::error::{TrainingError, TrainingResult};
use crate::matrix::Matrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    fn impurity(self, counts: &[f64], total: f64) -> f64 {
        if total == 0.0 {
            return 0.0;
        }
        match self {
            Self::Gini => 1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>(),
            Self::Entropy => -counts
                .iter()
                .filter(|c| **c > 0.0)
                .map(|c| {
                    let p = c / total;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }
}

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Count(usize),
}

impl MaxFeatures {
    fn read(reader: &mut ParamReader<'_>, default: Self) -> TrainingResult<Self> {
        match reader.value("max_features") {
            None => Ok(default),
            Some(ParamValue::Null) => Ok(Self::All),
            Some(ParamValue::Text(s)) if s == "sqrt" || s == "auto" => Ok(Self::Sqrt),
            Some(ParamValue::Text(s)) if s == "log2" => Ok(Self::Log2),
            Some(ParamValue::Int(n)) if *n > 0 => Ok(Self::Count(*n as usize)),
            Some(other) => Err(TrainingError::InvalidSpec(format!(
                "max_features must be sqrt, log2, a positive integer or null, got {other}"
            ))),
        }
    }

    pub(crate) fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            Self::All => n_features,
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::Log2 => (n_features as f64).log2() as usize,
            Self::Count(k) => k,
        };
        n.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreeParams {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub random_state: u64,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            random_state: 0,
        }
    }
}

impl DecisionTreeParams {
    pub(crate) fn read_with_default(
        reader: &mut ParamReader<'_>,
        default: Self,
    ) -> TrainingResult<Self> {
        let criterion = match reader.text_or("criterion", "gini")? {
            "gini" => Criterion::Gini,
            "entropy" => Criterion::Entropy,
            other => {
                return Err(TrainingError::InvalidSpec(format!("unknown criterion {other:?}")));
            }
        };
        let params = Self {
            criterion,
            max_depth: reader.opt_usize("max_depth")?.or(default.max_depth),
            min_samples_split: reader.usize_or("min_samples_split", default.min_samples_split)?,
            min_samples_leaf: reader.usize_or("min_samples_leaf", default.min_samples_leaf)?,
            max_features: MaxFeatures::read(reader, default.max_features)?,
            random_state: reader.usize_or("random_state", default.random_state as usize)? as u64,
        };
        if params.min_samples_split < 2 || params.min_samples_leaf < 1 {
            return Err(TrainingError::InvalidSpec(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1".to_string(),
            ));
        }
        Ok(params)
    }

    pub(crate) fn read(reader: &mut ParamReader<'_>) -> TrainingResult<Self> {
        Self::read_with_default(reader, Self::default())
    }

    pub(crate) fn fit(&self, x: &Matrix, y: &[f64]) -> TrainingResult<TreeModel> {
        let classes = distinct_classes(y);
        let labels = class_indices(&classes, y);
        let rows: Vec<usize> = (0..x.n_rows()).collect();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let nodes = grow(self, x, &labels, classes.len(), rows, &mut rng);
        Ok(TreeModel { classes, n_features: x.n_cols(), nodes })
    }
}

/// Arena node; children are indices into `TreeModel::nodes`, root is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf { distribution: Vec<f64> },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    pub classes: Vec<f64>,
    n_features: usize,
    nodes: Vec<Node>,
}

impl TreeModel {
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        x.iter_rows().map(|row| self.classes[argmax(leaf_distribution(&self.nodes, row))]).collect()
    }
}

pub(crate) fn leaf_distribution<'a>(nodes: &'a [Node], row: &[f64]) -> &'a [f64] {
    let mut idx = 0;
    loop {
        match &nodes[idx] {
            Node::Leaf { distribution } => return distribution,
            Node::Split { feature, threshold, left, right } => {
                idx = if row[*feature] <= *threshold { *left } else { *right };
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Grow a tree over `rows` (which may repeat, for bootstrap samples).
pub(crate) fn grow(
    params: &DecisionTreeParams,
    x: &Matrix,
    labels: &[usize],
    n_classes: usize,
    rows: Vec<usize>,
    rng: &mut StdRng,
) -> Vec<Node> {
    let mut nodes = Vec::new();
    let max_features = params.max_features.resolve(x.n_cols());
    let mut stack = vec![(rows, 0_usize, None::<(usize, bool)>)];

    while let Some((rows, depth, parent)) = stack.pop() {
        let idx = nodes.len();
        if let Some((p, is_left)) = parent {
            if let Node::Split { left, right, .. } = &mut nodes[p] {
                if is_left {
                    *left = idx;
                } else {
                    *right = idx;
                }
            }
        }

        let counts = class_counts(labels, &rows, n_classes);
        let total = rows.len() as f64;
        let parent_impurity = params.criterion.impurity(&counts, total);
        let leaf = || Node::Leaf { distribution: counts.iter().map(|c| c / total).collect() };

        let can_split = parent_impurity > 0.0
            && rows.len() >= params.min_samples_split
            && params.max_depth.is_none_or(|max| depth < max);
        let best = if can_split {
            best_split(params, x, labels, n_classes, &rows, max_features, rng)
        } else {
            None
        };

        match best {
            None => nodes.push(leaf()),
            Some(split) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                    rows.into_iter().partition(|&r| x.get(r, split.feature) <= split.threshold);
                nodes.push(Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: 0,
                    right: 0,
                });
                stack.push((right_rows, depth + 1, Some((idx, false))));
                stack.push((left_rows, depth + 1, Some((idx, true))));
            }
        }
    }
    nodes
}

fn class_counts(labels: &[usize], rows: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &r in rows {
        counts[labels[r]] += 1.0;
    }
    counts
}

fn best_split(
    params: &DecisionTreeParams,
    x: &Matrix,
    labels: &[usize],
    n_classes: usize,
    rows: &[usize],
    max_features: usize,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let n_features = x.n_cols();
    let features: Vec<usize> = if max_features >= n_features {
        (0..n_features).collect()
    } else {
        let mut sampled = rand::seq::index::sample(rng, n_features, max_features).into_vec();
        sampled.sort_unstable();
        sampled
    };

    let total = rows.len() as f64;
    let totals = class_counts(labels, rows, n_classes);
    let mut best: Option<SplitCandidate> = None;
    let mut sorted = rows.to_vec();

    for feature in features {
        sorted.sort_by(|&a, &b| x.get(a, feature).total_cmp(&x.get(b, feature)));
        let mut left = vec![0.0; n_classes];
        for pos in 1..sorted.len() {
            left[labels[sorted[pos - 1]]] += 1.0;
            let lo = x.get(sorted[pos - 1], feature);
            let hi = x.get(sorted[pos], feature);
            if lo >= hi || pos < params.min_samples_leaf || sorted.len() - pos < params.min_samples_leaf {
                continue;
            }
            let right: Vec<f64> = totals.iter().zip(&left).map(|(t, l)| t - l).collect();
            let n_left = pos as f64;
            let n_right = total - n_left;
            let impurity = (n_left * params.criterion.impurity(&left, n_left)
                + n_right * params.criterion.impurity(&right, n_right))
                / total;
            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid < hi { mid } else { lo };
                best = Some(SplitCandidate { feature, threshold, impurity });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stump_threshold_is_midpoint() {
        let x = Matrix::from_rows(vec![vec![1.0], vec![2.0], vec![4.0], vec![5.0]]).unwrap();
        let model = DecisionTreeParams::default().fit(&x, &[0.0, 0.0, 1.0, 1.0]).unwrap();
        assert_eq!(model.n_nodes(), 3);
        match &model.nodes[0] {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 3.0),
            Node::Leaf { .. } => panic!("expected a split at the root"),
        }
    }

    #[test]
    fn test_max_depth_zero_is_a_single_leaf() {
        let x = Matrix::from_rows(vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let params = DecisionTreeParams { max_depth: Some(0), ..DecisionTreeParams::default() };
        let model = params.fit(&x, &[0.0, 1.0, 1.0]).unwrap();
        assert_eq!(model.n_nodes(), 1);
        assert_eq!(model.predict(&x), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_tree_memorizes_xor() {
        let x = Matrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ])
        .unwrap();
        let y = [0.0, 1.0, 1.0, 0.0];
        let model = DecisionTreeParams::default().fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x), y.to_vec());
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(30), 5);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
        assert_eq!(MaxFeatures::Count(100).resolve(4), 4);
    }
}
