//! Isolation forest anomaly scorer
//!
//! Builds an ensemble of randomized partitioning trees; observations that
//! isolate after few random splits are anomalous. Increasing the ensemble
//! size smooths the decision surface at a roughly linear fit cost.

use crate::error::{AnomalyLabError, Result};
use crate::scorer::{check_features, check_fit_input, AnomalyScorer};
use crate::threshold::score_quantile;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Isolation tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsoNode {
    /// Internal node splitting on one feature
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsoNode>,
        right: Box<IsoNode>,
    },
    /// Leaf holding the number of samples that ended up here
    Leaf { size: usize },
}

impl IsoNode {
    fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Self {
        let n_samples = indices.len();
        if height >= max_height || n_samples <= 1 {
            return IsoNode::Leaf { size: n_samples };
        }

        let feature = rng.gen_range(0..x.ncols());
        let mut min_val = f64::INFINITY;
        let mut max_val = f64::NEG_INFINITY;
        for &i in indices {
            let v = x[[i, feature]];
            min_val = min_val.min(v);
            max_val = max_val.max(v);
        }

        if (max_val - min_val).abs() < 1e-10 {
            return IsoNode::Leaf { size: n_samples };
        }

        let threshold = rng.gen_range(min_val..max_val);
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] < threshold);

        if left_idx.is_empty() || right_idx.is_empty() {
            return IsoNode::Leaf { size: n_samples };
        }

        IsoNode::Split {
            feature,
            threshold,
            left: Box::new(Self::build(x, &left_idx, height + 1, max_height, rng)),
            right: Box::new(Self::build(x, &right_idx, height + 1, max_height, rng)),
        }
    }

    fn path_length(&self, sample: &[f64], height: usize) -> f64 {
        match self {
            IsoNode::Leaf { size } => height as f64 + average_path_length(*size),
            IsoNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, height + 1)
                } else {
                    right.path_length(sample, height + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points,
/// c(n) = 2 H(n-1) - 2(n-1)/n.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n_f = n as f64;
            2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
        }
    }
}

/// Isolation forest anomaly scorer
///
/// Score orientation: `0.5 - 2^(-E[h(x)] / c(n))`, so higher = more normal
/// and well-isolated points go negative. The native decision threshold is
/// the training-score quantile at the contamination fraction, fixed at fit
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    /// Number of trees in the ensemble
    n_estimators: usize,
    /// Subsample size per tree
    max_samples: usize,
    /// Assumed upper bound on the outlier fraction
    contamination: f64,
    /// Random seed; `None` draws from entropy
    seed: Option<u64>,
    trees: Option<Vec<IsoNode>>,
    /// Decision threshold derived from the training scores
    threshold: Option<f64>,
    /// Subsample size actually used at fit time
    fitted_samples: usize,
    n_features: usize,
}

impl IsolationForest {
    /// Create a forest with 100 trees, 256 samples per tree and
    /// contamination 0.1
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: None,
            trees: None,
            threshold: None,
            fitted_samples: 0,
            n_features: 0,
        }
    }

    /// Set the ensemble size
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set the subsample size per tree
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    /// Set the contamination fraction
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn compute_scores(&self, trees: &[IsoNode], x: &Array2<f64>) -> Array1<f64> {
        let c_n = average_path_length(self.fitted_samples);

        let scores: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let sample: Vec<f64> = row.iter().copied().collect();
                let avg_path: f64 = trees
                    .iter()
                    .map(|tree| tree.path_length(&sample, 0))
                    .sum::<f64>()
                    / trees.len() as f64;

                let anomaly = if c_n > 0.0 {
                    2.0_f64.powf(-avg_path / c_n)
                } else {
                    1.0
                };
                0.5 - anomaly
            })
            .collect();

        Array1::from_vec(scores)
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyScorer for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        check_fit_input(x)?;

        let n_samples = x.nrows();
        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree as f64).log2().ceil() as usize;

        let mut rng = match self.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let indices: Vec<usize> = (0..samples_per_tree)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();
            trees.push(IsoNode::build(x, &indices, 0, max_height, &mut rng));
        }

        self.fitted_samples = samples_per_tree;
        self.n_features = x.ncols();

        let train_scores = self.compute_scores(&trees, x);
        self.threshold = Some(score_quantile(&train_scores, self.contamination)?);
        self.trees = Some(trees);
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or(AnomalyLabError::NotFitted)?;
        check_features(self.n_features, x)?;
        Ok(self.compute_scores(trees, x))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        let scores = self.score_samples(x)?;
        let threshold = self.decision_threshold();

        let labels: Vec<i32> = scores
            .iter()
            .map(|&s| if s < threshold { -1 } else { 1 })
            .collect();

        Ok(Array1::from_vec(labels))
    }

    fn decision_threshold(&self) -> f64 {
        self.threshold.unwrap_or(0.0)
    }
}
