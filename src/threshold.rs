//! Threshold selection over score vectors
//!
//! Converts a desired outlier fraction into a scalar cutoff over a score
//! vector, or defers to a fitted scorer's own decision boundary. A quantile
//! cutoff must be compared against the same scorer's scores it was computed
//! from; score orientations differ between scorers.

use crate::error::{AnomalyLabError, Result};
use crate::scorer::AnomalyScorer;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Empirical quantile of a score vector with linear interpolation between
/// order statistics.
///
/// `q = 0.0` returns the minimum and `q = 1.0` the maximum. For a scorer
/// where low scores mean abnormal, the cutoff for a target outlier fraction
/// `p` is `score_quantile(scores, p)`.
pub fn score_quantile(scores: &Array1<f64>, q: f64) -> Result<f64> {
    if scores.is_empty() {
        return Err(AnomalyLabError::InsufficientData(
            "cannot take a quantile of an empty score vector".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(AnomalyLabError::InvalidConfig(format!(
            "quantile must be in [0, 1], got {}",
            q
        )));
    }

    let mut sorted: Vec<f64> = scores.iter().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Ok(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// How to turn a fitted scorer's scores into a scalar cutoff
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdRule {
    /// Empirical quantile of the given score vector at the outlier fraction
    Quantile(f64),
    /// The scorer's own decision boundary, no extra computation
    Native,
}

impl ThresholdRule {
    /// Resolve the rule to a scalar cutoff.
    ///
    /// `scores` are only consulted in quantile mode and must come from the
    /// same scorer whose boundary would otherwise be used.
    pub fn resolve<S: AnomalyScorer + ?Sized>(
        &self,
        scores: &Array1<f64>,
        scorer: &S,
    ) -> Result<f64> {
        match *self {
            ThresholdRule::Quantile(p) => score_quantile(scores, p),
            ThresholdRule::Native => Ok(scorer.decision_threshold()),
        }
    }
}
