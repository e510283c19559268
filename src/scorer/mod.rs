//! Anomaly scorers
//!
//! Three interchangeable scorers behind one trait:
//! - [`KernelDensity`] - non-parametric density estimate; score is the
//!   log-likelihood of a point under the fitted density (higher = more normal)
//! - [`OneClassSvm`] - one-class separating surface; score is the signed
//!   distance to the surface (negative = outlier side, native cutoff 0)
//! - [`IsolationForest`] - randomized partitioning trees; score is a centred
//!   normalized path-length statistic (higher = more normal)
//!
//! The score orientations are each scorer's own and are deliberately not
//! unified; a cutoff derived from one scorer's scores means nothing for
//! another's.

mod iforest;
mod kde;
mod ocsvm;

pub use iforest::IsolationForest;
pub use kde::{Kernel, KernelDensity};
pub use ocsvm::OneClassSvm;

use crate::error::{AnomalyLabError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Scores, labels and the cutoff that produced them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Per-observation scores in the scorer's native orientation
    pub scores: Array1<f64>,
    /// Binary labels (-1 = outlier, 1 = normal)
    pub labels: Array1<i32>,
    /// Cutoff used for classification
    pub threshold: f64,
    /// Number of observations labelled outlier
    pub n_outliers: usize,
}

/// Trait for anomaly scorers
pub trait AnomalyScorer: Send + Sync {
    /// Fit the scorer on a sample matrix.
    ///
    /// Fails with `InsufficientData` on an empty matrix. Fitting again
    /// replaces the previous fit.
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Score observations in the scorer's native orientation.
    ///
    /// Fails with `NotFitted` before [`AnomalyScorer::fit`] and with
    /// `ShapeMismatch` when the feature count differs from fit time.
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Classify observations (-1 = outlier, 1 = normal) against the
    /// scorer's decision threshold.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>>;

    /// Fit and classify in one step.
    fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<i32>> {
        self.fit(x)?;
        self.predict(x)
    }

    /// Scores and labels together.
    fn detect(&self, x: &Array2<f64>) -> Result<Detection> {
        let scores = self.score_samples(x)?;
        let labels = self.predict(x)?;
        let threshold = self.decision_threshold();
        let n_outliers = labels.iter().filter(|&&l| l == -1).count();

        Ok(Detection {
            scores,
            labels,
            threshold,
            n_outliers,
        })
    }

    /// The scorer's decision boundary in its native score orientation.
    fn decision_threshold(&self) -> f64;
}

/// Shared fit-input validation: a fit on empty data is an error.
pub(crate) fn check_fit_input(x: &Array2<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(AnomalyLabError::InsufficientData(format!(
            "cannot fit on a {}x{} sample matrix",
            x.nrows(),
            x.ncols()
        )));
    }
    Ok(())
}

/// Shared score-input validation against the feature count seen at fit time.
pub(crate) fn check_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(AnomalyLabError::ShapeMismatch {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}
