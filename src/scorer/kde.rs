//! Kernel density estimation scorer
//!
//! Fits a non-parametric density over the training samples and scores new
//! points by their log-likelihood under it: the smaller the score, the rarer
//! the sample. Useful in low dimensions; like all density estimators it
//! degrades as the feature count grows, which is when the boundary and
//! isolation scorers become the better tools.

use crate::error::Result;
use crate::scorer::{check_features, check_fit_input, AnomalyScorer};
use crate::threshold::score_quantile;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimum row count before grid scoring is parallelised
const PARALLEL_SCORE_ROWS: usize = 256;

/// Kernel shape for density estimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    /// Gaussian kernel: smooth density, infinite support
    Gaussian,
    /// Tophat kernel: uniform density inside a bandwidth-radius ball
    Tophat,
}

/// Kernel density estimation anomaly scorer
///
/// Score orientation: log-likelihood, higher = more normal. The native
/// decision threshold is the training-score quantile at the configured
/// contamination fraction, fixed at fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelDensity {
    /// Kernel bandwidth
    bandwidth: f64,
    /// Kernel shape
    kernel: Kernel,
    /// Assumed upper bound on the outlier fraction, used for the threshold
    contamination: f64,
    /// Training samples retained by the fit
    train: Option<Array2<f64>>,
    /// Decision threshold on the log-likelihood scale
    threshold: Option<f64>,
}

impl KernelDensity {
    /// Create a Gaussian-kernel estimator with bandwidth 1.0
    pub fn new() -> Self {
        Self {
            bandwidth: 1.0,
            kernel: Kernel::Gaussian,
            contamination: 0.05,
            train: None,
            threshold: None,
        }
    }

    /// Set the kernel bandwidth
    pub fn with_bandwidth(mut self, h: f64) -> Self {
        self.bandwidth = h.max(1e-12);
        self
    }

    /// Set the kernel shape
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set the contamination fraction used for the native threshold
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Log density of a single point under the fitted estimate.
    fn log_density(&self, train: &Array2<f64>, point: &[f64]) -> f64 {
        let n = train.nrows();
        let d = train.ncols();
        let h = self.bandwidth;

        match self.kernel {
            Kernel::Gaussian => {
                // log(1/n sum_i N(point; x_i, h^2 I)) via log-sum-exp
                let log_norm =
                    -(d as f64) / 2.0 * (2.0 * std::f64::consts::PI * h * h).ln();
                let mut terms = Vec::with_capacity(n);
                let mut max = f64::NEG_INFINITY;
                for row in train.rows() {
                    let sq_dist: f64 = row
                        .iter()
                        .zip(point.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    let t = -sq_dist / (2.0 * h * h);
                    if t > max {
                        max = t;
                    }
                    terms.push(t);
                }
                let sum_exp: f64 = terms.iter().map(|&t| (t - max).exp()).sum();
                log_norm + max + sum_exp.ln() - (n as f64).ln()
            }
            Kernel::Tophat => {
                let inside = train
                    .rows()
                    .into_iter()
                    .filter(|row| {
                        let sq_dist: f64 = row
                            .iter()
                            .zip(point.iter())
                            .map(|(a, b)| (a - b) * (a - b))
                            .sum();
                        sq_dist.sqrt() <= h
                    })
                    .count();
                if inside == 0 {
                    return f64::NEG_INFINITY;
                }
                (inside as f64 / (n as f64 * ball_volume(d, h))).ln()
            }
        }
    }
}

/// Volume of a d-ball of radius `h`, via the two-step recurrence.
fn ball_volume(d: usize, h: f64) -> f64 {
    match d {
        0 => 1.0,
        1 => 2.0 * h,
        _ => ball_volume(d - 2, h) * 2.0 * std::f64::consts::PI * h * h / d as f64,
    }
}

impl Default for KernelDensity {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyScorer for KernelDensity {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        check_fit_input(x)?;
        self.train = Some(x.clone());
        self.threshold = None;

        let train_scores = self.score_samples(x)?;
        self.threshold = Some(score_quantile(&train_scores, self.contamination)?);
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let train = self
            .train
            .as_ref()
            .ok_or(crate::error::AnomalyLabError::NotFitted)?;
        check_features(train.ncols(), x)?;

        let n = x.nrows();
        let scores: Vec<f64> = if n < PARALLEL_SCORE_ROWS {
            (0..n)
                .map(|i| {
                    let row = x.row(i).to_vec();
                    self.log_density(train, &row)
                })
                .collect()
        } else {
            let rows: Vec<Vec<f64>> = (0..n).map(|i| x.row(i).to_vec()).collect();
            rows.par_iter()
                .map(|row| self.log_density(train, row))
                .collect()
        };

        Ok(Array1::from_vec(scores))
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
        self.threshold.unwrap_or(f64::NEG_INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnomalyLabError;

    fn cluster_with_outlier() -> Array2<f64> {
        // Tight cluster around the origin plus one far point
        let mut data = Vec::new();
        for i in 0..40 {
            data.push((i % 7) as f64 * 0.1);
            data.push((i % 5) as f64 * 0.1);
        }
        data.extend_from_slice(&[25.0, 25.0]);
        Array2::from_shape_vec((41, 2), data).unwrap()
    }

    #[test]
    fn test_outlier_scores_lower() {
        let x = cluster_with_outlier();
        let mut kde = KernelDensity::new();
        kde.fit(&x).unwrap();

        let scores = kde.score_samples(&x).unwrap();
        assert_eq!(scores.len(), 41);
        let bulk_min = scores
            .iter()
            .take(40)
            .copied()
            .fold(f64::INFINITY, f64::min);
        assert!(
            scores[40] < bulk_min,
            "outlier score {} not below bulk minimum {}",
            scores[40],
            bulk_min
        );
    }

    #[test]
    fn test_score_before_fit_fails() {
        let kde = KernelDensity::new();
        let x = Array2::zeros((3, 2));
        assert!(matches!(
            kde.score_samples(&x),
            Err(AnomalyLabError::NotFitted)
        ));
        assert!(matches!(kde.predict(&x), Err(AnomalyLabError::NotFitted)));
    }

    #[test]
    fn test_empty_fit_fails() {
        let mut kde = KernelDensity::new();
        let x = Array2::zeros((0, 2));
        assert!(matches!(
            kde.fit(&x),
            Err(AnomalyLabError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_feature_mismatch_fails() {
        let x = cluster_with_outlier();
        let mut kde = KernelDensity::new();
        kde.fit(&x).unwrap();

        let wrong = Array2::zeros((2, 3));
        assert!(matches!(
            kde.score_samples(&wrong),
            Err(AnomalyLabError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let x = cluster_with_outlier();
        let mut kde = KernelDensity::new().with_bandwidth(0.5);
        kde.fit(&x).unwrap();
        let s1 = kde.score_samples(&x).unwrap();
        let s2 = kde.score_samples(&x).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_tophat_kernel() {
        let x = cluster_with_outlier();
        let mut kde = KernelDensity::new()
            .with_kernel(Kernel::Tophat)
            .with_bandwidth(1.0);
        kde.fit(&x).unwrap();
        let scores = kde.score_samples(&x).unwrap();
        // The far point has nothing within one bandwidth: zero density.
        assert_eq!(scores[40], f64::NEG_INFINITY);
        assert!(scores[0].is_finite());
    }

    #[test]
    fn test_contamination_drives_flag_rate() {
        let x = cluster_with_outlier();
        let mut kde = KernelDensity::new().with_contamination(0.1);
        kde.fit(&x).unwrap();
        let detection = kde.detect(&x).unwrap();
        // 10% of 41 samples; duplicate points make ties, so allow slack
        assert!(
            (1..=8).contains(&detection.n_outliers),
            "flagged {}",
            detection.n_outliers
        );
        assert_eq!(detection.labels[40], -1);
    }
}
