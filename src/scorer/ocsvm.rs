//! One-class SVM anomaly scorer
//!
//! Learns a separating surface around the bulk of the training data by
//! solving the one-class dual problem (Schölkopf et al. 2001) with an
//! SMO-style pairwise solver over a precomputed RBF kernel matrix:
//!
//! ```text
//! min ½ αᵀQα   subject to   0 ≤ αᵢ ≤ 1/(νn),  Σαᵢ = 1
//! ```
//!
//! `nu` is an upper bound on the training outlier fraction and a lower
//! bound on the support-vector fraction. `gamma` controls the RBF kernel
//! width and with it the smoothness of the surface: larger values hug the
//! data more tightly.

use crate::error::{AnomalyLabError, Result};
use crate::scorer::{check_features, check_fit_input, AnomalyScorer};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, fitting returns an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Minimum row count before decision values are computed in parallel
const PARALLEL_SCORE_ROWS: usize = 256;

/// Dual coefficients below this are treated as zero
const ALPHA_EPS: f64 = 1e-8;

/// One-class SVM anomaly scorer with an RBF kernel
///
/// Score orientation: signed distance to the separating surface, negative =
/// outlier side. The native decision threshold is 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneClassSvm {
    /// Upper bound on the outlier fraction (0 < nu <= 1)
    nu: f64,
    /// RBF kernel width parameter
    gamma: f64,
    /// Stopping tolerance on the maximum KKT violation
    tol: f64,
    /// Maximum number of pairwise updates
    max_iter: usize,
    /// Support vectors retained by the fit
    support_vectors: Option<Array2<f64>>,
    /// Dual coefficients, one per support vector
    dual_coefs: Option<Array1<f64>>,
    /// Training-row indices of the support vectors
    support_idx: Vec<usize>,
    /// Decision offset
    rho: f64,
    n_features: usize,
}

impl OneClassSvm {
    /// Create a scorer with `nu = 0.5` and `gamma = 1.0`
    pub fn new() -> Self {
        Self {
            nu: 0.5,
            gamma: 1.0,
            tol: 1e-4,
            max_iter: 50_000,
            support_vectors: None,
            dual_coefs: None,
            support_idx: Vec::new(),
            rho: 0.0,
            n_features: 0,
        }
    }

    /// Set the outlier-fraction upper bound
    pub fn with_nu(mut self, nu: f64) -> Self {
        self.nu = nu.clamp(1e-6, 1.0);
        self
    }

    /// Set the RBF kernel width parameter
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.max(1e-12);
        self
    }

    /// Set the stopping tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol.max(1e-12);
        self
    }

    /// Set the iteration budget of the solver
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Training-row indices of the support vectors
    pub fn support_indices(&self) -> &[usize] {
        &self.support_idx
    }

    /// Number of support vectors retained by the fit
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map(|sv| sv.nrows()).unwrap_or(0)
    }

    fn kernel(&self, a: &[f64], b: &[f64]) -> f64 {
        let sq_dist: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
        (-self.gamma * sq_dist).exp()
    }

    /// Full RBF kernel matrix, upper-triangle rows computed in parallel for
    /// larger inputs.
    fn compute_kernel_matrix(&self, rows: &[Vec<f64>]) -> Array2<f64> {
        let n = rows.len();
        let mut k = Array2::zeros((n, n));

        if n < 100 {
            for i in 0..n {
                for j in i..n {
                    let val = self.kernel(&rows[i], &rows[j]);
                    k[[i, j]] = val;
                    k[[j, i]] = val;
                }
            }
            return k;
        }

        let triangles: Vec<Vec<(usize, f64)>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| (j, self.kernel(&rows[i], &rows[j])))
                    .collect()
            })
            .collect();

        for (i, row_vals) in triangles.into_iter().enumerate() {
            for (j, val) in row_vals {
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }

    /// SMO loop on the one-class dual. Returns the dual vector and its
    /// gradient `g = Qα`.
    fn solve(&self, k: &Array2<f64>, upper: f64) -> (Array1<f64>, Array1<f64>) {
        let n = k.nrows();

        // libsvm-style feasible start: fill coefficients up to the bound
        // until they sum to one.
        let mut alpha = Array1::zeros(n);
        let mut remaining: f64 = 1.0;
        for i in 0..n {
            alpha[i] = remaining.min(upper);
            remaining -= alpha[i];
            if remaining <= 0.0 {
                break;
            }
        }

        // g_i = (Qα)_i
        let mut g = Array1::zeros(n);
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..n {
                if alpha[j] > 0.0 {
                    sum += k[[i, j]] * alpha[j];
                }
            }
            g[i] = sum;
        }

        for _ in 0..self.max_iter {
            // Most-violating pair: i may grow (α_i < upper), j may shrink
            // (α_j > 0). At the optimum all growable gradients exceed all
            // shrinkable ones up to tol.
            let mut i_sel = None;
            let mut g_min = f64::INFINITY;
            let mut j_sel = None;
            let mut g_max = f64::NEG_INFINITY;

            for t in 0..n {
                if alpha[t] < upper - ALPHA_EPS && g[t] < g_min {
                    g_min = g[t];
                    i_sel = Some(t);
                }
                if alpha[t] > ALPHA_EPS && g[t] > g_max {
                    g_max = g[t];
                    j_sel = Some(t);
                }
            }

            let (i, j) = match (i_sel, j_sel) {
                (Some(i), Some(j)) if g_max - g_min > self.tol => (i, j),
                _ => break,
            };

            // Move mass δ from α_j to α_i, keeping the simplex constraint.
            let quad = (k[[i, i]] + k[[j, j]] - 2.0 * k[[i, j]]).max(1e-12);
            let mut delta = (g[j] - g[i]) / quad;
            delta = delta.min(upper - alpha[i]).min(alpha[j]);
            if delta <= 0.0 {
                break;
            }

            alpha[i] += delta;
            alpha[j] -= delta;
            for t in 0..n {
                g[t] += delta * (k[[t, i]] - k[[t, j]]);
            }
        }

        (alpha, g)
    }

    /// Offset so that margin support vectors sit on the surface.
    fn compute_rho(alpha: &Array1<f64>, g: &Array1<f64>, upper: f64) -> f64 {
        let mut free_sum = 0.0;
        let mut free_count = 0usize;
        // Bounds on rho from the KKT conditions when no free vector exists
        let mut lower = f64::NEG_INFINITY;
        let mut higher = f64::INFINITY;

        for (&a, &gi) in alpha.iter().zip(g.iter()) {
            if a > ALPHA_EPS && a < upper - ALPHA_EPS {
                free_sum += gi;
                free_count += 1;
            } else if a >= upper - ALPHA_EPS {
                lower = lower.max(gi);
            } else {
                higher = higher.min(gi);
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            match (lower.is_finite(), higher.is_finite()) {
                (true, true) => (lower + higher) / 2.0,
                (true, false) => lower,
                (false, true) => higher,
                (false, false) => 0.0,
            }
        }
    }

    fn decision_one(&self, sv_rows: &[Vec<f64>], coefs: &Array1<f64>, point: &[f64]) -> f64 {
        let mut sum = 0.0;
        for (j, row) in sv_rows.iter().enumerate() {
            sum += coefs[j] * self.kernel(row, point);
        }
        sum - self.rho
    }
}

impl Default for OneClassSvm {
    fn default() -> Self {
        Self::new()
    }
}

impl AnomalyScorer for OneClassSvm {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        check_fit_input(x)?;
        let n = x.nrows();

        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(AnomalyLabError::InvalidConfig(format!(
                "dataset has {} samples, exceeding the maximum {} for the \
                 one-class SVM kernel matrix; consider subsampling",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let rows: Vec<Vec<f64>> = (0..n).map(|i| x.row(i).to_vec()).collect();
        let k = self.compute_kernel_matrix(&rows);

        let upper = 1.0 / (self.nu * n as f64);
        let (alpha, g) = self.solve(&k, upper);
        self.rho = Self::compute_rho(&alpha, &g, upper);

        let support_idx: Vec<usize> = alpha
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > ALPHA_EPS)
            .map(|(i, _)| i)
            .collect();

        let mut support_vectors = Array2::zeros((support_idx.len(), x.ncols()));
        let mut dual_coefs = Array1::zeros(support_idx.len());
        for (r, &i) in support_idx.iter().enumerate() {
            support_vectors.row_mut(r).assign(&x.row(i));
            dual_coefs[r] = alpha[i];
        }

        self.support_vectors = Some(support_vectors);
        self.dual_coefs = Some(dual_coefs);
        self.support_idx = support_idx;
        self.n_features = x.ncols();
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let sv = self
            .support_vectors
            .as_ref()
            .ok_or(AnomalyLabError::NotFitted)?;
        let coefs = self.dual_coefs.as_ref().ok_or(AnomalyLabError::NotFitted)?;
        check_features(self.n_features, x)?;

        let sv_rows: Vec<Vec<f64>> = (0..sv.nrows()).map(|i| sv.row(i).to_vec()).collect();
        let n = x.nrows();
        let scores: Vec<f64> = if n < PARALLEL_SCORE_ROWS {
            (0..n)
                .map(|i| {
                    let row = x.row(i).to_vec();
                    self.decision_one(&sv_rows, coefs, &row)
                })
                .collect()
        } else {
            let rows: Vec<Vec<f64>> = (0..n).map(|i| x.row(i).to_vec()).collect();
            rows.par_iter()
                .map(|row| self.decision_one(&sv_rows, coefs, row))
                .collect()
        };

        Ok(Array1::from_vec(scores))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        let scores = self.score_samples(x)?;

        let labels: Vec<i32> = scores
            .iter()
            .map(|&s| if s < 0.0 { -1 } else { 1 })
            .collect();

        Ok(Array1::from_vec(labels))
    }

    fn decision_threshold(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{make_blobs, BlobsConfig};

    fn blob_data(n: usize) -> Array2<f64> {
        let config = BlobsConfig::new()
            .with_n_samples(n)
            .with_centers(2)
            .with_seed(11);
        make_blobs(&config).unwrap().0
    }

    #[test]
    fn test_outlier_fraction_bounded_by_nu() {
        let x = blob_data(200);
        let mut ocsvm = OneClassSvm::new().with_nu(0.1).with_gamma(0.1);
        ocsvm.fit(&x).unwrap();

        let detection = ocsvm.detect(&x).unwrap();
        // nu bounds the training outlier fraction; allow solver slack.
        assert!(
            detection.n_outliers <= 30,
            "{} outliers for nu=0.1 on 200 samples",
            detection.n_outliers
        );
        // nu also lower-bounds the support-vector fraction.
        assert!(
            ocsvm.n_support_vectors() >= 10,
            "only {} support vectors",
            ocsvm.n_support_vectors()
        );
    }

    #[test]
    fn test_far_point_on_outlier_side() {
        let x = blob_data(150);
        let mut ocsvm = OneClassSvm::new().with_nu(0.05).with_gamma(0.1);
        ocsvm.fit(&x).unwrap();

        let far = Array2::from_shape_vec((1, 2), vec![1e3, 1e3]).unwrap();
        let score = ocsvm.score_samples(&far).unwrap();
        assert!(score[0] < 0.0, "far point scored {}", score[0]);
    }

    #[test]
    fn test_score_before_fit_fails() {
        let ocsvm = OneClassSvm::new();
        let x = Array2::zeros((3, 2));
        assert!(matches!(
            ocsvm.score_samples(&x),
            Err(AnomalyLabError::NotFitted)
        ));
    }

    #[test]
    fn test_empty_fit_fails() {
        let mut ocsvm = OneClassSvm::new();
        let x = Array2::zeros((0, 2));
        assert!(matches!(
            ocsvm.fit(&x),
            Err(AnomalyLabError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_feature_mismatch_fails() {
        let x = blob_data(100);
        let mut ocsvm = OneClassSvm::new().with_gamma(0.1);
        ocsvm.fit(&x).unwrap();

        let wrong = Array2::zeros((5, 4));
        assert!(matches!(
            ocsvm.score_samples(&wrong),
            Err(AnomalyLabError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_support_indices_match_coefs() {
        let x = blob_data(120);
        let mut ocsvm = OneClassSvm::new().with_nu(0.1).with_gamma(0.2);
        ocsvm.fit(&x).unwrap();

        assert_eq!(ocsvm.support_indices().len(), ocsvm.n_support_vectors());
        for &i in ocsvm.support_indices() {
            assert!(i < x.nrows());
        }
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let x = blob_data(100);
        let mut ocsvm = OneClassSvm::new().with_nu(0.05).with_gamma(0.05);
        ocsvm.fit(&x).unwrap();
        let s1 = ocsvm.score_samples(&x).unwrap();
        let s2 = ocsvm.score_samples(&x).unwrap();
        assert_eq!(s1, s2);
    }
}
