//! Gaussian-mixture sample generation

use crate::error::{AnomalyLabError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_distr::{Normal, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Configuration for Gaussian blob generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobsConfig {
    /// Total number of samples, split as evenly as possible across clusters
    pub n_samples: usize,
    /// Number of isotropic Gaussian clusters
    pub centers: usize,
    /// Feature dimensionality
    pub n_features: usize,
    /// Standard deviation of every cluster
    pub cluster_std: f64,
    /// Bounding interval for cluster centers, applied per feature
    pub center_box: (f64, f64),
    /// Random seed; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for BlobsConfig {
    fn default() -> Self {
        Self {
            n_samples: 100,
            centers: 3,
            n_features: 2,
            cluster_std: 1.0,
            center_box: (-10.0, 10.0),
            seed: None,
        }
    }
}

impl BlobsConfig {
    /// Create a config with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total sample count
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    /// Set cluster count
    pub fn with_centers(mut self, k: usize) -> Self {
        self.centers = k;
        self
    }

    /// Set feature dimensionality
    pub fn with_n_features(mut self, d: usize) -> Self {
        self.n_features = d;
        self
    }

    /// Set the per-cluster standard deviation
    pub fn with_cluster_std(mut self, std: f64) -> Self {
        self.cluster_std = std;
        self
    }

    /// Set the bounding interval for cluster centers
    pub fn with_center_box(mut self, low: f64, high: f64) -> Self {
        self.center_box = (low, high);
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.centers == 0 {
            return Err(AnomalyLabError::InvalidConfig(
                "centers must be positive".to_string(),
            ));
        }
        if self.n_samples == 0 {
            return Err(AnomalyLabError::InvalidConfig(
                "n_samples must be positive".to_string(),
            ));
        }
        if self.n_features == 0 {
            return Err(AnomalyLabError::InvalidConfig(
                "n_features must be positive".to_string(),
            ));
        }
        if self.cluster_std <= 0.0 || !self.cluster_std.is_finite() {
            return Err(AnomalyLabError::InvalidConfig(format!(
                "cluster_std must be positive and finite, got {}",
                self.cluster_std
            )));
        }
        if self.center_box.0 >= self.center_box.1 {
            return Err(AnomalyLabError::InvalidConfig(format!(
                "center_box must be a non-empty interval, got ({}, {})",
                self.center_box.0, self.center_box.1
            )));
        }
        Ok(())
    }
}

/// Draw samples from a mixture of isotropic Gaussian clusters.
///
/// Cluster centers are drawn uniformly inside `center_box`; the requested
/// sample count is split as evenly as possible across clusters, with the
/// first `n_samples % centers` clusters receiving one extra sample. The
/// returned label vector holds each row's cluster index. The same seed
/// reproduces the draw bit for bit.
pub fn make_blobs(config: &BlobsConfig) -> Result<(Array2<f64>, Array1<usize>)> {
    config.validate()?;

    let mut rng = match config.seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };

    let (low, high) = config.center_box;
    let center_dist = Uniform::new_inclusive(low, high);
    let centers: Vec<Vec<f64>> = (0..config.centers)
        .map(|_| (0..config.n_features).map(|_| rng.sample(center_dist)).collect())
        .collect();

    // Validated above, so the distribution is always constructible
    let noise = Normal::new(0.0, config.cluster_std)
        .map_err(|e| AnomalyLabError::InvalidConfig(e.to_string()))?;

    let base = config.n_samples / config.centers;
    let remainder = config.n_samples % config.centers;

    let mut flat = Vec::with_capacity(config.n_samples * config.n_features);
    let mut labels = Vec::with_capacity(config.n_samples);

    for (k, center) in centers.iter().enumerate() {
        let count = base + usize::from(k < remainder);
        for _ in 0..count {
            for &c in center.iter() {
                flat.push(c + noise.sample(&mut rng));
            }
            labels.push(k);
        }
    }

    let x = Array2::from_shape_vec((config.n_samples, config.n_features), flat)?;
    Ok((x, Array1::from_vec(labels)))
}
