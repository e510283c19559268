//! anomaly-lab - Unsupervised anomaly-detection workbench
//!
//! This crate provides a small, self-contained anomaly-detection workflow:
//! - Dataset providers (Gaussian-mixture blobs, bundled digit images)
//! - Three interchangeable anomaly scorers behind one trait
//! - Empirical-quantile and model-native threshold selection
//! - Decision-surface and image-panel rendering
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Synthetic blob generation and the bundled digits set
//! - [`grid`] - 2-D evaluation meshes for decision-surface rendering
//!
//! ## Scoring
//! - [`scorer`] - Kernel density, one-class SVM and isolation forest scorers
//! - [`threshold`] - Quantile-based and model-native cutoff selection
//!
//! ## Output
//! - [`viz`] - Contour and image-panel figures (bitmap backend)
//!
//! ## Services
//! - [`cli`] - Command-line interface running the demo workflows
//!
//! Each scorer keeps its native score orientation: kernel density and
//! isolation forest scores grow with normality, while the one-class SVM
//! reports a signed distance whose negative side is the outlier region.
//! A threshold computed from one scorer's scores is not comparable with
//! another scorer's scores.

// Core error handling
pub mod error;

// Data
pub mod dataset;
pub mod grid;

// Scoring
pub mod scorer;
pub mod threshold;

// Output
pub mod viz;

// Services
pub mod cli;

pub use error::{AnomalyLabError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{AnomalyLabError, Result};

    // Datasets
    pub use crate::dataset::{make_blobs, BlobsConfig, Digits};

    // Scorers
    pub use crate::scorer::{
        AnomalyScorer, Detection, IsolationForest, Kernel, KernelDensity, OneClassSvm,
    };

    // Thresholds
    pub use crate::threshold::{score_quantile, ThresholdRule};

    // Grids and rendering
    pub use crate::grid::Grid2d;
    pub use crate::viz::{decision_contour, image_panel, ContourOptions, PanelOptions};
}
