//! Command-line interface
//!
//! Runs the demo workflows: Gaussian blobs scored by each of the three
//! scorers with a rendered decision surface, and the bundled digit images
//! screened by an isolation forest. Without a subcommand all four run in
//! sequence.

use clap::{Parser, Subcommand};
use colored::*;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::dataset::{make_blobs, BlobsConfig, Digits};
use crate::error::Result;
use crate::grid::Grid2d;
use crate::scorer::{AnomalyScorer, IsolationForest, KernelDensity, OneClassSvm};
use crate::threshold::score_quantile;
use crate::viz::{decision_contour, image_panel, ContourOptions, PanelOptions};

/// Inlier fraction targeted by the demos
const INLIER_FRACTION: f64 = 0.95;

/// Mesh step for decision-surface rendering
const GRID_STEP: f64 = 0.1;

/// Mesh margin around the observed feature range
const GRID_MARGIN: f64 = 1.0;

#[derive(Parser)]
#[command(name = "anomaly-lab")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Unsupervised anomaly-detection workbench")]
pub struct Cli {
    /// Directory where rendered figures are written
    #[arg(long, default_value = "figures")]
    pub out_dir: PathBuf,

    /// Seed for synthetic data generation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score Gaussian blobs with kernel density estimation
    BlobsKde,
    /// Score Gaussian blobs with a one-class SVM
    BlobsOcsvm,
    /// Score Gaussian blobs with an isolation forest
    BlobsIforest,
    /// Screen the bundled digit images with an isolation forest
    Digits,
}

fn step(msg: &str) {
    println!("  {} {}", "›".blue(), msg);
}

fn step_ok(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

fn demo_blobs(seed: u64) -> Result<(Array2<f64>, Grid2d)> {
    let config = BlobsConfig::new()
        .with_n_samples(500)
        .with_centers(3)
        .with_seed(seed);
    let (x, _) = make_blobs(&config)?;
    let grid = Grid2d::from_data(&x, GRID_MARGIN, GRID_STEP)?;
    Ok((x, grid))
}

/// Kernel density over the blob data, contoured at the cutoff that keeps
/// 95% of the training samples inside.
pub fn cmd_blobs_kde(out_dir: &Path, seed: u64) -> Result<()> {
    step("generating 500 samples from 3 Gaussian clusters");
    let (x, grid) = demo_blobs(seed)?;

    step("fitting Gaussian kernel density (bandwidth 1.0)");
    let mut kde = KernelDensity::new();
    kde.fit(&x)?;

    let scores = kde.score_samples(&x)?;
    let tau = score_quantile(&scores, 1.0 - INLIER_FRACTION)?;
    info!(tau, "kde quantile cutoff");

    let grid_scores = kde.score_samples(&grid.points())?;
    let path = out_dir.join("kde.png");
    decision_contour(&path, &x, &grid, &grid_scores, tau, &ContourOptions::default())?;
    step_ok(&format!("wrote {}", path.display()));
    Ok(())
}

/// One-class SVM over the blob data: decision boundary at zero, with the
/// flagged outliers and the support vectors each getting a figure.
pub fn cmd_blobs_ocsvm(out_dir: &Path, seed: u64) -> Result<()> {
    step("generating 500 samples from 3 Gaussian clusters");
    let (x, grid) = demo_blobs(seed)?;

    step("fitting one-class SVM (nu=0.05, gamma=0.05)");
    let mut ocsvm = OneClassSvm::new().with_nu(0.05).with_gamma(0.05);
    ocsvm.fit(&x)?;

    let detection = ocsvm.detect(&x)?;
    let n = x.nrows() as f64;
    info!(
        n_outliers = detection.n_outliers,
        n_support = ocsvm.n_support_vectors(),
        outlier_fraction = detection.n_outliers as f64 / n,
        support_fraction = ocsvm.n_support_vectors() as f64 / n,
        "one-class SVM fitted"
    );

    let grid_scores = ocsvm.score_samples(&grid.points())?;

    let outliers: Vec<usize> = detection
        .labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == -1)
        .map(|(i, _)| i)
        .collect();
    let path = out_dir.join("ocsvm.png");
    let opts = ContourOptions {
        highlight: outliers,
        ..Default::default()
    };
    decision_contour(&path, &x, &grid, &grid_scores, 0.0, &opts)?;
    step_ok(&format!("wrote {}", path.display()));

    // Only the support vectors shape the boundary; show them over the
    // shaded score field.
    let path = out_dir.join("ocsvm_support.png");
    let opts = ContourOptions {
        shade_bands: true,
        highlight: ocsvm.support_indices().to_vec(),
        ..Default::default()
    };
    decision_contour(&path, &x, &grid, &grid_scores, 0.0, &opts)?;
    step_ok(&format!("wrote {}", path.display()));
    Ok(())
}

/// Isolation forest over the blob data, contoured at its native
/// contamination-derived threshold.
pub fn cmd_blobs_iforest(out_dir: &Path, seed: u64) -> Result<()> {
    step("generating 500 samples from 3 Gaussian clusters");
    let (x, grid) = demo_blobs(seed)?;

    step("fitting isolation forest (300 trees, contamination 0.10)");
    let mut forest = IsolationForest::new()
        .with_n_estimators(300)
        .with_contamination(0.10)
        .with_seed(seed);
    forest.fit(&x)?;
    info!(threshold = forest.decision_threshold(), "native cutoff");

    let grid_scores = forest.score_samples(&grid.points())?;
    let path = out_dir.join("iforest.png");
    decision_contour(
        &path,
        &x,
        &grid,
        &grid_scores,
        forest.decision_threshold(),
        &ContourOptions::default(),
    )?;
    step_ok(&format!("wrote {}", path.display()));
    Ok(())
}

/// Isolation forest over one digit class: panels of the most typical
/// glyphs and of the flagged outliers.
pub fn cmd_digits(out_dir: &Path, seed: u64) -> Result<()> {
    step("loading bundled digit images");
    let digits = Digits::load()?;
    let x5 = digits.filter_class(5);
    info!(n = x5.nrows(), "class-5 subset");

    step("fitting isolation forest (contamination 0.05)");
    let mut forest = IsolationForest::new()
        .with_contamination(0.05)
        .with_seed(seed);
    forest.fit(&x5)?;

    let detection = forest.detect(&x5)?;
    info!(n_outliers = detection.n_outliers, "digits flagged");

    // Row indices by score, most typical first
    let mut order: Vec<usize> = (0..x5.nrows()).collect();
    order.sort_by(|&a, &b| {
        detection.scores[b]
            .partial_cmp(&detection.scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let panel = PanelOptions::default();
    let n_cells = panel.rows * panel.cols;

    let inliers: Vec<usize> = order.iter().take(n_cells).copied().collect();
    let path = out_dir.join("digits_inliers.png");
    image_panel(&path, &x5, &inliers, &panel)?;
    step_ok(&format!("wrote {}", path.display()));

    let n_flagged = detection.n_outliers.clamp(1, n_cells);
    let outliers: Vec<usize> = order.iter().rev().take(n_flagged).copied().collect();
    let path = out_dir.join("digits_outliers.png");
    image_panel(&path, &x5, &outliers, &panel)?;
    step_ok(&format!("wrote {}", path.display()));
    Ok(())
}

/// Run every demo in sequence.
pub fn cmd_all(out_dir: &Path, seed: u64) -> Result<()> {
    println!("{}", "kernel density".bold());
    cmd_blobs_kde(out_dir, seed)?;
    println!("{}", "one-class SVM".bold());
    cmd_blobs_ocsvm(out_dir, seed)?;
    println!("{}", "isolation forest".bold());
    cmd_blobs_iforest(out_dir, seed)?;
    println!("{}", "digit screening".bold());
    cmd_digits(out_dir, seed)?;
    Ok(())
}
