//! End-to-end workflow tests: synthetic clusters and bundled digit images
//! through each scorer, thresholding and figure rendering.

use anomaly_lab::prelude::*;
use anomaly_lab::AnomalyLabError;
use ndarray::Array2;
use tempfile::tempdir;

fn blob_scene() -> (Array2<f64>, Grid2d) {
    let config = BlobsConfig::new()
        .with_n_samples(500)
        .with_centers(3)
        .with_seed(42);
    let (x, _) = make_blobs(&config).unwrap();
    let grid = Grid2d::from_data(&x, 1.0, 0.5).unwrap();
    (x, grid)
}

#[test]
fn kde_quantile_cutoff_flags_the_tail() {
    let (x, _) = blob_scene();
    let mut kde = KernelDensity::new();
    kde.fit(&x).unwrap();

    let scores = kde.score_samples(&x).unwrap();
    let tau = score_quantile(&scores, 0.05).unwrap();
    let below = scores.iter().filter(|&&s| s < tau).count();

    // The 5% quantile of 500 scores leaves about 25 samples underneath;
    // interpolation and ties move the count slightly.
    assert!(
        (15..=35).contains(&below),
        "{} samples below the 5% cutoff",
        below
    );
}

#[test]
fn kde_native_threshold_matches_contamination() {
    let (x, _) = blob_scene();
    let mut kde = KernelDensity::new().with_contamination(0.05);
    kde.fit(&x).unwrap();

    let detection = kde.detect(&x).unwrap();
    assert_eq!(detection.threshold, kde.decision_threshold());
    assert!(
        (15..=35).contains(&detection.n_outliers),
        "flagged {}",
        detection.n_outliers
    );
}

#[test]
fn ocsvm_outlier_fraction_tracks_nu() {
    let (x, _) = blob_scene();
    let mut ocsvm = OneClassSvm::new().with_nu(0.05).with_gamma(0.05);
    ocsvm.fit(&x).unwrap();

    let detection = ocsvm.detect(&x).unwrap();
    assert_eq!(detection.threshold, 0.0);
    // nu bounds the training outlier fraction from above (here 25 of 500)
    // and the support-vector fraction from below.
    assert!(detection.n_outliers > 0, "no outliers flagged");
    assert!(
        detection.n_outliers <= 40,
        "flagged {} of 500, far above nu",
        detection.n_outliers
    );
    assert!(ocsvm.n_support_vectors() >= detection.n_outliers);
    assert!(ocsvm.n_support_vectors() < x.nrows());
}

#[test]
fn iforest_contamination_drives_flag_count() {
    let (x, _) = blob_scene();
    let mut forest = IsolationForest::new()
        .with_n_estimators(300)
        .with_contamination(0.10)
        .with_seed(42);
    forest.fit(&x).unwrap();

    let detection = forest.detect(&x).unwrap();
    // Threshold sits at the 10% quantile of the training scores.
    assert!(
        (35..=65).contains(&detection.n_outliers),
        "flagged {} of 500",
        detection.n_outliers
    );
}

#[test]
fn threshold_rules_resolve_per_scorer() {
    let (x, _) = blob_scene();
    let mut forest = IsolationForest::new().with_seed(42);
    forest.fit(&x).unwrap();
    let scores = forest.score_samples(&x).unwrap();

    let native = ThresholdRule::Native.resolve(&scores, &forest).unwrap();
    assert_eq!(native, forest.decision_threshold());

    let q = ThresholdRule::Quantile(0.05).resolve(&scores, &forest).unwrap();
    let below = scores.iter().filter(|&&s| s < q).count();
    assert!((15..=35).contains(&below), "{} below quantile rule", below);
}

#[test]
fn digit_screening_flags_a_few_glyphs() {
    let digits = Digits::load().unwrap();
    let x5 = digits.filter_class(5);
    assert_eq!(x5.ncols(), 64);
    assert!(x5.nrows() >= 50);

    let mut forest = IsolationForest::new()
        .with_contamination(0.05)
        .with_seed(42);
    forest.fit(&x5).unwrap();

    let detection = forest.detect(&x5).unwrap();
    assert!(
        (1..=12).contains(&detection.n_outliers),
        "flagged {} of {}",
        detection.n_outliers,
        x5.nrows()
    );
}

#[test]
fn decision_surface_renders_for_each_scorer() {
    let (x, grid) = blob_scene();
    let dir = tempdir().unwrap();

    let mut kde = KernelDensity::new();
    kde.fit(&x).unwrap();
    let mut ocsvm = OneClassSvm::new().with_nu(0.05).with_gamma(0.05);
    ocsvm.fit(&x).unwrap();
    let mut forest = IsolationForest::new().with_seed(42);
    forest.fit(&x).unwrap();

    let scorers: [(&str, &dyn AnomalyScorer); 3] =
        [("kde", &kde), ("ocsvm", &ocsvm), ("iforest", &forest)];
    for (name, scorer) in scorers {
        let grid_scores = scorer.score_samples(&grid.points()).unwrap();
        let path = dir.path().join(format!("{}.png", name));
        decision_contour(
            &path,
            &x,
            &grid,
            &grid_scores,
            scorer.decision_threshold(),
            &ContourOptions::default(),
        )
        .unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}

#[test]
fn digit_panels_render() {
    let digits = Digits::load().unwrap();
    let x5 = digits.filter_class(5);
    let dir = tempdir().unwrap();

    let indices: Vec<usize> = (0..10).collect();
    let path = dir.path().join("panel.png");
    image_panel(&path, &x5, &indices, &PanelOptions::default()).unwrap();
    assert!(path.exists());
}

#[test]
fn scoring_before_fit_is_rejected() {
    let x = Array2::<f64>::zeros((3, 2));
    for scorer in [
        Box::new(KernelDensity::new()) as Box<dyn AnomalyScorer>,
        Box::new(OneClassSvm::new()),
        Box::new(IsolationForest::new()),
    ] {
        assert!(matches!(
            scorer.score_samples(&x),
            Err(AnomalyLabError::NotFitted)
        ));
    }
}

#[test]
fn feature_mismatch_is_rejected() {
    let (x, _) = blob_scene();
    let mut forest = IsolationForest::new().with_seed(1);
    forest.fit(&x).unwrap();

    let wrong = Array2::<f64>::zeros((5, 7));
    assert!(matches!(
        forest.score_samples(&wrong),
        Err(AnomalyLabError::ShapeMismatch { .. })
    ));
}

#[test]
fn seeded_runs_are_reproducible() {
    let config = BlobsConfig::new()
        .with_n_samples(200)
        .with_centers(3)
        .with_seed(7);
    let (a, la) = make_blobs(&config).unwrap();
    let (b, lb) = make_blobs(&config).unwrap();
    assert_eq!(a, b);
    assert_eq!(la, lb);

    let mut fa = IsolationForest::new().with_seed(7);
    let mut fb = IsolationForest::new().with_seed(7);
    fa.fit(&a).unwrap();
    fb.fit(&b).unwrap();
    assert_eq!(fa.score_samples(&a).unwrap(), fb.score_samples(&b).unwrap());
}
