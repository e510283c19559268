//! 2-D evaluation meshes
//!
//! A rectangular mesh of synthetic feature vectors spanning a sample
//! matrix's feature range, used only for rendering continuous decision
//! surfaces. Built once from per-feature min/max and a fixed step, never
//! mutated.

use crate::error::{AnomalyLabError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Rectangular mesh over a 2-D feature range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid2d {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Mesh step along both axes
    pub step: f64,
    /// Number of mesh columns
    pub nx: usize,
    /// Number of mesh rows
    pub ny: usize,
}

impl Grid2d {
    /// Build a mesh covering `x`'s feature range, widened by `margin` on
    /// every side.
    pub fn from_data(x: &Array2<f64>, margin: f64, step: f64) -> Result<Self> {
        if x.ncols() != 2 {
            return Err(AnomalyLabError::ShapeMismatch {
                expected: "2 features".to_string(),
                actual: format!("{} features", x.ncols()),
            });
        }
        if x.nrows() == 0 {
            return Err(AnomalyLabError::InsufficientData(
                "cannot derive a grid from an empty sample matrix".to_string(),
            ));
        }
        if step <= 0.0 || !step.is_finite() {
            return Err(AnomalyLabError::InvalidConfig(format!(
                "grid step must be positive and finite, got {}",
                step
            )));
        }

        let col0 = x.column(0);
        let col1 = x.column(1);
        let x_min = col0.iter().copied().fold(f64::INFINITY, f64::min) - margin;
        let x_max = col0.iter().copied().fold(f64::NEG_INFINITY, f64::max) + margin;
        let y_min = col1.iter().copied().fold(f64::INFINITY, f64::min) - margin;
        let y_max = col1.iter().copied().fold(f64::NEG_INFINITY, f64::max) + margin;

        let nx = (((x_max - x_min) / step).ceil() as usize).max(2);
        let ny = (((y_max - y_min) / step).ceil() as usize).max(2);

        Ok(Self {
            x_min,
            x_max,
            y_min,
            y_max,
            step,
            nx,
            ny,
        })
    }

    /// x coordinate of mesh column `ix`
    pub fn x_at(&self, ix: usize) -> f64 {
        self.x_min + ix as f64 * self.step
    }

    /// y coordinate of mesh row `iy`
    pub fn y_at(&self, iy: usize) -> f64 {
        self.y_min + iy as f64 * self.step
    }

    /// Total number of mesh points
    pub fn n_points(&self) -> usize {
        self.nx * self.ny
    }

    /// All mesh points flattened into a sample matrix, row-major by mesh
    /// row (y outer, x inner). Feed this to a scorer and reshape the result
    /// with [`Grid2d::reshape_scores`].
    pub fn points(&self) -> Array2<f64> {
        let mut flat = Vec::with_capacity(self.n_points() * 2);
        for iy in 0..self.ny {
            let y = self.y_at(iy);
            for ix in 0..self.nx {
                flat.push(self.x_at(ix));
                flat.push(y);
            }
        }
        Array2::from_shape_vec((self.n_points(), 2), flat)
            .expect("mesh point count matches reserved shape")
    }

    /// Reshape a score vector computed over [`Grid2d::points`] back into
    /// mesh layout (`ny` rows, `nx` columns).
    pub fn reshape_scores(&self, scores: &Array1<f64>) -> Result<Array2<f64>> {
        if scores.len() != self.n_points() {
            return Err(AnomalyLabError::ShapeMismatch {
                expected: format!("{} grid scores", self.n_points()),
                actual: format!("{}", scores.len()),
            });
        }
        Ok(scores.clone().into_shape((self.ny, self.nx))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_data() -> Array2<f64> {
        Array2::from_shape_vec((4, 2), vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap()
    }

    #[test]
    fn test_grid_covers_data_with_margin() {
        let grid = Grid2d::from_data(&square_data(), 1.0, 0.1).unwrap();
        assert_eq!(grid.x_min, -1.0);
        assert_eq!(grid.x_max, 2.0);
        assert_eq!(grid.y_min, -1.0);
        assert_eq!(grid.y_max, 2.0);
        assert_eq!(grid.nx, 30);
        assert_eq!(grid.ny, 30);
    }

    #[test]
    fn test_points_roundtrip_shape() {
        let grid = Grid2d::from_data(&square_data(), 0.5, 0.25).unwrap();
        let pts = grid.points();
        assert_eq!(pts.nrows(), grid.n_points());
        assert_eq!(pts.ncols(), 2);

        // First point is the lower-left corner, second one step along x.
        assert_eq!(pts[[0, 0]], grid.x_min);
        assert_eq!(pts[[0, 1]], grid.y_min);
        assert_eq!(pts[[1, 0]], grid.x_min + grid.step);
        assert_eq!(pts[[1, 1]], grid.y_min);

        let scores = Array1::from_vec((0..grid.n_points()).map(|i| i as f64).collect());
        let mesh = grid.reshape_scores(&scores).unwrap();
        assert_eq!(mesh.shape(), &[grid.ny, grid.nx]);
        assert_eq!(mesh[[1, 0]], grid.nx as f64);
    }

    #[test]
    fn test_reshape_rejects_wrong_length() {
        let grid = Grid2d::from_data(&square_data(), 0.5, 0.25).unwrap();
        let scores = Array1::from_vec(vec![0.0; grid.n_points() - 1]);
        assert!(matches!(
            grid.reshape_scores(&scores),
            Err(AnomalyLabError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_non_2d_data_rejected() {
        let x = Array2::from_shape_vec((2, 3), vec![0.0; 6]).unwrap();
        assert!(matches!(
            Grid2d::from_data(&x, 1.0, 0.1),
            Err(AnomalyLabError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_step_rejected() {
        assert!(Grid2d::from_data(&square_data(), 1.0, 0.0).is_err());
    }
}
