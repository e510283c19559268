//! Figure rendering
//!
//! Renders decision-surface contours over sample scatters and panels of
//! raw image observations, via the plotters bitmap backend. Purely
//! presentational: nothing here affects scoring or mutates its inputs.

mod contour;

pub use contour::{contour_segments, Segment};

use crate::error::{AnomalyLabError, Result};
use crate::grid::Grid2d;
use ndarray::{Array1, Array2};
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

/// Options for [`decision_contour`]
#[derive(Debug, Clone)]
pub struct ContourOptions {
    /// Shade the background by score band (decision-surface fill)
    pub shade_bands: bool,
    /// Row indices to emphasize (outliers, support vectors, ...)
    pub highlight: Vec<usize>,
    /// Output image size in pixels
    pub size: (u32, u32),
    /// Scatter point radius in pixels
    pub point_radius: i32,
}

impl Default for ContourOptions {
    fn default() -> Self {
        Self {
            shade_bands: false,
            highlight: Vec::new(),
            size: (900, 700),
            point_radius: 2,
        }
    }
}

/// Render the `level` contour of grid scores over a scatter of the
/// observations.
///
/// `grid_scores` must be one score per [`Grid2d::points`] row. Highlighted
/// indices are drawn over the scatter in a distinct color.
pub fn decision_contour(
    path: &Path,
    x: &Array2<f64>,
    grid: &Grid2d,
    grid_scores: &Array1<f64>,
    level: f64,
    opts: &ContourOptions,
) -> Result<()> {
    if x.ncols() != 2 {
        return Err(AnomalyLabError::ShapeMismatch {
            expected: "2 features".to_string(),
            actual: format!("{} features", x.ncols()),
        });
    }
    for &i in &opts.highlight {
        if i >= x.nrows() {
            return Err(AnomalyLabError::InvalidConfig(format!(
                "highlight index {} out of range ({} rows)",
                i,
                x.nrows()
            )));
        }
    }
    let values = grid.reshape_scores(grid_scores)?;

    let root = BitMapBackend::new(path, opts.size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(grid.x_min..grid.x_max, grid.y_min..grid.y_max)
        .map_err(render_err)?;

    if opts.shade_bands {
        let (v_min, v_max) = finite_range(&values);
        if v_max > v_min {
            let mut cells = Vec::with_capacity((grid.ny - 1) * (grid.nx - 1));
            for iy in 0..grid.ny - 1 {
                for ix in 0..grid.nx - 1 {
                    let v = values[[iy, ix]];
                    if !v.is_finite() {
                        continue;
                    }
                    // Quantize into ten bands, dark blue = low score
                    let t = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
                    let band = (t * 9.0).round() / 9.0;
                    let shade = (80.0 + band * 175.0) as u8;
                    let color = RGBColor(shade, shade, 255);
                    cells.push(Rectangle::new(
                        [
                            (grid.x_at(ix), grid.y_at(iy)),
                            (grid.x_at(ix + 1), grid.y_at(iy + 1)),
                        ],
                        color.filled(),
                    ));
                }
            }
            chart.draw_series(cells).map_err(render_err)?;
        }
    }

    let segments = contour_segments(&values, grid, level);
    debug!(n_segments = segments.len(), level, "contour extracted");
    chart
        .draw_series(
            segments
                .into_iter()
                .map(|(a, b)| PathElement::new(vec![a, b], RED.stroke_width(3))),
        )
        .map_err(render_err)?;

    chart
        .draw_series(
            x.rows()
                .into_iter()
                .map(|row| Circle::new((row[0], row[1]), opts.point_radius, BLUE.filled())),
        )
        .map_err(render_err)?;

    if !opts.highlight.is_empty() {
        chart
            .draw_series(opts.highlight.iter().map(|&i| {
                Circle::new(
                    (x[[i, 0]], x[[i, 1]]),
                    opts.point_radius + 2,
                    RGBColor(255, 140, 0).filled(),
                )
            }))
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    Ok(())
}

/// Options for [`image_panel`]
#[derive(Debug, Clone)]
pub struct PanelOptions {
    /// Panel rows
    pub rows: usize,
    /// Panel columns
    pub cols: usize,
    /// Pixel scale factor per image pixel
    pub scale: u32,
    /// Padding between images in output pixels
    pub pad: u32,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 5,
            scale: 16,
            pad: 8,
        }
    }
}

/// Render a fixed-size panel of square grayscale images.
///
/// `data` holds flattened images (one per row, a perfect-square column
/// count); `indices` selects which rows to show, in order, truncated to
/// `rows * cols` cells.
pub fn image_panel(
    path: &Path,
    data: &Array2<f64>,
    indices: &[usize],
    opts: &PanelOptions,
) -> Result<()> {
    let side = (data.ncols() as f64).sqrt() as usize;
    if side * side != data.ncols() || side == 0 {
        return Err(AnomalyLabError::ShapeMismatch {
            expected: "a square pixel count per row".to_string(),
            actual: format!("{} columns", data.ncols()),
        });
    }
    if opts.rows * opts.cols == 0 || opts.scale == 0 {
        return Err(AnomalyLabError::InvalidConfig(
            "panel layout must be non-empty with a positive scale".to_string(),
        ));
    }
    for &i in indices {
        if i >= data.nrows() {
            return Err(AnomalyLabError::InvalidConfig(format!(
                "image index {} out of range ({} rows)",
                i,
                data.nrows()
            )));
        }
    }

    let cell = side as u32 * opts.scale;
    let width = opts.cols as u32 * (cell + opts.pad) + opts.pad;
    let height = opts.rows as u32 * (cell + opts.pad) + opts.pad;

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let shown = indices.iter().take(opts.rows * opts.cols);
    let v_max = shown
        .clone()
        .flat_map(|&i| data.row(i).to_vec())
        .fold(f64::MIN, f64::max)
        .max(1e-12);

    for (slot, &idx) in shown.enumerate() {
        let panel_col = slot % opts.cols;
        let panel_row = slot / opts.cols;
        let x0 = (panel_col as u32 * (cell + opts.pad) + opts.pad) as i32;
        let y0 = (panel_row as u32 * (cell + opts.pad) + opts.pad) as i32;

        let row = data.row(idx);
        for py in 0..side {
            for px in 0..side {
                let v = row[py * side + px];
                // Inverted grayscale: ink dark on white, matching how the
                // digit images are usually displayed
                let g = 255 - ((v / v_max).clamp(0.0, 1.0) * 255.0) as u8;
                let sx = x0 + (px as u32 * opts.scale) as i32;
                let sy = y0 + (py as u32 * opts.scale) as i32;
                root.draw(&Rectangle::new(
                    [
                        (sx, sy),
                        (sx + opts.scale as i32, sy + opts.scale as i32),
                    ],
                    RGBColor(g, g, g).filled(),
                ))
                .map_err(render_err)?;
            }
        }
    }

    root.present().map_err(render_err)?;
    Ok(())
}

fn render_err<E: std::fmt::Display>(e: E) -> AnomalyLabError {
    AnomalyLabError::RenderError(e.to_string())
}

fn finite_range(values: &Array2<f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter() {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn toy_scene() -> (Array2<f64>, Grid2d, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (4, 2),
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let grid = Grid2d::from_data(&x, 1.0, 0.5).unwrap();
        let scores = Array1::from_vec(
            (0..grid.n_points()).map(|i| (i % 7) as f64 - 3.0).collect(),
        );
        (x, grid, scores)
    }

    #[test]
    fn test_decision_contour_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contour.png");
        let (x, grid, scores) = toy_scene();

        let opts = ContourOptions {
            shade_bands: true,
            highlight: vec![0, 3],
            ..Default::default()
        };
        decision_contour(&path, &x, &grid, &scores, 0.0, &opts).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_decision_contour_rejects_bad_highlight() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contour.png");
        let (x, grid, scores) = toy_scene();

        let opts = ContourOptions {
            highlight: vec![99],
            ..Default::default()
        };
        assert!(matches!(
            decision_contour(&path, &x, &grid, &scores, 0.0, &opts),
            Err(AnomalyLabError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_decision_contour_rejects_wrong_score_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contour.png");
        let (x, grid, _) = toy_scene();
        let scores = Array1::from_vec(vec![0.0; 3]);

        assert!(matches!(
            decision_contour(&path, &x, &grid, &scores, 0.0, &ContourOptions::default()),
            Err(AnomalyLabError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_image_panel_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.png");
        // Three 4x4 images
        let data = Array2::from_shape_fn((3, 16), |(r, c)| (r * c % 5) as f64);

        let opts = PanelOptions {
            rows: 1,
            cols: 3,
            scale: 8,
            pad: 4,
        };
        image_panel(&path, &data, &[0, 1, 2], &opts).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_image_panel_rejects_non_square_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.png");
        let data = Array2::zeros((2, 15));

        assert!(matches!(
            image_panel(&path, &data, &[0], &PanelOptions::default()),
            Err(AnomalyLabError::ShapeMismatch { .. })
        ));
    }
}
