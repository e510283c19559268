//! Marching-squares contour extraction
//!
//! Walks every grid cell and emits the line segments where a scalar field
//! crosses a given level. Pure geometry; the rendering backend draws the
//! returned segments.

use crate::grid::Grid2d;
use ndarray::Array2;

/// One contour line segment in data coordinates
pub type Segment = ((f64, f64), (f64, f64));

/// Line segments of the `level` contour of `values` over `grid`.
///
/// `values` must be in mesh layout (`grid.ny` rows, `grid.nx` columns), as
/// produced by [`Grid2d::reshape_scores`]. Non-finite cells are skipped.
pub fn contour_segments(values: &Array2<f64>, grid: &Grid2d, level: f64) -> Vec<Segment> {
    let mut segments = Vec::new();
    if values.nrows() != grid.ny || values.ncols() != grid.nx {
        return segments;
    }

    for iy in 0..grid.ny - 1 {
        for ix in 0..grid.nx - 1 {
            let bl = values[[iy, ix]];
            let br = values[[iy, ix + 1]];
            let tr = values[[iy + 1, ix + 1]];
            let tl = values[[iy + 1, ix]];
            if !(bl.is_finite() && br.is_finite() && tr.is_finite() && tl.is_finite()) {
                continue;
            }

            let x0 = grid.x_at(ix);
            let x1 = grid.x_at(ix + 1);
            let y0 = grid.y_at(iy);
            let y1 = grid.y_at(iy + 1);

            let mask = (usize::from(bl >= level))
                | (usize::from(br >= level) << 1)
                | (usize::from(tr >= level) << 2)
                | (usize::from(tl >= level) << 3);
            if mask == 0 || mask == 15 {
                continue;
            }

            // Crossing point on each cell edge
            let bottom = (lerp(x0, x1, bl, br, level), y0);
            let right = (x1, lerp(y0, y1, br, tr, level));
            let top = (lerp(x0, x1, tl, tr, level), y1);
            let left = (x0, lerp(y0, y1, bl, tl, level));

            match mask {
                1 => segments.push((left, bottom)),
                2 => segments.push((bottom, right)),
                3 => segments.push((left, right)),
                4 => segments.push((top, right)),
                5 => {
                    // Saddle: disambiguate with the cell center
                    let center = (bl + br + tr + tl) / 4.0;
                    if center >= level {
                        segments.push((left, top));
                        segments.push((bottom, right));
                    } else {
                        segments.push((left, bottom));
                        segments.push((top, right));
                    }
                }
                6 => segments.push((bottom, top)),
                7 => segments.push((left, top)),
                8 => segments.push((left, top)),
                9 => segments.push((bottom, top)),
                10 => {
                    let center = (bl + br + tr + tl) / 4.0;
                    if center >= level {
                        segments.push((left, bottom));
                        segments.push((top, right));
                    } else {
                        segments.push((left, top));
                        segments.push((bottom, right));
                    }
                }
                11 => segments.push((top, right)),
                12 => segments.push((left, right)),
                13 => segments.push((bottom, right)),
                14 => segments.push((left, bottom)),
                _ => unreachable!(),
            }
        }
    }

    segments
}

/// Linear interpolation of the level crossing between two corner values.
fn lerp(p0: f64, p1: f64, v0: f64, v1: f64, level: f64) -> f64 {
    if (v1 - v0).abs() < 1e-300 {
        return (p0 + p1) / 2.0;
    }
    let t = ((level - v0) / (v1 - v0)).clamp(0.0, 1.0);
    p0 + t * (p1 - p0)
}
