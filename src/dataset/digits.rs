//! Bundled handwritten-digit image set
//!
//! A fixed corpus of 8x8 grayscale digit images (intensity 0..=16) shipped
//! with the crate as CSV and embedded at compile time. Each row holds the 64
//! flattened pixel values followed by the digit label.

use crate::error::{AnomalyLabError, Result};
use ndarray::{s, Array1, Array2};

/// Side length of one digit image in pixels
pub const IMAGE_SIDE: usize = 8;

/// Number of pixels (= features) per image
pub const N_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;

static DIGITS_CSV: &str = include_str!("../../data/digits.csv");

/// The bundled digit image set
#[derive(Debug, Clone)]
pub struct Digits {
    /// Flattened images, one row per image, `N_PIXELS` columns
    pub data: Array2<f64>,
    /// Digit label per row
    pub target: Array1<usize>,
}

impl Digits {
    /// Load the bundled digit set.
    pub fn load() -> Result<Self> {
        Self::parse(DIGITS_CSV)
    }

    fn parse(csv: &str) -> Result<Self> {
        let mut flat = Vec::new();
        let mut target = Vec::new();

        for (lineno, line) in csv.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != N_PIXELS + 1 {
                return Err(AnomalyLabError::DataError(format!(
                    "digits line {}: expected {} fields, got {}",
                    lineno + 1,
                    N_PIXELS + 1,
                    fields.len()
                )));
            }
            for field in &fields[..N_PIXELS] {
                let v: f64 = field.parse().map_err(|_| {
                    AnomalyLabError::DataError(format!(
                        "digits line {}: bad pixel value {:?}",
                        lineno + 1,
                        field
                    ))
                })?;
                flat.push(v);
            }
            let label: usize = fields[N_PIXELS].parse().map_err(|_| {
                AnomalyLabError::DataError(format!(
                    "digits line {}: bad label {:?}",
                    lineno + 1,
                    fields[N_PIXELS]
                ))
            })?;
            if label > 9 {
                return Err(AnomalyLabError::DataError(format!(
                    "digits line {}: label {} out of range",
                    lineno + 1,
                    label
                )));
            }
            target.push(label);
        }

        if target.is_empty() {
            return Err(AnomalyLabError::DataError(
                "digits data is empty".to_string(),
            ));
        }

        let n = target.len();
        let data = Array2::from_shape_vec((n, N_PIXELS), flat)?;
        Ok(Self {
            data,
            target: Array1::from_vec(target),
        })
    }

    /// Number of images in the set
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Rows belonging to one digit class.
    pub fn filter_class(&self, digit: usize) -> Array2<f64> {
        let indices: Vec<usize> = self
            .target
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == digit)
            .map(|(i, _)| i)
            .collect();

        let mut out = Array2::zeros((indices.len(), N_PIXELS));
        for (row, &i) in indices.iter().enumerate() {
            out.row_mut(row).assign(&self.data.row(i));
        }
        out
    }

    /// One image reshaped to its `IMAGE_SIDE x IMAGE_SIDE` layout.
    pub fn image(&self, idx: usize) -> Result<Array2<f64>> {
        if idx >= self.n_samples() {
            return Err(AnomalyLabError::InvalidConfig(format!(
                "image index {} out of range ({} images)",
                idx,
                self.n_samples()
            )));
        }
        let row = self.data.slice(s![idx, ..]).to_owned();
        Ok(row.into_shape((IMAGE_SIDE, IMAGE_SIDE))?)
    }
}
