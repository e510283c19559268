//! Dataset providers
//!
//! Provides the two sample sources used by the demo workflows:
//! - Gaussian-mixture blob generation (synthetic, seeded)
//! - A bundled set of 8x8 grayscale digit images with class labels
//!
//! Providers produce an immutable sample matrix (rows = observations,
//! columns = features) and, where available, a parallel label vector.
//! Labels are only ever used for filtering, never by the scorers.

mod blobs;
mod digits;

pub use blobs::{make_blobs, BlobsConfig};
pub use digits::{Digits, IMAGE_SIDE, N_PIXELS};
