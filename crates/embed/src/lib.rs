//! # SharkID Embed
//!
//! Turns a cropped region into a fixed-length, unit-norm fingerprint.
//!
//! Every backend implements [`Embedder`]; the rest of the system reads the
//! output width from [`Embedder::dimension`] and never infers it from data.
//!
//! - [`HandcraftedEmbedder`]: colour histogram, rotation-invariant texture
//!   histogram and spatial grid statistics (`D = 106`).
//! - `OnnxEmbedder` (feature `onnx`): pooled features of a pretrained
//!   EfficientNet-B0 (`D = 1280`).
//! - [`StubEmbedder`]: hash-seeded vectors of any width, for tests.
//!
//! ```
//! use embed::{build_embedder, EmbedderConfig};
//! use image::{Rgb, RgbImage};
//!
//! let embedder = build_embedder(&EmbedderConfig::default()).unwrap();
//! let v = embedder.embed(&RgbImage::from_pixel(128, 128, Rgb([40, 90, 160]))).unwrap();
//! assert_eq!(v.len(), embedder.dimension());
//! ```

mod config;
mod error;
mod handcrafted;
mod normalize;
#[cfg(feature = "onnx")]
mod onnx;
mod stub;

pub use config::{build_embedder, EmbedderConfig, EmbedderKind};
pub use error::EmbedError;
pub use handcrafted::{HandcraftedEmbedder, HANDCRAFTED_DIM};
pub use normalize::{l2_norm, l2_normalize_in_place};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxEmbedder, ONNX_DIM};
pub use stub::StubEmbedder;

use image::RgbImage;

/// Capability interface for region embedders.
///
/// Implementations must be deterministic and return vectors of exactly
/// [`Embedder::dimension`] components with unit L2 norm, or the zero vector
/// when the raw features are all zero.
pub trait Embedder: Send + Sync {
    /// Short identifier used in logs and health output.
    fn name(&self) -> &str;
    fn dimension(&self) -> usize;
    fn embed(&self, region: &RgbImage) -> Result<Vec<f32>, EmbedError>;
}
