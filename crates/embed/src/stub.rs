use fxhash::hash64;
use image::RgbImage;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedError, Embedder};

/// Deterministic stand-in for tests and model-less deployments.
///
/// Generates sinusoid values seeded by a hash of the region's pixels, so
/// identical regions always map to identical unit vectors.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Embedder for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, region: &RgbImage) -> Result<Vec<f32>, EmbedError> {
        if region.width() == 0 || region.height() == 0 {
            return Err(EmbedError::EmptyRegion);
        }
        let h = hash64(region.as_raw().as_slice());
        let mut v: Vec<f32> = (0..self.dimension)
            .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001 + idx as f32).sin())
            .collect();
        l2_normalize_in_place(&mut v);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::l2_norm;
    use image::Rgb;

    #[test]
    fn stub_is_deterministic_and_unit_norm() {
        let e = StubEmbedder::new(32);
        let img = RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]));
        let a = e.embed(&img).unwrap();
        let b = e.embed(&img).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn stub_varies_with_content() {
        let e = StubEmbedder::new(16);
        let a = e.embed(&RgbImage::from_pixel(8, 8, Rgb([1, 2, 3]))).unwrap();
        let b = e.embed(&RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]))).unwrap();
        assert_ne!(a, b);
    }
}
