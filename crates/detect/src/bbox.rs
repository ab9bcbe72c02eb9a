use serde::{Deserialize, Serialize};

use crate::DetectError;

/// Normalized rectangle with all coordinates in `[0, 1]`.
///
/// A *subject box* is relative to the full image; a *zone box* is relative to
/// the subject crop, so composing the two always needs a two-stage crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Box covering the whole reference frame.
    pub const fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Reject boxes a client could not have meant: non-finite values,
    /// coordinates outside `[0, 1]`, or a zero/negative extent.
    pub fn validate(&self) -> Result<(), DetectError> {
        let fields = [("x", self.x), ("y", self.y), ("w", self.w), ("h", self.h)];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(DetectError::InvalidBox(format!("{name} is not finite")));
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectError::InvalidBox(format!(
                    "{name}={value} outside [0, 1]"
                )));
            }
        }
        if self.w <= 0.0 || self.h <= 0.0 {
            return Err(DetectError::InvalidBox("w and h must be positive".into()));
        }
        Ok(())
    }

    /// Resolve against a `width x height` pixel grid.
    ///
    /// Bounds are truncated toward zero, clamped inside the grid, and never
    /// smaller than one pixel in either dimension.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let width = width.max(1);
        let height = height.max(1);
        let x = ((self.x * width as f32) as u32).min(width - 1);
        let y = ((self.y * height as f32) as u32).min(height - 1);
        let w = ((self.w * width as f32) as u32).max(1).min(width - x);
        let h = ((self.h * height as f32) as u32).max(1).min(height - y);
        PixelRect { x, y, w, h }
    }

    pub(crate) fn rounded(self) -> Self {
        Self::new(round4(self.x), round4(self.y), round4(self.w), round4(self.h))
    }
}

fn round4(v: f32) -> f32 {
    (v * 10_000.0).round() / 10_000.0
}

/// Integer crop window produced by [`BoundingBox::to_pixels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Output of a successful [`crate::auto_detect`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub subject_box: BoundingBox,
    pub zone_box: BoundingBox,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_box_maps_to_whole_grid() {
        let rect = BoundingBox::full().to_pixels(640, 480);
        assert_eq!(rect, PixelRect { x: 0, y: 0, w: 640, h: 480 });
    }

    #[test]
    fn tiny_box_still_yields_one_pixel() {
        let rect = BoundingBox::new(0.5, 0.5, 0.0001, 0.0001).to_pixels(100, 100);
        assert_eq!(rect.w, 1);
        assert_eq!(rect.h, 1);
    }

    #[test]
    fn box_touching_far_edge_is_clamped_inside() {
        let rect = BoundingBox::new(1.0, 1.0, 1.0, 1.0).to_pixels(10, 20);
        assert_eq!(rect, PixelRect { x: 9, y: 19, w: 1, h: 1 });
    }

    #[test]
    fn coordinates_truncate_toward_zero() {
        let rect = BoundingBox::new(0.19, 0.26, 0.5, 0.5).to_pixels(10, 10);
        assert_eq!((rect.x, rect.y, rect.w, rect.h), (1, 2, 5, 5));
    }

    #[test]
    fn validate_rejects_out_of_range_and_nan() {
        assert!(BoundingBox::new(-0.1, 0.0, 0.5, 0.5).validate().is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.5, 0.5).validate().is_err());
        assert!(BoundingBox::new(f32::NAN, 0.0, 0.5, 0.5).validate().is_err());
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.5).validate().is_err());
        assert!(BoundingBox::new(0.1, 0.2, 0.3, 0.4).validate().is_ok());
    }

    #[test]
    fn serializes_with_short_field_names() {
        let json = serde_json::to_value(BoundingBox::new(0.25, 0.1, 0.5, 0.8)).unwrap();
        assert_eq!(json["x"], 0.25);
        assert_eq!(json["w"], 0.5);
        assert!(json.get("width").is_none());
    }
}
