use serde::{Deserialize, Serialize};

use crate::{BoundingBox, DetectError};

/// Tunables for the background-subtraction localizer and the crop stage.
///
/// The defaults are tuned for underwater footage where the frame border is
/// open water.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Longest side of the working copy used for localization.
    pub max_side: u32,
    /// Foreground threshold is `mean + sigma_factor * stddev` of the
    /// per-pixel distance from the background colour.
    pub sigma_factor: f32,
    /// Padding added on every side of the detected box (normalized units).
    pub padding: f32,
    /// Radius of the 3x3 closing applied to the foreground mask.
    pub closing_iterations: u8,
    /// Minimum number of foreground rows and columns for a detection.
    pub min_extent_px: u32,
    /// Accepted `[min, max]` width of the padded subject box.
    pub width_bounds: (f32, f32),
    /// Accepted `[min, max]` height of the padded subject box.
    pub height_bounds: (f32, f32),
    /// Zone proposed inside an auto-detected subject.
    pub zone_box: BoundingBox,
    /// Side of the square region handed to the embedder.
    pub output_size: u32,
    /// Horizontal `[start, end]` of the fixed fallback crop.
    pub fallback_x: (f32, f32),
    /// Vertical `[start, end]` of the fixed fallback crop.
    pub fallback_y: (f32, f32),
    /// Run [`crate::auto_detect`] when no annotation is supplied.
    pub auto_detect_missing: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_side: 300,
            sigma_factor: 0.8,
            padding: 0.04,
            closing_iterations: 2,
            min_extent_px: 4,
            width_bounds: (0.10, 0.95),
            height_bounds: (0.05, 0.95),
            zone_box: BoundingBox::new(0.35, 0.05, 0.50, 0.50),
            output_size: 128,
            fallback_x: (0.20, 0.80),
            fallback_y: (0.20, 0.85),
            auto_detect_missing: true,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.max_side < 8 {
            return Err(DetectError::InvalidConfig("max_side must be >= 8".into()));
        }
        if self.output_size == 0 {
            return Err(DetectError::InvalidConfig("output_size must be > 0".into()));
        }
        if !self.sigma_factor.is_finite() || !self.padding.is_finite() || self.padding < 0.0 {
            return Err(DetectError::InvalidConfig(
                "sigma_factor and padding must be finite, padding >= 0".into(),
            ));
        }
        for (name, (lo, hi)) in [
            ("width_bounds", self.width_bounds),
            ("height_bounds", self.height_bounds),
            ("fallback_x", self.fallback_x),
            ("fallback_y", self.fallback_y),
        ] {
            if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo >= hi {
                return Err(DetectError::InvalidConfig(format!(
                    "{name} must satisfy 0 <= min < max <= 1"
                )));
            }
        }
        self.zone_box
            .validate()
            .map_err(|e| DetectError::InvalidConfig(format!("zone_box: {e}")))
    }

    /// The fallback window expressed as a [`BoundingBox`].
    pub fn fallback_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.fallback_x.0,
            self.fallback_y.0,
            self.fallback_x.1 - self.fallback_x.0,
            self.fallback_y.1 - self.fallback_y.0,
        )
    }
}
