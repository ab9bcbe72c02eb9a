//! # SharkID Detect
//!
//! Subject localization and region cropping for underwater photo
//! identification.
//!
//! The crate is stateless: every function takes an image plus a
//! [`DetectorConfig`] and returns either boxes or a cropped region.
//!
//! - [`auto_detect`] proposes a subject box and a marking-zone box using a
//!   background-subtraction heuristic. A miss is `None`, never an error.
//! - [`crop_zone`], [`crop_with_orientation`] and [`fallback_crop`] turn an
//!   image plus optional annotations into a square RGB region of
//!   [`DetectorConfig::output_size`] pixels.
//! - [`select_region`] applies the precedence rules used by the pipeline:
//!   explicit boxes, then orientation zones, then auto-detection, then the
//!   fixed fallback window.
//!
//! ```
//! use detect::{select_region, DetectorConfig, Orientation};
//! use image::{DynamicImage, Rgb, RgbImage};
//!
//! let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([10, 60, 120])));
//! let cfg = DetectorConfig::default();
//! let region = select_region(&img, None, None, Orientation::Unspecified, &cfg);
//! assert_eq!(region.image.dimensions(), (128, 128));
//! ```

mod bbox;
mod config;
mod crop;
mod error;
mod heuristic;
mod orientation;

pub use bbox::{BoundingBox, Detection, PixelRect};
pub use config::DetectorConfig;
pub use crop::{
    crop_with_orientation, crop_zone, fallback_crop, orientation_zone, CENTERED_ZONE,
    FACE_LEFT_ZONE, FACE_RIGHT_ZONE,
};
pub use error::DetectError;
pub use heuristic::auto_detect;
pub use orientation::Orientation;

use image::{DynamicImage, RgbImage};

/// Decode a still image from raw bytes, sniffing the format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DetectError> {
    if bytes.is_empty() {
        return Err(DetectError::Empty);
    }
    image::load_from_memory(bytes).map_err(|e| DetectError::Decode(e.to_string()))
}

/// Decode `bytes` and run [`auto_detect`] on the result.
pub fn auto_detect_bytes(
    bytes: &[u8],
    cfg: &DetectorConfig,
) -> Result<Option<Detection>, DetectError> {
    let img = decode_image(bytes)?;
    Ok(auto_detect(&img, cfg))
}

/// How the region handed to the embedder was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSource {
    /// Caller supplied both subject and zone boxes.
    Annotated,
    /// Caller supplied a subject box; the zone came from the orientation.
    Oriented,
    /// Boxes were proposed by [`auto_detect`].
    Detected,
    /// Nothing was found; the fixed center window was used.
    Fallback,
}

/// A canonical-size crop plus the boxes that produced it.
#[derive(Debug, Clone)]
pub struct Region {
    pub image: RgbImage,
    pub source: RegionSource,
    pub subject_box: Option<BoundingBox>,
    pub zone_box: Option<BoundingBox>,
}

/// Pick the region to embed.
///
/// Precedence: both boxes, then subject box with an orientation zone, then
/// auto-detection (if enabled), then [`fallback_crop`]. A zone box without a
/// subject box is ignored. Boxes are assumed to be validated by the caller.
pub fn select_region(
    img: &DynamicImage,
    subject_box: Option<BoundingBox>,
    zone_box: Option<BoundingBox>,
    orientation: Orientation,
    cfg: &DetectorConfig,
) -> Region {
    match (subject_box, zone_box) {
        (Some(subject), Some(zone)) => Region {
            image: crop_zone(img, &subject, &zone, cfg),
            source: RegionSource::Annotated,
            subject_box: Some(subject),
            zone_box: Some(zone),
        },
        (Some(subject), None) => {
            let zone = orientation_zone(orientation);
            Region {
                image: crop_zone(img, &subject, &zone, cfg),
                source: RegionSource::Oriented,
                subject_box: Some(subject),
                zone_box: Some(zone),
            }
        }
        (None, _) => {
            let detection = if cfg.auto_detect_missing {
                auto_detect(img, cfg)
            } else {
                None
            };
            match detection {
                Some(det) => Region {
                    image: crop_zone(img, &det.subject_box, &det.zone_box, cfg),
                    source: RegionSource::Detected,
                    subject_box: Some(det.subject_box),
                    zone_box: Some(det.zone_box),
                },
                None => {
                    tracing::debug!("no subject detected, using fallback crop");
                    Region {
                        image: fallback_crop(img, cfg),
                        source: RegionSource::Fallback,
                        subject_box: None,
                        zone_box: None,
                    }
                }
            }
        }
    }
}
