use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use crate::{BoundingBox, DetectorConfig, Orientation};

/// Zone inside the subject crop when the animal faces left.
pub const FACE_LEFT_ZONE: BoundingBox = BoundingBox::new(0.05, 0.10, 0.50, 0.80);
/// Zone inside the subject crop when the animal faces right.
pub const FACE_RIGHT_ZONE: BoundingBox = BoundingBox::new(0.45, 0.10, 0.50, 0.80);
/// Zone used when the facing side is unknown.
pub const CENTERED_ZONE: BoundingBox = BoundingBox::new(0.25, 0.10, 0.50, 0.80);

/// Zone sub-rectangle shifted toward the side the subject faces.
pub fn orientation_zone(orientation: Orientation) -> BoundingBox {
    match orientation {
        Orientation::FaceLeft => FACE_LEFT_ZONE,
        Orientation::FaceRight => FACE_RIGHT_ZONE,
        Orientation::Unspecified => CENTERED_ZONE,
    }
}

/// Two-stage crop: `subject` against the full image, then `zone` against the
/// subject crop. The result is `output_size x output_size`.
pub fn crop_zone(
    img: &DynamicImage,
    subject: &BoundingBox,
    zone: &BoundingBox,
    cfg: &DetectorConfig,
) -> RgbImage {
    let rgb = img.to_rgb8();
    let subject_crop = crop_box(&rgb, subject);
    let zone_crop = crop_box(&subject_crop, zone);
    canonical(&zone_crop, cfg.output_size)
}

/// Crop the subject, then an orientation-dependent zone inside it.
pub fn crop_with_orientation(
    img: &DynamicImage,
    subject: &BoundingBox,
    orientation: Orientation,
    cfg: &DetectorConfig,
) -> RgbImage {
    crop_zone(img, subject, &orientation_zone(orientation), cfg)
}

/// Fixed center-biased crop for images with neither annotation nor detection.
pub fn fallback_crop(img: &DynamicImage, cfg: &DetectorConfig) -> RgbImage {
    let rgb = img.to_rgb8();
    canonical(&crop_box(&rgb, &cfg.fallback_box()), cfg.output_size)
}

fn crop_box(img: &RgbImage, bbox: &BoundingBox) -> RgbImage {
    let rect = bbox.to_pixels(img.width(), img.height());
    imageops::crop_imm(img, rect.x, rect.y, rect.w, rect.h).to_image()
}

fn canonical(img: &RgbImage, size: u32) -> RgbImage {
    let size = size.max(1);
    if img.dimensions() == (size, size) {
        return img.clone();
    }
    imageops::resize(img, size, size, FilterType::Lanczos3)
}
