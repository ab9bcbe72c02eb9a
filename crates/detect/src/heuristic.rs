//! Background-subtraction localizer.
//!
//! The border ring of the frame is assumed to be open water. Pixels whose
//! colour differs strongly from the median border colour form a foreground
//! mask; after closing, the largest 8-connected component is the subject.

use std::collections::HashMap;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::{BoundingBox, Detection, DetectorConfig};

/// Propose a subject box and a marking zone for `img`.
///
/// Returns `None` when no plausible subject stands out from the border colour,
/// when the subject spans fewer than `min_extent_px` rows or columns, or when
/// the padded box is implausibly small or close to full-frame.
pub fn auto_detect(img: &DynamicImage, cfg: &DetectorConfig) -> Option<Detection> {
    let work = downsample(img, cfg.max_side);
    let (width, height) = work.dimensions();
    if width < 3 || height < 3 {
        return None;
    }

    let background = border_median(&work);
    let distances: Vec<f32> = work
        .pixels()
        .map(|px| color_distance(px, &background))
        .collect();
    let (mean, std) = mean_std(&distances);
    let threshold = mean + cfg.sigma_factor * std;

    let mask = GrayImage::from_fn(width, height, |x, y| {
        if distances[(y * width + x) as usize] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let mask = if cfg.closing_iterations > 0 {
        close(&mask, Norm::LInf, cfg.closing_iterations)
    } else {
        mask
    };

    let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));
    let mut sizes: HashMap<u32, usize> = HashMap::new();
    for px in labels.pixels() {
        if px[0] != 0 {
            *sizes.entry(px[0]).or_default() += 1;
        }
    }
    // Ties resolve to the lowest label so the result does not depend on map order.
    let subject = sizes
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(&label, _)| label)?;

    let mut rows = vec![false; height as usize];
    let mut cols = vec![false; width as usize];
    for (x, y, px) in labels.enumerate_pixels() {
        if px[0] == subject {
            rows[y as usize] = true;
            cols[x as usize] = true;
        }
    }
    let row_count = rows.iter().filter(|&&r| r).count() as u32;
    let col_count = cols.iter().filter(|&&c| c).count() as u32;
    if row_count < cfg.min_extent_px || col_count < cfg.min_extent_px {
        tracing::debug!(row_count, col_count, "subject too small");
        return None;
    }

    let x_min = cols.iter().position(|&c| c)? as f32;
    let x_max = cols.iter().rposition(|&c| c)? as f32 + 1.0;
    let y_min = rows.iter().position(|&r| r)? as f32;
    let y_max = rows.iter().rposition(|&r| r)? as f32 + 1.0;

    let x0 = (x_min / width as f32 - cfg.padding).max(0.0);
    let y0 = (y_min / height as f32 - cfg.padding).max(0.0);
    let x1 = (x_max / width as f32 + cfg.padding).min(1.0);
    let y1 = (y_max / height as f32 + cfg.padding).min(1.0);
    let subject_box = BoundingBox::new(x0, y0, x1 - x0, y1 - y0).rounded();

    let (w_lo, w_hi) = cfg.width_bounds;
    let (h_lo, h_hi) = cfg.height_bounds;
    if subject_box.w < w_lo || subject_box.w > w_hi || subject_box.h < h_lo || subject_box.h > h_hi
    {
        tracing::debug!(w = subject_box.w, h = subject_box.h, "subject box rejected");
        return None;
    }

    Some(Detection {
        subject_box,
        zone_box: cfg.zone_box,
    })
}

fn downsample(img: &DynamicImage, max_side: u32) -> RgbImage {
    if img.width().max(img.height()) > max_side {
        img.resize(max_side, max_side, FilterType::Triangle).to_rgb8()
    } else {
        img.to_rgb8()
    }
}

/// Per-channel median over the outermost ring of pixels.
fn border_median(img: &RgbImage) -> [f32; 3] {
    let (width, height) = img.dimensions();
    let mut channels: [Vec<u8>; 3] = Default::default();
    let mut push = |px: &Rgb<u8>| {
        for (c, values) in channels.iter_mut().enumerate() {
            values.push(px[c]);
        }
    };
    for x in 0..width {
        push(img.get_pixel(x, 0));
        push(img.get_pixel(x, height - 1));
    }
    for y in 1..height - 1 {
        push(img.get_pixel(0, y));
        push(img.get_pixel(width - 1, y));
    }
    channels.map(|mut values| median(&mut values))
}

fn median(values: &mut [u8]) -> f32 {
    values.sort_unstable();
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        values[n / 2] as f32
    } else {
        (values[n / 2 - 1] as f32 + values[n / 2] as f32) / 2.0
    }
}

fn color_distance(px: &Rgb<u8>, background: &[f32; 3]) -> f32 {
    let dr = px[0] as f32 - background[0];
    let dg = px[1] as f32 - background[1];
    let db = px[2] as f32 - background[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}
