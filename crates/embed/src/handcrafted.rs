//! Hand-crafted region descriptor.
//!
//! Layout of the 106 components, before the final L2 normalization:
//!
//! | range    | feature                                             |
//! |----------|-----------------------------------------------------|
//! | 0..64    | joint HSV histogram, 4 bins per channel             |
//! | 64..74   | rotation-invariant uniform LBP(8, 1) histogram      |
//! | 74..106  | 4x4 grid of grayscale (mean, variance) pairs        |
//!
//! Each histogram is normalized to sum to one so the blocks stay comparable
//! regardless of region size.

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedError, Embedder};

const HSV_BINS: usize = 4;
const HSV_LEN: usize = HSV_BINS * HSV_BINS * HSV_BINS;
const LBP_LEN: usize = 10;
const GRID: u32 = 4;
const GRID_LEN: usize = (GRID * GRID * 2) as usize;

/// Output dimension of [`HandcraftedEmbedder`].
pub const HANDCRAFTED_DIM: usize = HSV_LEN + LBP_LEN + GRID_LEN;

/// Colour, texture and layout descriptor computed on a fixed-size copy of
/// the region.
#[derive(Debug, Clone)]
pub struct HandcraftedEmbedder {
    input_size: u32,
}

impl HandcraftedEmbedder {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size: input_size.max(GRID * 2),
        }
    }
}

impl Default for HandcraftedEmbedder {
    fn default() -> Self {
        Self::new(128)
    }
}

impl Embedder for HandcraftedEmbedder {
    fn name(&self) -> &str {
        "handcrafted-hsv-lbp-grid"
    }

    fn dimension(&self) -> usize {
        HANDCRAFTED_DIM
    }

    fn embed(&self, region: &RgbImage) -> Result<Vec<f32>, EmbedError> {
        if region.width() == 0 || region.height() == 0 {
            return Err(EmbedError::EmptyRegion);
        }
        let resized;
        let rgb = if region.dimensions() == (self.input_size, self.input_size) {
            region
        } else {
            resized = imageops::resize(
                region,
                self.input_size,
                self.input_size,
                FilterType::Triangle,
            );
            &resized
        };
        let gray = imageops::grayscale(rgb);

        let mut out = Vec::with_capacity(HANDCRAFTED_DIM);
        out.extend(hsv_histogram(rgb));
        out.extend(lbp_histogram(&gray));
        out.extend(grid_stats(&gray));
        debug_assert_eq!(out.len(), HANDCRAFTED_DIM);
        l2_normalize_in_place(&mut out);
        Ok(out)
    }
}

fn hsv_histogram(img: &RgbImage) -> [f32; HSV_LEN] {
    let mut hist = [0f32; HSV_LEN];
    for px in img.pixels() {
        let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
        let hb = bin(h / 360.0);
        let sb = bin(s);
        let vb = bin(v);
        hist[(hb * HSV_BINS + sb) * HSV_BINS + vb] += 1.0;
    }
    normalize_sum(&mut hist);
    hist
}

fn bin(unit: f32) -> usize {
    ((unit * HSV_BINS as f32) as usize).min(HSV_BINS - 1)
}

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let sat = if max == 0.0 { 0.0 } else { delta / max };
    (hue, sat, max)
}

/// Neighbour offsets in circular order starting at the top-left.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

/// Bins 0..=8 count set bits of uniform patterns; bin 9 collects the rest.
fn lbp_histogram(gray: &GrayImage) -> [f32; LBP_LEN] {
    let mut hist = [0f32; LBP_LEN];
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return hist;
    }
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray.get_pixel(x, y)[0];
            let mut bits = [false; 8];
            for (i, (dx, dy)) in NEIGHBOURS.iter().enumerate() {
                let nx = (x as i32 + dx) as u32;
                let ny = (y as i32 + dy) as u32;
                bits[i] = gray.get_pixel(nx, ny)[0] >= center;
            }
            let transitions = (0..8).filter(|&i| bits[i] != bits[(i + 1) % 8]).count();
            let code = if transitions <= 2 {
                bits.iter().filter(|&&b| b).count()
            } else {
                LBP_LEN - 1
            };
            hist[code] += 1.0;
        }
    }
    normalize_sum(&mut hist);
    hist
}

fn grid_stats(gray: &GrayImage) -> [f32; GRID_LEN] {
    let mut out = [0f32; GRID_LEN];
    let (width, height) = gray.dimensions();
    for gy in 0..GRID {
        for gx in 0..GRID {
            let x0 = gx * width / GRID;
            let x1 = ((gx + 1) * width / GRID).max(x0 + 1).min(width);
            let y0 = gy * height / GRID;
            let y1 = ((gy + 1) * height / GRID).max(y0 + 1).min(height);
            let mut sum = 0f64;
            let mut sum_sq = 0f64;
            let mut n = 0f64;
            for y in y0..y1 {
                for x in x0..x1 {
                    let v = gray.get_pixel(x, y)[0] as f64 / 255.0;
                    sum += v;
                    sum_sq += v * v;
                    n += 1.0;
                }
            }
            let idx = ((gy * GRID + gx) * 2) as usize;
            if n > 0.0 {
                let mean = sum / n;
                out[idx] = mean as f32;
                out[idx + 1] = (sum_sq / n - mean * mean).max(0.0) as f32;
            }
        }
    }
    out
}

fn normalize_sum(values: &mut [f32]) {
    let total: f32 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}
