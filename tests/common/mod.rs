#![allow(dead_code)]

use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgb, RgbImage};

pub const WATER: Rgb<u8> = Rgb([12, 72, 128]);

/// A light body on open water, with a spot pattern unique to `seed`.
pub fn shark_image(seed: u32) -> RgbImage {
    RgbImage::from_fn(240, 150, |x, y| {
        if (60..180).contains(&x) && (40..110).contains(&y) {
            let spot = (x * 7 + y * 13 + seed * 31) % (11 + seed % 5) < 3;
            if spot {
                Rgb([60 + (seed * 17 % 80) as u8, 50, 40])
            } else {
                Rgb([215, 205 - (seed % 30) as u8, 185])
            }
        } else {
            WATER
        }
    })
}

pub fn open_water() -> RgbImage {
    RgbImage::from_pixel(240, 150, WATER)
}

pub fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut buf, format)
        .expect("encode fixture");
    buf.into_inner()
}

pub fn png(img: &RgbImage) -> Vec<u8> {
    encode(img, ImageFormat::Png)
}

/// Animated GIF at 10 fps; `true` frames carry an animal.
pub fn dive_gif(pattern: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        let frames = pattern.iter().map(|&with_subject| {
            let img = if with_subject {
                shark_image(3)
            } else {
                open_water()
            };
            Frame::from_parts(
                DynamicImage::ImageRgb8(img).to_rgba8(),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            )
        });
        encoder.encode_frames(frames).expect("encode gif");
    }
    bytes
}
