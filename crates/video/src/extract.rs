use detect::{auto_detect, BoundingBox, DetectorConfig};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};

use crate::source::{open_source, FrameSource};
use crate::{VideoConfig, VideoError};

/// A sampled frame in which a subject was detected.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFrame {
    pub jpeg_bytes: Vec<u8>,
    pub subject_box: BoundingBox,
    pub zone_box: BoundingBox,
    /// Presentation time in seconds, rounded to hundredths.
    pub timestamp_sec: f64,
    /// Zero-based index of the raw frame in the stream.
    pub frame_index: u64,
}

/// Harvest frames with a detected subject from an uploaded video.
///
/// Never fails: an empty, unreadable or subject-free video yields an empty
/// list. Temporary files are removed on every exit path.
pub fn extract_subject_frames(
    bytes: &[u8],
    content_type: &str,
    cfg: &VideoConfig,
    detector: &DetectorConfig,
) -> Vec<ExtractedFrame> {
    match try_extract_subject_frames(bytes, content_type, cfg, detector) {
        Ok(frames) => frames,
        Err(err) => {
            tracing::warn!(error = %err, content_type, size = bytes.len(), "video could not be opened");
            Vec::new()
        }
    }
}

/// Like [`extract_subject_frames`], but reports why a video could not be
/// opened. Decode errors after the first frame still end sampling quietly.
pub fn try_extract_subject_frames(
    bytes: &[u8],
    content_type: &str,
    cfg: &VideoConfig,
    detector: &DetectorConfig,
) -> Result<Vec<ExtractedFrame>, VideoError> {
    cfg.validate()?;
    let mut source = open_source(bytes, content_type, cfg)?;
    Ok(sample_frames(source.as_mut(), cfg, detector))
}

/// Walk `source`, running the detector on every `frame_step`-th frame until
/// `max_frames` detections are collected or the stream ends.
pub fn sample_frames(
    source: &mut dyn FrameSource,
    cfg: &VideoConfig,
    detector: &DetectorConfig,
) -> Vec<ExtractedFrame> {
    let step = cfg.frame_step(source.frame_rate());
    let mut kept = Vec::new();
    let mut index: u64 = 0;
    let mut sampled = 0usize;

    while kept.len() < cfg.max_frames {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, frame_index = index, "frame decode failed, stopping");
                break;
            }
        };
        if index % step == 0 {
            sampled += 1;
            let img = DynamicImage::ImageRgb8(frame.image);
            if let Some(det) = auto_detect(&img, detector) {
                match encode_jpeg(img.as_rgb8(), cfg.jpeg_quality) {
                    Ok(jpeg_bytes) => kept.push(ExtractedFrame {
                        jpeg_bytes,
                        subject_box: det.subject_box,
                        zone_box: det.zone_box,
                        timestamp_sec: round2(frame.timestamp_sec),
                        frame_index: index,
                    }),
                    Err(err) => {
                        tracing::warn!(error = %err, frame_index = index, "dropping frame")
                    }
                }
            }
        }
        index += 1;
    }

    tracing::info!(
        step,
        decoded = index,
        sampled,
        kept = kept.len(),
        "video sampling finished"
    );
    kept
}

fn encode_jpeg(img: Option<&RgbImage>, quality: u8) -> Result<Vec<u8>, VideoError> {
    let img = img.ok_or_else(|| VideoError::Encode("frame is not RGB8".into()))?;
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(img)
        .map_err(|e| VideoError::Encode(e.to_string()))?;
    Ok(buf)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
