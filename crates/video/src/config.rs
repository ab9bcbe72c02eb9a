use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::VideoError;

/// Sampling and encoding parameters for frame extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Seconds of playback between sampled frames.
    pub frame_interval_sec: f64,
    /// Stop after this many frames with a detected subject.
    pub max_frames: usize,
    /// JPEG quality (1-100) of kept frames.
    pub jpeg_quality: u8,
    /// Frame rate assumed when the container does not report one.
    pub default_fps: f64,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Parent for per-upload temporary directories; the system temp dir
    /// when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_interval_sec: 2.0,
            max_frames: 30,
            jpeg_quality: 85,
            default_fps: 25.0,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            scratch_dir: None,
        }
    }
}

impl VideoConfig {
    pub fn with_frame_interval(mut self, seconds: f64) -> Self {
        self.frame_interval_sec = seconds;
        self
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn validate(&self) -> Result<(), VideoError> {
        if !self.frame_interval_sec.is_finite() || self.frame_interval_sec <= 0.0 {
            return Err(VideoError::InvalidConfig(
                "frame_interval_sec must be > 0".into(),
            ));
        }
        if !self.default_fps.is_finite() || self.default_fps <= 0.0 {
            return Err(VideoError::InvalidConfig("default_fps must be > 0".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(VideoError::InvalidConfig(format!(
                "jpeg_quality {} outside 1..=100",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Raw frames between samples at `fps`: `max(1, round(fps * interval))`.
    pub fn frame_step(&self, fps: Option<f64>) -> u64 {
        let fps = fps
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(self.default_fps);
        ((fps * self.frame_interval_sec).round() as u64).max(1)
    }
}
