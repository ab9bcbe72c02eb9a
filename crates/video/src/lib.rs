//! # SharkID Video
//!
//! Samples a dive video at a fixed playback interval, runs the subject
//! localizer on each sampled frame, and returns the frames where an animal
//! was found as JPEG stills plus their boxes.
//!
//! Animated GIFs are decoded with `image`. Other containers (MP4, MOV, AVI,
//! MKV, WebM) go through the `ffmpeg` and `ffprobe` executables configured in
//! [`VideoConfig`].
//!
//! ```no_run
//! use detect::DetectorConfig;
//! use video::{extract_subject_frames, VideoConfig};
//!
//! let bytes = std::fs::read("dive.mp4").unwrap();
//! let frames = extract_subject_frames(
//!     &bytes,
//!     "video/mp4",
//!     &VideoConfig::default(),
//!     &DetectorConfig::default(),
//! );
//! for f in &frames {
//!     println!("{:.2}s frame {}", f.timestamp_sec, f.frame_index);
//! }
//! ```

mod config;
mod error;
mod extract;
mod source;

pub use config::VideoConfig;
pub use error::VideoError;
pub use extract::{extract_subject_frames, sample_frames, try_extract_subject_frames, ExtractedFrame};
pub use source::{extension_for_mime, open_source, DecodedFrame, FfmpegSource, FrameSource, GifSource};
