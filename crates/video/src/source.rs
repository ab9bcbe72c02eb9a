//! Frame decoders.
//!
//! Animated GIFs are decoded in-process. Every other container is copied to
//! a private temporary directory and piped through `ffmpeg` as raw RGB24;
//! the directory and the child process are released when the source drops.

use std::io::{Cursor, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frame, Frames, RgbImage};
use serde::Deserialize;
use tempfile::TempDir;

use crate::{VideoConfig, VideoError};

/// One decoded frame and its presentation time.
pub struct DecodedFrame {
    pub image: RgbImage,
    pub timestamp_sec: f64,
}

/// Sequential access to the frames of a video.
pub trait FrameSource {
    /// Frame rate reported by the container, if any.
    fn frame_rate(&self) -> Option<f64>;
    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, VideoError>;
}

const GIF_MAGIC: &[u8] = b"GIF8";

/// File extension handed to the external decoder for a MIME type.
pub fn extension_for_mime(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/avi" | "video/x-msvideo" => "avi",
        "video/x-matroska" => "mkv",
        "video/webm" => "webm",
        "image/gif" => "gif",
        _ => "mp4",
    }
}

/// Pick a decoder for `bytes`. GIF is recognised by its signature, whatever
/// the declared content type.
pub fn open_source(
    bytes: &[u8],
    content_type: &str,
    cfg: &VideoConfig,
) -> Result<Box<dyn FrameSource>, VideoError> {
    if bytes.is_empty() {
        return Err(VideoError::Empty);
    }
    if bytes.starts_with(GIF_MAGIC) {
        return Ok(Box::new(GifSource::new(bytes.to_vec())?));
    }
    let source = FfmpegSource::spawn(bytes, extension_for_mime(content_type), cfg)?;
    Ok(Box::new(source))
}

pub struct GifSource {
    frames: Frames<'static>,
    pending: Option<Frame>,
    fps: Option<f64>,
    elapsed_ms: f64,
}

impl GifSource {
    pub fn new(bytes: Vec<u8>) -> Result<Self, VideoError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let mut frames = decoder.into_frames();
        let pending = frames.next().transpose()?;
        let fps = pending.as_ref().and_then(|f| {
            let (numer, denom) = f.delay().numer_denom_ms();
            (numer > 0).then(|| 1000.0 * denom as f64 / numer as f64)
        });
        Ok(Self {
            frames,
            pending,
            fps,
            elapsed_ms: 0.0,
        })
    }
}

impl FrameSource for GifSource {
    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, VideoError> {
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.frames.next() {
                Some(frame) => frame?,
                None => return Ok(None),
            },
        };
        let timestamp_sec = self.elapsed_ms / 1000.0;
        let (numer, denom) = frame.delay().numer_denom_ms();
        if denom > 0 {
            self.elapsed_ms += numer as f64 / denom as f64;
        }
        let image = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
        Ok(Some(DecodedFrame {
            image,
            timestamp_sec,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
pub(crate) fn parse_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Streams RGB24 frames out of an `ffmpeg` child process.
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    fps: Option<f64>,
    timing_fps: f64,
    index: u64,
    // Keeps the uploaded copy alive until the decoder exits.
    _workdir: TempDir,
}

impl FfmpegSource {
    pub fn spawn(bytes: &[u8], extension: &str, cfg: &VideoConfig) -> Result<Self, VideoError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sharkid-video");
        let workdir = match &cfg.scratch_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        let input = workdir.path().join(format!("upload.{extension}"));
        std::fs::write(&input, bytes)?;

        let (width, height, fps) = probe(&cfg.ffprobe_path, &input)?;
        tracing::debug!(width, height, ?fps, extension, "probed video stream");

        let mut child = Command::new(&cfg.ffmpeg_path)
            .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(&input)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::tool("ffmpeg", e.to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VideoError::tool("ffmpeg", "stdout not captured"))?;

        Ok(Self {
            child,
            stdout,
            width,
            height,
            fps,
            timing_fps: fps.unwrap_or(cfg.default_fps),
            index: 0,
            _workdir: workdir,
        })
    }
}

fn probe(ffprobe: &Path, input: &Path) -> Result<(u32, u32, Option<f64>), VideoError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate",
            "-of",
            "json",
        ])
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| VideoError::tool("ffprobe", e.to_string()))?;
    if !output.status.success() {
        return Err(VideoError::tool(
            "ffprobe",
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| VideoError::tool("ffprobe", e.to_string()))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| VideoError::Decode("no video stream".into()))?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(VideoError::Decode("video stream has no dimensions".into())),
    };
    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate));
    Ok((width, height, fps))
}

impl FrameSource for FfmpegSource {
    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, VideoError> {
        let len = self.width as usize * self.height as usize * 3;
        let mut buf = vec![0u8; len];
        match self.stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let image = RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| VideoError::Decode("short raw frame".into()))?;
        let timestamp_sec = self.index as f64 / self.timing_fps;
        self.index += 1;
        Ok(Some(DecodedFrame {
            image,
            timestamp_sec,
        }))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        // Sampling may stop before the end of the stream.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
