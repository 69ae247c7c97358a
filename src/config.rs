//! Configuration types for video-to-document conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! config can be shared with the blocking stages, logged, and diffed between
//! runs.

use crate::error::Video2PdfError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Page size of the paged (PDF) output, in PDF points. Landscape 16:9.
pub const PAGE_WIDTH: f32 = 1280.0;
pub const PAGE_HEIGHT: f32 = 720.0;

/// Configuration for a video-to-document conversion.
///
/// # Example
/// ```rust
/// use edgequake_video2pdf::{Cadence, ConversionConfig, OutputFormat};
///
/// let config = ConversionConfig::builder()
///     .cadence(Cadence::FixedRate { fps: 0.5 })
///     .format(OutputFormat::Pptx)
///     .build()
///     .unwrap();
/// assert_eq!(config.resolved_output_path().to_str(), Some("output.pptx"));
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Which stream to download. Default: [`Quality::Highest`].
    pub quality: Quality,

    /// Which decoded frames become images. Default: one frame per second.
    pub cadence: Cadence,

    /// Output document format. Default: [`OutputFormat::Pdf`].
    pub format: OutputFormat,

    /// Where to write the document. Default: `output.pdf` / `output.pptx`
    /// in the current directory.
    pub output_path: Option<PathBuf>,

    /// Directory under which the per-run working directory is created.
    /// Default: the current directory.
    pub work_root: PathBuf,

    /// Skip cleanup and leave the downloaded video and frames on disk.
    pub keep_intermediates: bool,

    /// Reject frames whose aspect ratio does not match the 16:9 page instead
    /// of stretching them with a warning. PDF mode only.
    pub strict_aspect: bool,

    /// Timeout for the whole video download in seconds. Default: 600.
    pub download_timeout_secs: u64,

    /// `ffmpeg` executable. Default: `ffmpeg` on `PATH`.
    pub ffmpeg_path: PathBuf,

    /// `ffprobe` executable. Default: `ffprobe` on `PATH`.
    pub ffprobe_path: PathBuf,

    /// `yt-dlp` executable used to enumerate remote streams.
    pub ytdlp_path: PathBuf,

    /// Optional observer for stage progress.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            cadence: Cadence::default(),
            format: OutputFormat::default(),
            output_path: None,
            work_root: PathBuf::from("."),
            keep_intermediates: false,
            strict_aspect: false,
            download_timeout_secs: 600,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("quality", &self.quality)
            .field("cadence", &self.cadence)
            .field("format", &self.format)
            .field("output_path", &self.output_path)
            .field("work_root", &self.work_root)
            .field("keep_intermediates", &self.keep_intermediates)
            .field("strict_aspect", &self.strict_aspect)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The output path, falling back to the format's default file name.
    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.format.default_file_name()))
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn quality(mut self, quality: Quality) -> Self {
        self.config.quality = quality;
        self
    }

    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.config.cadence = cadence;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    pub fn work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_root = dir.into();
        self
    }

    pub fn keep_intermediates(mut self, v: bool) -> Self {
        self.config.keep_intermediates = v;
        self
    }

    pub fn strict_aspect(mut self, v: bool) -> Self {
        self.config.strict_aspect = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = path.into();
        self
    }

    pub fn ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffprobe_path = path.into();
        self
    }

    pub fn ytdlp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ytdlp_path = path.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Video2PdfError> {
        let c = &self.config;
        c.cadence.validate()?;
        if let Quality::Resolution(label) = &c.quality {
            if !RESOLUTION_LABEL.is_match(label) {
                return Err(Video2PdfError::InvalidConfig(format!(
                    "Resolution must look like '720p', got '{label}'"
                )));
            }
        }
        if c.download_timeout_secs == 0 {
            return Err(Video2PdfError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref p) = c.output_path {
            if p.as_os_str().is_empty() || p.is_dir() {
                return Err(Video2PdfError::InvalidConfig(format!(
                    "Output path '{}' must name a file",
                    p.display()
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

static RESOLUTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2,4}p$").expect("valid regex"));

/// Stream quality preference for acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quality {
    /// Best available progressive (audio+video) stream. (default)
    #[default]
    Highest,
    /// Exact resolution label such as `"720p"`; progressive streams only.
    Resolution(String),
}

impl FromStr for Quality {
    type Err = Video2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "highest" || s.is_empty() {
            return Ok(Quality::Highest);
        }
        if RESOLUTION_LABEL.is_match(&s) {
            Ok(Quality::Resolution(s))
        } else {
            Err(Video2PdfError::InvalidConfig(format!(
                "Resolution must be 'highest' or look like '720p', got '{s}'"
            )))
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Highest => f.write_str("highest"),
            Quality::Resolution(label) => f.write_str(label),
        }
    }
}

/// Rule deciding which decoded frames become images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Cadence {
    /// `fps` samples per second of video: every `round(native / fps)`-th frame.
    FixedRate { fps: f64 },
    /// The opening frame, then one frame every `seconds` of video.
    FixedInterval { seconds: f64 },
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::FixedRate { fps: 1.0 }
    }
}

impl Cadence {
    fn validate(&self) -> Result<(), Video2PdfError> {
        let (name, v) = match *self {
            Cadence::FixedRate { fps } => ("fps", fps),
            Cadence::FixedInterval { seconds } => ("interval", seconds),
        };
        if !v.is_finite() || v <= 0.0 {
            return Err(Video2PdfError::InvalidConfig(format!(
                "Sampling {name} must be a positive number, got {v}"
            )));
        }
        Ok(())
    }

    /// Number of decoded frames between regular emissions. Always ≥ 1.
    pub fn interval_frames(&self, native_frame_rate: f64) -> u64 {
        let raw = match *self {
            Cadence::FixedRate { fps } => (native_frame_rate / fps).round(),
            Cadence::FixedInterval { seconds } => (native_frame_rate * seconds).round(),
        };
        if raw.is_finite() && raw >= 1.0 {
            raw as u64
        } else {
            1
        }
    }

    /// Whether the decoded frame with 1-based position `frame` is emitted.
    ///
    /// Interval mode always keeps the opening frame; it is emitted once even
    /// when it is also a regular multiple (`interval == 1`).
    pub fn should_emit(&self, frame: u64, interval: u64) -> bool {
        match self {
            Cadence::FixedRate { .. } => frame % interval == 0,
            Cadence::FixedInterval { .. } => frame == 1 || frame % interval == 0,
        }
    }

    /// How many frames [`should_emit`](Self::should_emit) selects out of
    /// `total_frames`.
    pub fn expected_samples(&self, total_frames: u64, interval: u64) -> u64 {
        let regular = total_frames / interval;
        match self {
            Cadence::FixedRate { .. } => regular,
            Cadence::FixedInterval { .. } if total_frames > 0 && interval > 1 => regular + 1,
            Cadence::FixedInterval { .. } => regular,
        }
    }
}

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Paged PDF, one 1280×720 page per frame. (default)
    #[default]
    Pdf,
    /// PowerPoint deck, one blank slide per frame.
    Pptx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Pptx => "pptx",
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "output.pdf",
            OutputFormat::Pptx => "output.pptx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(OutputFormat::Pdf),
            "pptx" => Some(OutputFormat::Pptx),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Video2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "pptx" | "ppt" | "slides" => Ok(OutputFormat::Pptx),
            other => Err(Video2PdfError::InvalidConfig(format!(
                "Unknown output format '{other}' (expected pdf or pptx)"
            ))),
        }
    }
}
