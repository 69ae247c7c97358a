//! # edgequake-video2pdf
//!
//! Turn a lecture, talk or screencast into a document you can page through:
//! sample frames from a video at a fixed cadence and lay them out as a PDF
//! (one 1280×720 page per frame) or a PowerPoint deck (one slide per frame).
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL or local file
//!  │
//!  ├─ 1. Acquire  pick a progressive stream, download it (yt-dlp + reqwest)
//!  ├─ 2. Probe    frame rate, frame count, size (ffprobe)
//!  ├─ 3. Sample   decode sequentially, keep frames by cadence → frame_NNNN.png
//!  ├─ 4. Compose  PNG sequence → PDF (pdfium) or PPTX (zip)
//!  └─ 5. Cleanup  remove the per-run working directories
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_video2pdf::{convert, Cadence, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .cadence(Cadence::FixedInterval { seconds: 15.0 })
//!         .output_path("talk.pdf")
//!         .build()?;
//!     let output = convert("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &config).await?;
//!     eprintln!("{} pages → {}", output.stats.pages, output.output_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! `ffmpeg` and `ffprobe` are required for every run, `yt-dlp` for URLs.
//! PDF output binds to the pdfium shared library: set `PDFIUM_LIB_PATH` to
//! the library (or its directory), otherwise the system search path is used.
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `video2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `server` | off     | Adds the [`server`] module and the `video2pdf-server` binary (axum) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Cadence, ConversionConfig, ConversionConfigBuilder, OutputFormat, Quality};
pub use convert::{convert, convert_sync, convert_with, inspect, inspect_with};
pub use error::{CleanupWarning, Video2PdfError};
pub use output::{ConversionOutput, ConversionStats, Inspection};
pub use pipeline::acquire::{SourceListing, StreamInfo, VideoSource, YtDlpSource};
pub use pipeline::compose::compose_pdf;
pub use pipeline::deck::compose_deck;
pub use pipeline::decode::{FfmpegDecoder, FrameSource};
pub use pipeline::probe::{probe_video, VideoMetadata};
pub use pipeline::sample::{sample_frames, SampleSet};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
