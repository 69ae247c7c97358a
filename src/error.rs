//! Error types for the edgequake-video2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Video2PdfError`] — **Fatal**: the run cannot produce a document
//!   (source unreachable, no stream at the requested quality, corrupt video,
//!   nothing to compose). Returned as `Err(Video2PdfError)` from the
//!   top-level `convert*` functions. No partial output is returned.
//!
//! * [`CleanupWarning`] — **Non-fatal**: a working directory could not be
//!   removed after composition. Logged and stored in
//!   [`crate::output::ConversionOutput::cleanup_warnings`]; it never replaces
//!   an upstream error and never fails a run whose document was written.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-video2pdf library.
#[derive(Debug, Error)]
pub enum Video2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input string is neither an existing file nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not an existing video file or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An external program (ffmpeg, ffprobe, yt-dlp) could not be started.
    #[error("Required tool '{tool}' could not be started: {reason}\nInstall it or point --{tool} at the binary.")]
    ToolNotFound { tool: String, reason: String },

    // ── Acquisition errors ────────────────────────────────────────────────
    /// The source reference could not be resolved or downloaded.
    #[error("Source '{url}' is unavailable: {reason}\nCheck the URL and your internet connection.")]
    SourceUnavailable { url: String, reason: String },

    /// No progressive stream matches the requested resolution label.
    #[error("No progressive stream available for resolution '{resolution}' (available: {available})")]
    NoMatchingStream {
        resolution: String,
        available: String,
    },

    // ── Sampling errors ───────────────────────────────────────────────────
    /// The video file could not be probed or reports a zero frame rate.
    #[error("Video '{path}' is not usable: {detail}")]
    InvalidVideo { path: PathBuf, detail: String },

    /// Decoding failed part-way through the stream.
    #[error("Decoding '{path}' failed after {frames} frames: {detail}")]
    Decode {
        path: PathBuf,
        frames: u64,
        detail: String,
    },

    /// A sampled frame could not be written as an image.
    #[error("Failed to write frame '{path}': {detail}")]
    FrameWrite { path: PathBuf, detail: String },

    // ── Composition errors ────────────────────────────────────────────────
    /// The frame directory contains no images to compose.
    #[error("No frames found in '{dir}'\nThe video may be shorter than the sampling interval.")]
    EmptySampleSet { dir: PathBuf },

    /// Layout or writing of the output document failed.
    #[error("Failed to compose '{path}': {detail}")]
    Compose { path: PathBuf, detail: String },

    /// Could not create or move the output file into place.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF output needs the pdfium shared library. You can:\n\
  • Install libpdfium system-wide (e.g. from bblanchon/pdfium-binaries).\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Use --format pptx, which needs no native library.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure to remove a working directory.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("Could not remove working directory '{path}': {detail}")]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_stream_display() {
        let e = Video2PdfError::NoMatchingStream {
            resolution: "1440p".into(),
            available: "360p, 720p".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("1440p"), "got: {msg}");
        assert!(msg.contains("360p, 720p"), "got: {msg}");
    }

    #[test]
    fn decode_display_mentions_frame_count() {
        let e = Video2PdfError::Decode {
            path: PathBuf::from("clip.mp4"),
            frames: 42,
            detail: "truncated frame".into(),
        };
        assert!(e.to_string().contains("42 frames"));
        assert!(e.to_string().contains("clip.mp4"));
    }

    #[test]
    fn empty_sample_set_display() {
        let e = Video2PdfError::EmptySampleSet {
            dir: PathBuf::from("frames"),
        };
        assert!(e.to_string().contains("frames"));
    }

    #[test]
    fn cleanup_warning_display_and_serde() {
        let w = CleanupWarning {
            path: PathBuf::from("downloads"),
            detail: "permission denied".into(),
        };
        assert!(w.to_string().contains("downloads"));
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("permission denied"));
    }
}
