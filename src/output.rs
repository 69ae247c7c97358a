//! Result types returned by a successful conversion.

use crate::config::OutputFormat;
use crate::error::CleanupWarning;
use crate::pipeline::acquire::{SourceListing, StreamInfo};
use crate::pipeline::probe::VideoMetadata;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a caller may want to know about a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Path of the written document.
    pub output_path: PathBuf,
    pub format: OutputFormat,
    /// Title reported by the source, or the local file stem.
    pub title: String,
    /// The stream that was downloaded; `None` for local input.
    pub stream: Option<StreamInfo>,
    pub video: VideoMetadata,
    pub stats: ConversionStats,
    /// Working directories that could not be removed. Never fatal.
    pub cleanup_warnings: Vec<CleanupWarning>,
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Decoded frames between regular samples.
    pub interval_frames: u64,
    pub frames_decoded: u64,
    pub samples: usize,
    /// Pages or slides in the output document.
    pub pages: usize,
    pub acquire_duration_ms: u64,
    pub sample_duration_ms: u64,
    pub compose_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// What [`crate::inspect`] found without converting anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inspection {
    /// Streams offered for a remote URL.
    Remote {
        url: String,
        #[serde(flatten)]
        listing: SourceListing,
    },
    /// Probe result for a local file.
    Local { path: PathBuf, video: VideoMetadata },
}
