//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to observe
//! the pipeline while it runs. The core only ever does two things with a
//! progress sink: set the maximum for a stage ([`on_stage_start`]) and set
//! the current count ([`on_progress`]). Everything else is informational.
//!
//! The sampler and composer run on a blocking thread, so implementations
//! must be `Send + Sync`; a UI forwards the values to its own thread.
//!
//! # Example
//!
//! ```rust
//! use edgequake_video2pdf::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter {
//!     current: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for Counter {
//!     fn on_progress(&self, _stage: Stage, current: usize) {
//!         self.current.store(current, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Counter { current: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```
//!
//! [`on_stage_start`]: ConversionProgressCallback::on_stage_start
//! [`on_progress`]: ConversionProgressCallback::on_progress

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Acquire,
    Sample,
    Compose,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Acquire => "Downloading",
            Stage::Sample => "Sampling",
            Stage::Compose => "Composing",
            Stage::Cleanup => "Cleaning up",
        };
        f.write_str(s)
    }
}

/// Called by the conversion pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// A stage begins. `maximum` is the number of units it expects to emit
    /// (frames for [`Stage::Sample`], pages or slides for [`Stage::Compose`]).
    /// For [`Stage::Acquire`] and [`Stage::Cleanup`] it is `0`.
    fn on_stage_start(&self, stage: Stage, maximum: usize) {
        let _ = (stage, maximum);
    }

    /// Cumulative count of units completed in `stage`. Monotonic per stage;
    /// `0` is published right after [`on_stage_start`](Self::on_stage_start).
    fn on_progress(&self, stage: Stage, current: usize) {
        let _ = (stage, current);
    }

    /// Bytes written so far while downloading the video.
    fn on_download_progress(&self, downloaded: u64, total: Option<u64>) {
        let _ = (downloaded, total);
    }

    /// A stage finished successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// The output document has been written.
    fn on_conversion_complete(&self, output: &Path) {
        let _ = output;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
