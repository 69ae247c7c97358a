//! Conversion entry points.
//!
//! A run is four stages in a fixed order: acquire the video, sample frames
//! from it, compose the frames into one document, and remove the working
//! directories. Stages never overlap. Decoding and composition are blocking
//! work and run inside `spawn_blocking`; acquisition is async I/O.
//!
//! Cleanup runs whether composition succeeded or not, and also when the
//! returned future is dropped mid-run. Its failures are reported as
//! [`crate::error::CleanupWarning`]s and never replace the error that ended
//! the run.

use crate::config::{ConversionConfig, OutputFormat};
use crate::error::{CleanupWarning, Video2PdfError};
use crate::output::{ConversionOutput, ConversionStats, Inspection};
use crate::pipeline::acquire::{self, is_url, VideoSource, YtDlpSource};
use crate::pipeline::cleanup::{RunGuard, WorkDirs};
use crate::pipeline::decode::{FfmpegDecoder, FrameSource};
use crate::pipeline::probe;
use crate::pipeline::sample::{self, SampleSet};
use crate::pipeline::{compose, deck};
use crate::progress::{ProgressCallback, Stage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a video URL or local video file into a PDF or PPTX document.
///
/// Remote inputs are fetched through `yt-dlp` (see
/// [`acquire::YtDlpSource`]). Use [`convert_with`] to plug in another
/// [`VideoSource`].
///
/// # Errors
/// Any stage failure ends the run with `Err`; no document is written in
/// that case, and the working directories are still removed.
pub async fn convert(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Video2PdfError> {
    let source = YtDlpSource::new(&config.ytdlp_path, config.download_timeout_secs);
    convert_with(&source, input, config).await
}

/// Like [`convert`], with an explicit acquisition backend.
pub async fn convert_with<S: VideoSource + ?Sized>(
    source: &S,
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Video2PdfError> {
    let total_start = Instant::now();
    let input = input.as_ref().trim();
    info!("Starting conversion: {}", input);

    let local = resolve_local(input)?;
    let run = Arc::new(RunGuard::new(
        WorkDirs::create(&config.work_root)?,
        config.keep_intermediates,
    ));
    let dirs = run.dirs();
    let cb = config.progress_callback.as_ref();

    let result = async {
        // ── Step 1: Acquire ──────────────────────────────────────────────
        let acquire_start = Instant::now();
        let (video_path, title, stream) = match local {
            Some(path) => {
                let title = file_title(&path);
                (path, title, None)
            }
            None => {
                if let Some(cb) = cb {
                    cb.on_stage_start(Stage::Acquire, 0);
                }
                let video =
                    acquire::acquire(source, input, &config.quality, &dirs.downloads, cb).await?;
                if let Some(cb) = cb {
                    cb.on_stage_complete(Stage::Acquire);
                }
                (video.path, video.title, Some(video.stream))
            }
        };
        let acquire_duration_ms = acquire_start.elapsed().as_millis() as u64;

        // ── Step 2: Probe ────────────────────────────────────────────────
        let video = probe::probe_video(&config.ffprobe_path, &video_path).await?;

        // ── Step 3–4: Sample + compose ───────────────────────────────────
        let ffmpeg = config.ffmpeg_path.clone();
        let meta = video.clone();
        let opener = move || -> Result<Box<dyn FrameSource + Send>, Video2PdfError> {
            Ok(Box::new(FfmpegDecoder::open(&ffmpeg, &video_path, meta)?))
        };
        let staged = sample_and_compose(opener, config, &run).await?;

        Ok::<_, Video2PdfError>(ConversionOutput {
            output_path: staged.output_path,
            format: config.format,
            title,
            stream,
            video,
            stats: ConversionStats {
                interval_frames: staged.samples.interval_frames,
                frames_decoded: staged.samples.frames_decoded,
                samples: staged.samples.files.len(),
                pages: staged.pages,
                acquire_duration_ms,
                sample_duration_ms: staged.sample_duration_ms,
                compose_duration_ms: staged.compose_duration_ms,
                total_duration_ms: 0,
            },
            cleanup_warnings: Vec::new(),
        })
    }
    .await;

    // ── Step 5: Cleanup (always) ─────────────────────────────────────────
    let warnings = finish(&run, config);

    let mut output = result?;
    output.cleanup_warnings = warnings;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete: {} with {} pages, {}ms total",
        output.output_path.display(),
        output.stats.pages,
        output.stats.total_duration_ms
    );
    if let Some(cb) = cb {
        cb.on_conversion_complete(&output.output_path);
    }
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Video2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Video2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// List the streams of a URL, or probe a local file, without converting.
pub async fn inspect(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<Inspection, Video2PdfError> {
    let source = YtDlpSource::new(&config.ytdlp_path, config.download_timeout_secs);
    inspect_with(&source, input, config).await
}

/// Like [`inspect`], with an explicit acquisition backend.
pub async fn inspect_with<S: VideoSource + ?Sized>(
    source: &S,
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<Inspection, Video2PdfError> {
    let input = input.as_ref().trim();
    match resolve_local(input)? {
        Some(path) => {
            let video = probe::probe_video(&config.ffprobe_path, &path).await?;
            Ok(Inspection::Local { path, video })
        }
        None => {
            let listing = source.list_streams(input).await?;
            Ok(Inspection::Remote {
                url: input.to_string(),
                listing,
            })
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// `Ok(None)` for a URL, `Ok(Some(path))` for an existing local file.
fn resolve_local(input: &str) -> Result<Option<PathBuf>, Video2PdfError> {
    if is_url(input) {
        return Ok(None);
    }
    let path = PathBuf::from(input);
    if input.is_empty() || !path.is_file() {
        return Err(Video2PdfError::InvalidInput {
            input: input.to_string(),
        });
    }
    debug!("Resolved local video: {}", path.display());
    Ok(Some(path))
}

fn file_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// Remove the working directories unless asked to keep them.
fn finish(run: &RunGuard, config: &ConversionConfig) -> Vec<CleanupWarning> {
    if config.keep_intermediates {
        info!("Keeping intermediates in {}", run.dirs().root.display());
        return Vec::new();
    }
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_stage_start(Stage::Cleanup, 0);
    }
    let warnings = run.cleanup_now();
    if let Some(cb) = cb {
        cb.on_stage_complete(Stage::Cleanup);
    }
    warnings
}

/// Result of the blocking half of a run.
pub(crate) struct Staged {
    pub samples: SampleSet,
    pub output_path: PathBuf,
    pub pages: usize,
    pub sample_duration_ms: u64,
    pub compose_duration_ms: u64,
}

/// Sample frames from the source returned by `open`, then compose them.
///
/// `open` runs on the blocking pool, so the decoder's child process is owned
/// by the thread that drains it. Each blocking task holds a handle on `run`,
/// so a dropped caller does not remove directories still being written.
pub(crate) async fn sample_and_compose<F>(
    open: F,
    config: &ConversionConfig,
    run: &Arc<RunGuard>,
) -> Result<Staged, Video2PdfError>
where
    F: FnOnce() -> Result<Box<dyn FrameSource + Send>, Video2PdfError> + Send + 'static,
{
    let progress = config.progress_callback.clone();

    // ── Sample ───────────────────────────────────────────────────────────
    let sample_start = Instant::now();
    let cadence = config.cadence;
    let frames_dir = run.dirs().frames.clone();
    let cb = progress.clone();
    let held = Arc::clone(run);
    let samples = tokio::task::spawn_blocking(move || {
        let _held = held;
        let mut source = open()?;
        sample::sample_frames(source.as_mut(), &cadence, &frames_dir, cb.as_ref())
    })
    .await
    .map_err(join_error)??;
    if let Some(cb) = &progress {
        cb.on_stage_complete(Stage::Sample);
    }
    let sample_duration_ms = sample_start.elapsed().as_millis() as u64;

    // ── Compose ──────────────────────────────────────────────────────────
    let compose_start = Instant::now();
    let frames = compose::list_frames(&samples.dir)?;
    let output_path = config.resolved_output_path();
    let pages = compose_blocking(
        config.format,
        frames,
        output_path.clone(),
        config.strict_aspect,
        progress.clone(),
        Arc::clone(run),
    )
    .await?;
    if let Some(cb) = &progress {
        cb.on_stage_complete(Stage::Compose);
    }
    let compose_duration_ms = compose_start.elapsed().as_millis() as u64;

    Ok(Staged {
        samples,
        output_path,
        pages,
        sample_duration_ms,
        compose_duration_ms,
    })
}

async fn compose_blocking(
    format: OutputFormat,
    frames: Vec<PathBuf>,
    output: PathBuf,
    strict_aspect: bool,
    progress: Option<ProgressCallback>,
    run: Arc<RunGuard>,
) -> Result<usize, Video2PdfError> {
    tokio::task::spawn_blocking(move || {
        let _held = run;
        let progress = progress.as_ref();
        match format {
            OutputFormat::Pdf => compose::compose_pdf(&frames, &output, strict_aspect, progress),
            OutputFormat::Pptx => deck::compose_deck(&frames, &output, progress),
        }
    })
    .await
    .map_err(join_error)?
}

fn join_error(e: tokio::task::JoinError) -> Video2PdfError {
    Video2PdfError::Internal(format!("blocking task failed: {e}"))
}
