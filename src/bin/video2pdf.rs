//! CLI binary for edgequake-video2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_video2pdf::{
    convert, inspect, Cadence, ConversionConfig, ConversionProgressCallback, Inspection,
    OutputFormat, ProgressCallback, Quality, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar that is restyled for each stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    fn count_style(unit: &str) -> ProgressStyle {
        ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>4}}/{{len}} {unit}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }

    fn bytes_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, maximum: usize) {
        let style = match stage {
            Stage::Acquire => Self::bytes_style(),
            Stage::Sample => Self::count_style("images"),
            Stage::Compose => Self::count_style("pages"),
            Stage::Cleanup => Self::spinner_style(),
        };
        self.bar.set_style(style);
        self.bar.set_prefix(stage.to_string());
        self.bar.set_length(maximum as u64);
        self.bar.set_position(0);
        self.bar.reset_eta();
    }

    fn on_progress(&self, _stage: Stage, current: usize) {
        self.bar.set_position(current as u64);
    }

    fn on_download_progress(&self, downloaded: u64, total: Option<u64>) {
        if let Some(t) = total {
            if self.bar.length().unwrap_or(0) != t {
                self.bar.set_length(t);
            }
        }
        self.bar.set_position(downloaded);
    }

    fn on_stage_complete(&self, stage: Stage) {
        let detail = match stage {
            Stage::Sample | Stage::Compose => format!("{}", self.bar.position()),
            _ => String::new(),
        };
        self.bar
            .println(format!("  {} {:<12} {}", green("✓"), stage.to_string(), dim(&detail)));
    }

    fn on_conversion_complete(&self, output: &Path) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", green("✔"), bold(&output.display().to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One frame per second of video, PDF next to you
  video2pdf https://www.youtube.com/watch?v=VIDEO_ID

  # One frame every 15 seconds, 720p source, named output
  video2pdf --interval 15 --resolution 720p https://youtu.be/VIDEO_ID -o talk.pdf

  # Slide deck instead of PDF (format inferred from the extension)
  video2pdf --interval 30 lecture.mp4 -o lecture.pptx

  # List the streams a URL offers (nothing is downloaded)
  video2pdf --inspect-only https://youtu.be/VIDEO_ID

  # Machine-readable result
  video2pdf --json lecture.mp4 > result.json

CADENCE:
  --fps N         N images per second of video; first image after one interval
  --interval S    the opening frame, then one image every S seconds

EXTERNAL TOOLS:
  ffmpeg, ffprobe   required; override with --ffmpeg / --ffprobe
  yt-dlp            required for URLs; override with --yt-dlp
  pdfium            required for PDF output

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory); otherwise the
                    system library search path is used
  RUST_LOG          Log filter, e.g. RUST_LOG=edgequake_video2pdf=debug
  VIDEO2PDF_*       Every flag, e.g. VIDEO2PDF_INTERVAL=15
"#;

/// Sample frames from a video and assemble them into a PDF or slide deck.
#[derive(Parser, Debug)]
#[command(
    name = "video2pdf",
    version,
    about = "Sample frames from a video and assemble them into a PDF or slide deck",
    long_about = "Download a video (or use a local file), keep one frame per chosen interval, \
and lay the frames out as 1280x720 PDF pages or PowerPoint slides.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTTP/HTTPS video URL or local video file.
    input: String,

    /// Output file (default: output.pdf or output.pptx).
    #[arg(short, long, env = "VIDEO2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Stream resolution: highest, or a label such as 720p.
    #[arg(long, env = "VIDEO2PDF_RESOLUTION", default_value = "highest")]
    resolution: String,

    /// Images per second of video.
    #[arg(long, env = "VIDEO2PDF_FPS", conflicts_with = "interval")]
    fps: Option<f64>,

    /// Seconds between images; the opening frame is always kept.
    #[arg(long, env = "VIDEO2PDF_INTERVAL")]
    interval: Option<f64>,

    /// Output format: pdf or pptx. Inferred from --output when omitted.
    #[arg(long, env = "VIDEO2PDF_FORMAT")]
    format: Option<String>,

    /// Leave the downloaded video and sampled frames on disk.
    #[arg(long, env = "VIDEO2PDF_KEEP_INTERMEDIATES")]
    keep_intermediates: bool,

    /// Directory for per-run working directories.
    #[arg(long, env = "VIDEO2PDF_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Fail instead of stretching frames that are not 16:9.
    #[arg(long, env = "VIDEO2PDF_STRICT_ASPECT")]
    strict_aspect: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "VIDEO2PDF_DOWNLOAD_TIMEOUT", default_value_t = 600)]
    download_timeout: u64,

    /// ffmpeg executable.
    #[arg(long, env = "VIDEO2PDF_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable.
    #[arg(long, env = "VIDEO2PDF_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// yt-dlp executable.
    #[arg(long = "yt-dlp", env = "VIDEO2PDF_YT_DLP", default_value = "yt-dlp")]
    ytdlp: PathBuf,

    /// List streams (URL) or probe the file (local), no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print the result as JSON on stdout.
    #[arg(long, env = "VIDEO2PDF_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VIDEO2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VIDEO2PDF_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "VIDEO2PDF_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is on screen.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let found = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect input")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&found).context("Failed to serialise result")?
            );
        } else {
            print_inspection(&found);
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        let s = &output.stats;
        eprintln!(
            "{}  {} {}  from {} frames  {}ms  →  {}",
            green("✔"),
            s.pages,
            if output.format == OutputFormat::Pdf { "pages" } else { "slides" },
            s.frames_decoded,
            s.total_duration_ms,
            bold(&output.output_path.display().to_string()),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "download {}ms  /  sampling {}ms  /  compose {}ms",
                s.acquire_duration_ms, s.sample_duration_ms, s.compose_duration_ms
            ))
        );
    }
    for w in &output.cleanup_warnings {
        eprintln!("{} could not remove {}: {}", yellow("⚠"), w.path.display(), w.detail);
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let quality: Quality = cli.resolution.parse().context("Invalid --resolution")?;

    let cadence = match (cli.fps, cli.interval) {
        (_, Some(seconds)) => Cadence::FixedInterval { seconds },
        (Some(fps), None) => Cadence::FixedRate { fps },
        (None, None) => Cadence::default(),
    };

    let format = match (&cli.format, &cli.output) {
        (Some(f), _) => f.parse().context("Invalid --format")?,
        (None, Some(path)) => OutputFormat::from_path(path).unwrap_or_default(),
        (None, None) => OutputFormat::default(),
    };

    let mut builder = ConversionConfig::builder()
        .quality(quality)
        .cadence(cadence)
        .format(format)
        .work_root(&cli.work_dir)
        .keep_intermediates(cli.keep_intermediates)
        .strict_aspect(cli.strict_aspect)
        .download_timeout_secs(cli.download_timeout)
        .ffmpeg_path(&cli.ffmpeg)
        .ffprobe_path(&cli.ffprobe)
        .ytdlp_path(&cli.ytdlp);

    if let Some(ref path) = cli.output {
        builder = builder.output_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_inspection(found: &Inspection) {
    match found {
        Inspection::Remote { url, listing } => {
            println!("URL:          {}", url);
            println!("Title:        {}", listing.title);
            println!("Streams:");
            for s in &listing.streams {
                let size = s
                    .filesize
                    .map(|b| format!("{:.1} MiB", b as f64 / 1_048_576.0))
                    .unwrap_or_default();
                println!(
                    "  {:<8} {:<7} {:<5} {:<12} {}",
                    s.id,
                    s.label,
                    s.container,
                    if s.progressive {
                        cyan("audio+video")
                    } else {
                        dim("video only")
                    },
                    size
                );
            }
        }
        Inspection::Local { path, video } => {
            println!("File:         {}", path.display());
            println!("Size:         {}x{}", video.width, video.height);
            println!("Frame rate:   {:.3} fps", video.native_frame_rate);
            println!("Frames:       {}", video.total_frames);
            println!("Duration:     {:.1}s", video.duration_secs);
        }
    }
}
