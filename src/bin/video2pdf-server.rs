//! HTTP front end for edgequake-video2pdf.
//!
//! Serves the upload form on `/` and returns converted documents from
//! `POST /convert`.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_video2pdf::server::{serve, AppState};
use edgequake_video2pdf::ConversionConfig;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Serve the video-to-PDF form over HTTP.
#[derive(Parser, Debug)]
#[command(name = "video2pdf-server", version)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "VIDEO2PDF_ADDR", default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    /// Conversions allowed to run at the same time.
    #[arg(long, env = "VIDEO2PDF_MAX_JOBS", default_value_t = 1)]
    max_jobs: usize,

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
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let base = ConversionConfig::builder()
        .work_root(&cli.work_dir)
        .strict_aspect(cli.strict_aspect)
        .download_timeout_secs(cli.download_timeout)
        .ffmpeg_path(&cli.ffmpeg)
        .ffprobe_path(&cli.ffprobe)
        .ytdlp_path(&cli.ytdlp)
        .build()
        .context("Invalid configuration")?;

    serve(cli.addr, AppState::new(base, cli.max_jobs))
        .await
        .with_context(|| format!("Server on {} failed", cli.addr))
}
