//! HTTP front end: a one-page form that turns a video URL into a download.
//!
//! Routes:
//!   GET  /            — HTML form
//!   POST /convert     — form fields `video_url`, `resolution`, `interval`
//!                       (or `fps`), `format`; responds with the document
//!   GET  /api/health  — liveness probe
//!
//! Conversions are bounded by a semaphore. Every run works in its own
//! directory, so more than one permit is safe.

use crate::config::{Cadence, ConversionConfig, OutputFormat, Quality};
use crate::convert::convert_with;
use crate::error::Video2PdfError;
use crate::pipeline::acquire::{is_url, sanitize_file_stem, VideoSource, YtDlpSource};
use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Video to PDF</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 36rem; margin: 3rem auto; padding: 0 1rem; }
label { display: block; margin-top: 1rem; }
input, select { width: 100%; padding: .4rem; }
button { margin-top: 1.5rem; padding: .6rem 1.2rem; }
</style>
</head>
<body>
<h1>Video to PDF</h1>
<form action="/convert" method="post">
  <label>Video URL <input type="url" name="video_url" required></label>
  <label>Resolution
    <select name="resolution">
      <option value="highest">Highest</option>
      <option value="1080p">1080p</option>
      <option value="720p">720p</option>
      <option value="480p">480p</option>
      <option value="360p">360p</option>
    </select>
  </label>
  <label>Seconds between frames <input type="number" name="interval" value="15" min="0.1" step="0.1"></label>
  <label>Format
    <select name="format">
      <option value="pdf">PDF</option>
      <option value="pptx">PowerPoint</option>
    </select>
  </label>
  <button type="submit">Convert</button>
</form>
</body>
</html>
"#;

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    /// Template for every run; per-request fields override it.
    pub base: ConversionConfig,
    pub source: Arc<dyn VideoSource>,
    pub jobs: Arc<Semaphore>,
}

impl AppState {
    /// State backed by `yt-dlp`, allowing `max_jobs` concurrent conversions.
    pub fn new(base: ConversionConfig, max_jobs: usize) -> Self {
        let source = YtDlpSource::new(&base.ytdlp_path, base.download_timeout_secs);
        Self::with_source(base, Arc::new(source), max_jobs)
    }

    pub fn with_source(
        base: ConversionConfig,
        source: Arc<dyn VideoSource>,
        max_jobs: usize,
    ) -> Self {
        Self {
            base,
            source,
            jobs: Arc::new(Semaphore::new(max_jobs.max(1))),
        }
    }
}

/// Fields of `POST /convert`. Everything is optional so that missing
/// fields produce a readable 400 instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertForm {
    #[serde(default)]
    pub video_url: String,
    pub resolution: Option<String>,
    /// Seconds between sampled frames.
    pub interval: Option<String>,
    /// Older name of `interval`.
    pub fps: Option<String>,
    pub format: Option<String>,
}

impl ConvertForm {
    /// Apply the form to `base`. Any invalid field is `InvalidConfig`.
    pub fn to_config(&self, base: &ConversionConfig) -> Result<ConversionConfig, Video2PdfError> {
        let quality: Quality = match self.resolution.as_deref().map(str::trim) {
            None | Some("") => Quality::Highest,
            Some(r) => r.parse()?,
        };

        let seconds = match self
            .interval
            .as_deref()
            .or(self.fps.as_deref())
            .map(str::trim)
        {
            None | Some("") => 1.0,
            Some(s) => s.parse::<f64>().map_err(|_| {
                Video2PdfError::InvalidConfig(format!("interval '{s}' is not a number"))
            })?,
        };

        let format: OutputFormat = match self.format.as_deref().map(str::trim) {
            None | Some("") => OutputFormat::Pdf,
            Some(f) => f.parse()?,
        };

        let mut builder = ConversionConfig::builder()
            .quality(quality)
            .cadence(Cadence::FixedInterval { seconds })
            .format(format)
            .work_root(&base.work_root)
            .keep_intermediates(base.keep_intermediates)
            .strict_aspect(base.strict_aspect)
            .download_timeout_secs(base.download_timeout_secs)
            .ffmpeg_path(&base.ffmpeg_path)
            .ffprobe_path(&base.ffprobe_path)
            .ytdlp_path(&base.ytdlp_path);
        if let Some(cb) = &base.progress_callback {
            builder = builder.progress_callback(Arc::clone(cb));
        }
        builder.build()
    }
}

/// HTTP status for a failed conversion.
pub fn status_for(err: &Video2PdfError) -> StatusCode {
    match err {
        Video2PdfError::InvalidInput { .. } | Video2PdfError::InvalidConfig(_) => {
            StatusCode::BAD_REQUEST
        }
        Video2PdfError::NoMatchingStream { .. } => StatusCode::NOT_FOUND,
        Video2PdfError::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
        Video2PdfError::InvalidVideo { .. }
        | Video2PdfError::Decode { .. }
        | Video2PdfError::EmptySampleSet { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &Video2PdfError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!("Conversion failed: {err}");
    } else {
        warn!("Conversion rejected: {err}");
    }
    (status, format!("An error occurred: {err}")).into_response()
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/convert", post(convert_document))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("video2pdf server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// POST /convert — run one conversion and return the document.
pub async fn convert_document(
    State(state): State<AppState>,
    Form(form): Form<ConvertForm>,
) -> Response {
    let url = form.video_url.trim().to_string();
    if url.is_empty() {
        return (StatusCode::BAD_REQUEST, "Please provide a video URL").into_response();
    }
    if !is_url(&url) {
        return (StatusCode::BAD_REQUEST, "The video URL must start with http:// or https://")
            .into_response();
    }

    let mut config = match form.to_config(&state.base) {
        Ok(config) => config,
        Err(e) => return error_response(&e),
    };

    // The document lives in its own directory until it has been read back.
    let out_dir = match tempfile::Builder::new()
        .prefix(".video2pdf-out-")
        .tempdir_in(&config.work_root)
    {
        Ok(dir) => dir,
        Err(e) => {
            return error_response(&Video2PdfError::OutputWriteFailed {
                path: config.work_root.clone(),
                source: e,
            })
        }
    };
    config.output_path = Some(out_dir.path().join(config.format.default_file_name()));

    let _permit = match state.jobs.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            return error_response(&Video2PdfError::Internal("server is shutting down".into()))
        }
    };

    let output = match convert_with(state.source.as_ref(), &url, &config).await {
        Ok(output) => output,
        Err(e) => return error_response(&e),
    };

    let bytes = match tokio::fs::read(&output.output_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(&Video2PdfError::OutputWriteFailed {
                path: output.output_path.clone(),
                source: e,
            })
        }
    };

    let filename = format!(
        "{}.{}",
        sanitize_file_stem(&output.title),
        output.format.extension()
    );
    info!(
        "Serving {} ({} pages, {} bytes)",
        filename,
        output.stats.pages,
        bytes.len()
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, output.format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        ],
        bytes,
    )
        .into_response()
}
