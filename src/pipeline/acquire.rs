//! Acquisition: resolve a source URL plus quality preference to a local file.
//!
//! The remote side is a collaborator behind the [`VideoSource`] trait. It
//! returns an explicit list of [`StreamInfo`] values and the choice of stream
//! is a pure predicate over that list ([`select_stream`]), so the selection
//! rules are testable without a network.
//!
//! The default [`YtDlpSource`] asks `yt-dlp -J` for the stream list and then
//! downloads the chosen stream's direct URL with `reqwest`, streaming to disk.

use crate::config::Quality;
use crate::error::Video2PdfError;
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use futures::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One downloadable stream of a remote video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Source-specific identifier (yt-dlp `format_id`).
    pub id: String,
    /// Resolution label such as `"720p"`.
    pub label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Audio and video in one file.
    pub progressive: bool,
    /// File extension of the container, e.g. `"mp4"`.
    pub container: String,
    /// Direct media URL.
    #[serde(skip_serializing, default)]
    pub url: String,
    /// Headers the host requires for `url`.
    #[serde(skip_serializing, default)]
    pub http_headers: HashMap<String, String>,
    pub filesize: Option<u64>,
    /// Total bitrate in kbit/s.
    pub bitrate: Option<f64>,
}

/// Everything a source knows about a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceListing {
    pub title: String,
    pub streams: Vec<StreamInfo>,
}

/// The local video produced by [`acquire`].
#[derive(Debug, Clone)]
pub struct AcquiredVideo {
    pub path: PathBuf,
    pub title: String,
    pub stream: StreamInfo,
}

/// Remote video-fetch capability.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Enumerate the streams available for `url`.
    async fn list_streams(&self, url: &str) -> Result<SourceListing, Video2PdfError>;

    /// Write `stream` to `dest`. The parent directory already exists.
    async fn fetch(
        &self,
        url: &str,
        stream: &StreamInfo,
        dest: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<(), Video2PdfError>;
}

/// Pick the stream for `quality`.
///
/// * `Highest` — the progressive stream with the greatest height, ties broken
///   by bitrate.
/// * `Resolution(label)` — the first progressive stream whose label equals
///   `label` exactly.
pub fn select_stream<'a>(
    streams: &'a [StreamInfo],
    quality: &Quality,
) -> Result<&'a StreamInfo, Video2PdfError> {
    let mut progressive = streams.iter().filter(|s| s.progressive);
    let selected = match quality {
        Quality::Highest => progressive.max_by(|a, b| {
            a.height
                .unwrap_or(0)
                .cmp(&b.height.unwrap_or(0))
                .then_with(|| {
                    a.bitrate
                        .unwrap_or(0.0)
                        .total_cmp(&b.bitrate.unwrap_or(0.0))
                })
        }),
        Quality::Resolution(label) => progressive.find(|s| &s.label == label),
    };

    selected.ok_or_else(|| Video2PdfError::NoMatchingStream {
        resolution: quality.to_string(),
        available: available_labels(streams),
    })
}

/// Comma-separated, de-duplicated labels of the progressive streams, lowest
/// resolution first.
pub fn available_labels(streams: &[StreamInfo]) -> String {
    let mut progressive: Vec<(u32, &str)> = streams
        .iter()
        .filter(|s| s.progressive)
        .map(|s| (s.height.unwrap_or(0), s.label.as_str()))
        .collect();
    progressive.sort_unstable();
    let mut labels: Vec<&str> = Vec::with_capacity(progressive.len());
    for (_, label) in progressive {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    if labels.is_empty() {
        "none".to_string()
    } else {
        labels.join(", ")
    }
}

/// Download the stream matching `quality` into `dest_dir`.
///
/// Stream selection happens before anything touches the filesystem, so a
/// missing resolution fails with [`Video2PdfError::NoMatchingStream`] and
/// leaves `dest_dir` untouched.
pub async fn acquire<S: VideoSource + ?Sized>(
    source: &S,
    url: &str,
    quality: &Quality,
    dest_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<AcquiredVideo, Video2PdfError> {
    let listing = source.list_streams(url).await?;
    debug!(
        "{} streams for '{}': {}",
        listing.streams.len(),
        listing.title,
        available_labels(&listing.streams)
    );
    let stream = select_stream(&listing.streams, quality)?.clone();
    info!(
        "Selected stream {} ({}, {}) for quality '{}'",
        stream.id, stream.label, stream.container, quality
    );

    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| Video2PdfError::OutputWriteFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

    let path = dest_dir.join(format!(
        "{}.{}",
        sanitize_file_stem(&listing.title),
        stream.container
    ));
    source.fetch(url, &stream, &path, progress).await?;
    info!("Downloaded to: {}", path.display());

    Ok(AcquiredVideo {
        path,
        title: listing.title,
        stream,
    })
}

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-. ]+").expect("valid regex"));

/// Turn a video title into a safe file stem.
pub fn sanitize_file_stem(title: &str) -> String {
    let cleaned = UNSAFE_FILE_CHARS.replace_all(title, "_");
    let cleaned: String = cleaned
        .trim()
        .trim_matches('.')
        .chars()
        .take(100)
        .collect();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

// ── yt-dlp backed source ─────────────────────────────────────────────────

/// [`VideoSource`] backed by the `yt-dlp` executable and `reqwest`.
pub struct YtDlpSource {
    ytdlp: PathBuf,
    timeout_secs: u64,
}

impl YtDlpSource {
    pub fn new(ytdlp: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            ytdlp: ytdlp.into(),
            timeout_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
    #[serde(flatten)]
    top: YtDlpFormat,
}

#[derive(Debug, Default, Deserialize)]
struct YtDlpFormat {
    format_id: Option<String>,
    ext: Option<String>,
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    vcodec: Option<String>,
    acodec: Option<String>,
    protocol: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    tbr: Option<f64>,
    format_note: Option<String>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

impl YtDlpFormat {
    /// Streams we can fetch with a single GET. Segmented protocols are skipped.
    fn into_stream(self) -> Option<StreamInfo> {
        let url = self.url?;
        let protocol = self.protocol.as_deref().unwrap_or("https");
        if !protocol.starts_with("http") || protocol == "http_dash_segments" {
            return None;
        }
        let has = |codec: &Option<String>| codec.as_deref() != Some("none");
        let progressive = has(&self.vcodec) && has(&self.acodec);
        let label = match self.height {
            Some(h) => format!("{h}p"),
            None => self.format_note.unwrap_or_else(|| "unknown".into()),
        };
        Some(StreamInfo {
            id: self.format_id.unwrap_or_else(|| "0".into()),
            label,
            width: self.width,
            height: self.height,
            progressive,
            container: self.ext.unwrap_or_else(|| "mp4".into()),
            url,
            http_headers: self.http_headers,
            filesize: self.filesize.or(self.filesize_approx).map(|b| b as u64),
            bitrate: self.tbr,
        })
    }
}

/// Parse `yt-dlp -J` output.
pub fn parse_ytdlp_json(bytes: &[u8], url: &str) -> Result<SourceListing, Video2PdfError> {
    let info: YtDlpInfo =
        serde_json::from_slice(bytes).map_err(|e| Video2PdfError::SourceUnavailable {
            url: url.to_string(),
            reason: format!("unreadable yt-dlp output: {e}"),
        })?;

    let streams: Vec<StreamInfo> = if info.formats.is_empty() {
        info.top.into_stream().into_iter().collect()
    } else {
        info.formats
            .into_iter()
            .filter_map(YtDlpFormat::into_stream)
            .collect()
    };

    Ok(SourceListing {
        title: info.title.unwrap_or_else(|| "video".into()),
        streams,
    })
}

#[async_trait]
impl VideoSource for YtDlpSource {
    async fn list_streams(&self, url: &str) -> Result<SourceListing, Video2PdfError> {
        info!("Listing streams for: {}", url);
        let output = Command::new(&self.ytdlp)
            .args(["-J", "--no-playlist", "--no-warnings", "--"])
            .arg(url)
            .output()
            .await
            .map_err(|e| Video2PdfError::ToolNotFound {
                tool: "yt-dlp".into(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Video2PdfError::SourceUnavailable {
                url: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_ytdlp_json(&output.stdout, url)
    }

    async fn fetch(
        &self,
        url: &str,
        stream: &StreamInfo,
        dest: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<(), Video2PdfError> {
        let result = download_to(url, stream, dest, self.timeout_secs, progress).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(dest).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial download {}: {e}", dest.display());
                }
            }
        }
        result
    }
}

/// Stream `stream.url` into `dest`, reporting bytes as they arrive.
async fn download_to(
    url: &str,
    stream: &StreamInfo,
    dest: &Path,
    timeout_secs: u64,
    progress: Option<&ProgressCallback>,
) -> Result<(), Video2PdfError> {
    let unavailable = |reason: String| Video2PdfError::SourceUnavailable {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| unavailable(e.to_string()))?;

    let mut request = client.get(&stream.url);
    for (name, value) in &stream.http_headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            unavailable(format!("download timed out after {timeout_secs}s"))
        } else {
            unavailable(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(unavailable(format!("HTTP {}", response.status())));
    }

    let total = response.content_length().or(stream.filesize);
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Video2PdfError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

    let mut downloaded: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                unavailable(format!("download timed out after {timeout_secs}s"))
            } else {
                unavailable(e.to_string())
            }
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Video2PdfError::OutputWriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;
        downloaded += chunk.len() as u64;
        if let Some(cb) = progress {
            cb.on_download_progress(downloaded, total);
        }
    }

    file.flush()
        .await
        .map_err(|e| Video2PdfError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

    debug!("Downloaded {} bytes to {}", downloaded, dest.display());
    Ok(())
}
