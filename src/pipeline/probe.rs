//! Video probing: native frame rate, frame count and dimensions via `ffprobe`.
//!
//! The sampler's interval arithmetic depends on the native frame rate, so a
//! missing or zero rate is rejected here as [`Video2PdfError::InvalidVideo`]
//! instead of surfacing later as a division by zero.

use crate::error::Video2PdfError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Metadata read from the video file itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Frames per second as stored in the container.
    pub native_frame_rate: f64,
    /// Total decodable frames (reported or estimated from duration).
    pub total_frames: u64,
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeJson {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe the first video stream of `path`.
pub async fn probe_video(ffprobe: &Path, path: &Path) -> Result<VideoMetadata, Video2PdfError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| Video2PdfError::ToolNotFound {
            tool: "ffprobe".into(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Video2PdfError::InvalidVideo {
            path: path.to_path_buf(),
            detail: format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    let meta = parse_probe_json(&output.stdout, path)?;
    info!(
        "Probed {}: {}x{} @ {:.3} fps, {} frames",
        path.display(),
        meta.width,
        meta.height,
        meta.native_frame_rate,
        meta.total_frames
    );
    Ok(meta)
}

/// Parse `ffprobe -of json` output into [`VideoMetadata`].
pub fn parse_probe_json(bytes: &[u8], path: &Path) -> Result<VideoMetadata, Video2PdfError> {
    let invalid = |detail: String| Video2PdfError::InvalidVideo {
        path: path.to_path_buf(),
        detail,
    };

    let json: ProbeJson = serde_json::from_slice(bytes)
        .map_err(|e| invalid(format!("unreadable probe output: {e}")))?;
    let stream = json
        .streams
        .first()
        .ok_or_else(|| invalid("no video stream".into()))?;

    let rate = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .ok_or_else(|| invalid("frame rate is zero or unreadable".into()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(invalid("frame size is zero or unreadable".into())),
    };

    let duration_secs = stream
        .duration
        .as_deref()
        .or(json.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| (duration_secs * rate).round() as u64);

    debug!(
        "probe: rate={rate} frames={total_frames} duration={duration_secs}s ({})",
        path.display()
    );

    Ok(VideoMetadata {
        native_frame_rate: rate,
        total_frames,
        width,
        height,
        duration_secs,
    })
}

/// Parse an ffprobe rational such as `"30000/1001"` or `"25"`.
/// Returns `None` for zero, `0/0` and anything non-finite.
pub fn parse_rate(s: &str) -> Option<f64> {
    let rate = match s.trim().split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "programs": [],
        "streams": [{
            "width": 1280, "height": 720,
            "r_frame_rate": "30/1", "avg_frame_rate": "30/1",
            "nb_frames": "900", "duration": "30.000000"
        }],
        "format": { "duration": "30.021000" }
    }"#;

    #[test]
    fn parses_rationals() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert_eq!(parse_rate("25"), Some(25.0));
        let ntsc = parse_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("0/1"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn parses_full_probe() {
        let meta = parse_probe_json(SAMPLE.as_bytes(), Path::new("v.mp4")).unwrap();
        assert_eq!(meta.native_frame_rate, 30.0);
        assert_eq!(meta.total_frames, 900);
        assert_eq!((meta.width, meta.height), (1280, 720));
        assert_eq!(meta.duration_secs, 30.0);
    }

    #[test]
    fn estimates_frame_count_from_format_duration() {
        let json = r#"{"streams":[{"width":640,"height":360,
            "r_frame_rate":"25/1","avg_frame_rate":"0/0"}],
            "format":{"duration":"10.0"}}"#;
        let meta = parse_probe_json(json.as_bytes(), Path::new("v.webm")).unwrap();
        assert_eq!(meta.native_frame_rate, 25.0);
        assert_eq!(meta.total_frames, 250);
    }

    #[test]
    fn zero_frame_rate_is_invalid_video() {
        let json = r#"{"streams":[{"width":640,"height":360,
            "r_frame_rate":"0/0","avg_frame_rate":"0/0"}]}"#;
        let err = parse_probe_json(json.as_bytes(), Path::new("v.mp4")).unwrap_err();
        assert!(matches!(err, Video2PdfError::InvalidVideo { .. }), "{err}");
    }

    #[test]
    fn no_video_stream_is_invalid_video() {
        let err = parse_probe_json(br#"{"streams":[]}"#, Path::new("a.m4a")).unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[test]
    fn garbage_is_invalid_video() {
        let err = parse_probe_json(b"not json", Path::new("x")).unwrap_err();
        assert!(matches!(err, Video2PdfError::InvalidVideo { .. }));
    }
}
