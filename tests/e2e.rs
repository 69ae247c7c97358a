//! End-to-end integration tests for edgequake-video2pdf.
//!
//! These tests generate synthetic videos with `ffmpeg -f lavfi testsrc` and
//! run the full pipeline on them as local files, so no network access is
//! needed. They do need `ffmpeg`, `ffprobe` and the pdfium library, and are
//! gated behind the `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/lib cargo test --test e2e -- --nocapture

use edgequake_video2pdf::pipeline::compose::bind_pdfium;
use edgequake_video2pdf::{
    convert, inspect, Cadence, ConversionConfig, Inspection, OutputFormat,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set and ffmpeg can be started.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if Command::new("ffmpeg").arg("-version").output().is_err() {
            println!("SKIP — ffmpeg not found on PATH");
            return;
        }
    }};
}

/// Write a `seconds`-long 1280×720 @ 30 fps test pattern to `dir`.
fn synthetic_video(dir: &Path, seconds: u32) -> PathBuf {
    let path = dir.join(format!("testsrc_{seconds}s.mp4"));
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-f", "lavfi", "-i"])
        .arg("testsrc=size=1280x720:rate=30")
        .args(["-t", &seconds.to_string()])
        .args(["-c:v", "mpeg4", "-q:v", "5", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .expect("ffmpeg should start");
    assert!(status.success(), "ffmpeg failed to generate {}", path.display());
    path
}

fn config(work: &Path, output: &Path, cadence: Cadence, format: OutputFormat) -> ConversionConfig {
    ConversionConfig::builder()
        .work_root(work)
        .output_path(output)
        .cadence(cadence)
        .format(format)
        .build()
        .expect("valid config")
}

/// Page count and the size of every page, in points.
fn pdf_pages(path: &Path) -> Vec<(f32, f32)> {
    let pdfium = bind_pdfium().expect("pdfium should bind");
    let doc = pdfium
        .load_pdf_from_file(path, None)
        .expect("output should be a readable PDF");
    doc.pages()
        .iter()
        .map(|p| (p.width().value, p.height().value))
        .collect()
}

fn slide_count(path: &Path) -> usize {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).expect("output should be a zip package");
    let mut presentation = String::new();
    archive
        .by_name("ppt/presentation.xml")
        .unwrap()
        .read_to_string(&mut presentation)
        .unwrap();
    presentation.matches("<p:sldId ").count()
}

fn leftover_run_dirs(work: &Path) -> usize {
    std::fs::read_dir(work)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".video2pdf-run-"))
        .count()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_local_video() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let video = synthetic_video(dir.path(), 2);

    let found = inspect(video.to_str().unwrap(), &ConversionConfig::default())
        .await
        .expect("inspect() should succeed");
    match found {
        Inspection::Local { video, .. } => {
            assert_eq!((video.width, video.height), (1280, 720));
            assert!((video.native_frame_rate - 30.0).abs() < 0.01);
            assert_eq!(video.total_frames, 60);
        }
        other => panic!("expected a local probe, got {other:?}"),
    }
}

#[tokio::test]
async fn test_one_frame_per_second_makes_thirty_pages() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let video = synthetic_video(dir.path(), 30);
    let out = dir.path().join("output.pdf");

    let cfg = config(
        dir.path(),
        &out,
        Cadence::FixedRate { fps: 1.0 },
        OutputFormat::Pdf,
    );
    let output = convert(video.to_str().unwrap(), &cfg)
        .await
        .expect("conversion should succeed");

    assert_eq!(output.stats.interval_frames, 30);
    assert_eq!(output.stats.samples, 30);
    assert_eq!(output.stats.pages, 30);
    assert!(output.cleanup_warnings.is_empty());

    let pages = pdf_pages(&out);
    assert_eq!(pages.len(), 30);
    for (w, h) in pages {
        assert!((w - 1280.0).abs() < 0.5 && (h - 720.0).abs() < 0.5, "{w}x{h}");
    }

    assert_eq!(leftover_run_dirs(dir.path()), 0);
    assert!(video.is_file(), "local input is never deleted");
}

#[tokio::test]
async fn test_fifteen_second_interval_on_fifteen_second_video() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let video = synthetic_video(dir.path(), 15);
    let out = dir.path().join("talk.pdf");

    let cfg = config(
        dir.path(),
        &out,
        Cadence::FixedInterval { seconds: 15.0 },
        OutputFormat::Pdf,
    );
    let output = convert(video.to_str().unwrap(), &cfg).await.unwrap();

    // Opening frame plus frame 450.
    assert_eq!(output.stats.pages, 2);
    assert_eq!(pdf_pages(&out).len(), 2);
}

#[tokio::test]
async fn test_slide_deck_mode() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let video = synthetic_video(dir.path(), 15);
    let out = dir.path().join("talk.pptx");

    let cfg = config(
        dir.path(),
        &out,
        Cadence::FixedInterval { seconds: 15.0 },
        OutputFormat::Pptx,
    );
    let output = convert(video.to_str().unwrap(), &cfg).await.unwrap();
    assert_eq!(output.stats.pages, 2);
    assert_eq!(slide_count(&out), 2);

    // Same frames in, same bytes out.
    let first = std::fs::read(&out).unwrap();
    convert(video.to_str().unwrap(), &cfg).await.unwrap();
    assert_eq!(first, std::fs::read(&out).unwrap());
}

#[tokio::test]
async fn test_rerun_rewrites_identical_pdf() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let video = synthetic_video(dir.path(), 5);
    let out = dir.path().join("output.pdf");

    let cfg = config(
        dir.path(),
        &out,
        Cadence::FixedRate { fps: 1.0 },
        OutputFormat::Pdf,
    );
    convert(video.to_str().unwrap(), &cfg).await.unwrap();
    let first = std::fs::read(&out).unwrap();
    assert_eq!(pdf_pages(&out).len(), 5);

    convert(video.to_str().unwrap(), &cfg).await.unwrap();
    assert_eq!(first, std::fs::read(&out).unwrap(), "reruns are byte-identical");
    assert_eq!(leftover_run_dirs(dir.path()), 0);
}
