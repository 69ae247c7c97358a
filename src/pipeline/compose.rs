//! Paged-document composition: one 1280×720 PDF page per sampled frame.
//!
//! Frames are drawn from (0,0) to the full page size with no letterboxing.
//! Source frames are 16:9 in the common case; frames that are not are
//! either stretched with a warning or rejected when `strict_aspect` is set.
//!
//! pdfium is not async-safe, so [`compose_pdf`] is a blocking function and
//! the caller runs it inside `spawn_blocking`. The document is saved to a
//! temporary sibling of the output path and renamed into place, so a failed
//! run never leaves a half-written file behind.
//!
//! pdfium stamps a creation date into the Info dictionary and a random file
//! identifier into the trailer. Both are overwritten in place with fixed
//! values of the same length before the file is written, so composing the
//! same frames twice gives byte-identical PDFs and the xref offsets stay valid.

use crate::config::{PAGE_HEIGHT, PAGE_WIDTH};
use crate::error::Video2PdfError;
use crate::progress::{ProgressCallback, Stage};
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::bytes::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Maximum relative difference between frame and page aspect ratios.
const ASPECT_TOLERANCE: f32 = 0.01;

/// Extension of the images the sampler writes.
const FRAME_EXTENSION: &str = "png";

/// Replacement for the `YYYYMMDDHHmmSS` part of document dates.
const PINNED_DATE: &[u8; 14] = b"19800101000000";

static PDF_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)/(?:CreationDate|ModDate)\s*\(D:([0-9]{14})").expect("valid regex")
});

/// `/ID [<hex> <hex>]` or `/ID [(lit) (lit)]` in the trailer.
static PDF_FILE_ID: Lazy<Regex> = Lazy::new(|| {
    let string = r"(?:<([0-9A-Fa-f]*)>|\(((?:\\.|[^\\)])*)\))";
    Regex::new(&format!(r"(?s-u)/ID\s*\[\s*{string}\s*{string}\s*\]")).expect("valid regex")
});

/// List the sampled frames in `dir`, sorted by file name.
///
/// Fails with [`Video2PdfError::EmptySampleSet`] when there is nothing to
/// compose, so an upstream problem surfaces here rather than as an empty
/// document.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, Video2PdfError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Video2PdfError::EmptySampleSet {
                dir: dir.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(Video2PdfError::Compose {
                path: dir.to_path_buf(),
                detail: format!("cannot read frame directory: {e}"),
            })
        }
    };

    let mut frames: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(FRAME_EXTENSION))
        })
        .collect();

    if frames.is_empty() {
        return Err(Video2PdfError::EmptySampleSet {
            dir: dir.to_path_buf(),
        });
    }

    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} frames in {}", frames.len(), dir.display());
    Ok(frames)
}

/// Check that a `width`×`height` frame fits the page without distortion.
pub fn matches_page_aspect(width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    let frame = width as f32 / height as f32;
    let page = PAGE_WIDTH / PAGE_HEIGHT;
    ((frame - page) / page).abs() <= ASPECT_TOLERANCE
}

/// Temporary path next to `output` used while the document is written.
pub(crate) fn temp_output_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    output.with_file_name(format!(".{name}.tmp"))
}

/// Move a finished temporary file over `output`.
pub(crate) fn commit_output(tmp: &Path, output: &Path) -> Result<(), Video2PdfError> {
    std::fs::rename(tmp, output).map_err(|e| {
        let _ = std::fs::remove_file(tmp);
        Video2PdfError::OutputWriteFailed {
            path: output.to_path_buf(),
            source: e,
        }
    })
}

/// Create the parent directory of `output` if it has one.
pub(crate) fn ensure_parent(output: &Path) -> Result<(), Video2PdfError> {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| Video2PdfError::OutputWriteFailed {
                path: output.to_path_buf(),
                source: e,
            }),
        _ => Ok(()),
    }
}

/// Bind to the pdfium shared library.
///
/// `PDFIUM_LIB_PATH` may name the library file or the directory holding it;
/// otherwise the system library search path is used.
pub fn bind_pdfium() -> Result<Pdfium, Video2PdfError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(path) => {
            let path = PathBuf::from(path);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| Video2PdfError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Write `frames` to `output` as a PDF, one full-page image per frame.
///
/// Returns the number of pages written.
pub fn compose_pdf(
    frames: &[PathBuf],
    output: &Path,
    strict_aspect: bool,
    progress: Option<&ProgressCallback>,
) -> Result<usize, Video2PdfError> {
    if frames.is_empty() {
        let dir = output.parent().unwrap_or(Path::new(".")).to_path_buf();
        return Err(Video2PdfError::EmptySampleSet { dir });
    }

    let pdfium = bind_pdfium()?;
    ensure_parent(output)?;
    let tmp = temp_output_path(output);

    let result = write_pdf(&pdfium, frames, &tmp, strict_aspect, progress);
    match result {
        Ok(pages) => {
            commit_output(&tmp, output)?;
            info!("PDF saved as {} ({} pages)", output.display(), pages);
            Ok(pages)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn write_pdf(
    pdfium: &Pdfium,
    frames: &[PathBuf],
    tmp: &Path,
    strict_aspect: bool,
    progress: Option<&ProgressCallback>,
) -> Result<usize, Video2PdfError> {
    let compose_err = |path: &Path, detail: String| Video2PdfError::Compose {
        path: path.to_path_buf(),
        detail,
    };

    let mut document = pdfium
        .create_new_pdf()
        .map_err(|e| compose_err(tmp, format!("cannot create document: {e:?}")))?;

    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Compose, frames.len());
        cb.on_progress(Stage::Compose, 0);
    }

    let width = PdfPoints::new(PAGE_WIDTH);
    let height = PdfPoints::new(PAGE_HEIGHT);

    for (i, frame) in frames.iter().enumerate() {
        let image = image::open(frame)
            .map_err(|e| compose_err(frame, format!("cannot read image: {e}")))?;

        if !matches_page_aspect(image.width(), image.height()) {
            let detail = format!(
                "frame is {}x{}, page is {}x{}",
                image.width(),
                image.height(),
                PAGE_WIDTH,
                PAGE_HEIGHT
            );
            if strict_aspect {
                return Err(compose_err(frame, detail));
            }
            warn!("Stretching {}: {}", frame.display(), detail);
        }

        {
            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(width, height))
                .map_err(|e| compose_err(frame, format!("cannot add page: {e:?}")))?;
            page.objects_mut()
                .create_image_object(
                    PdfPoints::ZERO,
                    PdfPoints::ZERO,
                    &image,
                    Some(width),
                    Some(height),
                )
                .map_err(|e| compose_err(frame, format!("cannot place image: {e:?}")))?;
        }
        debug!("page {} ← {}", i + 1, frame.display());

        if let Some(cb) = progress {
            cb.on_progress(Stage::Compose, i + 1);
        }
    }

    let mut bytes = document
        .save_to_bytes()
        .map_err(|e| compose_err(tmp, format!("cannot save document: {e:?}")))?;
    pin_volatile_metadata(&mut bytes);
    std::fs::write(tmp, &bytes).map_err(|e| Video2PdfError::OutputWriteFailed {
        path: tmp.to_path_buf(),
        source: e,
    })?;

    Ok(frames.len())
}

/// Overwrite document dates and the trailer file identifier with fixed
/// values. Lengths never change.
pub(crate) fn pin_volatile_metadata(pdf: &mut [u8]) {
    let dates: Vec<Range<usize>> = PDF_DATE
        .captures_iter(pdf)
        .filter_map(|c| c.get(1).map(|m| m.range()))
        .collect();
    let ids: Vec<Range<usize>> = PDF_FILE_ID
        .captures_iter(pdf)
        .flat_map(|c| (1..=4).filter_map(move |i| c.get(i).map(|m| m.range())))
        .collect();

    for range in dates {
        pdf[range].copy_from_slice(PINNED_DATE);
    }
    for range in ids {
        pdf[range].fill(b'0');
    }
}
