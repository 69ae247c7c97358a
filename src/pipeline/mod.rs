//! Pipeline stages for video-to-document conversion.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the external capabilities (fetch, decode, layout) can be swapped
//! behind their trait seams.
//!
//! ## Data Flow
//!
//! ```text
//! acquire ──▶ probe ──▶ decode + sample ──▶ compose | deck ──▶ cleanup
//! (yt-dlp)   (ffprobe)  (ffmpeg → PNG)      (pdfium | zip)
//! ```
//!
//! 1. [`acquire`] — resolve URL + quality to a local video file
//! 2. [`probe`]   — read native frame rate, frame count and size
//! 3. [`decode`]  — sequential RGB frames out of an `ffmpeg` child process
//! 4. [`sample`]  — cadence arithmetic; writes `frame_NNNN.png`
//! 5. [`compose`] — PNG sequence → 1280×720 PDF pages
//! 6. [`deck`]    — PNG sequence → PPTX slides
//! 7. [`cleanup`] — per-run working directories, removed at the end

pub mod acquire;
pub mod cleanup;
pub mod compose;
pub mod deck;
pub mod decode;
pub mod probe;
pub mod sample;
