//! Sequential frame decoding through an `ffmpeg` child process.
//!
//! `ffmpeg` writes raw `rgb24` frames to its stdout; each frame is exactly
//! `width * height * 3` bytes, so frames are read with fixed-size reads and
//! no container parsing happens in-process. Decoding is strictly start to
//! end with no seeking.
//!
//! `ffmpeg` runs with `-loglevel error -xerror`, so anything it prints is an
//! error: a stream that ends with stderr output fails with
//! [`Video2PdfError::Decode`] even when the exit status is zero.
//!
//! The child process is a scoped resource: [`FfmpegDecoder`] kills and reaps
//! it on drop, so an early return from the sampler never leaks a process or
//! its pipes.

use crate::error::Video2PdfError;
use crate::pipeline::probe::VideoMetadata;
use image::RgbImage;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Lines of ffmpeg stderr kept for error messages.
const STDERR_TAIL: usize = 20;

/// A source of decoded frames in presentation order.
pub trait FrameSource {
    /// Metadata of the stream being decoded.
    fn metadata(&self) -> &VideoMetadata;

    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, Video2PdfError>;
}

/// Decodes a video file by piping raw RGB frames out of `ffmpeg`.
pub struct FfmpegDecoder {
    path: PathBuf,
    meta: VideoMetadata,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_tail: Arc<Mutex<Vec<String>>>,
    stderr_handle: Option<JoinHandle<()>>,
    frame_len: usize,
    frames_read: u64,
    finished: bool,
}

impl FfmpegDecoder {
    /// Spawn `ffmpeg` for `path`. `meta` must come from probing the same file.
    pub fn open(ffmpeg: &Path, path: &Path, meta: VideoMetadata) -> Result<Self, Video2PdfError> {
        let mut child = Command::new(ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-xerror", "-nostdin"])
            .args(["-noautorotate", "-i"])
            .arg(path)
            .args([
                "-map", "0:v:0", "-vsync", "passthrough", "-f", "rawvideo", "-pix_fmt", "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Video2PdfError::ToolNotFound {
                tool: "ffmpeg".into(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| Video2PdfError::Decode {
            path: path.to_path_buf(),
            frames: 0,
            detail: "ffmpeg stdout not available".into(),
        })?;

        let stderr_tail = Arc::new(Mutex::new(Vec::new()));
        let stderr_handle = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&stderr_tail);
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    debug!("[ffmpeg] {line}");
                    if let Ok(mut tail) = tail.lock() {
                        if tail.len() == STDERR_TAIL {
                            tail.remove(0);
                        }
                        tail.push(line);
                    }
                }
            })
        });

        let frame_len = meta.width as usize * meta.height as usize * 3;
        debug!(
            "ffmpeg decoder started for {} ({} bytes/frame)",
            path.display(),
            frame_len
        );

        Ok(Self {
            path: path.to_path_buf(),
            meta,
            child,
            stdout: BufReader::new(stdout),
            stderr_tail,
            stderr_handle,
            frame_len,
            frames_read: 0,
            finished: false,
        })
    }

    fn decode_error(&self, detail: String) -> Video2PdfError {
        let tail = self
            .stderr_tail
            .lock()
            .map(|t| t.join("\n"))
            .unwrap_or_default();
        let detail = if tail.is_empty() {
            detail
        } else {
            format!("{detail}\n{tail}")
        };
        Video2PdfError::Decode {
            path: self.path.clone(),
            frames: self.frames_read,
            detail,
        }
    }

    /// Fill `buf` completely. Returns `false` on a clean end of stream
    /// (no bytes at all); a partial frame is an error.
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<bool, Video2PdfError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.decode_error(format!("read failed: {e}"))),
            }
        }
        match filled {
            0 => Ok(false),
            n if n == buf.len() => Ok(true),
            n => Err(self.decode_error(format!(
                "truncated frame ({n} of {} bytes)",
                buf.len()
            ))),
        }
    }

    /// Reap the child once stdout is exhausted and check its exit status.
    fn finish(&mut self) -> Result<(), Video2PdfError> {
        self.finished = true;
        let status = self
            .child
            .wait()
            .map_err(|e| self.decode_error(format!("wait failed: {e}")))?;
        if let Some(handle) = self.stderr_handle.take() {
            let _ = handle.join();
        }
        if !status.success() {
            return Err(self.decode_error(format!("ffmpeg exited with {status}")));
        }
        let reported = self.stderr_tail.lock().map(|t| !t.is_empty()).unwrap_or(false);
        if reported {
            return Err(self.decode_error("ffmpeg reported decoding errors".into()));
        }
        debug!("ffmpeg finished after {} frames", self.frames_read);
        Ok(())
    }
}

impl FrameSource for FfmpegDecoder {
    fn metadata(&self) -> &VideoMetadata {
        &self.meta
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, Video2PdfError> {
        if self.finished {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.frame_len];
        if !self.read_frame(&mut buf)? {
            self.finish()?;
            return Ok(None);
        }
        self.frames_read += 1;
        let frame = RgbImage::from_raw(self.meta.width, self.meta.height, buf)
            .ok_or_else(|| self.decode_error("frame buffer size mismatch".into()))?;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.child.kill() {
            if e.kind() != ErrorKind::InvalidInput {
                warn!("Failed to stop ffmpeg for {}: {e}", self.path.display());
            }
        }
        let _ = self.child.wait();
        if let Some(handle) = self.stderr_handle.take() {
            let _ = handle.join();
        }
    }
}
