//! Frame sampling: pick frames by cadence and write them as numbered PNGs.
//!
//! The output directory forms the Frame Sample Set: `frame_0000.png`,
//! `frame_0001.png`, … in emission order. Index order, chronological order
//! and lexicographic file-name order are the same thing, which is what the
//! composer relies on when it sorts by name.

use crate::config::Cadence;
use crate::error::Video2PdfError;
use crate::pipeline::decode::FrameSource;
use crate::progress::{ProgressCallback, Stage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Minimum zero-padding of the frame index.
const MIN_INDEX_WIDTH: usize = 4;

/// The frames written by one sampling run.
#[derive(Debug, Clone)]
pub struct SampleSet {
    pub dir: PathBuf,
    /// Written files in emission order.
    pub files: Vec<PathBuf>,
    pub interval_frames: u64,
    pub frames_decoded: u64,
}

/// File name for the sample with 0-based `index`.
pub fn frame_file_name(index: usize, width: usize) -> String {
    format!("frame_{index:0width$}.png")
}

/// Index width that keeps lexicographic order for `expected` samples.
fn index_width(expected: u64) -> usize {
    let digits = expected.saturating_sub(1).max(1).to_string().len();
    digits.max(MIN_INDEX_WIDTH)
}

/// Rename `files` (indices `0..files.len()`) to `width` digits, in place.
///
/// Used when the probed frame count undercounts and the index outgrows its
/// padding, so lexicographic order keeps matching emission order.
fn renumber(files: &mut [PathBuf], width: usize) -> Result<(), Video2PdfError> {
    for (index, path) in files.iter_mut().enumerate() {
        let renamed = path.with_file_name(frame_file_name(index, width));
        std::fs::rename(&*path, &renamed).map_err(|e| Video2PdfError::FrameWrite {
            path: renamed.clone(),
            detail: e.to_string(),
        })?;
        *path = renamed;
    }
    debug!("Widened frame index to {} digits", width);
    Ok(())
}

/// Walk `source` from the first frame to end of stream and write every frame
/// selected by `cadence` into `out_dir`.
///
/// Progress: the expected sample count is published as the maximum of
/// [`Stage::Sample`], the counter is reset to 0, then the running count is
/// published after every written frame.
pub fn sample_frames<S: FrameSource + ?Sized>(
    source: &mut S,
    cadence: &Cadence,
    out_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<SampleSet, Video2PdfError> {
    let meta = source.metadata().clone();
    if !meta.native_frame_rate.is_finite() || meta.native_frame_rate <= 0.0 {
        return Err(Video2PdfError::InvalidVideo {
            path: out_dir.to_path_buf(),
            detail: format!("native frame rate is {}", meta.native_frame_rate),
        });
    }

    let interval = cadence.interval_frames(meta.native_frame_rate);
    let expected = cadence.expected_samples(meta.total_frames, interval);
    let mut width = index_width(expected);
    info!(
        "Sampling every {} frames ({:?}), expecting {} images",
        interval, cadence, expected
    );

    std::fs::create_dir_all(out_dir).map_err(|e| Video2PdfError::FrameWrite {
        path: out_dir.to_path_buf(),
        detail: e.to_string(),
    })?;

    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Sample, expected as usize);
        cb.on_progress(Stage::Sample, 0);
    }

    let mut files = Vec::with_capacity(expected as usize);
    let mut decoded: u64 = 0;

    while let Some(frame) = source.next_frame()? {
        decoded += 1;
        if !cadence.should_emit(decoded, interval) {
            continue;
        }

        if files.len() as u64 >= 10u64.saturating_pow(width as u32) {
            width += 1;
            renumber(&mut files, width)?;
        }
        let path = out_dir.join(frame_file_name(files.len(), width));
        frame
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| Video2PdfError::FrameWrite {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        debug!("frame {} → {}", decoded, path.display());
        files.push(path);

        if let Some(cb) = progress {
            cb.on_progress(Stage::Sample, files.len());
        }
    }

    info!(
        "Sampled {} images from {} decoded frames into {}",
        files.len(),
        decoded,
        out_dir.display()
    );

    Ok(SampleSet {
        dir: out_dir.to_path_buf(),
        files,
        interval_frames: interval,
        frames_decoded: decoded,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::probe::VideoMetadata;
    use crate::progress::tests::RecordingCallback;
    use image::{Rgb, RgbImage};
    use std::sync::Arc;

    /// Synthetic video: every frame is a solid colour encoding its 1-based
    /// position in the red/green channels.
    pub(crate) struct SyntheticVideo {
        meta: VideoMetadata,
        next: u64,
        fail_at: Option<u64>,
    }

    impl SyntheticVideo {
        pub(crate) fn new(rate: f64, total_frames: u64) -> Self {
            Self {
                meta: VideoMetadata {
                    native_frame_rate: rate,
                    total_frames,
                    width: 16,
                    height: 9,
                    duration_secs: total_frames as f64 / rate,
                },
                next: 0,
                fail_at: None,
            }
        }

        fn failing_at(mut self, frame: u64) -> Self {
            self.fail_at = Some(frame);
            self
        }
    }

    impl FrameSource for SyntheticVideo {
        fn metadata(&self) -> &VideoMetadata {
            &self.meta
        }

        fn next_frame(&mut self) -> Result<Option<RgbImage>, Video2PdfError> {
            if self.next >= self.meta.total_frames {
                return Ok(None);
            }
            self.next += 1;
            if self.fail_at == Some(self.next) {
                return Err(Video2PdfError::Decode {
                    path: PathBuf::from("synthetic"),
                    frames: self.next - 1,
                    detail: "corrupt packet".into(),
                });
            }
            let n = self.next;
            Ok(Some(RgbImage::from_pixel(
                16,
                9,
                Rgb([(n >> 8) as u8, (n & 0xff) as u8, 0]),
            )))
        }
    }

    /// Decode the frame position written by [`SyntheticVideo`].
    fn frame_number(path: &Path) -> u64 {
        let img = image::open(path).unwrap().to_rgb8();
        let p = img.get_pixel(0, 0);
        ((p[0] as u64) << 8) | p[1] as u64
    }

    #[test]
    fn fixed_rate_count_and_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = SyntheticVideo::new(30.0, 900);
        let set = sample_frames(
            &mut video,
            &Cadence::FixedRate { fps: 1.0 },
            dir.path(),
            None,
        )
        .unwrap();

        assert_eq!(set.interval_frames, 30);
        assert_eq!(set.frames_decoded, 900);
        assert_eq!(set.files.len(), 30);
        assert_eq!(frame_number(&set.files[0]), 30);
        assert_eq!(frame_number(&set.files[1]), 60);
        assert_eq!(frame_number(&set.files[29]), 900);
    }

    #[test]
    fn fixed_rate_count_is_floor_of_total_over_interval() {
        for (rate, fps, total) in [(30.0, 1.0, 95_u64), (25.0, 2.0, 100), (24.0, 0.5, 200)] {
            let dir = tempfile::tempdir().unwrap();
            let cadence = Cadence::FixedRate { fps };
            let mut video = SyntheticVideo::new(rate, total);
            let set = sample_frames(&mut video, &cadence, dir.path(), None).unwrap();
            let interval = (rate / fps).round() as u64;
            assert_eq!(set.files.len() as u64, total / interval, "rate={rate} fps={fps}");
        }
    }

    #[test]
    fn fixed_interval_first_sample_is_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        // 15 s at 30 fps, one sample every 15 s
        let mut video = SyntheticVideo::new(30.0, 450);
        let set = sample_frames(
            &mut video,
            &Cadence::FixedInterval { seconds: 15.0 },
            dir.path(),
            None,
        )
        .unwrap();

        assert_eq!(set.interval_frames, 450);
        assert_eq!(set.files.len(), 2);
        assert_eq!(frame_number(&set.files[0]), 1);
        assert_eq!(frame_number(&set.files[1]), 450);
    }

    #[test]
    fn fixed_interval_forty_five_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = SyntheticVideo::new(30.0, 1350);
        let set = sample_frames(
            &mut video,
            &Cadence::FixedInterval { seconds: 15.0 },
            dir.path(),
            None,
        )
        .unwrap();
        let positions: Vec<u64> = set.files.iter().map(|p| frame_number(p)).collect();
        assert_eq!(positions, vec![1, 450, 900, 1350]);
    }

    #[test]
    fn fixed_interval_every_frame_does_not_duplicate_opening_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = SyntheticVideo::new(30.0, 5);
        let set = sample_frames(
            &mut video,
            &Cadence::FixedInterval { seconds: 0.01 },
            dir.path(),
            None,
        )
        .unwrap();
        let positions: Vec<u64> = set.files.iter().map(|p| frame_number(p)).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn video_shorter_than_interval_yields_no_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = SyntheticVideo::new(30.0, 20);
        let set = sample_frames(
            &mut video,
            &Cadence::FixedRate { fps: 1.0 },
            dir.path(),
            None,
        )
        .unwrap();
        assert!(set.files.is_empty());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("frames");
        let mut video = SyntheticVideo::new(10.0, 10);
        let set = sample_frames(&mut video, &Cadence::FixedRate { fps: 1.0 }, &out, None).unwrap();
        assert_eq!(set.files.len(), 1);
        assert!(out.join("frame_0000.png").is_file());
    }

    #[test]
    fn zero_frame_rate_is_invalid_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = SyntheticVideo::new(0.0, 10);
        let err = sample_frames(
            &mut video,
            &Cadence::FixedRate { fps: 1.0 },
            dir.path(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Video2PdfError::InvalidVideo { .. }), "{err}");
    }

    #[test]
    fn decode_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = SyntheticVideo::new(10.0, 100).failing_at(35);
        let err = sample_frames(
            &mut video,
            &Cadence::FixedRate { fps: 1.0 },
            dir.path(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Video2PdfError::Decode { frames: 34, .. }), "{err}");
    }

    #[test]
    fn publishes_maximum_then_reset_then_counts() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(RecordingCallback::default());
        let cb: ProgressCallback = recorder.clone();
        let mut video = SyntheticVideo::new(10.0, 35);
        sample_frames(
            &mut video,
            &Cadence::FixedRate { fps: 1.0 },
            dir.path(),
            Some(&cb),
        )
        .unwrap();
        assert_eq!(
            recorder.events(),
            vec![
                "start Sample 3",
                "progress Sample 0",
                "progress Sample 1",
                "progress Sample 2",
                "progress Sample 3",
            ]
        );
    }

    #[test]
    fn file_names_sort_chronologically_up_to_9999() {
        let width = index_width(10_000);
        assert_eq!(width, 4);
        let names: Vec<String> = (0..10_000).map(|i| frame_file_name(i, width)).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "frame_0000.png");
        assert_eq!(names[9_999], "frame_9999.png");
    }

    #[test]
    fn index_width_grows_past_ten_thousand() {
        assert_eq!(index_width(0), 4);
        assert_eq!(index_width(10_001), 5);
        assert_eq!(frame_file_name(12, 5), "frame_00012.png");
    }

    #[test]
    fn renumber_keeps_name_order_when_index_outgrows_width() {
        let dir = tempfile::tempdir().unwrap();
        let mut files: Vec<PathBuf> = (0..10)
            .map(|i| {
                let path = dir.path().join(frame_file_name(i, 1));
                std::fs::write(&path, [i as u8]).unwrap();
                path
            })
            .collect();

        renumber(&mut files, 2).unwrap();
        files.push(dir.path().join(frame_file_name(10, 2)));
        std::fs::write(&files[10], [10u8]).unwrap();

        let mut on_disk: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        on_disk.sort();
        assert_eq!(on_disk, files);
        for (i, path) in on_disk.iter().enumerate() {
            assert_eq!(std::fs::read(path).unwrap(), vec![i as u8]);
        }
        assert_eq!(files[3].file_name().unwrap(), "frame_03.png");
    }
}
