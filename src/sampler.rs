//! Single-frame sampling.
//!
//! [`FrameSampler`] opens a video, decodes one frame by its 1-based number,
//! and hands it back in RGB order, ready for an image store.

use std::path::Path;

use image::RgbImage;

use crate::{conversion, error::StitchError, source::VideoSource};

/// Samples individual frames from video files.
///
/// Each call opens its own [`VideoSource`] and releases it before returning,
/// on success and on every error path.
///
/// # Example
///
/// ```no_run
/// use framestitch::FrameSampler;
///
/// let first = FrameSampler::sample("clip.mp4", 1)?;
/// first.save("first.png")?;
/// # Ok::<(), framestitch::StitchError>(())
/// ```
pub struct FrameSampler;

impl FrameSampler {
    /// Decode frame `frame_number` (1-based) from `video_path`.
    ///
    /// # Errors
    ///
    /// - [`StitchError::InvalidFrameNumber`] if `frame_number < 1`.
    /// - [`StitchError::SourceUnavailable`] if the file is missing or is not
    ///   a container FFmpeg can read.
    /// - [`StitchError::NoVideoStream`] if the container opens but holds no
    ///   video (an audio-only file, say). This takes the place of
    ///   `SourceUnavailable` for that case.
    /// - [`StitchError::FrameReadFailure`] if the frame lies past the end of
    ///   the video or cannot be decoded. Only a frame count recorded in the
    ///   stream header is checked up front; otherwise the end is found by
    ///   decoding.
    pub fn sample<P: AsRef<Path>>(
        video_path: P,
        frame_number: i64,
    ) -> Result<RgbImage, StitchError> {
        if frame_number < 1 {
            return Err(StitchError::InvalidFrameNumber(frame_number));
        }

        let path = video_path.as_ref();
        let read_failure = |reason: String| StitchError::FrameReadFailure {
            path: path.to_path_buf(),
            frame_number,
            reason,
        };

        let mut source = VideoSource::open(path)?;
        let frame_index = (frame_number - 1) as u64;

        if let Some(frames) = source
            .reported_frame_count()
            .filter(|&frames| past_reported_end(frame_index, Some(frames)))
        {
            return Err(read_failure(format!("video has {frames} frames")));
        }

        log::debug!(
            "Sampling frame {frame_number} of {} from {}",
            source.frame_count(),
            path.display()
        );

        let frame = source
            .read_frame(frame_index)
            .map_err(|error| read_failure(error.to_string()))?
            .ok_or_else(|| read_failure("stream ended before the requested frame".to_string()))?;
        drop(source);

        conversion::bgr_to_rgb(frame).map_err(|error| read_failure(error.to_string()))
    }
}

/// Whether `frame_index` is known to be out of range before decoding.
///
/// Duration-based estimates can come out a frame short, so only a count
/// recorded in the stream header is trusted.
fn past_reported_end(frame_index: u64, reported_frames: Option<u64>) -> bool {
    reported_frames.is_some_and(|frames| frame_index >= frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recorded_counts_bound_the_frame_early() {
        // 48 frames whose duration-based estimate rounds down to 47.
        assert!(!past_reported_end(47, None));
        assert!(!past_reported_end(47, Some(48)));
        assert!(past_reported_end(48, Some(48)));
        assert!(!past_reported_end(0, None));
    }

    #[test]
    fn rejects_zero_and_negative_frame_numbers() {
        for frame_number in [0, -1, i64::MIN] {
            let result = FrameSampler::sample("does_not_matter.mp4", frame_number);
            assert!(matches!(
                result,
                Err(StitchError::InvalidFrameNumber(n)) if n == frame_number
            ));
        }
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let result = FrameSampler::sample("this_file_does_not_exist.mp4", 1);
        assert!(matches!(result, Err(StitchError::SourceUnavailable { .. })));
    }
}
