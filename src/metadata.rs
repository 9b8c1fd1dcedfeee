//! Video metadata accessors.
//!
//! [`VideoMetadataReader`] reads container-reported properties without
//! decoding any frames. Unlike a silent zero, an unopenable source is an
//! error here, the same as for [`FrameSampler`](crate::FrameSampler).

use std::path::Path;

use serde::Serialize;

use crate::{error::StitchError, source::VideoSource};

/// Properties of a video stream, read in a single open.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct VideoProperties {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (may be approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Total frame count as reported (or estimated) by the container.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"mpeg4"`).
    pub codec: String,
}

/// Reads frame count and frame rate from video files.
///
/// # Example
///
/// ```no_run
/// use framestitch::VideoMetadataReader;
///
/// let frames = VideoMetadataReader::total_frames("clip.mp4")?;
/// let fps = VideoMetadataReader::frame_rate("clip.mp4")?;
/// println!("{frames} frames at {fps} fps");
/// # Ok::<(), framestitch::StitchError>(())
/// ```
pub struct VideoMetadataReader;

impl VideoMetadataReader {
    /// Total frame count reported by the container.
    ///
    /// May be 0 or imprecise for containers that do not record it.
    pub fn total_frames<P: AsRef<Path>>(video_path: P) -> Result<u64, StitchError> {
        let source = VideoSource::open(video_path)?;
        Ok(source.frame_count())
    }

    /// Frames per second reported by the container.
    pub fn frame_rate<P: AsRef<Path>>(video_path: P) -> Result<f64, StitchError> {
        let source = VideoSource::open(video_path)?;
        Ok(source.frame_rate())
    }

    /// All stream properties at once.
    pub fn properties<P: AsRef<Path>>(video_path: P) -> Result<VideoProperties, StitchError> {
        let source = VideoSource::open(video_path)?;
        let (width, height, codec) = source.stream_info()?;
        Ok(VideoProperties {
            width,
            height,
            frames_per_second: source.frame_rate(),
            frame_count: source.frame_count(),
            codec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unopenable_source_fails_fast() {
        let missing = "this_file_does_not_exist.mp4";
        assert!(matches!(
            VideoMetadataReader::total_frames(missing),
            Err(StitchError::SourceUnavailable { .. })
        ));
        assert!(matches!(
            VideoMetadataReader::frame_rate(missing),
            Err(StitchError::SourceUnavailable { .. })
        ));
    }
}
