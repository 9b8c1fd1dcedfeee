//! Read-side video handle.
//!
//! [`VideoSource`] wraps an FFmpeg demuxer for the best video stream of a
//! file. It is opened, used, and dropped within a single operation; dropping
//! it closes the demuxer, so every early return releases the source.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{conversion::BgrFrame, error::StitchError, utilities};

/// An open, decodable video file.
pub struct VideoSource {
    input: Input,
    stream_index: usize,
    path: PathBuf,
}

impl VideoSource {
    /// Open `path` and locate its best video stream.
    ///
    /// # Errors
    ///
    /// - [`StitchError::SourceUnavailable`] if the file is missing or not a
    ///   recognisable container.
    /// - [`StitchError::NoVideoStream`] if the container has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StitchError> {
        let path = path.as_ref();
        log::debug!("Opening video source: {}", path.display());

        crate::ffmpeg::initialize(path)?;

        let input =
            ffmpeg_next::format::input(&path).map_err(|error| StitchError::SourceUnavailable {
                path: path.to_path_buf(),
                reason: error.to_string(),
            })?;

        let stream_index = input
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index())
            .ok_or_else(|| StitchError::NoVideoStream(path.to_path_buf()))?;

        Ok(Self {
            input,
            stream_index,
            path: path.to_path_buf(),
        })
    }

    /// Path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames per second reported by the container.
    ///
    /// Uses the stream's average frame rate, falling back to its base rate.
    /// Returns 0.0 when neither is defined.
    pub fn frame_rate(&self) -> f64 {
        let Some(stream) = self.input.stream(self.stream_index) else {
            return 0.0;
        };
        let average = utilities::rational_to_f64(stream.avg_frame_rate());
        if average > 0.0 {
            average
        } else {
            utilities::rational_to_f64(stream.rate())
        }
    }

    /// Frame count recorded in the stream header, if any.
    ///
    /// Unlike [`frame_count`](Self::frame_count) this is never an estimate,
    /// so it is safe to reject frame indices against.
    pub fn reported_frame_count(&self) -> Option<u64> {
        self.input
            .stream(self.stream_index)
            .map(|stream| stream.frames())
            .filter(|&frames| frames > 0)
            .map(|frames| frames as u64)
    }

    /// Total frame count of the video stream.
    ///
    /// Prefers the stream's own frame count; otherwise estimates from the
    /// container duration and frame rate. Returns 0 when neither is known.
    pub fn frame_count(&self) -> u64 {
        if let Some(reported) = self.reported_frame_count() {
            return reported;
        }

        let frames_per_second = self.frame_rate();
        let duration_microseconds = self.input.duration();
        if frames_per_second > 0.0 && duration_microseconds > 0 {
            (duration_microseconds as f64 / 1_000_000.0 * frames_per_second).round() as u64
        } else {
            0
        }
    }

    /// Coded frame dimensions and codec name of the video stream.
    pub fn stream_info(&self) -> Result<(u32, u32, String), StitchError> {
        let stream = self
            .input
            .stream(self.stream_index)
            .ok_or_else(|| StitchError::NoVideoStream(self.path.clone()))?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;
        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok((decoder.width(), decoder.height(), codec))
    }

    /// Seek to the zero-based `frame_index` and decode that frame as BGR24.
    ///
    /// Seeks to the nearest keyframe at or before the target and decodes
    /// forward. If the seek lands past the target, or on a frame whose
    /// position cannot be told, decoding restarts from the beginning of the
    /// stream. Returns `Ok(None)` if the stream ends before the target.
    pub fn read_frame(&mut self, frame_index: u64) -> Result<Option<BgrFrame>, StitchError> {
        let frames_per_second = self.frame_rate();

        let stream = self
            .input
            .stream(self.stream_index)
            .ok_or_else(|| StitchError::NoVideoStream(self.path.clone()))?;
        // AV_NOPTS_VALUE when the container does not record a start time.
        let start_time = match stream.start_time() {
            i64::MIN => 0,
            start => start,
        };
        // Without a frame rate PTS cannot be mapped to indices, so frames
        // are counted from the start instead.
        let clock = (frames_per_second > 0.0).then(|| FrameClock {
            time_base: stream.time_base(),
            start_time,
            frames_per_second,
        });
        let mut decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let width = decoder.width();
        let height = decoder.height();
        let mut scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::BGR24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let start_offset = clock
            .as_ref()
            .map_or(0, |clock| utilities::pts_to_microseconds(clock.start_time, clock.time_base));

        if clock.is_some() && frame_index > 0 {
            let target = utilities::frame_index_to_seek_timestamp(frame_index, frames_per_second)
                + start_offset;
            match self.input.seek(target, ..target) {
                Ok(()) => {
                    let cursor = FrameCursor::after_seek(clock);
                    match self.decode_until(&mut decoder, &mut scaler, cursor, frame_index)? {
                        Decoded::Frame(frame) => return Ok(Some(frame)),
                        Decoded::EndOfStream => return Ok(None),
                        Decoded::Misplaced(landed) => {
                            log::warn!(
                                "Seek for frame {frame_index} in {} landed on {landed}; decoding from the start",
                                self.path.display()
                            );
                            self.input.seek(start_offset, ..start_offset + 1)?;
                            decoder.flush();
                        }
                    }
                }
                // A fresh source is still positioned at the start.
                Err(error) => log::warn!(
                    "Seek to frame {frame_index} in {} failed ({error}); decoding from the start",
                    self.path.display()
                ),
            }
        }

        let cursor = FrameCursor::from_start(clock);
        match self.decode_until(&mut decoder, &mut scaler, cursor, frame_index)? {
            Decoded::Frame(frame) => Ok(Some(frame)),
            Decoded::EndOfStream | Decoded::Misplaced(_) => Ok(None),
        }
    }

    fn decode_until(
        &mut self,
        decoder: &mut VideoDecoder,
        scaler: &mut ScalingContext,
        mut cursor: FrameCursor,
        frame_index: u64,
    ) -> Result<Decoded, StitchError> {
        let width = decoder.width();
        let height = decoder.height();
        let mut decoded_frame = VideoFrame::empty();
        let mut bgr_frame = VideoFrame::empty();

        let mut eof_sent = false;
        let mut packets = self.input.packets();
        loop {
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.timestamp().or_else(|| decoded_frame.pts());
                match cursor.locate(pts, frame_index) {
                    Step::Skip => {}
                    Step::Take => {
                        scaler.run(&decoded_frame, &mut bgr_frame)?;
                        return Ok(Decoded::Frame(to_bgr_frame(&bgr_frame, width, height)?));
                    }
                    Step::Misplaced(landed) => return Ok(Decoded::Misplaced(landed)),
                }
            }

            if eof_sent {
                return Ok(Decoded::EndOfStream);
            }

            match packets.next() {
                Some((stream, packet)) => {
                    if stream.index() == self.stream_index {
                        decoder.send_packet(&packet)?;
                    }
                }
                None => {
                    decoder.send_eof()?;
                    eof_sent = true;
                }
            }
        }
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        log::debug!("Releasing video source: {}", self.path.display());
    }
}

/// Maps a stream's timestamps onto zero-based frame indices.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    time_base: Rational,
    start_time: i64,
    frames_per_second: f64,
}

impl FrameClock {
    fn index_of(&self, pts: i64) -> u64 {
        utilities::pts_to_frame_index(pts - self.start_time, self.time_base, self.frames_per_second)
    }
}

/// Where a decoded frame falls relative to the wanted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Skip,
    Take,
    /// The first frame after a seek is already past the target, or has no
    /// position at all (`u64::MAX`).
    Misplaced(u64),
}

/// Tracks the index of each decoded frame.
///
/// Frames with a timestamp are placed by it; frames without one follow the
/// previous frame. After a seek there is no previous frame until the first
/// timestamped one arrives.
#[derive(Debug)]
struct FrameCursor {
    clock: Option<FrameClock>,
    next_index: Option<u64>,
    after_seek: bool,
    seen_any: bool,
}

impl FrameCursor {
    fn from_start(clock: Option<FrameClock>) -> Self {
        Self {
            clock,
            next_index: Some(0),
            after_seek: false,
            seen_any: false,
        }
    }

    fn after_seek(clock: Option<FrameClock>) -> Self {
        Self {
            clock,
            next_index: None,
            after_seek: true,
            seen_any: false,
        }
    }

    fn locate(&mut self, pts: Option<i64>, target: u64) -> Step {
        let index = match (self.clock.as_ref(), pts) {
            (Some(clock), Some(pts)) => Some(clock.index_of(pts)),
            _ => self.next_index,
        };
        let first = !self.seen_any;
        self.seen_any = true;

        let Some(index) = index else {
            return Step::Misplaced(u64::MAX);
        };
        self.next_index = Some(index + 1);

        if index < target {
            Step::Skip
        } else if index > target && first && self.after_seek {
            Step::Misplaced(index)
        } else {
            Step::Take
        }
    }
}

enum Decoded {
    Frame(BgrFrame),
    EndOfStream,
    Misplaced(u64),
}

fn to_bgr_frame(frame: &VideoFrame, width: u32, height: u32) -> Result<BgrFrame, StitchError> {
    let buffer = utilities::frame_to_buffer(frame, width, height, 3);
    BgrFrame::from_raw(width, height, buffer).ok_or_else(|| {
        StitchError::FfmpegError(format!("scaled frame is not {width}x{height} BGR24"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_24fps() -> Option<FrameClock> {
        Some(FrameClock {
            time_base: Rational::new(1, 24),
            start_time: -2,
            frames_per_second: 24.0,
        })
    }

    #[test]
    fn seek_overshoot_is_misplaced_not_taken() {
        // Keyframe at pts 9 sits at index 11 once the negative start is removed.
        let mut cursor = FrameCursor::after_seek(clock_24fps());
        assert_eq!(cursor.locate(Some(9), 10), Step::Misplaced(11));
    }

    #[test]
    fn seek_undershoot_decodes_forward_to_target() {
        let mut cursor = FrameCursor::after_seek(clock_24fps());
        assert_eq!(cursor.locate(Some(4), 10), Step::Skip);
        assert_eq!(cursor.locate(None, 10), Step::Skip);
        assert_eq!(cursor.locate(Some(7), 10), Step::Skip);
        assert_eq!(cursor.locate(None, 10), Step::Take);
    }

    #[test]
    fn untimed_first_frame_after_seek_is_misplaced() {
        let mut cursor = FrameCursor::after_seek(clock_24fps());
        assert_eq!(cursor.locate(None, 3), Step::Misplaced(u64::MAX));
    }

    #[test]
    fn from_start_counts_untimed_frames_and_accepts_gaps() {
        let mut cursor = FrameCursor::from_start(None);
        assert_eq!(cursor.locate(Some(100), 2), Step::Skip);
        assert_eq!(cursor.locate(None, 2), Step::Skip);
        assert_eq!(cursor.locate(None, 2), Step::Take);

        // Variable frame rate: nothing lands on index 4, so index 5 is taken.
        let mut cursor = FrameCursor::from_start(clock_24fps());
        assert_eq!(cursor.locate(Some(1), 4), Step::Skip);
        assert_eq!(cursor.locate(Some(3), 4), Step::Take);
    }
}
