//! Internal utility functions.
//!
//! Helpers for pixel-data copying, timestamp conversion, and other shared
//! logic that does not belong in any single public module.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × bpp).
/// This strips the padding.
pub fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Copy a tightly-packed buffer into an FFmpeg frame whose rows may be padded.
pub fn buffer_to_frame(buffer: &[u8], video_frame: &mut VideoFrame, bytes_per_pixel: usize) {
    let width = video_frame.width() as usize;
    let height = video_frame.height() as usize;
    let stride = video_frame.stride(0);
    let row_len = width * bytes_per_pixel;
    let data = video_frame.data_mut(0);

    for row in 0..height {
        let source = row * row_len;
        let destination = row * stride;
        data[destination..destination + row_len].copy_from_slice(&buffer[source..source + row_len]);
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value from stream time base to AV_TIME_BASE (microseconds).
pub fn pts_to_microseconds(pts: i64, time_base: Rational) -> i64 {
    (pts_to_seconds(pts, time_base) * 1_000_000.0).round() as i64
}

/// Rescale a PTS value to a zero-based frame index.
///
/// Rounds to the nearest index so that timestamps stored with a coarse time
/// base do not land one frame short.
pub fn pts_to_frame_index(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds = pts_to_seconds(pts, time_base);
    (seconds * frames_per_second).round().max(0.0) as u64
}

/// Convert a zero-based frame index to a seek timestamp in AV_TIME_BASE
/// (microseconds), as expected by `Input::seek`.
pub fn frame_index_to_seek_timestamp(frame_index: u64, frames_per_second: f64) -> i64 {
    if frames_per_second <= 0.0 {
        return 0;
    }
    let seconds = frame_index as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Convert a rational rate (e.g. `30000/1001`) to a float, 0.0 when undefined.
pub fn rational_to_f64(rate: Rational) -> f64 {
    if rate.denominator() == 0 {
        0.0
    } else {
        rate.numerator() as f64 / rate.denominator() as f64
    }
}
