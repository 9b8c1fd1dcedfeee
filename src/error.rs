//! Error types for the `framestitch` crate.
//!
//! This module defines [`StitchError`], the unified error type returned by
//! every fallible operation in the crate. Variants carry the path, record
//! position, or frame index involved so that a host can report the failure
//! without additional logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `framestitch` operations.
///
/// Every error is terminal for the invocation that produced it. Source and
/// sink handles are released before the error reaches the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StitchError {
    /// The video could not be opened for reading.
    #[error("Failed to open video source at {path}: {reason}")]
    SourceUnavailable {
        /// Path that was passed to the operation.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The source opened, but it carries no video stream (an audio-only
    /// file, for instance). Reported instead of [`SourceUnavailable`] for
    /// that case.
    ///
    /// [`SourceUnavailable`]: StitchError::SourceUnavailable
    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),

    /// The requested frame could not be decoded.
    #[error("Failed to read frame {frame_number} from {path}: {reason}")]
    FrameReadFailure {
        /// Path of the video source.
        path: PathBuf,
        /// The 1-based frame number that was requested.
        frame_number: i64,
        /// Why the frame could not be produced.
        reason: String,
    },

    /// The output video could not be opened for writing.
    #[error("Failed to open video sink at {path}: {reason}")]
    SinkUnavailable {
        /// Destination path of the video.
        path: PathBuf,
        /// Underlying reason (bad codec, unwritable path, unknown container).
        reason: String,
    },

    /// A serialized record is not a valid `[index, image_name]` pair.
    #[error("Malformed record at position {position}: {reason}")]
    MalformedRecord {
        /// Offset of the record within the input collection.
        position: usize,
        /// Parser message.
        reason: String,
    },

    /// The record collection handed to the assembler is empty.
    #[error("Cannot assemble a video from an empty record collection")]
    EmptyCollection,

    /// A resolved image does not match the sink's fixed frame size.
    #[error(
        "Frame for index {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    FrameSizeMismatch {
        /// Record index of the offending image.
        index: i64,
        /// Sink width fixed by the first frame.
        expected_width: u32,
        /// Sink height fixed by the first frame.
        expected_height: u32,
        /// Width of the offending image.
        actual_width: u32,
        /// Height of the offending image.
        actual_height: u32,
    },

    /// Frame numbers are 1-based.
    #[error("Frame number must be at least 1, got {0}")]
    InvalidFrameNumber(i64),

    /// Frame rate must be finite and strictly positive.
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    /// A codec identifier is not exactly four ASCII characters.
    #[error("Invalid FourCC codec {0:?}: expected exactly 4 ASCII characters")]
    InvalidCodec(String),

    /// The image store has no image with this name.
    #[error("Image not found: {0}")]
    ImageNotFound(String),

    /// An image name cannot be used as a store key.
    #[error("Invalid image name: {0:?}")]
    InvalidImageName(String),

    /// No node is registered under the requested type tag.
    #[error("Unknown node type: {0}")]
    UnknownNode(String),

    /// Invocation fields failed to deserialize or validate.
    #[error("Invalid fields for node {type_tag}: {reason}")]
    InvalidFields {
        /// Node type tag.
        type_tag: String,
        /// Deserializer or validation message.
        reason: String,
    },

    /// The encoder rejected a frame or failed to flush.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while loading or saving an image.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] JsonError),
}

impl From<FfmpegError> for StitchError {
    fn from(error: FfmpegError) -> Self {
        StitchError::FfmpegError(error.to_string())
    }
}
