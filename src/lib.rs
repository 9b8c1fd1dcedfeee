//! # framestitch
//!
//! Sample frames out of video files and stitch indexed image collections back
//! into videos, as nodes of an image-generation pipeline.
//!
//! A host pipeline typically:
//!
//! 1. samples frames with [`FrameSampler`] and saves them in an
//!    [`ImageStore`],
//! 2. processes each frame independently, tagging every result with its
//!    position via [`encode_record`] (in any order, from any branch),
//! 3. hands the gathered records to [`IndexedVideoAssembler`], which writes
//!    them out as a video ordered by index.
//!
//! [`VideoMetadataReader`] answers "how many frames, at what rate?" without
//! decoding, and [`NodeRegistry`] exposes all of the above to a host by type
//! tag.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framestitch::{
//!     AssembleOptions, FfmpegSinkBackend, FourCc, FrameSampler, ImageStore,
//!     IndexedVideoAssembler, MemoryImageStore, VideoMetadataReader, encode_record,
//! };
//!
//! let store = MemoryImageStore::new();
//! let total = VideoMetadataReader::total_frames("clip.mp4")?;
//!
//! let mut records = Vec::new();
//! for frame_number in (1..=total as i64).rev() {
//!     let frame = FrameSampler::sample("clip.mp4", frame_number)?;
//!     let stored = store.save(frame)?;
//!     records.push(encode_record(frame_number, &stored.image));
//! }
//!
//! let options = AssembleOptions::default()
//!     .with_fps(VideoMetadataReader::frame_rate("clip.mp4")?)
//!     .with_codec(FourCc::new("mp4v")?);
//! IndexedVideoAssembler::new(&store, &FfmpegSinkBackend)
//!     .assemble(&records, "copy.mp4", &options)?;
//! # Ok::<(), framestitch::StitchError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod assemble;
pub mod codec;
pub mod configuration;
pub mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod invocation;
pub mod metadata;
pub mod progress;
pub mod record;
pub mod registry;
pub mod sampler;
pub mod sink;
pub mod source;
pub mod store;
mod utilities;

pub use assemble::{AssemblyReport, IndexedVideoAssembler, sort_records};
pub use codec::FourCc;
pub use configuration::{AssembleOptions, DEFAULT_FPS};
pub use conversion::{BgrFrame, bgr_to_rgb, rgb_to_bgr};
pub use error::StitchError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use invocation::{
    FrameCountOutput, FrameRateOutput, ImageIndexCollect, ImageIndexCollectOutput,
    ImageIndexToVideo, ImageIndexToVideoOutput, ImageNameOutput, ImageOutput, ImageToName,
    Invocation, LoadVideoFrame, NodeContext, VideoFrameCount, VideoFrameRate,
};
pub use metadata::{VideoMetadataReader, VideoProperties};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use record::{IndexedImageRecord, decode_records, encode_record};
pub use registry::{NodeDescriptor, NodeRegistry};
pub use sampler::FrameSampler;
pub use sink::{
    FfmpegSink, FfmpegSinkBackend, FrameSink, MemoryRecording, MemorySinkBackend, SinkBackend,
    SinkConfig,
};
pub use source::VideoSource;
pub use store::{
    DirectoryImageStore, ImageReference, ImageStore, MemoryImageStore, StoredImage,
    extract_image_name,
};
