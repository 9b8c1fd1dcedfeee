//! Host-facing invocations.
//!
//! Each struct here is the typed field set a pipeline host passes to one
//! node, with the host's defaults applied during deserialization. Calling
//! [`Invocation::invoke`] runs the matching operation against the explicit
//! collaborators in a [`NodeContext`] and returns a typed output.

use std::path::PathBuf;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    assemble::IndexedVideoAssembler,
    codec::FourCc,
    configuration::{AssembleOptions, DEFAULT_FPS},
    error::StitchError,
    metadata::VideoMetadataReader,
    record,
    sampler::FrameSampler,
    sink::SinkBackend,
    store::{self, ImageReference, ImageStore},
};

/// Collaborators available to every invocation.
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    /// Where sampled images are saved and referenced images resolved.
    pub images: &'a dyn ImageStore,
    /// How output videos are opened.
    pub sinks: &'a dyn SinkBackend,
}

impl<'a> NodeContext<'a> {
    /// Bundle an image store and a sink backend.
    pub fn new(images: &'a dyn ImageStore, sinks: &'a dyn SinkBackend) -> Self {
        Self { images, sinks }
    }
}

/// A node's typed inputs and the operation they drive.
pub trait Invocation: DeserializeOwned {
    /// What the node produces.
    type Output: Serialize;

    /// Reject field values the operation cannot accept, before any I/O.
    fn validate(&self) -> Result<(), StitchError> {
        Ok(())
    }

    /// Run the operation.
    fn invoke(&self, context: &NodeContext<'_>) -> Result<Self::Output, StitchError>;
}

fn default_frame_number() -> i64 {
    1
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

fn require_image_name(image: &ImageReference) -> Result<(), StitchError> {
    if image.image_name().is_empty() {
        return Err(StitchError::InvalidImageName(String::new()));
    }
    Ok(())
}

/// Load one frame of a video into the image store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadVideoFrame {
    /// Path to the video file.
    pub video_path: PathBuf,
    /// 1-based frame number.
    #[serde(default = "default_frame_number")]
    pub frame_number: i64,
}

/// A stored image and its dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageOutput {
    /// Reference to the stored image.
    pub image: ImageReference,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Invocation for LoadVideoFrame {
    type Output = ImageOutput;

    fn validate(&self) -> Result<(), StitchError> {
        if self.frame_number < 1 {
            return Err(StitchError::InvalidFrameNumber(self.frame_number));
        }
        Ok(())
    }

    fn invoke(&self, context: &NodeContext<'_>) -> Result<ImageOutput, StitchError> {
        let frame = FrameSampler::sample(&self.video_path, self.frame_number)?;
        let stored = context.images.save(frame)?;
        Ok(ImageOutput {
            image: stored.image,
            width: stored.width,
            height: stored.height,
        })
    }
}

/// Read a video's total frame count.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoFrameCount {
    /// Path to the video file.
    pub video_path: PathBuf,
}

/// Output of [`VideoFrameCount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameCountOutput {
    /// Frames reported by the container.
    pub frame_count: u64,
}

impl Invocation for VideoFrameCount {
    type Output = FrameCountOutput;

    fn invoke(&self, _context: &NodeContext<'_>) -> Result<FrameCountOutput, StitchError> {
        Ok(FrameCountOutput {
            frame_count: VideoMetadataReader::total_frames(&self.video_path)?,
        })
    }
}

/// Read a video's frame rate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoFrameRate {
    /// Path to the video file.
    pub video_path: PathBuf,
}

/// Output of [`VideoFrameRate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameRateOutput {
    /// Frames per second reported by the container.
    pub fps: f64,
}

impl Invocation for VideoFrameRate {
    type Output = FrameRateOutput;

    fn invoke(&self, _context: &NodeContext<'_>) -> Result<FrameRateOutput, StitchError> {
        Ok(FrameRateOutput {
            fps: VideoMetadataReader::frame_rate(&self.video_path)?,
        })
    }
}

/// Pair an index with an image as a serialized record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageIndexCollect {
    /// Temporal position of the image.
    #[serde(default)]
    pub index: i64,
    /// The image to place at `index`.
    pub image: ImageReference,
}

/// Output of [`ImageIndexCollect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageIndexCollectOutput {
    /// The serialized `[index, image_name]` record.
    pub image_index_collection: String,
}

impl Invocation for ImageIndexCollect {
    type Output = ImageIndexCollectOutput;

    fn validate(&self) -> Result<(), StitchError> {
        require_image_name(&self.image)
    }

    fn invoke(&self, _context: &NodeContext<'_>) -> Result<ImageIndexCollectOutput, StitchError> {
        Ok(ImageIndexCollectOutput {
            image_index_collection: record::encode_record(self.index, &self.image),
        })
    }
}

/// Assemble a collection of records into a video file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageIndexToVideo {
    /// Serialized records, in any order.
    #[serde(default)]
    pub image_index_collection: Vec<String>,
    /// Destination video path.
    pub video_out_path: PathBuf,
    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Output FourCC.
    #[serde(default)]
    pub codec: FourCc,
}

/// Output of [`ImageIndexToVideo`]; success carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageIndexToVideoOutput {}

impl ImageIndexToVideo {
    fn options(&self) -> AssembleOptions {
        AssembleOptions::default()
            .with_fps(self.fps)
            .with_codec(self.codec)
    }
}

impl Invocation for ImageIndexToVideo {
    type Output = ImageIndexToVideoOutput;

    fn validate(&self) -> Result<(), StitchError> {
        self.options().validate()
    }

    fn invoke(&self, context: &NodeContext<'_>) -> Result<ImageIndexToVideoOutput, StitchError> {
        let report = IndexedVideoAssembler::new(context.images, context.sinks).assemble(
            &self.image_index_collection,
            &self.video_out_path,
            &self.options(),
        )?;
        log::debug!("Assembly finished: {report:?}");
        Ok(ImageIndexToVideoOutput {})
    }
}

/// Project an image reference to its name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageToName {
    /// The image whose name to extract.
    pub image: ImageReference,
}

/// Output of [`ImageToName`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageNameOutput {
    /// The image's identifier.
    pub image_name: String,
}

impl Invocation for ImageToName {
    type Output = ImageNameOutput;

    fn invoke(&self, _context: &NodeContext<'_>) -> Result<ImageNameOutput, StitchError> {
        Ok(ImageNameOutput {
            image_name: store::extract_image_name(&self.image),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{sink::MemorySinkBackend, store::MemoryImageStore};

    #[test]
    fn host_defaults_are_applied() {
        let load: LoadVideoFrame = serde_json::from_value(json!({"video_path": "a.mp4"})).unwrap();
        assert_eq!(load.frame_number, 1);

        let collect: ImageIndexCollect =
            serde_json::from_value(json!({"image": {"image_name": "x"}})).unwrap();
        assert_eq!(collect.index, 0);

        let to_video: ImageIndexToVideo =
            serde_json::from_value(json!({"video_out_path": "out.mp4"})).unwrap();
        assert!(to_video.image_index_collection.is_empty());
        assert_eq!(to_video.fps, 30.0);
        assert_eq!(to_video.codec.as_str(), "x264");
    }

    #[test]
    fn load_frame_rejects_frame_zero_before_io() {
        let load = LoadVideoFrame {
            video_path: PathBuf::from("missing.mp4"),
            frame_number: 0,
        };
        assert!(matches!(load.validate(), Err(StitchError::InvalidFrameNumber(0))));
    }

    #[test]
    fn collect_then_name_round_trip() {
        let store = MemoryImageStore::new();
        let sinks = MemorySinkBackend::new();
        let context = NodeContext::new(&store, &sinks);

        let collect = ImageIndexCollect {
            index: -4,
            image: ImageReference::new("imgA"),
        };
        let output = collect.invoke(&context).unwrap();
        assert_eq!(output.image_index_collection, r#"[-4,"imgA"]"#);

        let name = ImageToName {
            image: ImageReference::new("imgA"),
        }
        .invoke(&context)
        .unwrap();
        assert_eq!(name.image_name, "imgA");
    }

    #[test]
    fn collect_rejects_empty_name() {
        let collect = ImageIndexCollect {
            index: 0,
            image: ImageReference::new(""),
        };
        assert!(matches!(collect.validate(), Err(StitchError::InvalidImageName(_))));
    }
}
