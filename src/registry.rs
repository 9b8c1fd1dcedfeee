//! Node registry.
//!
//! An explicit lookup table from a host's type tag to a node's descriptor
//! and handler, built once at process start. The operations themselves know
//! nothing about how they are registered.
//!
//! # Example
//!
//! ```no_run
//! use framestitch::{MemoryImageStore, FfmpegSinkBackend, NodeContext, NodeRegistry};
//! use serde_json::json;
//!
//! let registry = NodeRegistry::builtin();
//! let store = MemoryImageStore::new();
//! let context = NodeContext::new(&store, &FfmpegSinkBackend);
//!
//! let output = registry.invoke(
//!     "load_video_frame",
//!     json!({"video_path": "clip.mp4", "frame_number": 3}),
//!     &context,
//! )?;
//! println!("{output}");
//! # Ok::<(), framestitch::StitchError>(())
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::StitchError,
    invocation::{
        ImageIndexCollect, ImageIndexToVideo, ImageToName, Invocation, LoadVideoFrame,
        NodeContext, VideoFrameCount, VideoFrameRate,
    },
};

/// How a node presents itself to a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDescriptor {
    /// Unique type tag, e.g. `"load_video_frame"`.
    pub type_tag: &'static str,
    /// Human-readable title.
    pub title: &'static str,
    /// Grouping category.
    pub category: &'static str,
    /// Search tags.
    pub tags: &'static [&'static str],
    /// Node version.
    pub version: &'static str,
}

type Handler = fn(&str, Value, &NodeContext<'_>) -> Result<Value, StitchError>;

struct NodeEntry {
    descriptor: NodeDescriptor,
    handler: Handler,
}

fn run<I: Invocation>(
    type_tag: &str,
    fields: Value,
    context: &NodeContext<'_>,
) -> Result<Value, StitchError> {
    let fields = match fields {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let invocation: I =
        serde_json::from_value(fields).map_err(|error| StitchError::InvalidFields {
            type_tag: type_tag.to_string(),
            reason: error.to_string(),
        })?;
    invocation.validate()?;
    let output = invocation.invoke(context)?;
    Ok(serde_json::to_value(output)?)
}

/// Type tag → node lookup table.
#[derive(Default)]
pub struct NodeRegistry {
    entries: BTreeMap<&'static str, NodeEntry>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The six nodes this crate provides.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register::<LoadVideoFrame>(NodeDescriptor {
                type_tag: "load_video_frame",
                title: "Load Video Frame",
                category: "video",
                tags: &["video", "load", "frame"],
                version: "1.0.0",
            })
            .register::<VideoFrameCount>(NodeDescriptor {
                type_tag: "video_frame_count",
                title: "Video Frame Count",
                category: "video",
                tags: &["video", "frame", "count", "metadata"],
                version: "1.0.0",
            })
            .register::<VideoFrameRate>(NodeDescriptor {
                type_tag: "video_frame_rate",
                title: "Video Frame Rate",
                category: "video",
                tags: &["video", "fps", "metadata"],
                version: "1.0.0",
            })
            .register::<ImageIndexCollect>(NodeDescriptor {
                type_tag: "image_index_collect",
                title: "Image Index Collect",
                category: "collections",
                tags: &["image", "index", "collect"],
                version: "1.0.0",
            })
            .register::<ImageIndexToVideo>(NodeDescriptor {
                type_tag: "image_index_to_video",
                title: "Image Index To Video",
                category: "video",
                tags: &["video", "image", "index", "save"],
                version: "1.0.0",
            })
            .register::<ImageToName>(NodeDescriptor {
                type_tag: "image_to_name",
                title: "Image To Name",
                category: "image",
                tags: &["image", "name"],
                version: "1.0.0",
            });
        registry
    }

    /// Register invocation type `I` under `descriptor.type_tag`.
    ///
    /// A later registration with the same tag replaces the earlier one.
    pub fn register<I: Invocation>(&mut self, descriptor: NodeDescriptor) -> &mut Self {
        if self.entries.contains_key(descriptor.type_tag) {
            log::warn!("Replacing registered node {}", descriptor.type_tag);
        }
        self.entries.insert(
            descriptor.type_tag,
            NodeEntry {
                descriptor,
                handler: run::<I>,
            },
        );
        self
    }

    /// Descriptor registered under `type_tag`.
    pub fn get(&self, type_tag: &str) -> Option<&NodeDescriptor> {
        self.entries.get(type_tag).map(|entry| &entry.descriptor)
    }

    /// All descriptors, ordered by type tag.
    pub fn descriptors(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.entries.values().map(|entry| &entry.descriptor)
    }

    /// Deserialize `fields` for the node `type_tag`, run it, and return its
    /// output as JSON.
    ///
    /// # Errors
    ///
    /// - [`StitchError::UnknownNode`] if nothing is registered under `type_tag`.
    /// - [`StitchError::InvalidFields`] if `fields` do not match the node.
    /// - Any error of the node's operation.
    pub fn invoke(
        &self,
        type_tag: &str,
        fields: Value,
        context: &NodeContext<'_>,
    ) -> Result<Value, StitchError> {
        let entry = self
            .entries
            .get(type_tag)
            .ok_or_else(|| StitchError::UnknownNode(type_tag.to_string()))?;
        log::debug!("Invoking node {type_tag}");
        (entry.handler)(type_tag, fields, context)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{sink::MemorySinkBackend, store::MemoryImageStore};

    #[test]
    fn builtin_registers_all_nodes() {
        let registry = NodeRegistry::builtin();
        let tags: Vec<_> = registry.descriptors().map(|d| d.type_tag).collect();
        assert_eq!(
            tags,
            [
                "image_index_collect",
                "image_index_to_video",
                "image_to_name",
                "load_video_frame",
                "video_frame_count",
                "video_frame_rate",
            ]
        );
        assert_eq!(registry.get("load_video_frame").unwrap().title, "Load Video Frame");
    }

    #[test]
    fn dispatches_by_type_tag() {
        let registry = NodeRegistry::builtin();
        let store = MemoryImageStore::new();
        let sinks = MemorySinkBackend::new();
        let context = NodeContext::new(&store, &sinks);

        let output = registry
            .invoke(
                "image_index_collect",
                json!({"index": 2, "image": {"image_name": "imgB"}}),
                &context,
            )
            .unwrap();
        assert_eq!(output, json!({"image_index_collection": "[2,\"imgB\"]"}));
    }

    #[test]
    fn unknown_tags_and_bad_fields_are_reported() {
        let registry = NodeRegistry::builtin();
        let store = MemoryImageStore::new();
        let sinks = MemorySinkBackend::new();
        let context = NodeContext::new(&store, &sinks);

        assert!(matches!(
            registry.invoke("no_such_node", Value::Null, &context),
            Err(StitchError::UnknownNode(_))
        ));
        assert!(matches!(
            registry.invoke("image_to_name", Value::Null, &context),
            Err(StitchError::InvalidFields { .. })
        ));
        assert!(matches!(
            registry.invoke(
                "image_index_to_video",
                json!({"video_out_path": "out.mp4", "codec": "toolong"}),
                &context,
            ),
            Err(StitchError::InvalidFields { .. })
        ));
    }

    #[test]
    fn empty_collection_node_fails_without_output() {
        let registry = NodeRegistry::builtin();
        let store = MemoryImageStore::new();
        let sinks = MemorySinkBackend::new();
        let context = NodeContext::new(&store, &sinks);
        let directory = tempfile::tempdir().unwrap();
        let output = directory.path().join("out.mp4");

        let result = registry.invoke(
            "image_index_to_video",
            json!({"video_out_path": output}),
            &context,
        );
        assert!(matches!(result, Err(StitchError::EmptyCollection)));
        assert!(!output.exists());
    }
}
