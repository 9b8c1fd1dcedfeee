//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for unusable
//! inputs, without needing any video fixture.

use framestitch::{
    DirectoryImageStore, FourCc, FrameSampler, ImageReference, ImageStore, MemoryImageStore,
    MemorySinkBackend, NodeContext, NodeRegistry, StitchError, VideoMetadataReader,
};
use serde_json::json;

#[test]
fn metadata_of_missing_file_fails_fast() {
    let result = VideoMetadataReader::total_frames("this_file_does_not_exist.mp4");
    let error = result.unwrap_err();
    assert!(matches!(error, StitchError::SourceUnavailable { .. }));
    assert!(
        error.to_string().contains("this_file_does_not_exist.mp4"),
        "error should name the path: {error}"
    );
}

#[test]
fn garbage_file_is_not_a_source() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("invalid.mp4");
    std::fs::write(&path, b"this is not a media file").expect("Failed to write invalid file");

    for error in [
        VideoMetadataReader::frame_rate(&path).unwrap_err(),
        FrameSampler::sample(&path, 1).unwrap_err(),
    ] {
        assert!(
            matches!(
                error,
                StitchError::SourceUnavailable { .. } | StitchError::NoVideoStream(_)
            ),
            "unexpected error: {error}"
        );
    }
}

#[test]
fn frame_numbers_below_one_are_rejected() {
    for frame_number in [0, -1, i64::MIN] {
        assert!(matches!(
            FrameSampler::sample("whatever.mp4", frame_number),
            Err(StitchError::InvalidFrameNumber(n)) if n == frame_number
        ));
    }
}

#[test]
fn fourcc_must_be_four_characters() {
    assert!(matches!(FourCc::new("avc"), Err(StitchError::InvalidCodec(_))));
    assert!(matches!(FourCc::new("h2645"), Err(StitchError::InvalidCodec(_))));
    assert!(FourCc::new("avc1").is_ok());
}

#[test]
fn directory_store_rejects_unknown_and_path_like_names() {
    let directory = tempfile::tempdir().unwrap();
    let store = DirectoryImageStore::open(directory.path()).unwrap();

    assert!(matches!(
        store.resolve(&ImageReference::new("image-999999.png")),
        Err(StitchError::ImageNotFound(_))
    ));
    assert!(matches!(
        store.resolve(&ImageReference::new("../escape.png")),
        Err(StitchError::InvalidImageName(_))
    ));
}

#[test]
fn registry_reports_operation_errors() {
    let registry = NodeRegistry::builtin();
    let store = MemoryImageStore::new();
    let sinks = MemorySinkBackend::new();
    let context = NodeContext::new(&store, &sinks);

    assert!(matches!(
        registry.invoke(
            "load_video_frame",
            json!({"video_path": "missing.mp4", "frame_number": 0}),
            &context,
        ),
        Err(StitchError::InvalidFrameNumber(0))
    ));
    assert!(matches!(
        registry.invoke("video_frame_count", json!({"video_path": "missing.mp4"}), &context),
        Err(StitchError::SourceUnavailable { .. })
    ));
    assert!(matches!(
        registry.invoke(
            "image_index_to_video",
            json!({"video_out_path": "out.mp4", "fps": -1.0}),
            &context,
        ),
        Err(StitchError::InvalidFrameRate(_))
    ));
    assert!(matches!(
        registry.invoke("load_video_frame", json!({"video_path": "a.mp4", "extra": 1}), &context),
        Err(StitchError::InvalidFields { .. })
    ));
}

/// A one-second silent 8 kHz mono PCM WAV file.
fn silent_wav() -> Vec<u8> {
    let data_len: u32 = 8_000 * 2;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1_u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&8_000_u32.to_le_bytes());
    bytes.extend_from_slice(&16_000_u32.to_le_bytes());
    bytes.extend_from_slice(&2_u16.to_le_bytes());
    bytes.extend_from_slice(&16_u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);
    bytes
}

#[test]
fn audio_only_file_has_no_video_stream() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("silence.wav");
    std::fs::write(&path, silent_wav()).unwrap();

    assert!(matches!(
        FrameSampler::sample(&path, 1),
        Err(StitchError::NoVideoStream(reported)) if reported == path
    ));
    assert!(matches!(
        VideoMetadataReader::total_frames(&path),
        Err(StitchError::NoVideoStream(_))
    ));
}
