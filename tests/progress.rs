//! Progress reporting integration tests.

use std::sync::{Arc, Mutex};

use framestitch::{
    AssembleOptions, IndexedVideoAssembler, MemoryImageStore, MemorySinkBackend, OperationType,
    ProgressCallback, ProgressInfo, encode_record,
};
use image::RgbImage;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(u64, Option<u64>, Option<i64>)>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        assert_eq!(info.operation, OperationType::Assembly);
        self.seen
            .lock()
            .unwrap()
            .push((info.current, info.total, info.current_index));
    }
}

#[test]
fn assembly_reports_each_frame_in_sorted_order() {
    let store = MemoryImageStore::new();
    let a = store.insert("a", RgbImage::new(2, 2));
    let b = store.insert("b", RgbImage::new(2, 2));
    let c = store.insert("c", RgbImage::new(2, 2));
    let sinks = MemorySinkBackend::new();
    let directory = tempfile::tempdir().unwrap();

    let recorder = Arc::new(Recorder::default());
    let options = AssembleOptions::default().with_progress(recorder.clone());
    IndexedVideoAssembler::new(&store, &sinks)
        .assemble(
            &[encode_record(9, &a), encode_record(-3, &b), encode_record(4, &c)],
            directory.path().join("progress.mp4"),
            &options,
        )
        .unwrap();

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        [(1, Some(3), Some(-3)), (2, Some(3), Some(4)), (3, Some(3), Some(9))]
    );
}
