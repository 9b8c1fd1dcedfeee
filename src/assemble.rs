//! Ordered video reconstruction from indexed image records.
//!
//! [`IndexedVideoAssembler`] takes the serialized `[index, image_name]`
//! records gathered by a host, orders them by index, and writes one frame per
//! record. Equal indices keep their input order.
//!
//! Output is staged in a temporary file next to the destination and renamed
//! into place only once the sink has been finished, so a failed assembly
//! never leaves a truncated video at `video_out_path`.
//!
//! # Example
//!
//! ```no_run
//! use framestitch::{
//!     AssembleOptions, DirectoryImageStore, FfmpegSinkBackend, IndexedVideoAssembler,
//! };
//!
//! let store = DirectoryImageStore::open("images")?;
//! let records = vec![
//!     r#"[1,"image-000001.png"]"#.to_string(),
//!     r#"[0,"image-000000.png"]"#.to_string(),
//! ];
//! let report = IndexedVideoAssembler::new(&store, &FfmpegSinkBackend)
//!     .assemble(&records, "out.mp4", &AssembleOptions::default().with_fps(24.0))?;
//! println!("wrote {} frames", report.frame_count);
//! # Ok::<(), framestitch::StitchError>(())
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempPath;

use crate::{
    codec::FourCc,
    configuration::AssembleOptions,
    conversion,
    error::StitchError,
    progress::{OperationType, ProgressTracker},
    record::{self, IndexedImageRecord},
    sink::{SinkBackend, SinkConfig},
    store::ImageStore,
};

/// Summary of a completed assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct AssemblyReport {
    /// Final output path.
    pub output: PathBuf,
    /// Number of frames written.
    pub frame_count: u64,
    /// Frame width fixed by the first sorted image.
    pub width: u32,
    /// Frame height fixed by the first sorted image.
    pub height: u32,
    /// Output frame rate.
    pub fps: f64,
    /// Output codec.
    pub codec: FourCc,
}

/// Writes indexed image collections to video files.
///
/// The image store and sink backend are explicit collaborators; the
/// assembler holds no state of its own between calls.
pub struct IndexedVideoAssembler<'a> {
    store: &'a dyn ImageStore,
    backend: &'a dyn SinkBackend,
}

impl<'a> IndexedVideoAssembler<'a> {
    /// Create an assembler resolving images from `store` and writing through
    /// `backend`.
    pub fn new(store: &'a dyn ImageStore, backend: &'a dyn SinkBackend) -> Self {
        Self { store, backend }
    }

    /// Assemble `records` into a video at `video_out_path`.
    ///
    /// Holds the decoded record list and one image at a time in memory.
    ///
    /// # Errors
    ///
    /// - [`StitchError::InvalidFrameRate`] for a non-positive `fps`.
    /// - [`StitchError::MalformedRecord`] for the first undecodable record.
    /// - [`StitchError::EmptyCollection`] if `records` is empty; no file is
    ///   created.
    /// - [`StitchError::ImageNotFound`] if a record names an unknown image.
    /// - [`StitchError::SinkUnavailable`] if the output cannot be opened with
    ///   the requested codec.
    /// - [`StitchError::FrameSizeMismatch`] if an image differs in size from
    ///   the first sorted image.
    pub fn assemble<S: AsRef<str>, P: AsRef<Path>>(
        &self,
        records: &[S],
        video_out_path: P,
        options: &AssembleOptions,
    ) -> Result<AssemblyReport, StitchError> {
        let video_out_path = video_out_path.as_ref();
        options.validate()?;

        let records = sort_records(record::decode_records(records)?);
        let Some(first_record) = records.first() else {
            return Err(StitchError::EmptyCollection);
        };

        log::info!(
            "Assembling {} frames into {} (codec={}, fps={})",
            records.len(),
            video_out_path.display(),
            options.codec,
            options.fps,
        );

        let first_image = self.store.resolve(&first_record.image())?;
        let config = SinkConfig {
            width: first_image.width(),
            height: first_image.height(),
            fps: options.fps,
            codec: options.codec,
        };

        let staging = staging_path(video_out_path)?;
        let mut sink = self.backend.open(&staging, &config)?;

        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            OperationType::Assembly,
            Some(records.len() as u64),
        );

        let mut pending_first = Some(first_image);
        for record in &records {
            let image = match pending_first.take() {
                Some(image) => image,
                None => self.store.resolve(&record.image())?,
            };

            if image.dimensions() != (config.width, config.height) {
                return Err(StitchError::FrameSizeMismatch {
                    index: record.index,
                    expected_width: config.width,
                    expected_height: config.height,
                    actual_width: image.width(),
                    actual_height: image.height(),
                });
            }

            sink.write_frame(&conversion::rgb_to_bgr(&image))?;
            tracker.advance(Some(record.index));
        }

        sink.finish()?;
        staging
            .persist(video_out_path)
            .map_err(|error| StitchError::IoError(error.error))?;

        log::info!("Wrote {} frames to {}", records.len(), video_out_path.display());

        Ok(AssemblyReport {
            output: video_out_path.to_path_buf(),
            frame_count: records.len() as u64,
            width: config.width,
            height: config.height,
            fps: options.fps,
            codec: options.codec,
        })
    }
}

/// Order records by index, keeping input order among equal indices.
pub fn sort_records(mut records: Vec<IndexedImageRecord>) -> Vec<IndexedImageRecord> {
    // `sort_by_key` is stable.
    records.sort_by_key(|record| record.index);
    records
}

/// Reserve a temporary file beside `destination` with the same extension.
///
/// The extension is kept so the container format can still be inferred
/// from the staging path. The file is deleted when the returned path drops.
fn staging_path(destination: &Path) -> Result<TempPath, StitchError> {
    let directory = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let suffix = destination
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default();

    tempfile::Builder::new()
        .prefix(".framestitch-")
        .suffix(&suffix)
        .tempfile_in(directory)
        .map(|file| file.into_temp_path())
        .map_err(|error| StitchError::SinkUnavailable {
            path: destination.to_path_buf(),
            reason: format!("cannot create staging file in {}: {error}", directory.display()),
        })
}
