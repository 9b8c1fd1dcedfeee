//! Image references and the image store seam.
//!
//! The crate never persists images on its own. Operations that produce or
//! consume images go through an [`ImageStore`] passed in by the caller:
//! [`MemoryImageStore`] for tests and embedding, [`DirectoryImageStore`] for
//! a PNG-per-image directory like the CLI uses.

use std::{
    collections::HashMap,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::StitchError;

/// An opaque name for an image held by an [`ImageStore`].
///
/// Serializes as `{"image_name": "..."}`. The name is only meaningful to the
/// store that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    /// Store-assigned identifier.
    pub image_name: String,
}

impl ImageReference {
    /// Wrap an identifier.
    pub fn new<S: Into<String>>(image_name: S) -> Self {
        Self {
            image_name: image_name.into(),
        }
    }

    /// The identifier this reference names.
    pub fn image_name(&self) -> &str {
        &self.image_name
    }
}

/// Project an image reference to its identifier.
pub fn extract_image_name(reference: &ImageReference) -> String {
    reference.image_name.clone()
}

/// What a store hands back after saving: the reference plus dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredImage {
    /// Reference to the saved image.
    pub image: ImageReference,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl StoredImage {
    fn describe(image_name: String, image: &RgbImage) -> Self {
        Self {
            image: ImageReference::new(image_name),
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Storage for decoded images, keyed by opaque names.
///
/// Implementations must be [`Send`] and [`Sync`]; a host may save images
/// from several graph branches at once.
pub trait ImageStore: Send + Sync {
    /// Store `image` and return a reference to it.
    fn save(&self, image: RgbImage) -> Result<StoredImage, StitchError>;

    /// Load the image named by `reference`.
    ///
    /// Returns [`StitchError::ImageNotFound`] for names the store never issued.
    fn resolve(&self, reference: &ImageReference) -> Result<RgbImage, StitchError>;
}

/// In-memory image store.
///
/// Names are sequential (`image-000000`, `image-000001`, ...).
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, RgbImage>>,
    next_id: AtomicU64,
}

impl MemoryImageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image under a caller-chosen name, replacing any previous one.
    pub fn insert<S: Into<String>>(&self, image_name: S, image: RgbImage) -> ImageReference {
        let image_name = image_name.into();
        self.images
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(image_name.clone(), image);
        ImageReference::new(image_name)
    }

    /// Number of stored images.
    pub fn len(&self) -> usize {
        self.images
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the store holds no images.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageStore for MemoryImageStore {
    fn save(&self, image: RgbImage) -> Result<StoredImage, StitchError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let image_name = format!("image-{id:06}");
        let stored = StoredImage::describe(image_name.clone(), &image);
        self.insert(image_name, image);
        Ok(stored)
    }

    fn resolve(&self, reference: &ImageReference) -> Result<RgbImage, StitchError> {
        self.images
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&reference.image_name)
            .cloned()
            .ok_or_else(|| StitchError::ImageNotFound(reference.image_name.clone()))
    }
}

/// Directory-backed image store: one PNG file per image.
///
/// The image name is the file name inside the directory.
#[derive(Debug)]
pub struct DirectoryImageStore {
    directory: PathBuf,
    next_id: AtomicU64,
}

impl DirectoryImageStore {
    /// Use `directory` as the store, creating it if necessary.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self, StitchError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            next_id: AtomicU64::new(0),
        })
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, image_name: &str) -> Result<PathBuf, StitchError> {
        let is_plain_file_name = !image_name.is_empty()
            && Path::new(image_name).file_name() == Some(OsStr::new(image_name))
            && image_name != "."
            && image_name != "..";
        if !is_plain_file_name {
            return Err(StitchError::InvalidImageName(image_name.to_string()));
        }
        Ok(self.directory.join(image_name))
    }
}

impl ImageStore for DirectoryImageStore {
    fn save(&self, image: RgbImage) -> Result<StoredImage, StitchError> {
        // Skip names already taken by earlier sessions in the same directory.
        let (image_name, path) = loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let image_name = format!("image-{id:06}.png");
            let path = self.directory.join(&image_name);
            if !path.exists() {
                break (image_name, path);
            }
        };

        image.save(&path)?;
        log::debug!("Saved {}x{} image to {}", image.width(), image.height(), path.display());
        Ok(StoredImage::describe(image_name, &image))
    }

    fn resolve(&self, reference: &ImageReference) -> Result<RgbImage, StitchError> {
        let path = self.path_for(&reference.image_name)?;
        if !path.is_file() {
            return Err(StitchError::ImageNotFound(reference.image_name.clone()));
        }
        Ok(image::open(&path)?.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryImageStore::new();
        let image = RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]));
        let stored = store.save(image.clone()).unwrap();

        assert_eq!((stored.width, stored.height), (4, 3));
        assert_eq!(store.resolve(&stored.image).unwrap(), image);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_store_names_are_unique() {
        let store = MemoryImageStore::new();
        let first = store.save(RgbImage::new(1, 1)).unwrap();
        let second = store.save(RgbImage::new(1, 1)).unwrap();
        assert_ne!(first.image, second.image);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let store = MemoryImageStore::new();
        let result = store.resolve(&ImageReference::new("nope"));
        assert!(matches!(result, Err(StitchError::ImageNotFound(name)) if name == "nope"));
    }

    #[test]
    fn directory_store_round_trip() {
        let directory = tempfile::tempdir().unwrap();
        let store = DirectoryImageStore::open(directory.path()).unwrap();
        let image = RgbImage::from_pixel(5, 2, Rgb([250, 0, 17]));

        let stored = store.save(image.clone()).unwrap();
        assert!(directory.path().join(stored.image.image_name()).is_file());
        assert_eq!(store.resolve(&stored.image).unwrap(), image);
    }

    #[test]
    fn directory_store_does_not_overwrite_existing_files() {
        let directory = tempfile::tempdir().unwrap();
        let first = DirectoryImageStore::open(directory.path())
            .unwrap()
            .save(RgbImage::new(1, 1))
            .unwrap();
        let second = DirectoryImageStore::open(directory.path())
            .unwrap()
            .save(RgbImage::new(2, 2))
            .unwrap();
        assert_ne!(first.image, second.image);
    }

    #[test]
    fn directory_store_rejects_path_traversal() {
        let directory = tempfile::tempdir().unwrap();
        let store = DirectoryImageStore::open(directory.path()).unwrap();
        for name in ["../escape.png", "nested/image.png", "", ".."] {
            let result = store.resolve(&ImageReference::new(name));
            assert!(
                matches!(result, Err(StitchError::InvalidImageName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn extract_image_name_projects_identifier() {
        let reference = ImageReference::new("frame-42.png");
        assert_eq!(extract_image_name(&reference), "frame-42.png");
    }
}
