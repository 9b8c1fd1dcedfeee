//! Assembly configuration.
//!
//! [`AssembleOptions`] is a builder that carries the output frame rate,
//! codec, and an optional progress callback into
//! [`IndexedVideoAssembler::assemble`](crate::IndexedVideoAssembler::assemble).
//!
//! # Example
//!
//! ```
//! use framestitch::{AssembleOptions, FourCc};
//!
//! let options = AssembleOptions::default()
//!     .with_fps(24.0)
//!     .with_codec(FourCc::new("mp4v").unwrap());
//! assert_eq!(options.fps, 24.0);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::{
    codec::FourCc,
    error::StitchError,
    progress::{NoOpProgress, ProgressCallback},
};

/// Default output frame rate.
pub const DEFAULT_FPS: f64 = 30.0;

/// Options for video assembly.
///
/// Defaults: 30 fps, FourCC `x264`, no progress callback.
#[derive(Clone)]
pub struct AssembleOptions {
    /// Output frames per second.
    pub fps: f64,
    /// Output codec.
    pub codec: FourCc,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for AssembleOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AssembleOptions")
            .field("fps", &self.fps)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            codec: FourCc::default(),
            progress: Arc::new(NoOpProgress),
        }
    }
}

impl AssembleOptions {
    /// Set the output frame rate.
    #[must_use]
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Set the output codec.
    #[must_use]
    pub fn with_codec(mut self, codec: FourCc) -> Self {
        self.codec = codec;
        self
    }

    /// Attach a progress callback, invoked after every written frame.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Check the options before any I/O happens.
    ///
    /// # Errors
    ///
    /// [`StitchError::InvalidFrameRate`] unless `fps` is finite and positive.
    pub fn validate(&self) -> Result<(), StitchError> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(StitchError::InvalidFrameRate(self.fps));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_host_fields() {
        let options = AssembleOptions::default();
        assert_eq!(options.fps, 30.0);
        assert_eq!(options.codec.as_str(), "x264");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_and_non_finite_rates() {
        for fps in [0.0, -24.0, f64::NAN, f64::INFINITY] {
            let result = AssembleOptions::default().with_fps(fps).validate();
            assert!(matches!(result, Err(StitchError::InvalidFrameRate(_))), "{fps}");
        }
    }
}
