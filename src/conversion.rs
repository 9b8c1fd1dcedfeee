//! Channel-order conversion between the video library and the image store.
//!
//! The FFmpeg side of the crate reads and writes packed BGR24 buffers
//! ([`BgrFrame`]); the image store works in RGB ([`image::RgbImage`]). Every
//! crossing between the two goes through this module.

use image::RgbImage;

use crate::error::StitchError;

/// A tightly-packed BGR24 raster, the channel order the video library uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 3` bytes, row-major, no padding.
    pub data: Vec<u8>,
}

impl BgrFrame {
    /// Wrap a packed BGR24 buffer, checking its length.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 3;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }
}

fn swap_red_blue(data: &mut [u8]) {
    for pixel in data.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }
}

/// Convert an RGB image into the BGR order expected by the video sink.
pub fn rgb_to_bgr(image: &RgbImage) -> BgrFrame {
    let mut data = image.as_raw().clone();
    swap_red_blue(&mut data);
    BgrFrame {
        width: image.width(),
        height: image.height(),
        data,
    }
}

/// Convert a decoded BGR frame into the RGB order expected by the image store.
pub fn bgr_to_rgb(frame: BgrFrame) -> Result<RgbImage, StitchError> {
    let BgrFrame {
        width,
        height,
        mut data,
    } = frame;
    swap_red_blue(&mut data);
    RgbImage::from_raw(width, height, data).ok_or_else(|| {
        StitchError::FfmpegError(format!(
            "decoded buffer does not match {width}x{height} RGB dimensions"
        ))
    })
}
