//! FourCC codec identifiers.
//!
//! A [`FourCc`] is passed straight through to the container writer. Common
//! tags are mapped to FFmpeg encoders here; anything else is looked up in
//! FFmpeg's own RIFF and QuickTime tag tables.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use ffmpeg_next::codec::Id;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StitchError;

/// A four-character codec code such as `mp4v` or `x264`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Validate and build a FourCC from text.
    ///
    /// # Errors
    ///
    /// [`StitchError::InvalidCodec`] unless `code` is exactly four ASCII
    /// characters.
    pub fn new(code: &str) -> Result<Self, StitchError> {
        let bytes: [u8; 4] = code
            .as_bytes()
            .try_into()
            .map_err(|_| StitchError::InvalidCodec(code.to_string()))?;
        if !bytes.iter().all(|byte| byte.is_ascii_graphic() || *byte == b' ') {
            return Err(StitchError::InvalidCodec(code.to_string()));
        }
        Ok(Self(bytes))
    }

    /// The four bytes of the code.
    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// The code as text.
    pub fn as_str(&self) -> &str {
        // Only ASCII is ever stored.
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// Little-endian tag value, as stored in AVI/MP4 headers.
    pub fn tag(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// The FFmpeg encoder to use for this FourCC, if one is known.
    pub fn codec_id(&self) -> Option<Id> {
        if let Some(id) = self.well_known_codec_id() {
            return Some(id);
        }

        let id = lookup_ffmpeg_tag(self.tag());
        (id != Id::None).then_some(id)
    }

    fn well_known_codec_id(&self) -> Option<Id> {
        let lowered = self.as_str().to_ascii_lowercase();
        let id = match lowered.as_str() {
            "x264" | "h264" | "avc1" | "avc3" => Id::H264,
            "x265" | "h265" | "hevc" | "hev1" | "hvc1" => Id::HEVC,
            "mp4v" | "fmp4" | "xvid" | "divx" | "dx50" => Id::MPEG4,
            "mjpg" | "jpeg" => Id::MJPEG,
            "vp80" => Id::VP8,
            "vp90" | "vp09" => Id::VP9,
            "av01" => Id::AV1,
            "png " | "mpng" => Id::PNG,
            "ffv1" => Id::FFV1,
            _ => return None,
        };
        Some(id)
    }
}

fn lookup_ffmpeg_tag(tag: u32) -> Id {
    // SAFETY: the tag tables are static arrays owned by libavformat and
    // terminated by a sentinel entry; `av_codec_get_id` only reads them.
    unsafe {
        let tables = [
            ffmpeg_sys_next::avformat_get_riff_video_tags(),
            ffmpeg_sys_next::avformat_get_mov_video_tags(),
            std::ptr::null(),
        ];
        Id::from(ffmpeg_sys_next::av_codec_get_id(tables.as_ptr(), tag))
    }
}

impl Default for FourCc {
    fn default() -> Self {
        Self(*b"x264")
    }
}

impl Display for FourCc {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for FourCc {
    type Err = StitchError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::new(code)
    }
}

impl Serialize for FourCc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FourCc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        FourCc::new(&code).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_four_ascii_characters() {
        assert_eq!(FourCc::new("mp4v").unwrap().as_str(), "mp4v");
        assert_eq!(FourCc::new("png ").unwrap().as_str(), "png ");
        for bad in ["", "mp4", "mp4v2", "h26\u{e9}", "ab\ncd"] {
            assert!(
                matches!(FourCc::new(bad), Err(StitchError::InvalidCodec(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn default_is_x264() {
        assert_eq!(FourCc::default().to_string(), "x264");
    }

    #[test]
    fn tag_is_little_endian() {
        let code = FourCc::new("mp4v").unwrap();
        assert_eq!(code.tag(), u32::from_le_bytes(*b"mp4v"));
    }

    #[test]
    fn maps_common_codes_case_insensitively() {
        let cases = [
            ("x264", Id::H264),
            ("H264", Id::H264),
            ("avc1", Id::H264),
            ("mp4v", Id::MPEG4),
            ("XVID", Id::MPEG4),
            ("MJPG", Id::MJPEG),
            ("hvc1", Id::HEVC),
        ];
        for (code, expected) in cases {
            assert_eq!(FourCc::new(code).unwrap().well_known_codec_id(), Some(expected));
        }
    }

    #[test]
    fn serde_uses_plain_strings() {
        let code: FourCc = serde_json::from_str(r#""mp4v""#).unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), r#""mp4v""#);
        assert!(serde_json::from_str::<FourCc>(r#""toolong""#).is_err());
    }
}
