//! Indexed image records.
//!
//! A record pairs an integer index with an image name and travels between
//! graph nodes as text: the compact JSON array `[index,"image_name"]`. The
//! index decides the frame's position in an assembled video; indices need
//! not be contiguous, start at zero, or be unique.

use serde::{Deserialize, Serialize};

use crate::{error::StitchError, store::ImageReference};

/// One `(index, image name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, String)", into = "(i64, String)")]
pub struct IndexedImageRecord {
    /// Temporal position key.
    pub index: i64,
    /// Name of the image in the store.
    pub image_name: String,
}

impl From<(i64, String)> for IndexedImageRecord {
    fn from((index, image_name): (i64, String)) -> Self {
        Self { index, image_name }
    }
}

impl From<IndexedImageRecord> for (i64, String) {
    fn from(record: IndexedImageRecord) -> Self {
        (record.index, record.image_name)
    }
}

impl IndexedImageRecord {
    /// Pair `index` with the image named by `image`.
    pub fn new(index: i64, image: &ImageReference) -> Self {
        Self {
            index,
            image_name: image.image_name().to_string(),
        }
    }

    /// Reference to the record's image.
    pub fn image(&self) -> ImageReference {
        ImageReference::new(self.image_name.clone())
    }

    /// Serialize to `[index,"image_name"]`.
    pub fn encode(&self) -> String {
        serde_json::json!([self.index, self.image_name]).to_string()
    }

    /// Parse a serialized record.
    ///
    /// # Errors
    ///
    /// [`StitchError::MalformedRecord`] (position 0) if `text` is not a
    /// two-element `[integer, string]` array.
    pub fn decode(text: &str) -> Result<Self, StitchError> {
        decode_at(text, 0)
    }
}

/// Serialize `(index, image)` into a record string.
pub fn encode_record(index: i64, image: &ImageReference) -> String {
    IndexedImageRecord::new(index, image).encode()
}

/// Parse every record of a collection, reporting the first bad position.
pub fn decode_records<S: AsRef<str>>(
    records: &[S],
) -> Result<Vec<IndexedImageRecord>, StitchError> {
    records
        .iter()
        .enumerate()
        .map(|(position, text)| decode_at(text.as_ref(), position))
        .collect()
}

fn decode_at(text: &str, position: usize) -> Result<IndexedImageRecord, StitchError> {
    serde_json::from_str::<IndexedImageRecord>(text).map_err(|error| {
        StitchError::MalformedRecord {
            position,
            reason: error.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_as_compact_json_array() {
        let encoded = encode_record(3, &ImageReference::new("imgA"));
        assert_eq!(encoded, r#"[3,"imgA"]"#);
    }

    #[test]
    fn encoding_escapes_names_and_keeps_extreme_indices() {
        let quoted = encode_record(i64::MIN, &ImageReference::new("say \"hi\"\n"));
        assert_eq!(quoted, r#"[-9223372036854775808,"say \"hi\"\n"]"#);
        let record = IndexedImageRecord::decode(&quoted).unwrap();
        assert_eq!(record.index, i64::MIN);
        assert_eq!(record.image_name, "say \"hi\"\n");
    }

    #[test]
    fn decode_recovers_index_and_name() {
        for index in [0, 1, -5, i64::MAX, i64::MIN] {
            let reference = ImageReference::new("some image \"quoted\"");
            let record = IndexedImageRecord::decode(&encode_record(index, &reference)).unwrap();
            assert_eq!(record.index, index);
            assert_eq!(record.image(), reference);
        }
    }

    #[test]
    fn decode_accepts_whitespace() {
        let record = IndexedImageRecord::decode(r#"[ 12 , "b.png" ]"#).unwrap();
        assert_eq!(record.index, 12);
        assert_eq!(record.image_name, "b.png");
    }

    #[test]
    fn rejects_wrong_shapes() {
        for text in [
            "",
            "not json",
            "[1]",
            r#"[1, "a", "b"]"#,
            r#"["1", "a"]"#,
            r#"[1.5, "a"]"#,
            r#"{"index": 1, "image_name": "a"}"#,
        ] {
            assert!(
                matches!(
                    IndexedImageRecord::decode(text),
                    Err(StitchError::MalformedRecord { position: 0, .. })
                ),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn decode_records_reports_position() {
        let records = [r#"[0,"a"]"#, r#"[1,"b"]"#, "garbage"];
        let result = decode_records(&records);
        assert!(matches!(
            result,
            Err(StitchError::MalformedRecord { position: 2, .. })
        ));
    }
}
