//! Checked view over one raw artifact entry of the listing response.
//!
//! Known positions: 0 = identifier, 2 = type tag, 4 = status tag,
//! 6 = metadata. Nothing else about the shape is guaranteed, so every
//! accessor returns `Option`/`Result` instead of indexing.
use crate::error::ExtractionError;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

const ID_IDX: usize = 0;
const KIND_IDX: usize = 2;
const STATUS_IDX: usize = 4;
const METADATA_IDX: usize = 6;
const MEDIA_IDX: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct ArtifactRecord<'a> {
    fields: &'a [Value],
}

impl<'a> ArtifactRecord<'a> {
    /// Wrap a raw entry; `None` unless it is a non-empty array.
    pub fn from_value(v: &'a Value) -> Option<Self> {
        match v.as_array() {
            Some(fields) if !fields.is_empty() => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn field(&self, idx: usize) -> Option<&'a Value> {
        self.fields.get(idx)
    }

    pub fn id(&self) -> Option<&'a str> {
        self.field(ID_IDX).and_then(Value::as_str)
    }

    pub fn kind(&self) -> ArtifactKind {
        self.field(KIND_IDX)
            .map(ArtifactKind::from_tag)
            .unwrap_or(ArtifactKind::Unknown)
    }

    pub fn status(&self) -> Option<&'a Value> {
        self.field(STATUS_IDX)
    }

    /// Status rendered for display; `N/A` when absent.
    pub fn status_label(&self) -> String {
        match self.status() {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn metadata(&self) -> Result<&'a [Value], ExtractionError> {
        self.field(METADATA_IDX)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or(ExtractionError::MalformedRecord)
    }

    /// Candidate media entries (`metadata[5]`).
    pub fn media_candidates(&self) -> Result<&'a [Value], ExtractionError> {
        self.metadata()?
            .get(MEDIA_IDX)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or(ExtractionError::MalformedMetadata)
    }

    pub fn summary(&self) -> Option<ArtifactSummary> {
        Some(ArtifactSummary {
            id: self.id()?.to_string(),
            kind: self.kind(),
            status: self.status_label(),
        })
    }
}

/// Artifact category decoded from the numeric type tag.
///
/// Serializes as its `Display` form (`"audio"`, `"type-9"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Audio,
    Report,
    Video,
    /// Quiz or flashcards.
    Interactive,
    Other(i64),
    Unknown,
}

impl ArtifactKind {
    pub fn from_tag(tag: &Value) -> Self {
        match tag.as_i64() {
            Some(1) => ArtifactKind::Audio,
            Some(2) => ArtifactKind::Report,
            Some(3) => ArtifactKind::Video,
            Some(4) => ArtifactKind::Interactive,
            Some(code) => ArtifactKind::Other(code),
            None => ArtifactKind::Unknown,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Audio => f.write_str("audio"),
            ArtifactKind::Report => f.write_str("report"),
            ArtifactKind::Video => f.write_str("video"),
            ArtifactKind::Interactive => f.write_str("interactive"),
            ArtifactKind::Other(code) => write!(f, "type-{code}"),
            ArtifactKind::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for ArtifactKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub id: String,
    pub kind: ArtifactKind,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_arrays_and_empty_arrays() {
        assert!(ArtifactRecord::from_value(&json!({"id": "x"})).is_none());
        assert!(ArtifactRecord::from_value(&json!([])).is_none());
        assert!(ArtifactRecord::from_value(&json!("a1")).is_none());
        assert!(ArtifactRecord::from_value(&json!(["a1"])).is_some());
    }

    #[test]
    fn short_record_has_no_metadata() {
        let v = json!(["a1", null, 1]);
        let rec = ArtifactRecord::from_value(&v).unwrap();
        assert_eq!(rec.id(), Some("a1"));
        assert_eq!(rec.kind(), ArtifactKind::Audio);
        assert_eq!(rec.status_label(), "N/A");
        assert_eq!(rec.metadata(), Err(ExtractionError::MalformedRecord));
    }

    #[test]
    fn metadata_of_wrong_type_is_malformed_record() {
        let v = json!(["a1", null, 1, null, 3, null, "not-a-list"]);
        let rec = ArtifactRecord::from_value(&v).unwrap();
        assert_eq!(rec.metadata(), Err(ExtractionError::MalformedRecord));
    }

    #[test]
    fn media_of_wrong_type_is_malformed_metadata() {
        let v = json!(["a1", null, 1, null, 3, null, [0, 1, 2, 3, 4, {"url": "x"}]]);
        let rec = ArtifactRecord::from_value(&v).unwrap();
        assert_eq!(
            rec.media_candidates(),
            Err(ExtractionError::MalformedMetadata)
        );
    }

    #[test]
    fn kind_tags_decode() {
        assert_eq!(ArtifactKind::from_tag(&json!(4)), ArtifactKind::Interactive);
        assert_eq!(ArtifactKind::from_tag(&json!(9)), ArtifactKind::Other(9));
        assert_eq!(ArtifactKind::from_tag(&json!("audio")), ArtifactKind::Unknown);
        assert_eq!(ArtifactKind::Other(9).to_string(), "type-9");
    }

    #[test]
    fn kind_serializes_like_display() {
        let summary = ArtifactSummary {
            id: "x".into(),
            kind: ArtifactKind::Other(9),
            status: "3".into(),
        };
        let v = serde_json::to_value(&summary).unwrap();
        assert_eq!(v["kind"], json!("type-9"));
        assert_eq!(serde_json::to_value(ArtifactKind::Audio).unwrap(), json!("audio"));
    }

    #[test]
    fn summary_requires_string_id() {
        let v = json!([42, null, 1]);
        let rec = ArtifactRecord::from_value(&v).unwrap();
        assert!(rec.summary().is_none());

        let v = json!(["a1", null, 3, null, "READY"]);
        let s = ArtifactRecord::from_value(&v).unwrap().summary().unwrap();
        assert_eq!(s.kind, ArtifactKind::Video);
        assert_eq!(s.status, "READY");
    }
}
