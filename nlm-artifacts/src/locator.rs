use crate::error::ExtractionError;
use crate::record::{ArtifactRecord, ArtifactSummary};
use serde_json::Value;

const URL_IDX: usize = 0;
const MEDIA_TYPE_IDX: usize = 2;
const AUDIO_MARKER: &str = "audio";

/// First record whose element 0 equals `artifact_id`.
///
/// Malformed neighbours (non-arrays, empty arrays, non-string ids) are skipped.
pub fn find_artifact<'a>(artifacts: &'a [Value], artifact_id: &str) -> Option<ArtifactRecord<'a>> {
    artifacts
        .iter()
        .filter_map(ArtifactRecord::from_value)
        .find(|rec| rec.field(0).and_then(Value::as_str) == Some(artifact_id))
}

/// Listing-friendly projection; entries without a string id are dropped.
pub fn summarize(artifacts: &[Value]) -> Vec<ArtifactSummary> {
    artifacts
        .iter()
        .filter_map(ArtifactRecord::from_value)
        .filter_map(|rec| rec.summary())
        .collect()
}

/// Resolve the download URL of an artifact from `metadata[5]`.
///
/// The first candidate whose type marker mentions `audio` wins. Without one,
/// the first candidate's URL is used, which may not be audio at all.
pub fn extract_media_url(record: &ArtifactRecord<'_>) -> Result<String, ExtractionError> {
    let candidates = record.media_candidates()?;

    let tagged = candidates
        .iter()
        .filter_map(Value::as_array)
        .find(|c| c.get(MEDIA_TYPE_IDX).is_some_and(is_audio_marker))
        .and_then(|c| url_of(c));
    if let Some(url) = tagged {
        return Ok(url);
    }

    let fallback = candidates
        .first()
        .and_then(Value::as_array)
        .and_then(|c| url_of(c))
        .ok_or(ExtractionError::NoDownloadUrl)?;
    tracing::warn!(
        artifact_id = record.id().unwrap_or("-"),
        candidates = candidates.len(),
        "artifact.locate.fallback_non_audio"
    );
    Ok(fallback)
}

fn is_audio_marker(marker: &Value) -> bool {
    match marker {
        Value::String(s) => s.contains(AUDIO_MARKER),
        other => other.to_string().contains(AUDIO_MARKER),
    }
}

fn url_of(candidate: &[Value]) -> Option<String> {
    candidate
        .get(URL_IDX)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
