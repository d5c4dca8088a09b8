use async_trait::async_trait;
use nlm_artifacts::{ArtifactKind, ArtifactSource, ClientError, ExtractionError};
use serde_json::{Value, json};

struct FixedListing(Vec<Value>);

#[async_trait]
impl ArtifactSource for FixedListing {
    async fn list_raw(&self, _notebook_id: &str) -> Result<Vec<Value>, ClientError> {
        Ok(self.0.clone())
    }
}

fn listing() -> FixedListing {
    FixedListing(vec![
        json!("garbage"),
        json!([]),
        json!([
            "quiz-1",
            "Chapter quiz",
            4,
            null,
            3,
            null,
            [null, null, null, null, null, [
                ["https://pages.example.com/quiz-1", null, "text/html"]
            ]]
        ]),
        json!([
            "audio-1",
            "Deep dive",
            1,
            null,
            3,
            null,
            [null, null, null, null, null, [
                ["https://media.example.com/v.mp4", null, "video/mp4"],
                ["https://media.example.com/a.m4a", null, "audio/mp4"]
            ]]
        ]),
        json!(["broken-1", "No metadata", 1]),
    ])
}

#[tokio::test]
async fn list_skips_malformed_entries() {
    let out = listing().list("nb").await.unwrap();
    let ids: Vec<&str> = out.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["quiz-1", "audio-1", "broken-1"]);
    assert_eq!(out[1].kind, ArtifactKind::Audio);
    assert_eq!(out[1].status, "3");
}

#[tokio::test]
async fn resolve_prefers_audio_candidate() {
    let details = listing().resolve("nb", "audio-1").await.unwrap();
    assert_eq!(details.media_url, "https://media.example.com/a.m4a");
    assert_eq!(details.summary.kind, ArtifactKind::Audio);
}

#[tokio::test]
async fn resolve_falls_back_for_interactive_pages() {
    let details = listing().resolve("nb", "quiz-1").await.unwrap();
    assert_eq!(details.media_url, "https://pages.example.com/quiz-1");
    assert_eq!(details.summary.kind, ArtifactKind::Interactive);
}

#[tokio::test]
async fn unknown_artifact_is_not_found() {
    let err = listing().resolve("nb", "missing").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Extraction(ExtractionError::NotFound(ref id)) if id == "missing"
    ));
}

#[tokio::test]
async fn record_without_metadata_is_malformed() {
    let err = listing().resolve("nb", "broken-1").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Extraction(ExtractionError::MalformedRecord)
    ));
}
