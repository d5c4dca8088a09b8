//! Pull the interactive payload out of a rendered quiz/flashcard page.
//!
//! The page is generated by the service and always quotes the attribute the
//! same way, so a regex over the raw HTML is enough. Callers only see
//! [`extract_app_data`]; the matching strategy can change behind it.
use crate::error::ExtractionError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static APP_DATA_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-app-data="([^"]+)""#).expect("app-data pattern is a valid regex")
});

/// Decode the `data-app-data="..."` attribute of `page_html` as JSON.
///
/// ```
/// use nlm_artifacts::extract_app_data;
///
/// let html = r#"<div data-app-data="{&quot;flashcards&quot;:[]}"></div>"#;
/// let data = extract_app_data(html).unwrap();
/// assert!(data["flashcards"].as_array().unwrap().is_empty());
/// ```
pub fn extract_app_data(page_html: &str) -> Result<Value, ExtractionError> {
    let encoded = APP_DATA_ATTR
        .captures(page_html)
        .and_then(|c| c.get(1))
        .ok_or(ExtractionError::PatternNotFound)?
        .as_str();

    let decoded = html_escape::decode_html_entities(encoded);
    serde_json::from_str(&decoded).map_err(|e| {
        tracing::warn!(
            error = %e,
            payload_len = decoded.len(),
            "artifact.app_data.invalid_json"
        );
        ExtractionError::InvalidPayloadJson(e.to_string())
    })
}
