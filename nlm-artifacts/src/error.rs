use nlm_common::NlmError;
use nlm_http::HttpError;
use thiserror::Error;

/// Failures while locating an artifact or decoding its embedded payload.
///
/// Every malformed-data condition in the locator and the app-data extractor
/// is converted into one of these variants; no indexing or type fault escapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("artifact {0} not found")]
    NotFound(String),
    #[error("artifact record has no metadata sequence at index 6")]
    MalformedRecord,
    #[error("artifact metadata has no media list at index 5")]
    MalformedMetadata,
    #[error("no download URL found in artifact metadata")]
    NoDownloadUrl,
    #[error("no data-app-data attribute found in page")]
    PatternNotFound,
    #[error("embedded app data is not valid JSON: {0}")]
    InvalidPayloadJson(String),
}

impl From<ExtractionError> for NlmError {
    fn from(e: ExtractionError) -> Self {
        NlmError::Extraction(e.to_string())
    }
}

/// Errors surfaced by [`crate::NotebookClient`] and the [`crate::ArtifactSource`] workflows.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Common(#[from] NlmError),
    #[error("unexpected artifact listing shape: {0}")]
    UnexpectedListing(String),
}

impl ClientError {
    pub fn hint(&self) -> Option<String> {
        match self {
            ClientError::Http(e) if e.is_redirect_loop() => Some(
                "The service kept redirecting; the saved cookies are probably expired. \
                 Refresh the profile and retry."
                    .into(),
            ),
            ClientError::Common(e) => e.hint(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_loop_has_refresh_hint() {
        let err = ClientError::from(HttpError::TooManyRedirects {
            limit: 20,
            host_path: "notebooklm.google.com/".into(),
        });
        assert!(err.hint().unwrap().contains("expired"));
    }

    #[test]
    fn extraction_errors_convert_into_common_error() {
        let err: NlmError = ExtractionError::NoDownloadUrl.into();
        assert!(err.to_string().contains("no download URL"));
    }
}
