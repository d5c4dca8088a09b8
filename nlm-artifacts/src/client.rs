//! Notebook service client: listing, media download and interactive export.
//!
//! [`ArtifactSource`] is the seam between the lookup workflow and the network;
//! [`NotebookClient`] is the HTTP-backed implementation. Every request carries
//! the profile cookies that match the target host plus browser-like
//! `User-Agent`/`Referer` headers, and follows redirects up to the configured cap.
use crate::app_data::extract_app_data;
use crate::error::{ClientError, ExtractionError};
use crate::format::format_interactive_content;
use crate::locator::{extract_media_url, find_artifact, summarize};
use crate::profile::AuthProfile;
use crate::record::{ArtifactKind, ArtifactSummary};
use async_trait::async_trait;
use nlm_common::OutputFormat;
use nlm_config::ServiceConfig;
use nlm_http::{Auth, HttpClient, HttpError, RawResponse, RedirectTrace, RequestOpts};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde_json::Value;
use std::borrow::Cow;
use std::time::{Duration, Instant};
use url::Url;

/// A located artifact together with its resolved media URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDetails {
    pub summary: ArtifactSummary,
    pub media_url: String,
}

#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Raw, positional artifact entries of a notebook.
    async fn list_raw(&self, notebook_id: &str) -> Result<Vec<Value>, ClientError>;

    async fn list(&self, notebook_id: &str) -> Result<Vec<ArtifactSummary>, ClientError> {
        let artifacts = self.list_raw(notebook_id).await?;
        Ok(summarize(&artifacts))
    }

    /// Find `artifact_id` and resolve its download URL.
    async fn resolve(
        &self,
        notebook_id: &str,
        artifact_id: &str,
    ) -> Result<ArtifactDetails, ClientError> {
        let artifacts = self.list_raw(notebook_id).await?;
        let record = find_artifact(&artifacts, artifact_id)
            .ok_or_else(|| ExtractionError::NotFound(artifact_id.to_string()))?;
        let summary = ArtifactSummary {
            id: artifact_id.to_string(),
            kind: record.kind(),
            status: record.status_label(),
        };
        let media_url = extract_media_url(&record)?;
        tracing::debug!(
            notebook_id,
            artifact_id,
            kind = %summary.kind,
            status = %summary.status,
            "artifact.locate.resolved"
        );
        Ok(ArtifactDetails { summary, media_url })
    }
}

pub struct NotebookClient {
    http: HttpClient,
    profile: AuthProfile,
    service: ServiceConfig,
    browser_headers: HeaderMap,
}

impl NotebookClient {
    pub fn new(service: ServiceConfig, profile: AuthProfile) -> Result<Self, ClientError> {
        let http = HttpClient::new(&service.base_url)?
            .with_timeout(Duration::from_secs(service.timeout_secs))
            .with_retries(service.retries)
            .with_max_redirects(service.max_redirects)?;

        let mut browser_headers = HeaderMap::new();
        browser_headers.insert(USER_AGENT, header_value(&service.user_agent)?);
        browser_headers.insert(REFERER, header_value(&service.referer)?);

        if !profile.has_sid() {
            tracing::warn!(profile = %profile.name, "profile.missing_sid_cookie");
        }

        Ok(Self {
            http,
            profile,
            service,
            browser_headers,
        })
    }

    pub fn profile(&self) -> &AuthProfile {
        &self.profile
    }

    /// Download the media behind an artifact (audio preferred).
    pub async fn download_media(
        &self,
        notebook_id: &str,
        artifact_id: &str,
    ) -> Result<(ArtifactDetails, RawResponse), ClientError> {
        let details = self.resolve(notebook_id, artifact_id).await?;
        let started = Instant::now();
        let resp = self.fetch(&details.media_url).await?;
        tracing::info!(
            artifact_id,
            bytes = resp.body.len(),
            content_type = resp.content_type().unwrap_or("-"),
            redirected = resp.url.as_str() != details.media_url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "artifact.download.complete"
        );
        Ok((details, resp))
    }

    /// Fetch the interactive page of a quiz/flashcard artifact and render it.
    ///
    /// The embedded payload is extracted even for `html` output so that a
    /// login or error page is reported instead of being saved as content.
    pub async fn interactive_content(
        &self,
        notebook_id: &str,
        artifact_id: &str,
        title: &str,
        output_format: OutputFormat,
        is_quiz: bool,
    ) -> Result<String, ClientError> {
        let details = self.resolve(notebook_id, artifact_id).await?;
        if details.summary.kind != ArtifactKind::Interactive {
            tracing::warn!(
                artifact_id,
                kind = %details.summary.kind,
                "artifact.interactive.unexpected_kind"
            );
        }
        let html = self.fetch_text(&details.media_url).await?;
        let payload = extract_app_data(&html)?;
        Ok(format_interactive_content(
            &payload,
            title,
            output_format,
            &html,
            is_quiz,
        ))
    }

    /// Walk the media URL's redirect chain without downloading the body.
    pub async fn trace_media_redirects(
        &self,
        notebook_id: &str,
        artifact_id: &str,
    ) -> Result<(ArtifactDetails, RedirectTrace), ClientError> {
        let details = self.resolve(notebook_id, artifact_id).await?;
        let cookies = self.cookies_for(&details.media_url)?;
        let trace = self
            .http
            .trace_redirects(&details.media_url, self.media_opts(&cookies))
            .await?;
        tracing::info!(
            artifact_id,
            redirects = trace.redirect_count(),
            final_status = trace.last().map(|h| h.status.as_u16()).unwrap_or_default(),
            "artifact.download.traced"
        );
        Ok((details, trace))
    }

    async fn fetch(&self, url: &str) -> Result<RawResponse, ClientError> {
        let cookies = self.cookies_for(url)?;
        Ok(self.http.get_bytes(url, self.media_opts(&cookies)).await?)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ClientError> {
        let cookies = self.cookies_for(url)?;
        Ok(self.http.get_text(url, self.media_opts(&cookies)).await?)
    }

    fn cookies_for(&self, url: &str) -> Result<String, ClientError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::Url(e.to_string()))?;
        Ok(self
            .profile
            .cookie_header_for(parsed.host_str().unwrap_or_default()))
    }

    fn media_opts<'a>(&self, cookies: &'a str) -> RequestOpts<'a> {
        RequestOpts {
            auth: Some(Auth::Cookies(cookies)),
            headers: Some(self.browser_headers.clone()),
            allow_absolute: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ArtifactSource for NotebookClient {
    async fn list_raw(&self, notebook_id: &str) -> Result<Vec<Value>, ClientError> {
        let host = self.http.base().host_str().unwrap_or_default().to_string();
        let cookies = self.profile.cookie_header_for(&host);

        let mut query: Vec<(&str, Cow<'_, str>)> =
            vec![(self.service.notebook_param.as_str(), notebook_id.into())];
        if let Some(tok) = &self.profile.csrf_token {
            query.push(("at", tok.as_str().into()));
        }
        if let Some(sid) = &self.profile.session_id {
            query.push(("f.sid", sid.as_str().into()));
        }

        let listing: Value = self
            .http
            .get_json(
                &self.service.list_path,
                RequestOpts {
                    auth: Some(Auth::Cookies(&cookies)),
                    headers: Some(self.browser_headers.clone()),
                    query: Some(query),
                    ..Default::default()
                },
            )
            .await?;
        let artifacts = artifacts_from_listing(listing)?;
        tracing::debug!(notebook_id, count = artifacts.len(), "artifact.list.fetched");
        Ok(artifacts)
    }
}

/// Accept either a bare array or `{"artifacts": [...]}`.
fn artifacts_from_listing(listing: Value) -> Result<Vec<Value>, ClientError> {
    match listing {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("artifacts") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(ClientError::UnexpectedListing(format!(
                "`artifacts` is {}",
                json_kind(&other)
            ))),
        },
        other => Err(ClientError::UnexpectedListing(format!(
            "top level is {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn header_value(s: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(s)
        .map_err(|e| HttpError::Build(format!("invalid header value: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_shapes() {
        assert_eq!(artifacts_from_listing(json!([["a"]])).unwrap().len(), 1);
        assert_eq!(
            artifacts_from_listing(json!({"artifacts": [["a"], ["b"]]}))
                .unwrap()
                .len(),
            2
        );
        assert!(artifacts_from_listing(json!({})).unwrap().is_empty());
        assert!(matches!(
            artifacts_from_listing(json!("nope")),
            Err(ClientError::UnexpectedListing(_))
        ));
        assert!(matches!(
            artifacts_from_listing(json!({"artifacts": 3})),
            Err(ClientError::UnexpectedListing(_))
        ));
    }

    #[test]
    fn bad_user_agent_is_rejected() {
        let profile = AuthProfile::from_json_str(r#"{"cookies": {"SID": "a"}}"#).unwrap();
        let service = ServiceConfig {
            user_agent: "bad\nagent".into(),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            NotebookClient::new(service, profile),
            Err(ClientError::Http(HttpError::Build(_)))
        ));
    }
}
