use nlm_artifacts::{ArtifactSource, AuthProfile, ClientError, ExtractionError, NotebookClient};
use nlm_common::OutputFormat;
use nlm_config::ServiceConfig;
use nlm_http::HttpError;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUIZ_PAGE: &str = r#"<html><body><div id="app" data-app-data="{&quot;quiz&quot;:[{&quot;question&quot;:&quot;What is 2+2?&quot;,&quot;answerOptions&quot;:[{&quot;text&quot;:&quot;3&quot;,&quot;isCorrect&quot;:false},{&quot;text&quot;:&quot;4&quot;,&quot;isCorrect&quot;:true}],&quot;hint&quot;:&quot;Count on your fingers&quot;}]}"></div></body></html>"#;

fn profile() -> AuthProfile {
    AuthProfile::from_json_str(
        r#"{
            "name": "test",
            "csrf_token": "csrf-1",
            "cookies": [
                {"name": "SID", "value": "sid-1", "domain": "127.0.0.1"},
                {"name": "OTHER", "value": "x", "domain": ".elsewhere.com"}
            ]
        }"#,
    )
    .unwrap()
}

fn client(server: &MockServer) -> NotebookClient {
    let service = ServiceConfig {
        base_url: format!("{}/", server.uri()),
        referer: format!("{}/", server.uri()),
        timeout_secs: 5,
        retries: 0,
        max_redirects: 3,
        ..ServiceConfig::default()
    };
    NotebookClient::new(service, profile()).unwrap()
}

async fn mount_listing(server: &MockServer, media: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/artifacts"))
        .and(query_param("notebook_id", "nb-1"))
        .and(query_param("at", "csrf-1"))
        .and(header("cookie", "SID=sid-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["art-1", "Artifact", 1, null, 3, null, [null, null, null, null, null, media]]
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn downloads_audio_with_cookies_and_browser_headers() {
    let server = MockServer::start().await;
    let audio_url = format!("{}/media/audio.m4a", server.uri());
    mount_listing(
        &server,
        json!([
            [format!("{}/media/video.mp4", server.uri()), null, "video/mp4"],
            [audio_url, null, "audio/mp4"]
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/media/audio.m4a"))
        .and(header("cookie", "SID=sid-1"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mp4")
                .set_body_bytes(vec![0u8; 16]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (details, resp) = client(&server).download_media("nb-1", "art-1").await.unwrap();
    assert!(details.media_url.ends_with("/media/audio.m4a"));
    assert_eq!(resp.body.len(), 16);
    assert_eq!(resp.content_type(), Some("audio/mp4"));
}

#[tokio::test]
async fn redirect_loop_surfaces_as_too_many_redirects() {
    let server = MockServer::start().await;
    let loop_url = format!("{}/media/loop", server.uri());
    mount_listing(&server, json!([[loop_url.clone(), null, "audio/mp4"]])).await;
    Mock::given(method("GET"))
        .and(path("/media/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", loop_url.as_str()))
        .mount(&server)
        .await;

    let err = client(&server)
        .download_media("nb-1", "art-1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Http(HttpError::TooManyRedirects { limit: 3, .. })
    ));
    assert!(err.hint().is_some());
}

#[tokio::test]
async fn exports_quiz_as_markdown() {
    let server = MockServer::start().await;
    let page_url = format!("{}/pages/quiz", server.uri());
    mount_listing(&server, json!([[page_url, null, "text/html"]])).await;
    Mock::given(method("GET"))
        .and(path("/pages/quiz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(QUIZ_PAGE))
        .mount(&server)
        .await;

    let c = client(&server);
    let md = c
        .interactive_content("nb-1", "art-1", "Math Quiz", OutputFormat::Markdown, true)
        .await
        .unwrap();
    assert!(md.contains("## Question 1"));
    assert!(md.contains("[x] 4"));
    assert!(md.contains("**Hint:** Count on your fingers"));

    let html = c
        .interactive_content("nb-1", "art-1", "Math Quiz", OutputFormat::Html, true)
        .await
        .unwrap();
    assert_eq!(html, QUIZ_PAGE);
}

#[tokio::test]
async fn login_page_is_pattern_not_found() {
    let server = MockServer::start().await;
    let page_url = format!("{}/pages/login", server.uri());
    mount_listing(&server, json!([[page_url, null, "text/html"]])).await;
    Mock::given(method("GET"))
        .and(path("/pages/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Sign in</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .interactive_content("nb-1", "art-1", "T", OutputFormat::Html, false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Extraction(ExtractionError::PatternNotFound)
    ));
}

#[tokio::test]
async fn listing_uses_cookie_auth() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([])).await;

    let summaries = client(&server).list("nb-1").await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, "art-1");
}

#[tokio::test]
async fn traces_media_redirect_chain() {
    let server = MockServer::start().await;
    let start = format!("{}/media/start", server.uri());
    mount_listing(&server, json!([[start, null, "audio/mp4"]])).await;
    Mock::given(method("GET"))
        .and(path("/media/start"))
        .and(header("cookie", "SID=sid-1"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/media/hop"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/hop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/media/audio.m4a"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/audio.m4a"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 8]))
        .mount(&server)
        .await;

    let (details, trace) = client(&server)
        .trace_media_redirects("nb-1", "art-1")
        .await
        .unwrap();
    assert!(details.media_url.ends_with("/media/start"));
    assert_eq!(trace.redirect_count(), 2);
    assert_eq!(
        trace.first().and_then(|h| h.location.as_deref()),
        Some("/media/hop")
    );
    assert_eq!(trace.last().map(|h| h.status.as_u16()), Some(200));
}
