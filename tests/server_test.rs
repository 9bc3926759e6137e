mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use toolbox_hub::{router, ServerOptions};
use tower::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn tts_request(uri: &str, key: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, _, body) = send(router(h.state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn test_index_page_embeds_key_and_base_url() {
    let options = ServerOptions {
        public_url: "http://31.220.75.241:9001".to_string(),
        ..ServerOptions::default()
    };
    let h = harness_with(options, Some("en"));
    let request = Request::get("/").body(Body::empty()).unwrap();
    let (status, headers, body) = send(router(h.state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains(TEST_KEY));
    assert!(html.contains("http://31.220.75.241:9001/tts"));
}

#[tokio::test]
async fn test_tts_requires_api_key() {
    let h = harness();
    let app = router(h.state.clone());

    let (status, _, body) = send(app.clone(), tts_request("/tts?text=hi", None, Body::empty())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["detail"], "Invalid or missing API key");

    let (status, _, _) = send(app, tts_request("/tts?text=hi", Some("wrong"), Body::empty())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.synthesizer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_tts_returns_wav_from_query_params() {
    let h = harness();
    let request = tts_request("/tts?text=Hello%20world!&rate=120", Some(TEST_KEY), Body::empty());
    let (status, headers, body) = send(router(h.state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/wav");
    assert_eq!(body, FAKE_WAV);

    let requests = h.synthesizer.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, "Hello world!");
    assert_eq!(requests[0].rate.wpm(), 120);
}

#[tokio::test]
async fn test_tts_uses_default_rate() {
    let h = harness();
    let request = tts_request("/tts?text=hi", Some(TEST_KEY), Body::empty());
    let (status, _, _) = send(router(h.state), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.synthesizer.requests.lock().unwrap()[0].rate.wpm(), 100);
}

#[tokio::test]
async fn test_tts_accepts_json_body() {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/tts")
        .header("X-API-Key", TEST_KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text": "Hello world!", "rate": 180}"#))
        .unwrap();
    let (status, _, _) = send(router(h.state), request).await;

    assert_eq!(status, StatusCode::OK);
    let requests = h.synthesizer.requests.lock().unwrap();
    assert_eq!(requests[0].text, "Hello world!");
    assert_eq!(requests[0].rate.wpm(), 180);
}

#[tokio::test]
async fn test_tts_rejects_out_of_range_rate() {
    let h = harness();
    for rate in [59, 201] {
        let uri = format!("/tts?text=hi&rate={}", rate);
        let (status, _, body) =
            send(router(h.state.clone()), tts_request(&uri, Some(TEST_KEY), Body::empty())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["detail"], "Rate must be 60–200 WPM");
    }
    assert!(h.synthesizer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_tts_malformed_rate_is_json_error() {
    let h = harness();
    let app = router(h.state);

    let (status, _, body) = send(app.clone(), tts_request("/tts?text=hi&rate=abc", None, Body::empty())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["detail"], "Invalid or missing API key");

    let (status, headers, body) = send(
        app,
        tts_request("/tts?text=hi&rate=abc", Some(TEST_KEY), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(json(&body)["detail"].as_str().unwrap().contains("rate"));
}

#[tokio::test]
async fn test_tts_returns_busy_when_queue_times_out() {
    let options = ServerOptions {
        queue_timeout: Duration::from_millis(50),
        ..ServerOptions::default()
    };
    let synthesizer = Arc::new(BlockingSynthesizer::default());
    let app = router(single_slot_state(options, synthesizer.clone()));

    let first = tokio::spawn(
        app.clone()
            .oneshot(tts_request("/tts?text=first", Some(TEST_KEY), Body::empty())),
    );
    synthesizer.started.notified().await;

    let (status, _, body) = send(
        app,
        tts_request("/tts?text=second", Some(TEST_KEY), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json(&body)["detail"]
        .as_str()
        .unwrap()
        .starts_with("Service busy"));

    synthesizer.release.notify_one();
    let response = first.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tts_requires_text() {
    let h = harness();
    let (status, _, body) =
        send(router(h.state), tts_request("/tts", Some(TEST_KEY), Body::empty())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["detail"], "Field 'text' is required");
}

#[tokio::test]
async fn test_tts_rejects_blank_text() {
    let h = harness();
    let (status, _, _) = send(
        router(h.state),
        tts_request("/tts?text=%20%20", Some(TEST_KEY), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_key_endpoint() {
    let h = harness();
    let request = Request::get("/key").body(Body::empty()).unwrap();
    let (status, _, body) = send(router(h.state), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["api_key"], TEST_KEY);
}

#[tokio::test]
async fn test_key_endpoint_can_be_disabled() {
    let options = ServerOptions {
        expose_key_endpoint: false,
        ..ServerOptions::default()
    };
    let h = harness_with(options, Some("en"));
    let request = Request::get("/key").body(Body::empty()).unwrap();
    let (status, _, body) = send(router(h.state), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!String::from_utf8(body).unwrap().contains(TEST_KEY));
}

fn transcribe_request(uri: &str, key: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn test_transcribe_english_upload() {
    let h = harness();
    let body = multipart_body("file", "clip.mp4", b"hello   from the hub");
    let (status, _, body) = send(
        router(h.state),
        transcribe_request("/transcribe", Some(TEST_KEY), body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value = json(&body);
    assert_eq!(value["transcript"], "hello from the hub");
    assert_eq!(value["language"], "en");
    assert_eq!(
        h.transcriber.models.lock().unwrap().clone(),
        vec!["tiny".to_string(), "small.en".to_string()]
    );
}

#[tokio::test]
async fn test_transcribe_non_english_uses_multilingual_model() {
    let h = harness_with(ServerOptions::default(), Some("es"));
    let body = multipart_body("file", "../../clip.mp4", b"hola mundo");
    let (status, _, body) = send(
        router(h.state),
        transcribe_request("/transcribe?device=cuda", Some(TEST_KEY), body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["language"], "es");
    assert_eq!(h.transcriber.models.lock().unwrap()[1], "small");
}

#[tokio::test]
async fn test_transcribe_requires_api_key() {
    let h = harness();
    let body = multipart_body("file", "clip.mp4", b"hello");
    let (status, _, _) = send(router(h.state), transcribe_request("/transcribe", None, body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(h.transcriber.models.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transcribe_rejects_unknown_device() {
    let h = harness();
    let body = multipart_body("file", "clip.mp4", b"hello");
    let (status, _, body) = send(
        router(h.state),
        transcribe_request("/transcribe?device=tpu", Some(TEST_KEY), body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["detail"].as_str().unwrap().contains("tpu"));
}

#[tokio::test]
async fn test_transcribe_requires_file_field() {
    let h = harness();
    let body = multipart_body("attachment", "clip.mp4", b"hello");
    let (status, _, body) = send(
        router(h.state),
        transcribe_request("/transcribe", Some(TEST_KEY), body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["detail"], "Multipart field 'file' is required");
}

#[tokio::test]
async fn test_transcribe_upload_named_like_scratch_audio() {
    let h = harness();
    let body = multipart_body("file", "audio_full.wav", b"hello from the hub");
    let (status, _, body) = send(
        router(h.state),
        transcribe_request("/transcribe", Some(TEST_KEY), body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["transcript"], "hello from the hub");
}

#[tokio::test]
async fn test_transcribe_non_multipart_body_is_json_error() {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/transcribe")
        .header("X-API-Key", TEST_KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file": "clip.mp4"}"#))
        .unwrap();
    let (status, headers, body) = send(router(h.state), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(json(&body)["detail"].is_string());
    assert!(h.transcriber.models.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transcribe_checks_key_before_parsing_body() {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/transcribe?device=tpu")
        .body(Body::from("not multipart"))
        .unwrap();
    let (status, _, body) = send(router(h.state), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["detail"], "Invalid or missing API key");
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let h = harness();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/tts")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-api-key")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(router(h.state), request).await;

    assert!(status.is_success());
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
