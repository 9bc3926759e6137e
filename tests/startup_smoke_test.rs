mod common;

use common::*;
use tokio::net::TcpListener;
use toolbox_hub::app::server;

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let h = harness();
    tokio::spawn(server::serve(listener, h.state));
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_server_answers_health_check() {
    let base = spawn_server().await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_server_synthesizes_over_http() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/tts", base))
        .query(&[("text", "Hello world!"), ("rate", "100")])
        .header("X-API-Key", TEST_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "audio/wav"
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), FAKE_WAV);

    let rejected = client
        .post(format!("{}/tts?text=hi", base))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_state_from_default_config_persists_key() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = toolbox_hub::HubConfig::default();
    config.auth.key_file = dir.path().join(".api_key").display().to_string();
    config.auth.api_key = Some("configured-key".to_string());

    let state = toolbox_hub::AppState::from_config(&config).unwrap();
    assert_eq!(state.api_key.expose(), "configured-key");
    assert!(!dir.path().join(".api_key").exists());
    assert_eq!(state.options.public_url, "http://localhost:10000");
}
