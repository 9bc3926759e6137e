use crate::app::page;
use crate::app::server::AppState;
use crate::core::stt::UploadScratch;
use crate::domain::model::{Device, SpeechRate, SynthesisRequest, Transcript};
use crate::utils::error::{HubError, Result};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct TtsParams {
    pub text: Option<String>,
    pub rate: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TranscribeParams {
    pub device: Option<String>,
}

fn api_key_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

// 擷取失敗在驗證 API key 之後才回報，並統一成 JSON detail
fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|e| HubError::invalid_request(e.body_text()))
}

/// Query parameters win; a JSON body fills in whatever the query left out.
pub fn merge_tts_params(query: TtsParams, body: &[u8]) -> Result<TtsParams> {
    if query.text.is_some() && query.rate.is_some() {
        return Ok(query);
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(query);
    }
    let from_body: TtsParams = serde_json::from_slice(body)
        .map_err(|e| HubError::invalid_request(format!("Invalid JSON body: {}", e)))?;
    Ok(TtsParams {
        text: query.text.or(from_body.text),
        rate: query.rate.or(from_body.rate),
    })
}

pub async fn root(State(state): State<AppState>) -> Html<String> {
    Html(page::render(
        state.api_key.expose(),
        &state.options.public_url,
        state.options.default_rate,
    ))
}

pub async fn tts(
    State(state): State<AppState>,
    query: std::result::Result<Query<TtsParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    state.api_key.verify(api_key_header(&headers))?;

    let params = merge_tts_params(query_params(query)?, &body)?;
    let text = params
        .text
        .ok_or_else(|| HubError::invalid_request("Field 'text' is required"))?;
    let rate = match params.rate {
        Some(wpm) => SpeechRate::new(wpm)?,
        None => state.options.default_rate,
    };
    let request = SynthesisRequest::new(&text, rate)?;

    let _permit = state.acquire_job().await?;
    let audio = state.synthesizer.synthesize(&request).await?;
    tracing::info!("🔊 Synthesized {} bytes at {}", audio.len(), request.rate);

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (header::CONTENT_DISPOSITION, "inline; filename=\"speech.wav\""),
        ],
        audio,
    )
        .into_response())
}

pub async fn show_key(State(state): State<AppState>) -> Result<Json<Value>> {
    if !state.options.expose_key_endpoint {
        return Err(HubError::NotFound {
            path: "/key".to_string(),
        });
    }
    Ok(Json(json!({ "api_key": state.api_key.expose() })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn transcribe(
    State(state): State<AppState>,
    query: std::result::Result<Query<TranscribeParams>, QueryRejection>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Transcript>> {
    state.api_key.verify(api_key_header(&headers))?;

    let params = query_params(query)?;
    let device = match params.device.as_deref() {
        Some(raw) => raw.parse::<Device>()?,
        None => Device::default(),
    };
    let mut multipart = multipart.map_err(|e| HubError::invalid_request(e.body_text()))?;

    // 先取得工作名額再讀取上傳內容，排隊中的請求不會佔用磁碟或記憶體
    let _permit = state.acquire_job().await?;

    let mut scratch: Option<UploadScratch> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| HubError::invalid_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let mut upload = UploadScratch::create(field.file_name()).await?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| HubError::invalid_request(format!("Failed to read upload: {}", e)))?
        {
            upload.write_chunk(&chunk).await?;
        }
        scratch = Some(upload);
        break;
    }
    let mut scratch =
        scratch.ok_or_else(|| HubError::invalid_request("Multipart field 'file' is required"))?;

    tracing::info!(
        "🎧 Transcribing upload {} ({} bytes) on {}",
        scratch.input().display(),
        scratch.bytes_written(),
        device
    );

    let transcript = state.pipeline.run_staged(&mut scratch, device).await?;
    Ok(Json(transcript))
}
