#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use toolbox_hub::core::{AudioExtractor, SpeechSynthesizer, SynthesisRequest, Transcriber};
use toolbox_hub::domain::model::{DecodeOptions, Segment};
use toolbox_hub::{ApiKey, AppState, PipelineSettings, Result, ServerOptions, TranscriptionPipeline};

pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";
pub const FAKE_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

/// Writes a fixed WAV payload and records every request.
#[derive(Default)]
pub struct FakeSynthesizer {
    pub requests: Mutex<Vec<SynthesisRequest>>,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn save_to_file(&self, request: &SynthesisRequest, path: &Path) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::fs::write(path, FAKE_WAV).await?;
        Ok(())
    }

    async fn speak(&self, request: &SynthesisRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Holds every synthesis until `release` is notified.
#[derive(Default)]
pub struct BlockingSynthesizer {
    pub started: Notify,
    pub release: Notify,
}

#[async_trait]
impl SpeechSynthesizer for BlockingSynthesizer {
    async fn save_to_file(&self, _request: &SynthesisRequest, path: &Path) -> Result<()> {
        self.started.notify_one();
        self.release.notified().await;
        tokio::fs::write(path, FAKE_WAV).await?;
        Ok(())
    }

    async fn speak(&self, _request: &SynthesisRequest) -> Result<()> {
        Ok(())
    }
}

pub struct CopyExtractor;

#[async_trait]
impl AudioExtractor for CopyExtractor {
    async fn extract(&self, input: &Path, output: &Path, _duration: Option<u32>) -> Result<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Reports `language` and echoes the uploaded bytes back as the transcript.
pub struct EchoTranscriber {
    pub language: Option<String>,
    pub models: Mutex<Vec<String>>,
}

impl EchoTranscriber {
    pub fn new(language: Option<&str>) -> Self {
        Self {
            language: language.map(str::to_string),
            models: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transcriber for EchoTranscriber {
    async fn detect_language(&self, _wav: &Path, options: &DecodeOptions) -> Result<Option<String>> {
        self.models.lock().unwrap().push(options.model.clone());
        Ok(self.language.clone())
    }

    async fn transcribe(&self, wav: &Path, _language: &str, options: &DecodeOptions) -> Result<Vec<Segment>> {
        self.models.lock().unwrap().push(options.model.clone());
        let text = tokio::fs::read_to_string(wav).await?;
        Ok(text
            .split_whitespace()
            .map(|word| Segment { text: format!(" {} ", word) })
            .collect())
    }
}

pub struct Harness {
    pub state: AppState,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub transcriber: Arc<EchoTranscriber>,
}

fn test_pipeline(transcriber: Arc<EchoTranscriber>) -> TranscriptionPipeline {
    TranscriptionPipeline::new(
        Arc::new(CopyExtractor),
        transcriber,
        PipelineSettings {
            purge_detector_cache: false,
            ..PipelineSettings::default()
        },
    )
}

/// Single job slot shared with a synthesizer that blocks until released.
pub fn single_slot_state(options: ServerOptions, synthesizer: Arc<BlockingSynthesizer>) -> AppState {
    let transcriber = Arc::new(EchoTranscriber::new(Some("en")));
    AppState::new(
        ApiKey::new(TEST_KEY),
        synthesizer,
        test_pipeline(transcriber),
        options,
        1,
    )
}

pub fn harness_with(options: ServerOptions, language: Option<&str>) -> Harness {
    let synthesizer = Arc::new(FakeSynthesizer::default());
    let transcriber = Arc::new(EchoTranscriber::new(language));
    let pipeline = test_pipeline(transcriber.clone());
    let state = AppState::new(
        ApiKey::new(TEST_KEY),
        synthesizer.clone(),
        pipeline,
        options,
        2,
    );
    Harness {
        state,
        synthesizer,
        transcriber,
    }
}

pub fn harness() -> Harness {
    harness_with(ServerOptions::default(), Some("en"))
}

pub const BOUNDARY: &str = "toolbox-hub-test-boundary";

pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
