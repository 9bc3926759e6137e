use crate::domain::model::{DecodeOptions, Segment, SynthesisRequest};
use crate::utils::error::{HubError, Result};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render speech into a WAV file at `path`.
    async fn save_to_file(&self, request: &SynthesisRequest, path: &Path) -> Result<()>;

    /// Play speech on the local audio device.
    async fn speak(&self, request: &SynthesisRequest) -> Result<()>;

    /// Render speech and return the WAV bytes. The scratch file is removed on return.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let tmp = tempfile::Builder::new()
            .prefix("tts-")
            .suffix(".wav")
            .tempfile()?;
        self.save_to_file(request, tmp.path()).await?;
        let bytes = tokio::fs::read(tmp.path()).await?;
        if bytes.is_empty() {
            return Err(HubError::ToolOutputError {
                program: "synthesizer".to_string(),
                message: "produced an empty WAV file".to_string(),
            });
        }
        Ok(bytes)
    }
}

#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract mono 16 kHz WAV audio from `input`, optionally limited to the first `duration_secs`.
    async fn extract(&self, input: &Path, output: &Path, duration_secs: Option<u32>) -> Result<()>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn detect_language(&self, wav: &Path, options: &DecodeOptions) -> Result<Option<String>>;

    async fn transcribe(
        &self,
        wav: &Path,
        language: &str,
        options: &DecodeOptions,
    ) -> Result<Vec<Segment>>;

    /// Drop whatever the detector model left behind (cached weights). No-op by default.
    async fn release_model(&self, _model: &str) -> Result<()> {
        Ok(())
    }
}
