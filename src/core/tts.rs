use crate::config::TtsConfig;
use crate::domain::model::SynthesisRequest;
use crate::domain::ports::SpeechSynthesizer;
use crate::utils::error::Result;
use crate::utils::process::run_tool_with_input;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

/// Speech synthesizer backed by the `espeak-ng` executable.
///
/// Text goes through stdin so input starting with `-` is never read as a flag.
#[derive(Debug, Clone)]
pub struct EspeakEngine {
    binary: String,
    voice: Option<String>,
    amplitude: u32,
}

impl EspeakEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            voice: None,
            amplitude: 100,
        }
    }

    pub fn from_config(config: &TtsConfig) -> Self {
        Self::new(config.espeak_binary.clone())
            .with_voice(config.voice.clone())
            .with_volume(config.volume)
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice.filter(|v| !v.trim().is_empty());
        self
    }

    /// `volume` is 0.0 - 1.0; espeak's amplitude scale puts 1.0 at 100.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.amplitude = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        self
    }

    pub fn amplitude(&self) -> u32 {
        self.amplitude
    }

    fn base_args(&self, request: &SynthesisRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-s".into(),
            request.rate.wpm().to_string().into(),
            "-a".into(),
            self.amplitude.to_string().into(),
        ];
        if let Some(voice) = &self.voice {
            args.push("-v".into());
            args.push(voice.into());
        }
        args
    }

    async fn run(&self, mut args: Vec<OsString>, request: &SynthesisRequest) -> Result<()> {
        args.push("--stdin".into());
        run_tool_with_input(&self.binary, args, Some(request.text.as_bytes())).await?;
        Ok(())
    }
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new("espeak-ng")
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakEngine {
    async fn save_to_file(&self, request: &SynthesisRequest, path: &Path) -> Result<()> {
        let mut args = self.base_args(request);
        args.push("-w".into());
        args.push(path.as_os_str().to_owned());
        tracing::debug!("Synthesizing {} chars at {}", request.text.len(), request.rate);
        self.run(args, request).await
    }

    async fn speak(&self, request: &SynthesisRequest) -> Result<()> {
        let args = self.base_args(request);
        self.run(args, request).await
    }
}
