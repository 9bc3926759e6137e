use crate::config::SttConfig;
use crate::domain::model::{DecodeOptions, Device, Transcript};
use crate::domain::ports::{AudioExtractor, Transcriber};
use crate::utils::error::{HubError, Result};
use crate::utils::process::run_tool;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

pub const FALLBACK_LANGUAGE: &str = "en";
pub const FALLBACK_UPLOAD_NAME: &str = "upload.bin";
const UPLOAD_SUBDIR: &str = "input";

/// Audio extraction through `ffmpeg`: mono, 16 kHz, video stream dropped.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    binary: String,
}

impl FfmpegExtractor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn args(input: &Path, output: &Path, duration_secs: Option<u32>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-ac".into(),
            "1".into(),
            "-ar".into(),
            "16000".into(),
            "-vn".into(),
        ];
        if let Some(secs) = duration_secs.filter(|s| *s > 0) {
            args.push("-t".into());
            args.push(secs.to_string().into());
        }
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, input: &Path, output: &Path, duration_secs: Option<u32>) -> Result<()> {
        run_tool(&self.binary, Self::args(input, output, duration_secs)).await?;
        Ok(())
    }
}

/// Scratch directory holding one uploaded file.
///
/// The upload sits in its own `input/` subdirectory so its name can never
/// collide with the extracted `audio_*.wav` files.
#[derive(Debug)]
pub struct UploadScratch {
    workdir: TempDir,
    input: PathBuf,
    file: Option<tokio::fs::File>,
    written: u64,
}

impl UploadScratch {
    pub async fn create(filename: Option<&str>) -> Result<Self> {
        let workdir = TempDir::new()?;
        let input_dir = workdir.path().join(UPLOAD_SUBDIR);
        tokio::fs::create_dir(&input_dir).await?;
        let input = input_dir.join(sanitize_upload_name(filename));
        let file = tokio::fs::File::create(&input).await?;
        Ok(Self {
            workdir,
            input,
            file: Some(file),
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk).await?;
            self.written += chunk.len() as u64;
        }
        Ok(())
    }

    /// Flush and close the upload file.
    pub async fn finish(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(())
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub detector_model: String,
    pub english_model: String,
    pub multilingual_model: String,
    pub sample_seconds: u32,
    pub detector_beam_size: u32,
    pub beam_size: u32,
    pub vad_filter: bool,
    pub purge_detector_cache: bool,
}

impl From<&SttConfig> for PipelineSettings {
    fn from(config: &SttConfig) -> Self {
        Self {
            detector_model: config.detector_model.clone(),
            english_model: config.english_model.clone(),
            multilingual_model: config.multilingual_model.clone(),
            sample_seconds: config.sample_seconds,
            detector_beam_size: config.detector_beam_size,
            beam_size: config.beam_size,
            vad_filter: config.vad_filter,
            purge_detector_cache: config.purge_detector_cache,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&SttConfig::default())
    }
}

/// Two-pass transcription: language detection on a short sample with a small
/// model, then a full pass with the model picked for that language.
#[derive(Clone)]
pub struct TranscriptionPipeline {
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    settings: PipelineSettings,
}

impl TranscriptionPipeline {
    pub fn new(
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// `small.en` style model for English, the multilingual one otherwise.
    pub fn model_for_language(&self, language: &str) -> &str {
        if language == FALLBACK_LANGUAGE {
            &self.settings.english_model
        } else {
            &self.settings.multilingual_model
        }
    }

    /// Transcribe a media file on disk.
    pub async fn run(&self, input: &Path, device: Device) -> Result<Transcript> {
        if !input.exists() {
            return Err(HubError::NotFound {
                path: input.display().to_string(),
            });
        }
        let workdir = TempDir::new()?;
        self.run_in(workdir.path(), input, device).await
    }

    /// Transcribe uploaded bytes. The upload lives only inside the scratch directory.
    pub async fn run_upload(
        &self,
        data: &[u8],
        filename: Option<&str>,
        device: Device,
    ) -> Result<Transcript> {
        let mut scratch = UploadScratch::create(filename).await?;
        scratch.write_chunk(data).await?;
        self.run_staged(&mut scratch, device).await
    }

    /// Transcribe an upload already streamed into `scratch`.
    pub async fn run_staged(&self, scratch: &mut UploadScratch, device: Device) -> Result<Transcript> {
        scratch.finish().await?;
        if scratch.bytes_written() == 0 {
            return Err(HubError::invalid_request("Uploaded file is empty"));
        }
        self.run_in(scratch.workdir.path(), scratch.input(), device).await
    }

    async fn run_in(&self, workdir: &Path, input: &Path, device: Device) -> Result<Transcript> {
        let full_wav = workdir.join("audio_full.wav");
        let sample_wav = workdir.join(format!("audio_{}s.wav", self.settings.sample_seconds));

        tracing::info!("🎞️ Extracting audio from {}", input.display());
        self.extractor.extract(input, &full_wav, None).await?;
        self.extractor
            .extract(input, &sample_wav, Some(self.settings.sample_seconds))
            .await?;

        tracing::info!("🔎 Detecting language (whisper-{})", self.settings.detector_model);
        let detector = DecodeOptions {
            model: self.settings.detector_model.clone(),
            device,
            beam_size: self.settings.detector_beam_size,
            vad_filter: false,
        };
        let language = self
            .transcriber
            .detect_language(&sample_wav, &detector)
            .await?
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string());
        tracing::info!("➜ Detected language: {}", language);

        if self.settings.purge_detector_cache {
            // 清除失敗不影響轉錄
            if let Err(e) = self.transcriber.release_model(&detector.model).await {
                tracing::warn!("⚠️ Could not purge detector cache: {}", e);
            }
        }

        let model = self.model_for_language(&language).to_string();
        tracing::info!("📝 Transcribing full audio with whisper-{}", model);
        let options = DecodeOptions {
            model,
            device,
            beam_size: self.settings.beam_size,
            vad_filter: self.settings.vad_filter,
        };
        let segments = self
            .transcriber
            .transcribe(&full_wav, &language, &options)
            .await?;

        Ok(Transcript::from_segments(&segments, language))
    }
}

/// Keep only the final path component of a client-supplied filename.
pub fn sanitize_upload_name(filename: Option<&str>) -> String {
    filename
        .map(|name| name.replace('\\', "/"))
        .and_then(|name| {
            Path::new(&name)
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        })
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_UPLOAD_NAME.to_string())
}
