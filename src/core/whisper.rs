use crate::config::HubConfig;
use crate::domain::model::{DecodeOptions, Device, Segment};
use crate::domain::ports::Transcriber;
use crate::utils::error::{HubError, Result};
use crate::utils::process::run_tool;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

const PROGRAM: &str = "whisper-cli";

static DETECTED_LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"auto-detected language:\s*([A-Za-z]{2,3})").expect("language pattern is valid")
});

/// Transcriber backed by the whisper.cpp command line tool.
///
/// Models are `ggml-<name>.bin` files in `models_dir`.
#[derive(Debug, Clone)]
pub struct WhisperCli {
    binary: String,
    models_dir: PathBuf,
    vad_model: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    threads: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
}

impl WhisperCli {
    pub fn new(binary: impl Into<String>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            models_dir: models_dir.into(),
            vad_model: None,
            cache_dir: None,
            threads: None,
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        Self {
            binary: config.stt.whisper_binary.clone(),
            models_dir: config.models_dir(),
            vad_model: config.stt.vad_model.as_ref().map(PathBuf::from),
            cache_dir: config.cache_dir(),
            threads: config.stt.threads,
        }
    }

    pub fn model_path(&self, model: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{}.bin", model))
    }

    fn resolve_model(&self, model: &str) -> Result<PathBuf> {
        let path = self.model_path(model);
        if !path.exists() {
            return Err(HubError::MissingConfigError {
                field: format!("whisper model file {}", path.display()),
            });
        }
        Ok(path)
    }

    fn common_args(&self, model: &Path, wav: &Path, options: &DecodeOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            model.as_os_str().to_owned(),
            "-f".into(),
            wav.as_os_str().to_owned(),
            "-bs".into(),
            options.beam_size.to_string().into(),
        ];
        if let Some(threads) = self.threads {
            args.push("-t".into());
            args.push(threads.to_string().into());
        }
        if options.device == Device::Cpu {
            args.push("-ng".into());
        }
        args
    }

    fn transcribe_args(
        &self,
        model: &Path,
        wav: &Path,
        language: &str,
        options: &DecodeOptions,
        output_prefix: &Path,
    ) -> Vec<OsString> {
        let mut args = self.common_args(model, wav, options);
        args.extend([
            OsString::from("-l"),
            OsString::from(language),
            OsString::from("-oj"),
            OsString::from("-of"),
            output_prefix.as_os_str().to_owned(),
            OsString::from("-np"),
        ]);
        match (&self.vad_model, options.vad_filter) {
            (Some(vad_model), true) => {
                args.push("--vad".into());
                args.push("-vm".into());
                args.push(vad_model.as_os_str().to_owned());
            }
            (None, true) => tracing::debug!("VAD requested but no VAD model configured"),
            _ => {}
        }
        args
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn detect_language(&self, wav: &Path, options: &DecodeOptions) -> Result<Option<String>> {
        let model = self.resolve_model(&options.model)?;
        let mut args = self.common_args(&model, wav, options);
        args.extend([OsString::from("-l"), OsString::from("auto"), OsString::from("-dl")]);

        let output = run_tool(&self.binary, args).await?;
        // 偵測結果印在 stderr 的 log 中
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_detected_language(&stderr).or_else(|| parse_detected_language(&stdout)))
    }

    async fn transcribe(
        &self,
        wav: &Path,
        language: &str,
        options: &DecodeOptions,
    ) -> Result<Vec<Segment>> {
        let model = self.resolve_model(&options.model)?;
        let stem = wav
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let output_prefix = wav.with_file_name(format!("{}_whisper", stem));
        let args = self.transcribe_args(&model, wav, language, options, &output_prefix);

        run_tool(&self.binary, args).await?;

        let mut json_path = output_prefix.into_os_string();
        json_path.push(".json");
        let json_path = PathBuf::from(json_path);
        let raw = tokio::fs::read(&json_path).await.map_err(|e| HubError::ToolOutputError {
            program: PROGRAM.to_string(),
            message: format!("missing {}: {}", json_path.display(), e),
        })?;
        parse_segments(&raw)
    }

    async fn release_model(&self, model: &str) -> Result<()> {
        let Some(cache_dir) = self.cache_dir.clone() else {
            return Ok(());
        };
        let needle = format!("whisper-{}", model);
        let removed = tokio::task::spawn_blocking(move || purge_cached_models(&cache_dir, &needle))
            .await
            .map_err(|e| HubError::IoError(std::io::Error::other(e)))?;
        if removed > 0 {
            tracing::debug!("Purged {} cached detector directories", removed);
        }
        Ok(())
    }
}

/// Parse whisper.cpp's `auto-detected language: xx (p = 0.97)` line.
pub fn parse_detected_language(log: &str) -> Option<String> {
    DETECTED_LANGUAGE
        .captures(log)
        .map(|caps| caps[1].to_ascii_lowercase())
}

pub fn parse_segments(raw: &[u8]) -> Result<Vec<Segment>> {
    let parsed: WhisperJson = serde_json::from_slice(raw).map_err(|e| HubError::ToolOutputError {
        program: PROGRAM.to_string(),
        message: format!("invalid JSON transcript: {}", e),
    })?;
    Ok(parsed
        .transcription
        .into_iter()
        .map(|s| Segment { text: s.text })
        .collect())
}

/// Remove every directory under `cache_dir` whose name contains `needle`. Errors are ignored.
pub fn purge_cached_models(cache_dir: &Path, needle: &str) -> usize {
    if !cache_dir.is_dir() {
        return 0;
    }
    let matches: Vec<PathBuf> = WalkDir::new(cache_dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.file_name().to_string_lossy().contains(needle))
        .map(|entry| entry.into_path())
        .collect();

    let mut removed = 0;
    for path in matches {
        // 父目錄已被刪除時略過
        if path.exists() && std::fs::remove_dir_all(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}
