use crate::domain::model::SpeechRate;
use crate::utils::error::{HubError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "toolbox-hub.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub tts: TtsConfig,
    pub stt: SttConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL shown on the test page and in the cURL example.
    pub public_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub max_concurrent_jobs: usize,
    /// Seconds a request may wait for a free job slot before 503.
    pub queue_timeout_secs: u64,
    pub max_upload_mb: usize,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            public_url: None,
            cors_origins: vec!["*".to_string()],
            max_concurrent_jobs: 2,
            queue_timeout_secs: 120,
            max_upload_mb: 512,
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fixed key; `--api-key` / `API_KEY` overrides it.
    pub api_key: Option<String>,
    pub key_file: String,
    pub expose_key_endpoint: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            key_file: ".api_key".to_string(),
            expose_key_endpoint: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub espeak_binary: String,
    pub voice: Option<String>,
    pub default_rate: u32,
    /// 0.0 - 1.0
    pub volume: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            espeak_binary: "espeak-ng".to_string(),
            voice: None,
            default_rate: SpeechRate::DEFAULT,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub ffmpeg_binary: String,
    pub whisper_binary: String,
    /// Directory holding `ggml-<model>.bin` files. Defaults to `~/.cache/whisper`.
    pub models_dir: Option<String>,
    pub detector_model: String,
    pub english_model: String,
    pub multilingual_model: String,
    pub sample_seconds: u32,
    pub detector_beam_size: u32,
    pub beam_size: u32,
    pub vad_filter: bool,
    /// whisper.cpp needs a separate VAD model; without one the filter is skipped.
    pub vad_model: Option<String>,
    pub purge_detector_cache: bool,
    /// Model cache scanned when purging the detector. Defaults to `~/.cache/huggingface/hub`.
    pub cache_dir: Option<String>,
    pub threads: Option<u32>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            whisper_binary: "whisper-cli".to_string(),
            models_dir: None,
            detector_model: "tiny".to_string(),
            english_model: "small.en".to_string(),
            multilingual_model: "small".to_string(),
            sample_seconds: 30,
            detector_beam_size: 1,
            beam_size: 5,
            vad_filter: true,
            vad_model: None,
            purge_detector_cache: true,
            cache_dir: None,
            threads: None,
        }
    }
}

impl HubConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HubError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                HubError::IoError(e)
            }
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// Explicit path first, then `toolbox-hub.toml` in the working directory, then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| HubError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn public_url(&self) -> String {
        match &self.server.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.server.port),
        }
    }

    pub fn default_rate(&self) -> Result<SpeechRate> {
        SpeechRate::new(self.tts.default_rate)
    }

    pub fn models_dir(&self) -> PathBuf {
        match &self.stt.models_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("whisper"),
        }
    }

    pub fn cache_dir(&self) -> Option<PathBuf> {
        match &self.stt.cache_dir {
            Some(dir) => Some(PathBuf::from(dir)),
            None => dirs::home_dir().map(|home| home.join(".cache").join("huggingface").join("hub")),
        }
    }
}

impl Validate for HubConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.server.host)?;
        if let Some(url) = &self.server.public_url {
            validation::validate_url("server.public_url", url)?;
        }
        validation::validate_positive_number(
            "server.max_concurrent_jobs",
            self.server.max_concurrent_jobs,
            1,
        )?;
        validation::validate_positive_number("server.max_upload_mb", self.server.max_upload_mb, 1)?;
        validation::validate_positive_number(
            "server.queue_timeout_secs",
            self.server.queue_timeout_secs as usize,
            1,
        )?;

        validation::validate_path("auth.key_file", &self.auth.key_file)?;
        if let Some(key) = &self.auth.api_key {
            validation::validate_non_empty_string("auth.api_key", key)?;
        }

        validation::validate_non_empty_string("tts.espeak_binary", &self.tts.espeak_binary)?;
        validation::validate_range(
            "tts.default_rate",
            self.tts.default_rate,
            SpeechRate::MIN,
            SpeechRate::MAX,
        )?;
        validation::validate_range("tts.volume", self.tts.volume, 0.0, 1.0)?;

        validation::validate_non_empty_string("stt.ffmpeg_binary", &self.stt.ffmpeg_binary)?;
        validation::validate_non_empty_string("stt.whisper_binary", &self.stt.whisper_binary)?;
        validation::validate_non_empty_string("stt.detector_model", &self.stt.detector_model)?;
        validation::validate_non_empty_string("stt.english_model", &self.stt.english_model)?;
        validation::validate_non_empty_string(
            "stt.multilingual_model",
            &self.stt.multilingual_model,
        )?;
        validation::validate_positive_number(
            "stt.sample_seconds",
            self.stt.sample_seconds as usize,
            1,
        )?;
        validation::validate_positive_number(
            "stt.detector_beam_size",
            self.stt.detector_beam_size as usize,
            1,
        )?;
        validation::validate_positive_number("stt.beam_size", self.stt.beam_size as usize, 1)?;
        if let Some(dir) = &self.stt.models_dir {
            validation::validate_path("stt.models_dir", dir)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_deployment_command() {
        let config = HubConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:10000");
        assert_eq!(config.public_url(), "http://localhost:10000");
        assert_eq!(config.auth.key_file, ".api_key");
        assert_eq!(config.stt.detector_model, "tiny");
        assert_eq!(config.stt.sample_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[server]
port = 9001
public_url = "http://31.220.75.241:9001/"

[tts]
default_rate = 150
"#;

        let config = HubConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.public_url(), "http://31.220.75.241:9001");
        assert_eq!(config.tts.default_rate, 150);
        assert_eq!(config.tts.espeak_binary, "espeak-ng");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TOOLBOX_HUB_TEST_MODELS", "/opt/whisper");

        let toml_content = r#"
[stt]
models_dir = "${TOOLBOX_HUB_TEST_MODELS}"
"#;

        let config = HubConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.models_dir(), PathBuf::from("/opt/whisper"));

        std::env::remove_var("TOOLBOX_HUB_TEST_MODELS");
    }

    #[test]
    fn test_config_validation() {
        let config = HubConfig::from_toml_str(
            r#"
[tts]
default_rate = 250
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = HubConfig::from_toml_str(
            r#"
[server]
public_url = "not a url"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = HubConfig::from_toml_str("[server\nport = ").unwrap_err();
        assert!(matches!(err, HubError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[auth]\nkey_file = \"/tmp/hub.key\"\nexpose_key_endpoint = false\n")
            .unwrap();

        let config = HubConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.auth.key_file, "/tmp/hub.key");
        assert!(!config.auth.expose_key_endpoint);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = HubConfig::from_file("/nonexistent/toolbox-hub.toml").unwrap_err();
        assert!(matches!(err, HubError::NotFound { .. }));
    }
}
