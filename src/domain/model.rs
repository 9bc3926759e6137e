use crate::utils::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speech rate in words per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SpeechRate(u32);

impl SpeechRate {
    pub const MIN: u32 = 60;
    pub const MAX: u32 = 200;
    pub const DEFAULT: u32 = 100;

    pub fn new(wpm: u32) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&wpm) {
            return Err(HubError::invalid_request("Rate must be 60–200 WPM"));
        }
        Ok(Self(wpm))
    }

    pub fn wpm(self) -> u32 {
        self.0
    }
}

impl Default for SpeechRate {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u32> for SpeechRate {
    type Error = HubError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SpeechRate> for u32 {
    fn from(rate: SpeechRate) -> Self {
        rate.0
    }
}

impl fmt::Display for SpeechRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wpm", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub rate: SpeechRate,
}

impl SynthesisRequest {
    /// Text is trimmed; empty text is rejected.
    pub fn new(text: &str, rate: SpeechRate) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HubError::invalid_request("Text must not be empty"));
        }
        Ok(Self {
            text: text.to_string(),
            rate,
        })
    }
}

/// Compute device for the Whisper models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl FromStr for Device {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(HubError::invalid_request(format!(
                "Unsupported device '{}'. Use cpu or cuda",
                other
            ))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda => f.write_str("cuda"),
        }
    }
}

/// Decoding parameters for a single Whisper pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub model: String,
    pub device: Device,
    pub beam_size: u32,
    pub vad_filter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub transcript: String,
    pub language: String,
}

impl Transcript {
    pub fn from_segments(segments: &[Segment], language: impl Into<String>) -> Self {
        let transcript = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            transcript,
            language: language.into(),
        }
    }

    /// First `max_chars` characters, with `...` appended when truncated.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.transcript.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}
