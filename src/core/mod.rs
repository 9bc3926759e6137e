pub mod auth;
pub mod stt;
pub mod tts;
pub mod whisper;

pub use crate::domain::model::{Device, SpeechRate, SynthesisRequest, Transcript};
pub use crate::domain::ports::{AudioExtractor, SpeechSynthesizer, Transcriber};
pub use crate::utils::error::Result;
