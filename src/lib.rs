pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use app::server::{router, AppState, ServerOptions};
pub use config::{HubConfig, ServeArgs};
pub use core::{
    auth::ApiKey,
    stt::{FfmpegExtractor, PipelineSettings, TranscriptionPipeline, UploadScratch},
    tts::EspeakEngine,
    whisper::WhisperCli,
};
pub use utils::error::{HubError, Result};
