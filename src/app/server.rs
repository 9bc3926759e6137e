use crate::app::handlers;
use crate::config::HubConfig;
use crate::core::auth::{ApiKey, KeySource};
use crate::core::stt::{FfmpegExtractor, PipelineSettings, TranscriptionPipeline};
use crate::core::tts::EspeakEngine;
use crate::core::whisper::WhisperCli;
use crate::domain::model::SpeechRate;
use crate::domain::ports::SpeechSynthesizer;
use crate::utils::error::{HubError, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub public_url: String,
    pub expose_key_endpoint: bool,
    pub default_rate: SpeechRate,
    pub max_upload_bytes: usize,
    pub queue_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl ServerOptions {
    pub fn from_config(config: &HubConfig) -> Result<Self> {
        Ok(Self {
            public_url: config.public_url(),
            expose_key_endpoint: config.auth.expose_key_endpoint,
            default_rate: config.default_rate()?,
            max_upload_bytes: config.server.max_upload_mb * 1024 * 1024,
            queue_timeout: Duration::from_secs(config.server.queue_timeout_secs),
            cors_origins: config.server.cors_origins.clone(),
        })
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        // 與 HubConfig::default() 相同的值
        Self {
            public_url: "http://localhost:10000".to_string(),
            expose_key_endpoint: true,
            default_rate: SpeechRate::default(),
            max_upload_bytes: 512 * 1024 * 1024,
            queue_timeout: Duration::from_secs(120),
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub api_key: ApiKey,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub pipeline: TranscriptionPipeline,
    pub options: ServerOptions,
    jobs: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        api_key: ApiKey,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        pipeline: TranscriptionPipeline,
        options: ServerOptions,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            api_key,
            synthesizer,
            pipeline,
            options,
            jobs: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Wire the espeak-ng, ffmpeg and whisper.cpp backends from config.
    pub fn from_config(config: &HubConfig) -> Result<Self> {
        let (api_key, source) =
            ApiKey::init(config.auth.api_key.as_deref(), Path::new(&config.auth.key_file))?;
        match source {
            KeySource::Configured => tracing::info!("🔑 Using configured API key"),
            KeySource::File => tracing::info!("🔑 Loaded API key from {}", config.auth.key_file),
            KeySource::Generated => {}
        }

        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(EspeakEngine::from_config(&config.tts));
        let pipeline = TranscriptionPipeline::new(
            Arc::new(FfmpegExtractor::new(config.stt.ffmpeg_binary.clone())),
            Arc::new(WhisperCli::from_config(config)),
            PipelineSettings::from(&config.stt),
        );

        Ok(Self::new(
            api_key,
            synthesizer,
            pipeline,
            ServerOptions::from_config(config)?,
            config.server.max_concurrent_jobs,
        ))
    }

    /// Wait for a heavy-job slot, giving up after the queue timeout.
    pub async fn acquire_job(&self) -> Result<OwnedSemaphorePermit> {
        match tokio::time::timeout(self.options.queue_timeout, self.jobs.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(HubError::Busy {
                message: "job queue closed".to_string(),
            }),
            Err(_) => Err(HubError::Busy {
                message: "all workers are busy".to_string(),
            }),
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                self,
                self.category(),
                self.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", self.recovery_suggestion());
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.options.max_upload_bytes;
    let cors = cors_layer(&state.options.cors_origins);

    Router::new()
        .route("/", get(handlers::root))
        .route("/tts", post(handlers::tts))
        .route("/key", get(handlers::show_key))
        .route("/health", get(handlers::health))
        .route("/transcribe", post(handlers::transcribe))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until Ctrl+C / SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!("🚀 AI Toolbox Hub listening on http://{}", local_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

pub async fn run(config: &HubConfig) -> Result<()> {
    let state = AppState::from_config(config)?;
    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("🌐 Public URL: {}", state.options.public_url);
    serve(listener, state).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("🛑 Shutdown signal received");
}
