use crate::config::HubConfig;
use clap::Parser;
use std::path::PathBuf;

/// HTTP server for text-to-speech and speech-to-text.
///
/// Defaults to 0.0.0.0:10000. Values given here override the TOML config file.
#[derive(Debug, Clone, Parser)]
#[command(name = "toolbox-hub")]
#[command(version, about, long_about = None)]
pub struct ServeArgs {
    /// Path to a TOML configuration file (defaults to ./toolbox-hub.toml when present)
    #[arg(short, long, env = "TOOLBOX_HUB_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Shared secret for the X-API-Key header (overrides the key file)
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL advertised on the test page
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,

    /// Turn off GET /key
    #[arg(long)]
    pub disable_key_endpoint: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut HubConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            config.auth.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = &self.public_url {
            config.server.public_url = Some(url.clone());
        }
        if self.json_logs {
            config.server.json_logs = true;
        }
        if self.disable_key_endpoint {
            config.auth.expose_key_endpoint = false;
        }
    }
}
