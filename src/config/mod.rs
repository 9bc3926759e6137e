pub mod cli;
pub mod toml_config;

pub use cli::ServeArgs;
pub use toml_config::{AuthConfig, HubConfig, ServerConfig, SttConfig, TtsConfig};
