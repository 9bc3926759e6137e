use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("{program} failed: {message}")]
    ToolError { program: String, message: String },

    #[error("Could not launch {program}: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected output from {program}: {message}")]
    ToolOutputError { program: String, message: String },

    #[error("Service busy: {message}")]
    Busy { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Client,
    ExternalTool,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HubError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        HubError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        HubError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            HubError::ConfigError { .. }
            | HubError::MissingConfigError { .. }
            | HubError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            HubError::Unauthorized
            | HubError::InvalidRequest { .. }
            | HubError::NotFound { .. } => ErrorCategory::Client,
            HubError::ToolError { .. }
            | HubError::ToolUnavailable { .. }
            | HubError::ToolOutputError { .. } => ErrorCategory::ExternalTool,
            HubError::IoError(_) | HubError::SerializationError(_) | HubError::Busy { .. } => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HubError::Busy { .. } => ErrorSeverity::Medium,
            HubError::ToolError { .. } | HubError::ToolOutputError { .. } => ErrorSeverity::Medium,
            HubError::Unauthorized | HubError::InvalidRequest { .. } | HubError::NotFound { .. } => {
                ErrorSeverity::High
            }
            HubError::ConfigError { .. }
            | HubError::MissingConfigError { .. }
            | HubError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            HubError::ToolUnavailable { .. }
            | HubError::IoError(_)
            | HubError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    /// HTTP status code for API responses.
    pub fn status_code(&self) -> u16 {
        match self {
            HubError::Unauthorized => 401,
            HubError::NotFound { .. } => 404,
            HubError::InvalidRequest { .. } => 400,
            HubError::Busy { .. } => 503,
            _ => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            HubError::Unauthorized => {
                "Send the key from GET /key (or the API_KEY env var) in the X-API-Key header".to_string()
            }
            HubError::InvalidRequest { .. } => "Check the request parameters and retry".to_string(),
            HubError::NotFound { path } => format!("Check that '{}' exists and is readable", path),
            HubError::ToolUnavailable { program, .. } => {
                format!("Install '{}' or point the config at the right binary", program)
            }
            HubError::ToolError { program, .. } | HubError::ToolOutputError { program, .. } => {
                format!("Run '{}' by hand with the same input to see the full error", program)
            }
            HubError::ConfigError { .. }
            | HubError::MissingConfigError { .. }
            | HubError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or the matching environment variable".to_string()
            }
            HubError::Busy { .. } => "Retry the request in a few seconds".to_string(),
            HubError::IoError(_) => "Check disk space and file permissions".to_string(),
            HubError::SerializationError(_) => "Check the JSON payload format".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Client => self.to_string(),
            ErrorCategory::ExternalTool => format!("Audio engine problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code for the binaries, derived from severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl From<toml::de::Error> for HubError {
    fn from(e: toml::de::Error) -> Self {
        HubError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
