use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid search query: {message}")]
    InvalidQuery { message: String },

    #[error("Client disconnected: {message}")]
    ClientDisconnected { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Input,
    Client,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AggregatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AggregatorError::HttpError(_) => ErrorCategory::Network,
            AggregatorError::IoError(_) | AggregatorError::SerializationError(_) => {
                ErrorCategory::System
            }
            AggregatorError::ConfigError { .. }
            | AggregatorError::InvalidConfigValueError { .. }
            | AggregatorError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            AggregatorError::InvalidQuery { .. } => ErrorCategory::Input,
            AggregatorError::ClientDisconnected { .. } => ErrorCategory::Client,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 客戶端自行斷線不算失敗
            ErrorCategory::Client => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and TLS settings",
            ErrorCategory::Configuration => {
                "Check the TOML configuration file and the referenced environment variables"
            }
            ErrorCategory::Input => {
                "Check the search query: it needs at least one route and one passenger"
            }
            ErrorCategory::Client => "The client closed the stream; no action needed",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AggregatorError::InvalidQuery { message } => format!("Search query rejected: {}", message),
            AggregatorError::ClientDisconnected { .. } => {
                "Stream closed by the client before all providers reported".to_string()
            }
            AggregatorError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
