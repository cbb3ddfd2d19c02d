use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComexError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Upstream rejected the request: {message}")]
    UpstreamRejected { message: String },

    #[error("Upstream HTTP error ({status}): {message}")]
    UpstreamHttpError { status: u16, message: String },

    #[error("Upstream unreachable: {message}")]
    UpstreamUnreachable { message: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 傳輸層錯誤，由 transport 產生並交給 UpstreamClient 轉換
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// 有 HTTP 回應但狀態碼非成功
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 沒有任何回應 (連線失敗、逾時)
    #[error("no response: {message}")]
    Unreachable { message: String },

    /// 回應內容無法解析為 envelope
    #[error("malformed envelope: {message}")]
    Decode { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ClientInput,
    Upstream,
    Configuration,
    Internal,
}

impl ComexError {
    pub fn validation(message: impl Into<String>) -> Self {
        ComexError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ComexError::ValidationError { .. } => ErrorCategory::ClientInput,
            ComexError::UpstreamRejected { .. }
            | ComexError::UpstreamHttpError { .. }
            | ComexError::UpstreamUnreachable { .. } => ErrorCategory::Upstream,
            ComexError::ConfigError { .. }
            | ComexError::InvalidConfigValueError { .. }
            | ComexError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ComexError::CacheError { .. }
            | ComexError::IoError(_)
            | ComexError::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP 對應狀態碼
    pub fn status_code(&self) -> u16 {
        match self {
            ComexError::ValidationError { .. } => 400,
            ComexError::UpstreamRejected { .. } | ComexError::UpstreamUnreachable { .. } => 503,
            ComexError::UpstreamHttpError { status, .. } => *status,
            _ => 500,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ComexError::ValidationError { message } => format!("Invalid input: {}", message),
            ComexError::UpstreamRejected { message } => {
                format!("ComexStat refused the query: {}", message)
            }
            ComexError::UpstreamHttpError { status, message } => {
                format!("ComexStat answered with HTTP {}: {}", status, message)
            }
            ComexError::UpstreamUnreachable { .. } => {
                "ComexStat API is unreachable right now, try again later".to_string()
            }
            ComexError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            ComexError::MissingConfigError { field } => {
                format!("Configuration field '{}' is required", field)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::ClientInput => "Check the query parameters (periods use YYYY-MM)",
            ErrorCategory::Upstream => "The upstream API may be down; retry later",
            ErrorCategory::Configuration => "Review the TOML configuration file",
            ErrorCategory::Internal => "Run with --verbose and inspect the logs",
        }
    }
}

pub type Result<T> = std::result::Result<T, ComexError>;
