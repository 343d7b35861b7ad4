use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes that cross the bridge as the `code` half of a structured error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgs,
    PermissionDenied,
    StoreError,
    Unsupported,
    EngineError,
    Canceled,
    RecordError,
    PlaybackError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgs => "INVALID_ARGS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::StoreError => "STORE_ERROR",
            Self::Unsupported => "UNSUPPORTED",
            Self::EngineError => "ENGINE_ERROR",
            Self::Canceled => "CANCELED",
            Self::RecordError => "RECORD_ERROR",
            Self::PlaybackError => "PLAYBACK_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Calendar store error: {0}")]
    Store(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Speech engine error: {0}")]
    Engine(String),

    #[error("Canceled: {0}")]
    Canceled(String),

    #[error("Recording error: {0}")]
    Record(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_args<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgs(msg.into())
    }

    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Self::Engine(msg.into())
    }

    pub fn canceled<S: Into<String>>(msg: S) -> Self {
        Self::Canceled(msg.into())
    }

    pub fn record<S: Into<String>>(msg: S) -> Self {
        Self::Record(msg.into())
    }

    pub fn playback<S: Into<String>>(msg: S) -> Self {
        Self::Playback(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// The bridge code this error is reported under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgs(_) => ErrorCode::InvalidArgs,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Store(_) | Self::Database(_) => ErrorCode::StoreError,
            Self::Unsupported(_) => ErrorCode::Unsupported,
            Self::Engine(_) => ErrorCode::EngineError,
            Self::Canceled(_) => ErrorCode::Canceled,
            Self::Record(_) => ErrorCode::RecordError,
            Self::Playback(_) => ErrorCode::PlaybackError,
            Self::Config(_) | Self::Anyhow(_) => ErrorCode::InternalError,
        }
    }

    /// The message without the kind prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidArgs(msg)
            | Self::PermissionDenied(msg)
            | Self::Store(msg)
            | Self::Unsupported(msg)
            | Self::Engine(msg)
            | Self::Canceled(msg)
            | Self::Record(msg)
            | Self::Playback(msg)
            | Self::Config(msg) => msg.clone(),
            Self::Database(e) => e.to_string(),
            Self::Anyhow(e) => format!("{:#}", e),
        }
    }

    pub fn is_pii_safe(&self) -> bool {
        match self {
            Self::Database(_) | Self::Anyhow(_) => false,
            Self::InvalidArgs(_) | Self::PermissionDenied(_) | Self::Store(_)
            | Self::Unsupported(_) | Self::Engine(_) | Self::Canceled(_)
            | Self::Record(_) | Self::Playback(_) | Self::Config(_) => true,
        }
    }

    /// Rendering used for log lines, which must not leak event contents or paths.
    pub fn to_safe_string(&self) -> String {
        if self.is_pii_safe() {
            self.to_string()
        } else {
            match self {
                Self::Database(_) => "Database operation failed".to_string(),
                Self::Anyhow(_) => "Operation failed".to_string(),
                _ => self.to_string(),
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_wire_names() {
        assert_eq!(AppError::invalid_args("x").code().as_str(), "INVALID_ARGS");
        assert_eq!(AppError::permission_denied("x").code().as_str(), "PERMISSION_DENIED");
        assert_eq!(AppError::store("x").code().as_str(), "STORE_ERROR");
        assert_eq!(AppError::unsupported("x").code().as_str(), "UNSUPPORTED");
        assert_eq!(AppError::engine("x").code().as_str(), "ENGINE_ERROR");
        assert_eq!(AppError::record("x").code().as_str(), "RECORD_ERROR");
        assert_eq!(AppError::playback("x").code().as_str(), "PLAYBACK_ERROR");
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::PermissionDenied).unwrap();
        assert_eq!(json, "\"PERMISSION_DENIED\"");
        let code: ErrorCode = serde_json::from_str("\"ENGINE_ERROR\"").unwrap();
        assert_eq!(code, ErrorCode::EngineError);
    }

    #[test]
    fn test_message_drops_prefix() {
        let err = AppError::store("disk full");
        assert_eq!(err.to_string(), "Calendar store error: disk full");
        assert_eq!(err.message(), "disk full");
    }

    #[test]
    fn test_database_errors_are_store_errors_but_not_pii_safe() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.code(), ErrorCode::StoreError);
        assert!(!err.is_pii_safe());
        assert_eq!(err.to_safe_string(), "Database operation failed");
    }
}
