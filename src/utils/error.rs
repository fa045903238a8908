use std::fmt;
use thiserror::Error;

/// Failure of the HTTP exchange itself. The carrier never sees the request
/// (or we never see its answer), so nothing can be said about the shipments.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport failed: {0}")]
    Other(String),
}

/// Structured part of a carrier rejection that blames one request item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    /// 1-based position of the item among the `<item>` elements of the envelope.
    pub position: usize,
    pub code: String,
    pub text: String,
    pub input: String,
}

/// A well-formed `<error>` envelope returned by the carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierError {
    pub message: String,
    pub item: Option<ItemError>,
}

impl CarrierError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            item: None,
        }
    }

    /// The blamed item's carrier error code, when the envelope carried one.
    pub fn code(&self) -> Option<&str> {
        self.item.as_ref().map(|item| item.code.as_str())
    }
}

impl fmt::Display for CarrierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CarrierError {}

#[derive(Error, Debug)]
pub enum ShippingError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{message}")]
    MalformedResponse { message: String },

    #[error("Carrier rejected the request: {0}")]
    Carrier(#[from] CarrierError),

    #[error("{message}")]
    DecodeFailure { message: String },

    #[error("XML encoding failed: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Carrier,
    Protocol,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ShippingError {
    /// 錯誤分類
    pub fn category(&self) -> ErrorCategory {
        match self {
            ShippingError::Transport(_) => ErrorCategory::Network,
            ShippingError::Carrier(_) => ErrorCategory::Carrier,
            ShippingError::MalformedResponse { .. }
            | ShippingError::DecodeFailure { .. }
            | ShippingError::Xml(_) => ErrorCategory::Protocol,
            ShippingError::ConfigError { .. }
            | ShippingError::ConfigValidationError { .. }
            | ShippingError::InvalidConfigValueError { .. }
            | ShippingError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ShippingError::IoError(_) | ShippingError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    /// 錯誤嚴重程度，CLI 依此決定退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Carrier | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Protocol | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ShippingError::Transport(_) => {
                "Check network connectivity and the configured base URL, then resubmit"
            }
            ShippingError::Carrier(err) if err.item.is_some() => {
                "Fix the reported shipment field and resubmit the batch"
            }
            ShippingError::Carrier(_) => "Check credentials and the request contents",
            ShippingError::MalformedResponse { .. } | ShippingError::DecodeFailure { .. } => {
                "The carrier answered with an unexpected body; verify the base URL points at the carrier API"
            }
            ShippingError::Xml(_) => "Check shipment fields for characters that cannot be encoded",
            ShippingError::ConfigError { .. }
            | ShippingError::ConfigValidationError { .. }
            | ShippingError::InvalidConfigValueError { .. }
            | ShippingError::MissingConfigError { .. } => "Review the configuration file",
            ShippingError::IoError(_) => "Check file paths and permissions",
            ShippingError::SerializationError(_) => "Report this as a bug",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ShippingError::Transport(e) => format!("Could not reach the carrier: {}", e),
            ShippingError::Carrier(e) => format!("Carrier error: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShippingError>;
