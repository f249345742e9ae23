//! Error types for proxy-select.
//!
//! All fallible surfaces of the crate (loading, validating, and watching
//! the settings file) report through [`ProxyError`]. Proxy resolution
//! itself never fails; see [`crate::resolver`].

use thiserror::Error;

/// Main error type for the proxy-select crate.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Proxy settings file could not be found.
    #[error("Proxy settings file not found: {path}")]
    ConfigNotFound { path: String },

    /// Proxy settings file could not be parsed.
    #[error("Failed to parse proxy settings: {message}")]
    ConfigParse { message: String },

    /// Proxy settings failed validation.
    #[error("Invalid proxy settings: {message}")]
    ConfigValidation { message: String },

    /// Settings file watcher could not be created or started.
    #[error("Failed to watch settings file: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Creates a new settings parse error.
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    /// Creates a new settings validation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}

/// Result type alias using ProxyError.
pub type Result<T> = std::result::Result<T, ProxyError>;
