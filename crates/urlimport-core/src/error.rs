//! Error types for remote import operations.

use thiserror::Error;

/// Errors that can occur while locating, resolving or loading a module.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Root rejected by the allow/deny configuration
    #[error("Root not allowed by configuration: {0}")]
    NotAllowed(String),

    /// HTTP error
    #[error("HTTP error fetching {url}: {status} - {message}")]
    Http {
        /// URL that was requested
        url: String,
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Fetched source is not valid UTF-8
    #[error("Source at {origin} is not valid UTF-8")]
    InvalidSource {
        /// Origin URL of the source
        origin: String,
    },

    /// No search root could resolve the module
    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    /// Compiling or executing fetched source failed
    #[error("Failed to execute module from {origin}")]
    Execution {
        /// Origin URL of the module
        origin: String,
        /// Engine error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ImportError {
    /// Wrap an engine failure, keeping the origin the source came from.
    pub fn execution<E>(origin: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ImportError::Execution {
            origin: origin.into(),
            source: Box::new(source),
        }
    }
}

/// Result type for remote import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
