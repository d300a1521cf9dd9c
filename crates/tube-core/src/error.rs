//! Error types for Tube Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Session bootstrap errors
    #[error("Failed to initialize platform client: {0}")]
    Initialization(String),

    #[error("Player not initialized. Call initialize() first")]
    NotInitialized,

    #[error("Invalid content id: {0:?}")]
    InvalidContentId(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Resolution errors
    #[error("Cannot play video: {status} ({reason})")]
    Playability { status: String, reason: String },

    #[error("Could not resolve a manifest: {0}")]
    ManifestResolution(String),

    #[error("Failed to decipher streaming URL: {0}")]
    Decipher(String),

    // Token errors
    #[error("Failed to mint proof-of-origin token: {0}")]
    TokenMinting(String),

    // Adapter errors
    #[error("Streaming adapter has been disposed")]
    AdapterDisposed,

    // Platform API errors
    #[error("Platform request failed: {0}")]
    Platform(String),

    // Network errors
    #[error("Proxy returned HTML error: {status} - {message}")]
    ProxyTransport { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a playability error from the platform's status block
    pub fn playability(status: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Playability {
            status: status.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Initialization(_)
                | Error::Network(_)
                | Error::ProxyTransport { .. }
                | Error::Platform(_)
        )
    }

    /// Returns the error code reported to the host application
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Initialization(_) => "INITIALIZATION",
            Error::NotInitialized => "NOT_INITIALIZED",
            Error::InvalidContentId(_) => "INVALID_CONTENT_ID",
            Error::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Error::Playability { .. } => "PLAYABILITY",
            Error::ManifestResolution(_) => "MANIFEST_RESOLUTION",
            Error::Decipher(_) => "DECIPHER",
            Error::TokenMinting(_) => "TOKEN_MINTING",
            Error::AdapterDisposed => "ADAPTER_DISPOSED",
            Error::Platform(_) => "PLATFORM",
            Error::ProxyTransport { .. } => "PROXY_TRANSPORT",
            Error::Network(_) => "NETWORK",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Json(_) => "JSON",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
        }
    }
}
