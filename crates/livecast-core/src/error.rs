//! Error types for Livecast Core
//!
//! Two layers live here. [`Error`] is the ordinary `Result` error used by
//! configuration loading and by the HLS loader internals. [`TransportError`]
//! and [`PlaybackFailure`] are *values* that a transport reports through its
//! event stream; the player routes them through the recovery policy and
//! never hands them to the host as `Err`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Manifest errors
    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Invalid manifest format: {0}")]
    InvalidManifest(String),

    // Fragment errors
    #[cfg(feature = "hls")]
    #[error("Failed to fetch fragment: {url}")]
    FragmentFetch { url: String, source: reqwest::Error },

    #[error("Fragment carried no media data: {url}")]
    FragmentEmpty { url: String },

    // Session errors
    #[error("No playback engine can play this source")]
    UnsupportedFormat,

    #[error("Quality level {index} out of range ({available} levels)")]
    LevelOutOfRange { index: usize, available: usize },

    #[error("Invalid source URL: {0}")]
    InvalidSource(#[from] url::ParseError),

    // Network errors
    #[cfg(feature = "hls")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration decode error: {0}")]
    ConfigDecode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the loader may retry the failed operation
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::ManifestFetch(_) => true,
            #[cfg(feature = "hls")]
            Error::FragmentFetch { .. } | Error::Network(_) => true,
            _ => false,
        }
    }

    /// Map a loader error onto the category a transport reports it under
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ManifestFetch(_) => ErrorCategory::Network,
            #[cfg(feature = "hls")]
            Error::FragmentFetch { .. } | Error::Network(_) => ErrorCategory::Network,
            Error::FragmentEmpty { .. } => ErrorCategory::Media,
            _ => ErrorCategory::Other,
        }
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::InvalidManifest(_) => "INVALID_MANIFEST",
            #[cfg(feature = "hls")]
            Error::FragmentFetch { .. } => "FRAGMENT_FETCH",
            Error::FragmentEmpty { .. } => "FRAGMENT_EMPTY",
            Error::UnsupportedFormat => "FORMAT_UNSUPPORTED",
            Error::LevelOutOfRange { .. } => "LEVEL_RANGE",
            Error::InvalidSource(_) => "INVALID_SOURCE",
            #[cfg(feature = "hls")]
            Error::Network(_) => "NETWORK",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::ConfigDecode(_) => "CONFIG_DECODE",
            Error::Io(_) => "IO",
        }
    }

    /// Convert into the fatal transport error a loader reports after giving up
    pub fn into_fatal(self) -> TransportError {
        TransportError::fatal(self.category(), self.to_string())
    }
}

/// Transport error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Network,
    Media,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Media => write!(f, "media"),
            ErrorCategory::Other => write!(f, "other"),
        }
    }
}

/// Error reported by a transport through its event stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportError {
    pub category: ErrorCategory,
    pub fatal: bool,
    pub details: String,
}

impl TransportError {
    pub fn fatal(category: ErrorCategory, details: impl Into<String>) -> Self {
        Self {
            category,
            fatal: true,
            details: details.into(),
        }
    }

    pub fn non_fatal(category: ErrorCategory, details: impl Into<String>) -> Self {
        Self {
            category,
            fatal: false,
            details: details.into(),
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.fatal { "fatal" } else { "non-fatal" };
        write!(f, "{} {} error: {}", kind, self.category, self.details)
    }
}

/// Playback failure taxonomy as seen by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackFailure {
    /// No engine can play the source; nothing was attempted
    UnsupportedFormat,
    /// Fatal to the current fragment, recovered by resuming loading
    NetworkTransient,
    /// Fatal to the current fragment, recovered by a decoder reset
    MediaDecodeTransient,
    /// Terminal; the transport handle is destroyed
    Unclassified,
}

impl PlaybackFailure {
    /// Classify a fatal transport error
    pub fn classify(error: &TransportError) -> Self {
        match error.category {
            ErrorCategory::Network => PlaybackFailure::NetworkTransient,
            ErrorCategory::Media => PlaybackFailure::MediaDecodeTransient,
            ErrorCategory::Other => PlaybackFailure::Unclassified,
        }
    }

    /// Terminal failures need a full re-mount to retry
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlaybackFailure::UnsupportedFormat | PlaybackFailure::Unclassified
        )
    }

    /// Message overlaid on the video surface
    pub fn message(&self) -> &'static str {
        match self {
            PlaybackFailure::UnsupportedFormat => "This stream format is not supported",
            PlaybackFailure::NetworkTransient => "Network error – trying to recover…",
            PlaybackFailure::MediaDecodeTransient => "Media error – trying to recover…",
            PlaybackFailure::Unclassified => "Stream unavailable",
        }
    }
}

impl std::fmt::Display for PlaybackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackFailure::UnsupportedFormat => write!(f, "unsupported-format"),
            PlaybackFailure::NetworkTransient => write!(f, "network-transient"),
            PlaybackFailure::MediaDecodeTransient => write!(f, "media-transient"),
            PlaybackFailure::Unclassified => write!(f, "unclassified"),
        }
    }
}
