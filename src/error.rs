//! Error types shared by the analysis pipeline.
//!
//! Per-provider failures ([`ProviderError`]) are absorbed by the BPM resolver
//! and never abort a batch.  Session failures ([`SessionError`]) are fatal and
//! stop the run before analysis starts.

use thiserror::Error;

/// Track construction and record parsing failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error("Track validation failed: {0}")]
    Validation(String),

    #[error("Track parsing failed: {0}")]
    Parsing(String),
}

/// Primary platform session failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Failure kind reported by an external data source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 429
    #[error("Rate limit exceeded")]
    RateLimited,

    /// HTTP 401
    #[error("Authentication rejected (invalid API key or token)")]
    Authentication,

    /// HTTP 403 from the primary platform
    #[error("Quota exceeded")]
    QuotaExceeded,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Service returned status {0}")]
    Status(u16),

    /// Body could not be decoded into the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Short machine-friendly label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::Authentication => "authentication",
            ProviderError::QuotaExceeded => "quota_exceeded",
            ProviderError::NotFound(_) => "not_found",
            ProviderError::Status(_) => "status",
            ProviderError::Malformed(_) => "malformed",
        }
    }
}

impl From<ureq::Error> for ProviderError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(401, _) => ProviderError::Authentication,
            ureq::Error::Status(403, _) => ProviderError::QuotaExceeded,
            ureq::Error::Status(429, _) => ProviderError::RateLimited,
            ureq::Error::Status(code, _) => ProviderError::Status(code),
            ureq::Error::Transport(t) => ProviderError::Network(t.to_string()),
        }
    }
}

/// Per-track analysis failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Quota exceeded for track: {0}")]
    QuotaExceeded(String),

    #[error("BPM analysis failed: {0}")]
    Bpm(String),

    #[error("Genre analysis failed: {0}")]
    Genre(String),
}

/// Invalid filter criteria.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Both minimum and maximum BPM must be given")]
    IncompleteRange,

    #[error("Minimum BPM must be positive, got {0}")]
    NonPositiveMin(f64),

    #[error("Maximum BPM ({max}) must be greater than minimum BPM ({min})")]
    InvertedRange { min: f64, max: f64 },
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HOME environment variable not set")]
    NoHome,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
