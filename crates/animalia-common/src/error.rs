//! Error types for the Animalia pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Main error type for the Animalia pipeline.
///
/// Per-record problems (a record failing a validation rule, a single send
/// attempt failing) are data, captured in the stage reports — they never
/// surface as an `EtlError`. This type covers the fatal, stage-aborting
/// failures only.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON in '{path}': {source}")]
    MalformedInput {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("no GBIF match found for species '{0}'")]
    SpeciesNotFound(String),

    #[error("no records: {0}")]
    Empty(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Create a malformed-input error for a given file path
    pub fn malformed(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedInput {
            path: path.into(),
            source,
        }
    }

    /// Create an upstream API error from a status code and response body
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Create an empty-output error
    pub fn empty(msg: impl Into<String>) -> Self {
        Self::Empty(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is a transport-level network failure
    /// (connect failure or timeout), as opposed to an upstream HTTP error.
    /// Retry policy applies only to these.
    pub fn is_network(&self) -> bool {
        match self {
            EtlError::Network(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}
