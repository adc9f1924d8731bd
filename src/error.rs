//! Error types for the assistant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a fallback stage did not satisfy a request. Always recovered inside
/// the resolver; only ever surfaces in logs.
#[derive(Error, Debug)]
pub enum Declined {
    #[error("source returned no usable data")]
    Empty,

    #[error("only {found} record(s), {required} required")]
    Insufficient { found: usize, required: usize },

    #[error("no array at result path `{0}`")]
    MissingPath(String),

    #[error(transparent)]
    Failed(#[from] Error),
}
