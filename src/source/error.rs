//! Errors raised by the content source layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Content API returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode content API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Content API did not advertise a master ref")]
    MissingMasterRef,

    #[error("Unknown pagination cursor: {0}")]
    UnknownCursor(String),

    #[error("Fixture error: {0}")]
    Fixture(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
