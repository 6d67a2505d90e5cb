use std::path::PathBuf;

use thiserror::Error;

/// Transport-level failure for one fetch. Never fatal: it becomes a `status = 0` record.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("too many redirects ({hops}) starting at {url}")]
    TooManyRedirects { url: String, hops: usize },

    #[error("redirect from {url} has no usable Location header")]
    BadRedirect { url: String },
}

/// Input problems that stop a run before any scan is attempted.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read URL list {path}: {source}")]
    UnreadableList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("URL list {0} contains no URLs")]
    EmptyList(PathBuf),

    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),
}
