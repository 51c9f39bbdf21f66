/// Error types shared by the rankings tools.
///
/// These cover document persistence and HTTP access. Binary-specific errors
/// (configuration, HTML parsing) are defined in each binary and wrap
/// `CommonError` via `#[from]`.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("rankings document not found at {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rankings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned error: status={status} url={url}")]
    Upstream {
        status: reqwest::StatusCode,
        url: String,
    },
}
