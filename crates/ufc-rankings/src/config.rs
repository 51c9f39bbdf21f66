use std::path::PathBuf;
use std::time::Duration;

use rankings_common::http::HttpClientConfig;

use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://www.ufc.com";

/// Runtime configuration, read explicitly from the environment.
///
/// The document path has no default; it must come from `--document` or
/// `RANKINGS_PATH`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Rankings JSON document to read and rewrite.
    pub document_path: PathBuf,
    /// Site root used to resolve relative athlete links.
    pub base_url: String,
    pub http: HttpClientConfig,
}

impl Config {
    /// Required (unless `document` is given):
    /// - `RANKINGS_PATH`
    ///
    /// Optional:
    /// - `UFC_BASE_URL` (default: "https://www.ufc.com")
    /// - `FETCH_TIMEOUT_SECS`, `FETCH_MAX_RETRIES`, `FETCH_RETRY_INITIAL_MS`,
    ///   `FETCH_RETRY_MAX_MS`, `FETCH_DELAY_MS`, `FETCH_USER_AGENT`
    pub fn from_env(document: Option<PathBuf>) -> Result<Self, AppError> {
        Self::from_lookup(document, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(document: Option<PathBuf>, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let document_path = match document {
            Some(p) => p,
            None => lookup("RANKINGS_PATH").map(PathBuf::from).ok_or_else(|| {
                AppError::Config(
                    "RANKINGS_PATH environment variable or --document is required".to_string(),
                )
            })?,
        };

        let base_url = lookup("UFC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let defaults = HttpClientConfig::default();
        let http = HttpClientConfig {
            user_agent: lookup("FETCH_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout: parse_u64(&lookup, "FETCH_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: parse_u64(&lookup, "FETCH_MAX_RETRIES")?
                .map(|n| {
                    u32::try_from(n).map_err(|_| {
                        AppError::Config(format!("FETCH_MAX_RETRIES must fit in 32 bits, got {n}"))
                    })
                })
                .transpose()?
                .unwrap_or(defaults.max_retries),
            initial_backoff: parse_u64(&lookup, "FETCH_RETRY_INITIAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: parse_u64(&lookup, "FETCH_RETRY_MAX_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
            min_interval: parse_u64(&lookup, "FETCH_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_interval),
        };

        Ok(Self {
            document_path,
            base_url,
            http,
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
    }
}
