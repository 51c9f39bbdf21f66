use std::future::Future;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::CommonError;

#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Minimum spacing between consecutive requests.
    pub min_interval: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("ufc-rankings/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(5_000),
            min_interval: Duration::from_millis(1_000),
        }
    }
}

/// Bounded exponential backoff for transient fetch failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl From<&HttpClientConfig> for RetryPolicy {
    fn from(config: &HttpClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `retry` (0-based): doubles from the initial backoff
    /// up to the cap, plus up to a quarter of that as jitter.
    fn delay(&self, retry: u32) -> Duration {
        let doubled = self.initial_backoff.saturating_mul(2u32.saturating_pow(retry));
        let capped = doubled.min(self.max_backoff);
        capped + jitter(capped / 4)
    }

    /// Run `attempt` until it succeeds, fails permanently, or the retry budget
    /// is spent. The last error is returned as is.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, CommonError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CommonError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(e) if retries < self.max_retries && is_transient(&e) => {
                    let delay = self.delay(retries);
                    retries += 1;
                    warn!(retry = retries, delay_ms = delay.as_millis() as u64, error = %e, "fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

fn is_transient(err: &CommonError) -> bool {
    match err {
        CommonError::Request(e) => e.is_timeout() || e.is_connect() || e.is_body(),
        CommonError::Upstream { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        _ => false,
    }
}

fn jitter(max: Duration) -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(nanos % (max_ms + 1))
}

/// Page fetcher for scraping: sequential, throttled, with bounded retry.
pub struct HttpClient {
    http: reqwest::Client,
    retry: RetryPolicy,
    throttle: Throttle,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            retry: RetryPolicy::from(&config),
            throttle: Throttle::new(config.min_interval),
        })
    }

    /// GET `url` and return the body with the final (post-redirect) URL.
    pub async fn get_text(&self, url: &str) -> Result<(String, String), CommonError> {
        self.get_text_with_query(url, &[]).await
    }

    /// Like `get_text`, with `query` pairs URL-encoded onto `url`.
    pub async fn get_text_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<(String, String), CommonError> {
        self.retry
            .run(|| async {
                self.throttle.wait().await;
                debug!(url, ?query, "GET");
                let resp = self.http.get(url).query(query).send().await?;
                let status = resp.status();
                let final_url = resp.url().to_string();
                if !status.is_success() {
                    return Err(CommonError::Upstream {
                        status,
                        url: final_url,
                    });
                }
                let body = resp.text().await?;
                Ok((body, final_url))
            })
            .await
    }
}

/// Enforces a minimum interval between calls to `wait`. The first call
/// returns immediately.
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
