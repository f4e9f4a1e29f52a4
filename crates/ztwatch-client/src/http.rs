//! Shared HTTP plumbing: one connection pool, per-request timeout and
//! retries with exponential backoff plus jitter.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use ztwatch_core::config::HttpConfig;

use crate::error::{ClientError, ClientResult, Exhausted};

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    /// Upper bound of the random delay added to every backoff.
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            base_delay: Duration::from_secs(config.retry_delay_secs),
            max_jitter: Duration::from_secs(1),
        }
    }

    /// Delay before retrying after the zero-based `attempt` failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let mut buf = [0u8; 4];
        match getrandom::getrandom(&mut buf) {
            Ok(()) => {
                let fraction = u32::from_le_bytes(buf) as f64 / u32::MAX as f64;
                self.max_jitter.mul_f64(fraction)
            }
            Err(_) => Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds or the attempts are used up.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, Exhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(what, attempt = attempt + 1, total = self.attempts, error = %e, "request failed");
                    attempt += 1;
                    if attempt >= self.attempts {
                        return Err(Exhausted {
                            attempts: self.attempts,
                            last: e,
                        });
                    }
                    let delay = self.backoff(attempt - 1);
                    debug!(what, delay_ms = delay.as_millis() as u64, "retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// reqwest client with the configured timeout and retry policy.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("ztwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self {
            client,
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request built fresh for every attempt and decode the JSON body.
    pub async fn fetch_json<T, B>(&self, what: &str, build: B) -> Result<T, Exhausted>
    where
        T: DeserializeOwned,
        B: Fn() -> RequestBuilder,
    {
        let build = &build;
        self.retry
            .run(what, move || async move {
                let response = build().send().await?.error_for_status()?;
                Ok(response.json::<T>().await?)
            })
            .await
    }

    /// Send a request built fresh for every attempt, ignoring the body.
    pub async fn send(&self, what: &str, build: impl Fn() -> RequestBuilder) -> Result<(), Exhausted> {
        let build = &build;
        self.retry
            .run(what, move || async move {
                build().send().await?.error_for_status()?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let p = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_secs(5),
            max_jitter: Duration::ZERO,
        };
        assert_eq!(p.backoff(0), Duration::from_secs(5));
        assert_eq!(p.backoff(1), Duration::from_secs(10));
        assert_eq!(p.backoff(2), Duration::from_secs(20));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let p = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(500),
        };
        for _ in 0..20 {
            let delay = p.backoff(0);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn from_config_never_allows_zero_attempts() {
        let config = HttpConfig {
            retry_attempts: 0,
            retry_delay_secs: 5,
            timeout_secs: 10,
        };
        assert_eq!(RetryPolicy::from_config(&config).attempts, 1);
    }

    #[tokio::test]
    async fn run_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = policy(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ClientError::Network("refused".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run_reports_last_error_when_exhausted() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = policy(2)
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(ClientError::Network(format!("failure {n}")))
            })
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(err.last.to_string(), "request failed: failure 1");
    }
}
