use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use std::time::Duration;
use tracing::warn;

/// An [`HttpClient`] wrapper that retries transport failures, `429 Too Many
/// Requests` and `5xx` responses with exponential backoff.
///
/// Attempt `n` (zero-based) waits `base_delay * 2^n`, unless a 429 carries a
/// numeric `Retry-After` header, in which case that many seconds are used.
/// Every wait is capped at `max_delay`. After `max_retries` retries the last
/// response or error is returned as-is.
#[derive(Clone)]
pub struct Retry<C> {
    pub inner: C,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

impl<C> Retry<C> {
    pub fn new(inner: C, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_delay)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    if resp.status() != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    resp.headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl<C: HttpClient> HttpClient for Retry<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let mut attempt = 0;

        loop {
            // Streaming bodies cannot be replayed; send those once.
            let Some(this_try) = req.try_clone() else {
                return self.inner.execute(req).await;
            };

            let delay = match self.inner.execute(this_try).await {
                Ok(resp) if is_retryable(resp.status()) && attempt < self.max_retries => {
                    let delay = retry_after(&resp)
                        .unwrap_or_else(|| self.backoff(attempt))
                        .min(self.max_delay);
                    warn!(
                        url = %req.url(),
                        status = resp.status().as_u16(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable HTTP status, backing off"
                    );
                    delay
                }
                Err(e) if !e.is_builder() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        url = %req.url(),
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "HTTP request failed, backing off"
                    );
                    delay
                }
                other => return other,
            };

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use crate::fetch::testing::{ScriptedClient, get_request};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Counts the attempts that reach a real client.
    #[derive(Clone)]
    struct Counting<C> {
        inner: C,
        calls: Arc<AtomicUsize>,
    }

    impl<C> Counting<C> {
        fn new(inner: C) -> Self {
            Self {
                inner,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<C: HttpClient> HttpClient for Counting<C> {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.execute(req).await
        }
    }

    fn retry(inner: ScriptedClient, max_retries: u32) -> Retry<ScriptedClient> {
        Retry::new(inner, max_retries, Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_returned_immediately() {
        let inner = ScriptedClient::always(200);
        let client = retry(inner.clone(), 3);

        let resp = client.execute(get_request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_retried_with_backoff() {
        let inner = ScriptedClient::sequence(&[500, 503, 200]);
        let client = retry(inner.clone(), 3);
        let start = Instant::now();

        let resp = client.execute(get_request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(inner.calls(), 3);
        // 100ms + 200ms
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_too_many_requests_honors_retry_after() {
        let inner = ScriptedClient::sequence(&[429, 200]).with_retry_after(2);
        let client = retry(inner.clone(), 3);
        let start = Instant::now();

        let resp = client.execute(get_request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let inner = ScriptedClient::always(502);
        let client = retry(inner.clone(), 2);

        let resp = client.execute(get_request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let inner = ScriptedClient::always(404);
        let client = retry(inner.clone(), 3);

        let resp = client.execute(get_request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_capped_at_max_delay() {
        let inner = ScriptedClient::sequence(&[429, 200]).with_retry_after(86_400);
        let client = retry(inner.clone(), 3).with_max_delay(Duration::from_secs(5));
        let start = Instant::now();

        let resp = client.execute(get_request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_transport_error_is_retried_then_returned() {
        let inner = Counting::new(BasicClient::new(Duration::from_secs(2)).unwrap());
        let client = Retry::new(inner.clone(), 2, Duration::from_millis(1));
        // Nothing listens on port 1, so every attempt fails to connect.
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://127.0.0.1:1/".parse().unwrap(),
        );

        let result = client.execute(req).await;

        assert!(result.is_err());
        assert_eq!(inner.calls(), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let client = retry(ScriptedClient::always(200), 3).with_max_delay(Duration::from_millis(250));
        assert_eq!(client.backoff(0), Duration::from_millis(100));
        assert_eq!(client.backoff(5), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_doubles() {
        let client = retry(ScriptedClient::always(200), 3);
        assert_eq!(client.backoff(0), Duration::from_millis(100));
        assert_eq!(client.backoff(1), Duration::from_millis(200));
        assert_eq!(client.backoff(3), Duration::from_millis(800));
    }
}
