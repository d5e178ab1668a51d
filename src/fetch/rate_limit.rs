use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// An [`HttpClient`] wrapper that admits at most `limit` requests per
/// fixed `window`.
///
/// The window opens at the first request after the previous one expired.
/// Once `limit` requests have gone out inside a window, the next caller
/// sleeps until the window closes and then starts a fresh one. Clones share
/// the same window, so a single limiter can be handed to many tasks.
#[derive(Clone)]
pub struct RateLimited<C> {
    inner: C,
    limit: u32,
    window: Duration,
    state: Arc<Mutex<WindowState>>,
}

struct WindowState {
    started: Instant,
    count: u32,
}

impl<C> RateLimited<C> {
    pub fn new(inner: C, limit: u32, window: Duration) -> Self {
        Self {
            inner,
            limit: limit.max(1),
            window,
            state: Arc::new(Mutex::new(WindowState {
                started: Instant::now(),
                count: 0,
            })),
        }
    }

    /// Blocks until a slot in the current window is available.
    ///
    /// The lock is held across the sleep so waiters queue up in order
    /// instead of all waking into the same new window.
    async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let elapsed = state.started.elapsed();

        if elapsed >= self.window {
            state.count = 0;
            state.started = Instant::now();
        } else if state.count >= self.limit {
            let wait = self.window - elapsed;
            debug!(
                wait_ms = wait.as_millis() as u64,
                limit = self.limit,
                "Rate limit reached, waiting for next window"
            );
            tokio::time::sleep(wait).await;
            state.count = 0;
            state.started = Instant::now();
        }

        state.count += 1;
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for RateLimited<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.acquire().await;
        self.inner.execute(req).await
    }
}
