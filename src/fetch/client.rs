use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a single outbound request. Decorators such as
/// [`RateLimited`](super::RateLimited) and [`Retry`](super::Retry) wrap
/// another `HttpClient` and forward to it.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
