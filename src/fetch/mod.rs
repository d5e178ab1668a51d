//! Outbound HTTP transport.
//!
//! [`HttpClient`] is the seam every request goes through. [`BasicClient`]
//! talks to the network; [`RateLimited`] and [`Retry`] decorate any other
//! client with a request ceiling and backoff respectively.

mod basic;
mod client;
mod rate_limit;
mod retry;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use rate_limit::RateLimited;
pub use retry::{DEFAULT_MAX_DELAY, Retry};

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;

/// Issues a GET to `url` with the given query pairs and decodes the body as JSON.
///
/// # Errors
///
/// Fails if the URL is malformed, the transport fails, the final status is
/// not 2xx, or the body does not decode into `T`.
pub async fn fetch_json<C, T>(client: &C, url: &str, query: &[(&str, &str)]) -> Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let mut url = reqwest::Url::parse(url).with_context(|| format!("invalid URL '{url}'"))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());
    let resp = client.execute(req).await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("GET {url} failed with status {status}: {body}");
    }

    resp.json::<T>()
        .await
        .with_context(|| format!("GET {url} returned an unexpected body"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Echo {
        ok: bool,
    }

    fn client() -> BasicClient {
        BasicClient::new(std::time::Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_json_sends_query_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/echo"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let url = format!("{}/echo", server.uri());
        let echo: Echo = fetch_json(&client(), &url, &[("format", "json")])
            .await
            .unwrap();

        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_fetch_json_non_success_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = fetch_json::<_, Echo>(&client(), &url, &[])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_json_invalid_url_is_error() {
        let result = fetch_json::<_, Echo>(&client(), "not a url", &[]).await;
        assert!(result.is_err());
    }
}
