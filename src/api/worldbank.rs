//! Client for the World Bank v2 indicator API.
//!
//! `GET {base}/{country}/indicator/SP.POP.TOTL?format=json&date={year}`
//! answers with a two-element array: page metadata, then either `null` or
//! the list of observations. Invalid requests come back as a one-element
//! array holding a `message` list instead.

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::time::Duration;

use super::{PopulationApi, PopulationData};
use crate::config::ClientConfig;
use crate::fetch::{BasicClient, HttpClient, RateLimited, Retry, fetch_json};

/// Total population indicator code.
pub const POPULATION_INDICATOR: &str = "SP.POP.TOTL";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IndicatorResponse {
    Data(IgnoredAny, Option<Vec<Observation>>),
    Error(Vec<ErrorEnvelope>),
}

#[derive(Debug, Deserialize)]
struct Observation {
    #[serde(default)]
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

/// Transport stack used outside of tests: retries wrapped around the rate
/// limiter, so every retry also waits for a slot.
pub type DefaultTransport = Retry<RateLimited<BasicClient>>;

pub struct WorldBankClient<C> {
    http: C,
    base_url: String,
    concurrency: usize,
}

impl WorldBankClient<DefaultTransport> {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let basic = BasicClient::new(config.timeout)?;
        let limited = RateLimited::new(basic, config.rate_limit, config.time_window);
        let http = Retry::new(limited, config.max_retries, config.retry_base_delay)
            .with_max_delay(config.retry_max_delay);

        Ok(Self::new(http, &config.base_url).with_concurrency(config.concurrency))
    }
}

impl<C: HttpClient> WorldBankClient<C> {
    pub fn new(http: C, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            concurrency: super::DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    fn indicator_url(&self, country: &str) -> String {
        format!(
            "{}/{}/indicator/{}",
            self.base_url, country, POPULATION_INDICATOR
        )
    }
}

#[async_trait]
impl<C: HttpClient> PopulationApi for WorldBankClient<C> {
    #[tracing::instrument(skip(self))]
    async fn get_country_population(
        &self,
        country: &str,
        year: i32,
    ) -> Result<Option<PopulationData>> {
        let country = country.trim().to_uppercase();
        let url = self.indicator_url(&country);
        let date = year.to_string();

        let started = std::time::Instant::now();
        let response: IndicatorResponse =
            fetch_json(&self.http, &url, &[("format", "json"), ("date", &date)]).await?;
        if started.elapsed() > Duration::from_secs(15) {
            tracing::warn!(elapsed_secs = started.elapsed().as_secs(), "Population fetch was slow");
        }

        match response {
            IndicatorResponse::Error(envelopes) => {
                let detail = envelopes
                    .iter()
                    .flat_map(|e| &e.message)
                    .map(|m| format!("{} {}: {}", m.id, m.key, m.value))
                    .collect::<Vec<_>>()
                    .join("; ");
                bail!("World Bank API rejected {country}/{year}: {detail}");
            }
            IndicatorResponse::Data(_, observations) => {
                let first = observations.unwrap_or_default().into_iter().next();
                let population = first
                    .and_then(|o| {
                        if !o.date.is_empty() && o.date != date {
                            tracing::debug!(returned = %o.date, "Observation year differs from request");
                        }
                        o.value
                    })
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .map(|v| v.round() as u64);

                Ok(population.map(|p| PopulationData::new(country, year, p)))
            }
        }
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }
}
