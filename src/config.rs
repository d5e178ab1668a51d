//! Runtime settings for the API client and the dashboard.
//!
//! Defaults match the public World Bank API's tolerance (10 requests per
//! second). The CLI overrides individual fields; `POPULATION_API_BASE` in the
//! environment (or `.env`) overrides the API base URL.

use std::net::SocketAddr;
use std::time::Duration;

use crate::fetch::DEFAULT_MAX_DELAY;

pub const DEFAULT_API_BASE: &str = "https://api.worldbank.org/v2/country";
pub const API_BASE_ENV: &str = "POPULATION_API_BASE";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Requests allowed per `time_window`.
    pub rate_limit: u32,
    pub time_window: Duration,
    /// Year requests kept in flight while fetching a range.
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// Upper bound on any single backoff, including server `Retry-After`.
    pub retry_max_delay: Duration,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            rate_limit: 10,
            time_window: Duration::from_secs(1),
            concurrency: 10,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: DEFAULT_MAX_DELAY,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Defaults, with the base URL taken from `POPULATION_API_BASE` when set.
    pub fn from_env() -> Self {
        Self::default().with_base_url_override(std::env::var(API_BASE_ENV).ok().as_deref())
    }

    /// Replaces the base URL with `base` unless it is missing or blank.
    pub fn with_base_url_override(mut self, base: Option<&str>) -> Self {
        if let Some(base) = base.map(str::trim).filter(|b| !b.is_empty()) {
            self.base_url = base.to_string();
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub addr: SocketAddr,
    pub min_year: i32,
    pub max_year: i32,
    pub default_country: String,
    pub default_start: i32,
    pub default_end: i32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8501)),
            min_year: 1960,
            max_year: 2023,
            default_country: "USA".to_string(),
            default_start: 2000,
            default_end: 2023,
        }
    }
}
