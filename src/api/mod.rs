//! Population data retrieval.
//!
//! [`PopulationApi`] fetches one (country, year) observation. The free
//! functions on top of it fan a year range out concurrently and derive
//! year-over-year growth rates.

pub mod worldbank;

pub use worldbank::WorldBankClient;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub const DEFAULT_CONCURRENCY: usize = 10;

/// One population observation, optionally annotated with the growth rate
/// (percent) relative to the previous observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationData {
    pub country: String,
    pub year: i32,
    pub population: u64,
    pub growth_rate: Option<f64>,
}

impl PopulationData {
    pub fn new(country: impl Into<String>, year: i32, population: u64) -> Self {
        Self {
            country: country.into(),
            year,
            population,
            growth_rate: None,
        }
    }
}

/// Source of single-year population observations.
#[async_trait]
pub trait PopulationApi: Send + Sync {
    /// Returns the population of `country` in `year`, or `None` when the
    /// source has no (or a zero) value for it.
    async fn get_country_population(
        &self,
        country: &str,
        year: i32,
    ) -> Result<Option<PopulationData>>;

    /// How many year requests a range fetch keeps in flight.
    fn concurrency(&self) -> usize {
        DEFAULT_CONCURRENCY
    }
}

/// Fetches every year in `start..=end` concurrently and yields the
/// observations in completion order.
///
/// Years without data are skipped. A year whose request fails is logged and
/// skipped; it does not end the stream.
pub fn get_country_population_range<'a, A>(
    api: &'a A,
    country: &'a str,
    start_year: i32,
    end_year: i32,
) -> impl Stream<Item = PopulationData> + 'a
where
    A: PopulationApi + ?Sized,
{
    let limit = api.concurrency().max(1);

    stream::iter(start_year..=end_year)
        .map(move |year| async move { (year, api.get_country_population(country, year).await) })
        .buffer_unordered(limit)
        .filter_map(move |(year, result)| async move {
            match result {
                Ok(Some(data)) => Some(data),
                Ok(None) => {
                    debug!(country, year, "No population value");
                    None
                }
                Err(e) => {
                    error!(country, year, error = %e, "Error fetching population");
                    None
                }
            }
        })
}

/// Collects the range, orders it by year and fills in growth rates.
#[tracing::instrument(skip(api))]
pub async fn calculate_growth_rate<A>(
    api: &A,
    country: &str,
    start_year: i32,
    end_year: i32,
) -> Vec<PopulationData>
where
    A: PopulationApi + ?Sized,
{
    let mut data: Vec<PopulationData> =
        get_country_population_range(api, country, start_year, end_year)
            .collect()
            .await;

    data.sort_by_key(|d| d.year);
    apply_growth_rates(&mut data);

    info!(
        observations = data.len(),
        requested = (i64::from(end_year) - i64::from(start_year) + 1).max(0),
        "Population range fetched"
    );
    data
}

/// Sets `growth_rate` on every entry after the first, as the percentage change
/// from its predecessor. Entries following a zero population are left unset.
pub fn apply_growth_rates(data: &mut [PopulationData]) {
    for i in 1..data.len() {
        let prev = data[i - 1].population;
        if prev > 0 {
            let curr = data[i].population;
            data[i].growth_rate = Some((curr as f64 - prev as f64) / prev as f64 * 100.0);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// In-memory source. Years listed in `failing` return an error.
    #[derive(Default)]
    pub struct StaticApi {
        pub values: HashMap<(String, i32), u64>,
        pub failing: Vec<i32>,
    }

    impl StaticApi {
        pub fn with(country: &str, values: &[(i32, u64)]) -> Self {
            Self {
                values: values
                    .iter()
                    .map(|(year, pop)| ((country.to_string(), *year), *pop))
                    .collect(),
                failing: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl PopulationApi for StaticApi {
        async fn get_country_population(
            &self,
            country: &str,
            year: i32,
        ) -> Result<Option<PopulationData>> {
            if self.failing.contains(&year) {
                anyhow::bail!("upstream unavailable for {year}");
            }
            let country = country.to_uppercase();
            Ok(self
                .values
                .get(&(country.clone(), year))
                .copied()
                .filter(|p| *p > 0)
                .map(|p| PopulationData::new(country, year, p)))
        }

        fn concurrency(&self) -> usize {
            3
        }
    }
}
