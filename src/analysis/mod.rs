//! Aggregate statistics over a country's population series.

pub mod stats;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::api::PopulationData;
use stats::mean_and_stddev;

/// Summary of one country's population over the analysed years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationAnalysis {
    pub country: String,
    pub start_year: i32,
    pub end_year: i32,
    /// Mean of the year-over-year growth rates, in percent.
    pub average_growth_rate: f64,
    pub growth_rate_stddev: f64,
    pub max_population: u64,
    pub min_population: u64,
    pub total_change: u64,
    /// `total_change` relative to `min_population`, in percent.
    pub percentage_change: f64,
}

/// Yields only the entries that carry a positive population.
pub fn process_population_data(
    data: &[PopulationData],
) -> impl Iterator<Item = &PopulationData> + '_ {
    data.iter().filter(|d| d.population > 0)
}

/// Computes [`PopulationAnalysis`] over the valid entries of `data`.
///
/// # Errors
///
/// Fails when no entry has a positive population.
pub fn analyze_population_trends(data: &[PopulationData]) -> Result<PopulationAnalysis> {
    let valid: Vec<&PopulationData> = process_population_data(data).collect();

    let Some(first) = valid.first() else {
        bail!("No valid population data available for analysis");
    };

    let rates: Vec<f64> = valid.iter().filter_map(|d| d.growth_rate).collect();
    let (average_growth_rate, growth_rate_stddev) = mean_and_stddev(&rates);

    let max_population = valid.iter().map(|d| d.population).max().unwrap_or(0);
    let min_population = valid.iter().map(|d| d.population).min().unwrap_or(0);
    let total_change = max_population - min_population;
    let percentage_change = if min_population > 0 {
        total_change as f64 / min_population as f64 * 100.0
    } else {
        0.0
    };

    Ok(PopulationAnalysis {
        country: first.country.clone(),
        start_year: valid.iter().map(|d| d.year).min().unwrap_or(first.year),
        end_year: valid.iter().map(|d| d.year).max().unwrap_or(first.year),
        average_growth_rate,
        growth_rate_stddev,
        max_population,
        min_population,
        total_change,
        percentage_change,
    })
}

/// Keeps entries whose growth rate lies within the inclusive bounds.
///
/// With neither bound set every entry is kept. Once a bound is set, entries
/// without a growth rate cannot satisfy it and are dropped.
pub fn filter_by_growth_rate(
    data: &[PopulationData],
    min_growth: Option<f64>,
    max_growth: Option<f64>,
) -> Vec<PopulationData> {
    if min_growth.is_none() && max_growth.is_none() {
        return data.to_vec();
    }

    data.iter()
        .filter(|d| match d.growth_rate {
            Some(rate) => {
                min_growth.is_none_or(|min| rate >= min) && max_growth.is_none_or(|max| rate <= max)
            }
            None => false,
        })
        .cloned()
        .collect()
}

/// `(year, growth_rate)` pairs for the entries that have a growth rate.
pub fn growth_series(data: &[PopulationData]) -> Vec<(i32, f64)> {
    data.iter()
        .filter_map(|d| d.growth_rate.map(|rate| (d.year, rate)))
        .collect()
}
