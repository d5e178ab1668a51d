use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use super::error::AppError;
use super::render::{FormValues, PageBody, render_page};
use crate::analysis::{PopulationAnalysis, analyze_population_trends};
use crate::api::{PopulationData, calculate_growth_rate};
use crate::config::DashboardConfig;
use crate::output::to_csv_bytes;

/// Query string shared by every data route. Missing fields fall back to the
/// dashboard defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionParams {
    pub country: Option<String>,
    pub start: Option<i32>,
    pub end: Option<i32>,
}

/// A validated country and inclusive year range.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub country: String,
    pub start: i32,
    pub end: i32,
}

impl SelectionParams {
    fn is_empty(&self) -> bool {
        self.country.is_none() && self.start.is_none() && self.end.is_none()
    }

    fn form_values(&self, config: &DashboardConfig) -> FormValues {
        FormValues {
            country: self
                .country
                .as_deref()
                .unwrap_or(&config.default_country)
                .trim()
                .to_uppercase(),
            start: self.start.unwrap_or(config.default_start),
            end: self.end.unwrap_or(config.default_end),
        }
    }

    pub fn validate(&self, config: &DashboardConfig) -> Result<Selection, AppError> {
        let FormValues {
            country,
            start,
            end,
        } = self.form_values(config);

        if !(2..=3).contains(&country.len()) || !country.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(AppError::BadRequest(format!(
                "Country code must be 2 or 3 letters or digits, got '{country}'"
            )));
        }

        for (label, year) in [("Start", start), ("End", end)] {
            if year < config.min_year || year > config.max_year {
                return Err(AppError::BadRequest(format!(
                    "{label} year {year} is outside {}-{}",
                    config.min_year, config.max_year
                )));
            }
        }

        if start > end {
            return Err(AppError::BadRequest(format!(
                "Start year {start} is after end year {end}"
            )));
        }

        Ok(Selection {
            country,
            start,
            end,
        })
    }
}

async fn load(state: &AppState, selection: &Selection) -> Vec<PopulationData> {
    info!(
        country = %selection.country,
        start = selection.start,
        end = selection.end,
        "Fetching population range"
    );
    calculate_growth_rate(
        &*state.api,
        &selection.country,
        selection.start,
        selection.end,
    )
    .await
}

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<SelectionParams>,
) -> Response {
    let config = &state.config;
    let form = params.form_values(config);

    if params.is_empty() {
        return Html(render_page(config, &form, PageBody::Intro)).into_response();
    }

    let selection = match params.validate(config) {
        Ok(selection) => selection,
        Err(AppError::BadRequest(msg)) => {
            let page = render_page(config, &form, PageBody::Error(&msg));
            return (StatusCode::BAD_REQUEST, Html(page)).into_response();
        }
        Err(e) => return e.into_response(),
    };

    let data = load(&state, &selection).await;
    let page = match analyze_population_trends(&data) {
        Ok(analysis) => render_page(
            config,
            &form,
            PageBody::Results {
                data: &data,
                analysis: &analysis,
            },
        ),
        Err(_) => render_page(config, &form, PageBody::NoData),
    };

    Html(page).into_response()
}

#[derive(Debug, Serialize)]
pub struct PopulationResponse {
    pub country: String,
    pub start_year: i32,
    pub end_year: i32,
    pub fetched_at: DateTime<Utc>,
    pub data: Vec<PopulationData>,
    pub analysis: Option<PopulationAnalysis>,
}

pub async fn population_json(
    State(state): State<AppState>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<PopulationResponse>, AppError> {
    let selection = params.validate(&state.config)?;
    let data = load(&state, &selection).await;
    let analysis = analyze_population_trends(&data).ok();

    Ok(Json(PopulationResponse {
        country: selection.country,
        start_year: selection.start,
        end_year: selection.end,
        fetched_at: Utc::now(),
        data,
        analysis,
    }))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<SelectionParams>,
) -> Result<Response, AppError> {
    let selection = params.validate(&state.config)?;
    let data = load(&state, &selection).await;
    let body = to_csv_bytes(&data)?;

    let disposition = format!(
        "attachment; filename=\"population_data_{}.csv\"",
        selection.country
    );
    info!(country = %selection.country, rows = data.len(), "Serving CSV export");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub async fn health() -> &'static str {
    "ok"
}
