use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use better_analytics_core::analytics::{JourneyQuery, TimeRange};
use better_analytics_core::journey::{to_sankey, DEFAULT_MAX_STEPS, DEFAULT_PATH_LIMIT};

use crate::{error::AppError, state::AppState};

const MAX_STEPS_RANGE: std::ops::RangeInclusive<u8> = 2..=10;
const LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=200;

#[derive(Debug, Deserialize)]
pub struct UserJourneyParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_steps: Option<u32>,
    pub limit: Option<u32>,
}

fn parse_date_range(
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<TimeRange, AppError> {
    let Some(start_raw) = start_date else {
        return Err(AppError::BadRequest("start_date is required".to_string()));
    };
    let Some(end_raw) = end_date else {
        return Err(AppError::BadRequest("end_date is required".to_string()));
    };

    let start = NaiveDate::parse_from_str(start_raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest("invalid start_date (expected YYYY-MM-DD)".to_string())
    })?;
    let end = NaiveDate::parse_from_str(end_raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("invalid end_date (expected YYYY-MM-DD)".to_string()))?;

    if end < start {
        return Err(AppError::BadRequest(
            "end_date must be on or after start_date".to_string(),
        ));
    }

    let invalid_time = || AppError::BadRequest("invalid date range".to_string());
    Ok(TimeRange {
        start: start.and_hms_opt(0, 0, 0).ok_or_else(invalid_time)?,
        end: end.and_hms_opt(23, 59, 59).ok_or_else(invalid_time)?,
    })
}

/// `GET .../user-journey`: most frequent session paths as Sankey data.
#[tracing::instrument(skip(state))]
pub async fn get_user_journey(
    State(state): State<Arc<AppState>>,
    Path(dashboard_id): Path<String>,
    Query(params): Query<UserJourneyParams>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.dashboard_context(&dashboard_id).await?;
    let range = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let max_steps = params
        .max_steps
        .map_or(Some(DEFAULT_MAX_STEPS), |raw| u8::try_from(raw).ok())
        .filter(|steps| MAX_STEPS_RANGE.contains(steps))
        .ok_or_else(|| AppError::BadRequest("max_steps must be between 2 and 10".to_string()))?;
    let limit = params.limit.unwrap_or(DEFAULT_PATH_LIMIT);
    if !LIMIT_RANGE.contains(&limit) {
        return Err(AppError::BadRequest(
            "limit must be between 1 and 200".to_string(),
        ));
    }

    let query = JourneyQuery {
        site_id: ctx.site_id,
        range,
        max_steps,
        limit,
    };
    let paths = state.analytics.get_sequential_paths(&query).await?;
    let data = to_sankey(&paths, usize::from(query.max_steps));
    Ok(Json(json!({ "data": data })))
}
