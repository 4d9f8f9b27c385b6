use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, info};

use better_analytics_core::analytics::{FunnelQuery, TimeRange};
use better_analytics_core::filter::QueryFilter;
use better_analytics_core::funnel::{CreateFunnelRequest, FunnelDetails, FunnelPreview};

use crate::{
    error::AppError,
    preview::{PreviewKey, MAX_EDITOR_ID_LEN},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PreviewFunnelRequest {
    pub query_filters: Vec<QueryFilter>,
    #[serde(default)]
    pub is_strict: bool,
    /// Identifies the editing session; with `sequence`, enables
    /// last-request-wins handling.
    pub editor_id: Option<String>,
    pub sequence: Option<u64>,
}

fn all_time(site_id: &str, query_filters: Vec<QueryFilter>, is_strict: bool) -> FunnelQuery {
    FunnelQuery {
        site_id: site_id.to_string(),
        query_filters,
        is_strict,
        range: None,
    }
}

#[tracing::instrument(skip(state))]
pub async fn list_funnels(
    State(state): State<Arc<AppState>>,
    Path(dashboard_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.dashboard_context(&dashboard_id).await?;
    let funnels = state.metadata.list_funnels(&ctx.dashboard_id).await?;

    let mut tasks = JoinSet::new();
    for (idx, funnel) in funnels.iter().enumerate() {
        let analytics = Arc::clone(&state.analytics);
        let query = all_time(&ctx.site_id, funnel.query_filters.clone(), funnel.is_strict);
        tasks.spawn(async move { (idx, analytics.get_funnel_visitors(&query).await) });
    }

    let mut visitors: Vec<Vec<u64>> = vec![Vec::new(); funnels.len()];
    while let Some(joined) = tasks.join_next().await {
        let (idx, result) = joined.map_err(anyhow::Error::from)?;
        visitors[idx] = result?;
    }

    let data = funnels
        .into_iter()
        .zip(visitors)
        .map(|(funnel, visitors)| Ok(FunnelDetails::new(funnel, visitors)?.report()))
        .collect::<Result<Vec<_>, AppError>>()?;
    Ok(Json(json!({ "data": data })))
}

#[tracing::instrument(skip(state))]
pub async fn get_funnel(
    State(state): State<Arc<AppState>>,
    Path((dashboard_id, funnel_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.dashboard_context(&dashboard_id).await?;
    let funnel = state
        .metadata
        .get_funnel(&ctx.dashboard_id, &funnel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Funnel not found".to_string()))?;

    let query = all_time(&ctx.site_id, funnel.query_filters.clone(), funnel.is_strict);
    let visitors = state.analytics.get_funnel_visitors(&query).await?;
    let details = FunnelDetails::new(funnel, visitors)?;
    let report = details.report();
    Ok(Json(json!({ "data": { "funnel": details, "report": report } })))
}

#[tracing::instrument(skip(state, req))]
pub async fn create_funnel(
    State(state): State<Arc<AppState>>,
    Path(dashboard_id): Path<String>,
    Json(req): Json<CreateFunnelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.dashboard_context(&dashboard_id).await?;
    req.validate()?;

    let funnel = state.metadata.create_funnel(&ctx.dashboard_id, req).await?;
    info!(funnel_id = %funnel.id, dashboard_id = %ctx.dashboard_id, "Funnel created");
    Ok((StatusCode::CREATED, Json(json!({ "data": funnel }))))
}

/// `POST .../funnels/preview`: analysis of unsaved steps over the last day.
///
/// Requests carrying `editor_id` and `sequence` are debounced per editor on
/// this dashboard, and any request overtaken by a newer one answers
/// `409 superseded`.
#[tracing::instrument(skip(state, req))]
pub async fn preview_funnel(
    State(state): State<Arc<AppState>>,
    Path(dashboard_id): Path<String>,
    Json(req): Json<PreviewFunnelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.dashboard_context(&dashboard_id).await?;

    let ticket = match (req.editor_id, req.sequence) {
        (Some(editor_id), Some(sequence)) => {
            if editor_id.is_empty() || editor_id.len() > MAX_EDITOR_ID_LEN {
                return Err(AppError::BadRequest(format!(
                    "editor_id must be 1 to {MAX_EDITOR_ID_LEN} bytes"
                )));
            }
            Some((PreviewKey::new(ctx.dashboard_id.as_str(), editor_id), sequence))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "editor_id and sequence must be provided together".to_string(),
            ))
        }
    };

    if let Some((key, sequence)) = &ticket {
        if !state.preview.settle(key, *sequence).await {
            return Err(AppError::Superseded);
        }
    }

    // Steps still being typed have no value yet.
    let query_filters: Vec<QueryFilter> = req
        .query_filters
        .into_iter()
        .filter(|filter| !filter.value.is_empty())
        .collect();

    let query = FunnelQuery {
        site_id: ctx.site_id,
        query_filters,
        is_strict: req.is_strict,
        range: Some(TimeRange::last_day()),
    };
    let visitors = state.analytics.get_funnel_visitors(&query).await?;

    if let Some((key, sequence)) = &ticket {
        if !state.preview.is_current(key, *sequence).await {
            debug!(editor_id = %key.editor_id, sequence, "discarding stale preview result");
            return Err(AppError::Superseded);
        }
    }

    let preview = FunnelPreview::new(query.query_filters, visitors, query.is_strict)?;
    Ok(Json(json!({ "data": preview.report() })))
}
