use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// `TraceLayer` wraps every request in a `tracing` span and responses are
/// gzip-compressed when the client accepts it. CORS is open unless
/// `BA_CORS_ORIGINS` lists the allowed origins.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/dashboards/{dashboard_id}/funnels",
            get(routes::funnels::list_funnels).post(routes::funnels::create_funnel),
        )
        .route(
            "/api/dashboards/{dashboard_id}/funnels/preview",
            post(routes::funnels::preview_funnel),
        )
        .route(
            "/api/dashboards/{dashboard_id}/funnels/{funnel_id}",
            get(routes::funnels::get_funnel),
        )
        .route(
            "/api/dashboards/{dashboard_id}/user-journey",
            get(routes::journey::get_user_journey),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
