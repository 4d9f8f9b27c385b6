use std::sync::Arc;

use better_analytics_core::analytics::{AnalyticsBackend, DashboardContext};
use better_analytics_metadata::MetadataStore;

use crate::{config::Config, error::AppError, preview::PreviewCoordinator};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Dashboard and funnel definitions.
    pub metadata: Arc<dyn MetadataStore>,

    /// Event store queried for visitor counts and session paths.
    pub analytics: Arc<dyn AnalyticsBackend>,

    pub config: Arc<Config>,

    pub preview: PreviewCoordinator,
}

impl AppState {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        analytics: Arc<dyn AnalyticsBackend>,
        config: Config,
    ) -> Self {
        Self {
            metadata,
            analytics,
            preview: PreviewCoordinator::new(config.preview_debounce()),
            config: Arc::new(config),
        }
    }

    /// Resolve the site behind `dashboard_id`, or `404` if it does not exist.
    pub async fn dashboard_context(
        &self,
        dashboard_id: &str,
    ) -> Result<DashboardContext, AppError> {
        self.metadata
            .get_dashboard(dashboard_id)
            .await?
            .map(|dashboard| dashboard.context())
            .ok_or_else(|| AppError::NotFound("Dashboard not found".to_string()))
    }
}
