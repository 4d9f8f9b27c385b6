use async_trait::async_trait;

use better_analytics_core::funnel::{CreateFunnelRequest, Funnel};
use better_analytics_metadata::{Dashboard, MetadataStore};

use crate::DuckDbBackend;

#[async_trait]
impl MetadataStore for DuckDbBackend {
    async fn ping(&self) -> anyhow::Result<()> {
        DuckDbBackend::ping(self).await
    }

    async fn get_dashboard(&self, dashboard_id: &str) -> anyhow::Result<Option<Dashboard>> {
        crate::queries::dashboards::get_dashboard_inner(self, dashboard_id).await
    }

    async fn list_funnels(&self, dashboard_id: &str) -> anyhow::Result<Vec<Funnel>> {
        crate::queries::funnels::list_funnels_inner(self, dashboard_id).await
    }

    async fn get_funnel(
        &self,
        dashboard_id: &str,
        funnel_id: &str,
    ) -> anyhow::Result<Option<Funnel>> {
        crate::queries::funnels::get_funnel_inner(self, dashboard_id, funnel_id).await
    }

    async fn create_funnel(
        &self,
        dashboard_id: &str,
        req: CreateFunnelRequest,
    ) -> anyhow::Result<Funnel> {
        crate::queries::funnels::create_funnel_inner(self, dashboard_id, req).await
    }
}
