use async_trait::async_trait;
use serde::Serialize;

use better_analytics_core::analytics::DashboardContext;
use better_analytics_core::funnel::{CreateFunnelRequest, Funnel};

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub id: String,
    pub site_id: String,
    pub name: String,
    pub created_at: String,
}

impl Dashboard {
    pub fn context(&self) -> DashboardContext {
        DashboardContext {
            dashboard_id: self.id.clone(),
            site_id: self.site_id.clone(),
        }
    }
}

/// Storage interface for dashboards and saved funnels.
///
/// Analytics data lives in the event store; this holds only definitions.
/// The DuckDB implementation is used by default, and route handlers only see
/// this trait so another store can be swapped in.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn ping(&self) -> anyhow::Result<()>;

    async fn get_dashboard(&self, dashboard_id: &str) -> anyhow::Result<Option<Dashboard>>;

    async fn list_funnels(&self, dashboard_id: &str) -> anyhow::Result<Vec<Funnel>>;

    async fn get_funnel(
        &self,
        dashboard_id: &str,
        funnel_id: &str,
    ) -> anyhow::Result<Option<Funnel>>;

    async fn create_funnel(
        &self,
        dashboard_id: &str,
        req: CreateFunnelRequest,
    ) -> anyhow::Result<Funnel>;
}
