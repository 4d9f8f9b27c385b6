use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use better_analytics_core::analytics::{AnalyticsBackend, FunnelQuery, JourneyQuery};
use better_analytics_core::filter::filter_conditions;
use better_analytics_core::journey::SequentialPath;

use crate::client::ClickHouseClient;
use crate::queries::{funnels, journey};

/// [`AnalyticsBackend`] over the `analytics.events` table in ClickHouse.
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: ClickHouseClient,
}

impl ClickHouseBackend {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalyticsBackend for ClickHouseBackend {
    async fn get_funnel_visitors(&self, query: &FunnelQuery) -> Result<Vec<u64>> {
        if query.query_filters.is_empty() {
            return Ok(Vec::new());
        }
        let sql = funnels::build_funnel_query(query);
        let levels = filter_conditions(&query.query_filters).len();
        let rows = self.client.query(&sql).await?;
        debug!(site_id = %query.site_id, levels, "funnel visitors fetched");
        funnels::parse_funnel_counts(&rows, levels)
    }

    async fn get_sequential_paths(&self, query: &JourneyQuery) -> Result<Vec<SequentialPath>> {
        let rows = self
            .client
            .query(&journey::build_journey_query(query))
            .await?;
        journey::parse_paths(&rows)
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }
}
