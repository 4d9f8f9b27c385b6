//! Analytics backend abstraction.

use chrono::{Duration, DurationRound, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::QueryFilter;
use crate::journey::SequentialPath;

/// The dashboard a request operates on, with the site its events belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardContext {
    pub dashboard_id: String,
    pub site_id: String,
}

/// Inclusive timestamp range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    /// The 24 hours ending at the end of the current UTC hour.
    pub fn last_day() -> Self {
        Self::last_day_from(Utc::now().naive_utc())
    }

    pub fn last_day_from(now: NaiveDateTime) -> Self {
        let hour_start = now
            .and_utc()
            .duration_trunc(Duration::hours(1))
            .map(|dt| dt.naive_utc())
            .unwrap_or(now);
        let end = hour_start + Duration::hours(1) - Duration::seconds(1);
        Self {
            start: end - Duration::hours(24),
            end,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FunnelQuery {
    pub site_id: String,
    pub query_filters: Vec<QueryFilter>,
    /// Steps must happen in immediate succession when set.
    pub is_strict: bool,
    /// `None` covers all recorded events.
    pub range: Option<TimeRange>,
}

#[derive(Debug, Clone)]
pub struct JourneyQuery {
    pub site_id: String,
    pub range: TimeRange,
    pub max_steps: u8,
    pub limit: u32,
}

/// Read-only analytical queries against the event store.
#[async_trait::async_trait]
pub trait AnalyticsBackend: Send + Sync + 'static {
    /// Visitors reaching each funnel step, aligned with `query.query_filters`.
    async fn get_funnel_visitors(&self, query: &FunnelQuery) -> anyhow::Result<Vec<u64>>;

    async fn get_sequential_paths(
        &self,
        query: &JourneyQuery,
    ) -> anyhow::Result<Vec<SequentialPath>>;

    async fn ping(&self) -> anyhow::Result<()>;
}
