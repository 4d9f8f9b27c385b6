#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use better_analytics_core::analytics::{AnalyticsBackend, FunnelQuery, JourneyQuery};
use better_analytics_core::config::Config;
use better_analytics_core::journey::SequentialPath;
use better_analytics_duckdb::DuckDbBackend;
use better_analytics_server::app::build_app;
use better_analytics_server::state::AppState;

/// In-memory stand-in for ClickHouse.
///
/// Funnel step `i` reports `100 - 20 * i` visitors. Each funnel call pops a
/// delay from `delays` (if any) before answering.
#[derive(Default)]
pub struct StubAnalytics {
    pub funnel_queries: Mutex<Vec<FunnelQuery>>,
    pub journey_queries: Mutex<Vec<JourneyQuery>>,
    pub paths: Vec<SequentialPath>,
    pub delays: Mutex<VecDeque<Duration>>,
    pub fail: bool,
}

impl StubAnalytics {
    pub fn funnel_calls(&self) -> Vec<FunnelQuery> {
        self.funnel_queries.lock().expect("lock").clone()
    }
}

#[async_trait]
impl AnalyticsBackend for StubAnalytics {
    async fn get_funnel_visitors(&self, query: &FunnelQuery) -> anyhow::Result<Vec<u64>> {
        self.funnel_queries.lock().expect("lock").push(query.clone());
        let delay = self.delays.lock().expect("lock").pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("ClickHouse error 500: boom");
        }
        Ok((0..query.query_filters.len() as u64)
            .map(|i| 100u64.saturating_sub(20 * i))
            .collect())
    }

    async fn get_sequential_paths(
        &self,
        query: &JourneyQuery,
    ) -> anyhow::Result<Vec<SequentialPath>> {
        self.journey_queries.lock().expect("lock").push(query.clone());
        if self.fail {
            anyhow::bail!("ClickHouse error 500: boom");
        }
        Ok(self.paths.clone())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/better-analytics-test".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
        clickhouse_url: "http://localhost:8123".to_string(),
        clickhouse_user: "default".to_string(),
        clickhouse_password: String::new(),
        clickhouse_database: "analytics".to_string(),
        cors_origins: vec![],
        preview_debounce_ms: 300,
        default_site_id: None,
    }
}

pub async fn setup_with(analytics: StubAnalytics) -> (Arc<StubAnalytics>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    db.seed_dashboard("dash_1", "site_1", "Main")
        .await
        .expect("seed dashboard");
    db.seed_dashboard("dash_2", "site_2", "Other")
        .await
        .expect("seed dashboard");
    let analytics = Arc::new(analytics);
    let state = Arc::new(AppState::new(
        Arc::new(db),
        Arc::clone(&analytics) as Arc<dyn AnalyticsBackend>,
        config(),
    ));
    (analytics, build_app(state))
}

pub async fn setup() -> (Arc<StubAnalytics>, axum::Router) {
    setup_with(StubAnalytics::default()).await
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

pub async fn get(app: &axum::Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    app.clone().oneshot(request).await.expect("request")
}

pub async fn post_json(app: &axum::Router, uri: &str, body: &Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    app.clone().oneshot(request).await.expect("request")
}
