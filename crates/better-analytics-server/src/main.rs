use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use better_analytics_clickhouse::{ClickHouseBackend, ClickHouseClient};
use better_analytics_core::analytics::AnalyticsBackend;
use better_analytics_duckdb::DuckDbBackend;
use better_analytics_server::{app::build_app, config::Config, state::AppState};

/// `better-analytics health`: liveness check for container health checks.
///
/// Calls `GET http://localhost:$BA_PORT/health` and exits 0 on HTTP 200,
/// 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("BA_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{port}/health");
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging; level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("better_analytics=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/better-analytics.db", cfg.data_dir);
    let db = DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    if let Some(site_id) = &cfg.default_site_id {
        match db.seed_dashboard("default", site_id, "Default").await {
            Ok(()) => info!(site_id = %site_id, "Default dashboard ready"),
            Err(e) => warn!(error = %e, "Failed to seed default dashboard"),
        }
    }

    let analytics = ClickHouseBackend::new(ClickHouseClient::new(
        &cfg.clickhouse_url,
        &cfg.clickhouse_user,
        &cfg.clickhouse_password,
        &cfg.clickhouse_database,
    ));
    if let Err(e) = analytics.ping().await {
        warn!(
            error = %e,
            clickhouse_url = %cfg.clickhouse_url,
            "ClickHouse unreachable at startup; analytics requests will fail until it is up"
        );
    }

    let state = Arc::new(AppState::new(Arc::new(db), Arc::new(analytics), cfg.clone()));
    let app = build_app(state);

    let addr = format!("0.0.0.0:{}", cfg.port);
    info!(port = cfg.port, "Better Analytics listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    info!("Shut down cleanly");
    Ok(())
}
