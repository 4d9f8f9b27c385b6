/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `BA_DUCKDB_MEMORY`, default `"1GB"`). The store only holds dashboard
/// and funnel definitions, so the limit can stay small.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- DASHBOARDS
-- ===========================================
-- A dashboard exposes one site's events. site_id is the key used in the
-- analytics event store.
CREATE TABLE IF NOT EXISTS dashboards (
    id              VARCHAR PRIMARY KEY,
    site_id         VARCHAR NOT NULL,
    name            VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_dashboards_site ON dashboards(site_id);

-- ===========================================
-- FUNNELS
-- ===========================================
CREATE TABLE IF NOT EXISTS funnels (
    id              VARCHAR PRIMARY KEY,
    dashboard_id    VARCHAR NOT NULL,
    name            VARCHAR NOT NULL,
    is_strict       BOOLEAN NOT NULL DEFAULT FALSE,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_funnels_dashboard ON funnels(dashboard_id);

-- One row per query filter; step_order is 1-based.
CREATE TABLE IF NOT EXISTS funnel_steps (
    funnel_id       VARCHAR NOT NULL,
    step_order      INTEGER NOT NULL,
    filter_column   VARCHAR NOT NULL,
    filter_operator VARCHAR NOT NULL,
    filter_value    VARCHAR NOT NULL,
    PRIMARY KEY (funnel_id, step_order)
);
"#
    )
}
