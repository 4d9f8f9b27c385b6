use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    pub clickhouse_url: String,
    pub clickhouse_user: String,
    pub clickhouse_password: String,
    pub clickhouse_database: String,
    pub cors_origins: Vec<String>,
    pub preview_debounce_ms: u64,
    /// When set, a `default` dashboard for this site is ensured at startup.
    pub default_site_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("BA_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("BA_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            duckdb_memory_limit: std::env::var("BA_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
            clickhouse_url: std::env::var("BA_CLICKHOUSE_URL")
                .unwrap_or_else(|_| "http://localhost:8123".to_string()),
            clickhouse_user: std::env::var("BA_CLICKHOUSE_USER")
                .unwrap_or_else(|_| "default".to_string()),
            clickhouse_password: std::env::var("BA_CLICKHOUSE_PASSWORD").unwrap_or_default(),
            clickhouse_database: std::env::var("BA_CLICKHOUSE_DATABASE")
                .unwrap_or_else(|_| "analytics".to_string()),
            cors_origins: std::env::var("BA_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            preview_debounce_ms: std::env::var("BA_PREVIEW_DEBOUNCE_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|e| format!("invalid preview debounce: {e}"))?,
            default_site_id: std::env::var("BA_DEFAULT_SITE_ID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }
}
