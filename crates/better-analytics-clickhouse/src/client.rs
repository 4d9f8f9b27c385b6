use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use better_analytics_core::safe_sql::SafeSql;

/// HTTP client wrapper for ClickHouse.
///
/// Uses ClickHouse's HTTP API: SQL is posted as the request body; named
/// parameters are passed as `param_<name>` query-string entries, allowing
/// ClickHouse to substitute them safely (no SQL injection).
#[derive(Clone)]
pub struct ClickHouseClient {
    client: Client,
    url: String,
    user: String,
    password: String,
    database: String,
}

impl ClickHouseClient {
    pub fn new(url: &str, user: &str, password: &str, database: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        }
    }

    /// Execute a SELECT and return the `data` array of the JSON response.
    pub async fn query(&self, query: &SafeSql) -> Result<Vec<Value>> {
        let mut url = reqwest::Url::parse(&self.url).context("Invalid ClickHouse URL")?;
        {
            let mut qs = url.query_pairs_mut();
            qs.append_pair("default_format", "JSON");
            qs.append_pair("database", &self.database);
            for (name, value) in query.wire_params() {
                qs.append_pair(&format!("param_{name}"), &value);
            }
        }

        debug!(params = query.params().len(), "ClickHouse query");

        let resp = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .body(query.sql().to_string())
            .send()
            .await
            .context("ClickHouse HTTP request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("ClickHouse error {status}: {body}");
        }

        let json: Value = resp
            .json()
            .await
            .context("ClickHouse response parse failed")?;
        Ok(json
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    pub async fn ping(&self) -> Result<()> {
        self.query(&SafeSql::raw("SELECT 1")).await.map(|_| ())
    }
}
