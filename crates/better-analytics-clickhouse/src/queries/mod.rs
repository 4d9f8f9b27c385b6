pub mod funnels;
pub mod journey;

use anyhow::{anyhow, Result};
use serde_json::Value;

/// ClickHouse's JSON format quotes 64-bit integers; accept both forms.
pub(crate) fn as_u64(value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| anyhow!("not a count: {n}")),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| anyhow!("not a count: {s:?}")),
        other => Err(anyhow!("not a count: {other}")),
    }
}
