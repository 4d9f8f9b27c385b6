use anyhow::{anyhow, Result};
use serde_json::Value;

use better_analytics_core::analytics::JourneyQuery;
use better_analytics_core::journey::SequentialPath;
use better_analytics_core::safe_sql::SafeSql;

use super::as_u64;

/// Each session's first `max_length` pages, grouped into path frequencies.
pub fn build_journey_query(query: &JourneyQuery) -> SafeSql {
    SafeSql::raw(
        "WITH session_paths AS (
  SELECT
    session_id,
    arraySlice(groupArray(url ORDER BY timestamp), 1, ",
    )
    .bind("max_length", query.max_steps)
    .push(
        ") AS path
  FROM analytics.events
  WHERE site_id = ",
    )
    .bind("site_id", query.site_id.as_str())
    .push(" AND timestamp BETWEEN ")
    .bind("start", query.range.start)
    .push(" AND ")
    .bind("end", query.range.end)
    .push(
        "
    AND url IS NOT NULL AND url != ''
  GROUP BY session_id
  HAVING length(path) > 1
)
SELECT path, count(*) AS count
FROM session_paths
GROUP BY path
ORDER BY count DESC
LIMIT ",
    )
    .bind("limit", query.limit)
}

pub fn parse_paths(rows: &[Value]) -> Result<Vec<SequentialPath>> {
    rows.iter()
        .map(|row| {
            let path = row
                .get("path")
                .and_then(Value::as_array)
                .ok_or_else(|| anyhow!("journey row without path: {row}"))?
                .iter()
                .map(|page| {
                    page.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| anyhow!("non-string page in path: {page}"))
                })
                .collect::<Result<Vec<_>>>()?;
            let count = as_u64(row.get("count").unwrap_or(&Value::Null))?;
            Ok(SequentialPath { path, count })
        })
        .collect()
}
