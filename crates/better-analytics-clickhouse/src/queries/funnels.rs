use anyhow::{bail, Result};
use serde_json::Value;

use better_analytics_core::analytics::FunnelQuery;
use better_analytics_core::filter::filter_conditions;
use better_analytics_core::safe_sql::SafeSql;

use super::as_u64;

/// A visitor must complete the whole funnel within this window.
pub const FUNNEL_WINDOW_SECONDS: u32 = 24 * 60 * 60;

/// Per-visitor `windowFunnel` levels turned into "visitors reaching at least
/// step i" for each `i` in `1..=n`, one row per level in order.
pub fn build_funnel_query(query: &FunnelQuery) -> SafeSql {
    let conditions = filter_conditions(&query.query_filters);
    let levels: Vec<u32> = (1..=conditions.len() as u32).collect();

    let window = SafeSql::raw("windowFunnel(").bind("windowDuration", FUNNEL_WINDOW_SECONDS);
    let window = if query.is_strict {
        window.push(", 'strict_order')")
    } else {
        window.push(")")
    };

    let mut where_conditions = vec![SafeSql::raw("1=1")];
    if let Some(range) = query.range {
        where_conditions.push(
            SafeSql::raw("timestamp BETWEEN ")
                .bind("query_start_date", range.start)
                .push(" AND ")
                .bind("query_end_date", range.end),
        );
    }

    SafeSql::raw(
        "WITH
  baseFunnel AS (
    SELECT ",
    )
    .append(window)
    .push("(timestamp, ")
    .append(SafeSql::separator(conditions))
    .push(
        ") AS level
    FROM analytics.events
    WHERE site_id = ",
    )
    .bind("site_id", query.site_id.as_str())
    .push(" AND ")
    .append(SafeSql::and(where_conditions))
    .push(
        "
    GROUP BY visitor_id
  ),
  funnelCounts AS (
    SELECT level, count() AS raw_count
    FROM baseFunnel
    GROUP BY level
  ),
  levels AS (
    SELECT arrayJoin(",
    )
    .bind("levels_array", levels)
    .push(
        ") AS level
  ),
  joined AS (
    SELECT levels.level, coalesce(funnelCounts.raw_count, 0) AS count
    FROM levels
    LEFT JOIN funnelCounts USING (level)
  )
SELECT sum(count) OVER (ORDER BY level DESC) AS count
FROM joined
ORDER BY level",
    )
}

/// Read the `count` column of each row, requiring exactly `expected` rows.
pub fn parse_funnel_counts(rows: &[Value], expected: usize) -> Result<Vec<u64>> {
    if rows.len() != expected {
        bail!(
            "funnel query returned {} levels, expected {expected}",
            rows.len()
        );
    }
    rows.iter()
        .map(|row| as_u64(row.get("count").unwrap_or(&Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use better_analytics_core::analytics::{FunnelQuery, TimeRange};
    use better_analytics_core::filter::{FilterColumn, FilterOperator, QueryFilter};
    use better_analytics_core::safe_sql::SqlValue;

    use super::{build_funnel_query, parse_funnel_counts};

    fn query(is_strict: bool, range: Option<TimeRange>) -> FunnelQuery {
        FunnelQuery {
            site_id: "site_1".to_string(),
            query_filters: vec![
                QueryFilter::new(FilterColumn::Url, FilterOperator::Is, "/"),
                QueryFilter::new(FilterColumn::Url, FilterOperator::Is, "/pricing' --"),
                QueryFilter::new(FilterColumn::CustomEventName, FilterOperator::Is, "signup"),
            ],
            is_strict,
            range,
        }
    }

    #[test]
    fn conditions_become_window_funnel_arguments() {
        let sql = build_funnel_query(&query(false, None));
        assert!(sql.sql().contains(
            "windowFunnel({windowDuration:UInt32})(timestamp, url ILIKE {query_filter_0:String}, \
             url ILIKE {query_filter_1:String}, custom_event_name ILIKE {query_filter_2:String})"
        ));
        assert!(sql.sql().contains("site_id = {site_id:String} AND 1=1"));
        assert!(!sql.sql().contains("BETWEEN"));
        assert!(!sql.sql().contains("/pricing"));
        assert_eq!(
            sql.params().get("levels_array"),
            Some(&SqlValue::UInt32Array(vec![1, 2, 3]))
        );
        assert_eq!(sql.params().get("windowDuration"), Some(&SqlValue::UInt32(86_400)));
    }

    #[test]
    fn strict_mode_and_range_are_rendered() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid datetime");
        let end = NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .expect("valid datetime");
        let sql = build_funnel_query(&query(true, Some(TimeRange { start, end })));

        assert!(sql
            .sql()
            .contains("windowFunnel({windowDuration:UInt32}, 'strict_order')"));
        assert!(sql.sql().contains(
            "1=1 AND timestamp BETWEEN {query_start_date:DateTime} AND {query_end_date:DateTime}"
        ));
        let wire: Vec<(String, String)> = sql.wire_params();
        assert!(wire.contains(&("query_end_date".to_string(), "2026-03-01 23:59:59".to_string())));
    }

    #[test]
    fn counts_must_match_level_count() {
        let rows = vec![json!({"count": "10"}), json!({"count": 4})];
        assert_eq!(parse_funnel_counts(&rows, 2).ok(), Some(vec![10, 4]));
        assert!(parse_funnel_counts(&rows, 3).is_err());
        assert!(parse_funnel_counts(&[json!({"visitors": 1})], 1).is_err());
    }
}
