//! Parameterized SQL composition for ClickHouse.
//!
//! A [`SafeSql`] is a `(sql, params)` pair. SQL text can only be appended as
//! `&'static str`, so string literals and enum-backed identifiers are the
//! only things that ever reach the query text. Runtime values go through
//! [`SafeSql::bind`], which writes a typed `{name:Type}` placeholder and
//! records the value in the parameter map. ClickHouse substitutes the
//! placeholders server-side.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

/// Format ClickHouse accepts for `DateTime` parameters.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A bound query parameter together with its ClickHouse type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    String(String),
    UInt8(u8),
    UInt32(u32),
    DateTime(NaiveDateTime),
    UInt32Array(Vec<u32>),
}

impl SqlValue {
    /// ClickHouse type name used inside the placeholder.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::String(_) => "String",
            SqlValue::UInt8(_) => "UInt8",
            SqlValue::UInt32(_) => "UInt32",
            SqlValue::DateTime(_) => "DateTime",
            SqlValue::UInt32Array(_) => "Array(UInt32)",
        }
    }

    /// Wire form sent as the `param_<name>` query-string value.
    pub fn to_param_string(&self) -> String {
        match self {
            SqlValue::String(s) => escape_text(s),
            SqlValue::UInt8(n) => n.to_string(),
            SqlValue::UInt32(n) => n.to_string(),
            SqlValue::DateTime(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
            SqlValue::UInt32Array(values) => {
                let items: Vec<String> = values.iter().map(u32::to_string).collect();
                format!("[{}]", items.join(","))
            }
        }
    }
}

/// ClickHouse reads `param_*` strings in its escaped text format, so the
/// escape character and control characters must be escaped on the wire.
fn escape_text(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::UInt32(value)
    }
}

impl From<u8> for SqlValue {
    fn from(value: u8) -> Self {
        SqlValue::UInt8(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::DateTime(value)
    }
}

impl From<Vec<u32>> for SqlValue {
    fn from(value: Vec<u32>) -> Self {
        SqlValue::UInt32Array(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeSql {
    sql: String,
    params: BTreeMap<String, SqlValue>,
}

impl SafeSql {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fragment from literal SQL text.
    pub fn raw(sql: &'static str) -> Self {
        Self {
            sql: sql.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn push(mut self, sql: &'static str) -> Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `{name:Type}` placeholder and register `value` under `name`.
    ///
    /// Names must be unique within one query.
    pub fn bind(self, name: &'static str, value: impl Into<SqlValue>) -> Self {
        self.bind_named(name.to_string(), value.into())
    }

    /// Like [`SafeSql::bind`] with the parameter named `{prefix}_{index}`.
    pub fn bind_indexed(
        self,
        prefix: &'static str,
        index: usize,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.bind_named(format!("{prefix}_{index}"), value.into())
    }

    fn bind_named(mut self, name: String, value: SqlValue) -> Self {
        self.sql.push('{');
        self.sql.push_str(&name);
        self.sql.push(':');
        self.sql.push_str(value.type_name());
        self.sql.push('}');
        debug_assert!(
            !self.params.contains_key(&name),
            "parameter {name} bound twice"
        );
        self.params.insert(name, value);
        self
    }

    /// Append another fragment, merging its parameters.
    pub fn append(mut self, other: SafeSql) -> Self {
        debug_assert!(
            other.params.keys().all(|name| !self.params.contains_key(name)),
            "appended fragment rebinds an existing parameter"
        );
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
        self
    }

    pub fn join(parts: impl IntoIterator<Item = SafeSql>, separator: &'static str) -> Self {
        let mut joined = SafeSql::new();
        for (idx, part) in parts.into_iter().enumerate() {
            if idx > 0 {
                joined = joined.push(separator);
            }
            joined = joined.append(part);
        }
        joined
    }

    /// `a AND b AND …`; no parts yields the tautology `1=1`.
    pub fn and(parts: impl IntoIterator<Item = SafeSql>) -> Self {
        let joined = Self::join(parts, " AND ");
        if joined.is_empty() {
            return SafeSql::raw("1=1");
        }
        joined
    }

    /// Comma-separated list, e.g. function arguments.
    pub fn separator(parts: impl IntoIterator<Item = SafeSql>) -> Self {
        Self::join(parts, ", ")
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &BTreeMap<String, SqlValue> {
        &self.params
    }

    /// `(name, wire value)` pairs ready for the HTTP query string.
    pub fn wire_params(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(name, value)| (name.clone(), value.to_param_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{SafeSql, SqlValue};

    #[test]
    fn empty_builder_has_no_sql_or_params() {
        let sql = SafeSql::new();
        assert_eq!(sql.sql(), "");
        assert!(sql.params().is_empty());
    }

    #[test]
    fn raw_sql_without_params_is_unchanged() {
        let sql = SafeSql::raw("SELECT uniq(visitor_id) FROM analytics.events");
        assert_eq!(sql.sql(), "SELECT uniq(visitor_id) FROM analytics.events");
        assert!(sql.params().is_empty());
    }

    #[test]
    fn bind_writes_typed_placeholder() {
        let sql = SafeSql::raw("SELECT uniq(visitor_id) FROM analytics.events WHERE site_id = ")
            .bind("site_id", "test");
        assert_eq!(
            sql.sql(),
            "SELECT uniq(visitor_id) FROM analytics.events WHERE site_id = {site_id:String}"
        );
        assert_eq!(
            sql.params().get("site_id"),
            Some(&SqlValue::String("test".to_string()))
        );
    }

    #[test]
    fn nested_fragments_merge_params() {
        let inner = SafeSql::raw("site_id = ")
            .bind("site_id", "test")
            .push(" AND event_type = ")
            .bind("event_type", "custom");
        let sql = SafeSql::raw("SELECT uniq(visitor_id) FROM analytics.events WHERE ")
            .append(inner);
        assert_eq!(
            sql.sql(),
            "SELECT uniq(visitor_id) FROM analytics.events \
             WHERE site_id = {site_id:String} AND event_type = {event_type:String}"
        );
        assert_eq!(sql.params().len(), 2);
    }

    #[test]
    fn and_helper_joins_indexed_params() {
        let pages = ["a", "b", "c"];
        let parts = pages
            .iter()
            .enumerate()
            .map(|(idx, page)| SafeSql::raw("url = ").bind_indexed("page", idx, *page));
        let sql = SafeSql::raw("WHERE ").append(SafeSql::and(parts));
        assert_eq!(
            sql.sql(),
            "WHERE url = {page_0:String} AND url = {page_1:String} AND url = {page_2:String}"
        );
        let wire = sql.wire_params();
        assert_eq!(
            wire,
            vec![
                ("page_0".to_string(), "a".to_string()),
                ("page_1".to_string(), "b".to_string()),
                ("page_2".to_string(), "c".to_string()),
            ]
        );
    }

    #[test]
    fn empty_and_is_tautology() {
        assert_eq!(SafeSql::and(Vec::new()).sql(), "1=1");
        assert_eq!(SafeSql::join(Vec::new(), " OR ").sql(), "");
    }

    #[test]
    fn string_wire_form_escapes_backslashes_and_control_characters() {
        let value = SqlValue::from(r"C:\temp\new");
        assert_eq!(value.to_param_string(), r"C:\\temp\\new");
        assert_eq!(
            SqlValue::from("a\tb\nc\rd\\").to_param_string(),
            r"a\tb\nc\rd\\"
        );
        assert_eq!(SqlValue::from("/blog/%").to_param_string(), "/blog/%");
    }

    #[test]
    fn bound_value_stays_unescaped_in_param_map() {
        let sql = SafeSql::raw("url = ").bind("url", r"C:\temp");
        assert_eq!(
            sql.params().get("url"),
            Some(&SqlValue::String(r"C:\temp".to_string()))
        );
        assert_eq!(sql.wire_params()[0].1, r"C:\\temp");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "bound twice")]
    fn rebinding_a_name_is_caught() {
        let _ = SafeSql::raw("a = ")
            .bind("x", 1u32)
            .push(" AND b = ")
            .bind("x", 2u32);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "rebinds an existing parameter")]
    fn appending_clashing_fragments_is_caught() {
        let left = SafeSql::raw("a = ").bind("x", 1u32);
        let right = SafeSql::raw("b = ").bind("x", 2u32);
        let _ = SafeSql::and([left, right]);
    }

    #[test]
    fn wire_format_for_non_string_types() {
        let at = NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(13, 5, 9))
            .expect("valid datetime");
        assert_eq!(SqlValue::DateTime(at).to_param_string(), "2026-03-01 13:05:09");
        assert_eq!(SqlValue::UInt32Array(vec![1, 2, 3]).to_param_string(), "[1,2,3]");
        assert_eq!(SqlValue::UInt32Array(vec![]).to_param_string(), "[]");
        assert_eq!(SqlValue::UInt8(7).type_name(), "UInt8");
        assert_eq!(SqlValue::UInt32Array(vec![1]).type_name(), "Array(UInt32)");
    }
}
