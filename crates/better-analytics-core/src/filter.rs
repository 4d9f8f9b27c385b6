//! Dimension/operator/value predicates applied to analytics events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::safe_sql::SafeSql;

/// Event dimensions a filter may target. This is the full allow-list; the
/// column name inlined into SQL always comes from [`FilterColumn::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterColumn {
    Url,
    DeviceType,
    CountryCode,
    Browser,
    Os,
    ReferrerSource,
    ReferrerSourceName,
    ReferrerSearchTerm,
    ReferrerUrl,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmTerm,
    UtmContent,
    CustomEventName,
}

impl FilterColumn {
    pub const ALL: [FilterColumn; 15] = [
        FilterColumn::Url,
        FilterColumn::DeviceType,
        FilterColumn::CountryCode,
        FilterColumn::Browser,
        FilterColumn::Os,
        FilterColumn::ReferrerSource,
        FilterColumn::ReferrerSourceName,
        FilterColumn::ReferrerSearchTerm,
        FilterColumn::ReferrerUrl,
        FilterColumn::UtmSource,
        FilterColumn::UtmMedium,
        FilterColumn::UtmCampaign,
        FilterColumn::UtmTerm,
        FilterColumn::UtmContent,
        FilterColumn::CustomEventName,
    ];

    /// Column name in `analytics.events`.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterColumn::Url => "url",
            FilterColumn::DeviceType => "device_type",
            FilterColumn::CountryCode => "country_code",
            FilterColumn::Browser => "browser",
            FilterColumn::Os => "os",
            FilterColumn::ReferrerSource => "referrer_source",
            FilterColumn::ReferrerSourceName => "referrer_source_name",
            FilterColumn::ReferrerSearchTerm => "referrer_search_term",
            FilterColumn::ReferrerUrl => "referrer_url",
            FilterColumn::UtmSource => "utm_source",
            FilterColumn::UtmMedium => "utm_medium",
            FilterColumn::UtmCampaign => "utm_campaign",
            FilterColumn::UtmTerm => "utm_term",
            FilterColumn::UtmContent => "utm_content",
            FilterColumn::CustomEventName => "custom_event_name",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterColumn::Url => "URL",
            FilterColumn::DeviceType => "Device",
            FilterColumn::CountryCode => "Country",
            FilterColumn::Browser => "Browser",
            FilterColumn::Os => "Operating system",
            FilterColumn::ReferrerSource => "Referrer source",
            FilterColumn::ReferrerSourceName => "Referrer name",
            FilterColumn::ReferrerSearchTerm => "Referrer term",
            FilterColumn::ReferrerUrl => "Referrer URL",
            FilterColumn::UtmSource => "UTM source",
            FilterColumn::UtmMedium => "UTM medium",
            FilterColumn::UtmCampaign => "UTM campaign",
            FilterColumn::UtmTerm => "UTM term",
            FilterColumn::UtmContent => "UTM content",
            FilterColumn::CustomEventName => "Event",
        }
    }
}

impl FromStr for FilterColumn {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        FilterColumn::ALL
            .into_iter()
            .find(|column| column.as_str() == raw)
            .ok_or_else(|| CoreError::UnknownColumn(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Is,
    #[serde(rename = "!=")]
    IsNot,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Is => "=",
            FilterOperator::IsNot => "!=",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterOperator::Is => "is",
            FilterOperator::IsNot => "is not",
        }
    }

    /// Comparison used in ClickHouse: case-insensitive pattern match.
    fn sql_keyword(self) -> &'static str {
        match self {
            FilterOperator::Is => " ILIKE ",
            FilterOperator::IsNot => " NOT ILIKE ",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "=" => Ok(FilterOperator::Is),
            "!=" => Ok(FilterOperator::IsNot),
            other => Err(CoreError::UnknownOperator(other.to_string())),
        }
    }
}

/// A single predicate such as `url = /pricing`.
///
/// Filters are immutable values; editing a filter replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryFilter {
    pub column: FilterColumn,
    pub operator: FilterOperator,
    pub value: String,
}

impl QueryFilter {
    pub fn new(column: FilterColumn, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column,
            operator,
            value: value.into(),
        }
    }

    /// Build a filter from untrusted strings, checking column and operator
    /// against the allow-lists.
    pub fn parse(
        column: &str,
        operator: &str,
        value: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Ok(Self::new(column.parse()?, operator.parse()?, value))
    }

    /// Display label, e.g. `URL is /pricing`.
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Parameterized predicate for this filter. `*` in the value acts as a
    /// wildcard.
    pub fn condition(&self, index: usize) -> SafeSql {
        SafeSql::raw(self.column.as_str())
            .push(self.operator.sql_keyword())
            .bind_indexed("query_filter", index, self.value.replace('*', "%"))
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.column.label(),
            self.operator.label(),
            self.value
        )
    }
}

/// One predicate per non-empty filter, in input order. No usable filters
/// yields a single `1=1` so callers always get at least one condition.
pub fn filter_conditions(filters: &[QueryFilter]) -> Vec<SafeSql> {
    let conditions: Vec<SafeSql> = filters
        .iter()
        .filter(|filter| !filter.value.is_empty())
        .enumerate()
        .map(|(idx, filter)| filter.condition(idx))
        .collect();

    if conditions.is_empty() {
        return vec![SafeSql::raw("1=1")];
    }
    conditions
}

/// All filters joined with `AND`. An empty list renders `1=1`.
pub fn to_and_clause(filters: &[QueryFilter]) -> SafeSql {
    SafeSql::and(filter_conditions(filters))
}
