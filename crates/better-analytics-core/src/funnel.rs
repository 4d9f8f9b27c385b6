//! Funnel entities and the conversion/drop-off analysis.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::filter::QueryFilter;

const MAX_NAME_LEN: usize = 100;
const MAX_FILTER_VALUE_LEN: usize = 500;

/// A persisted funnel definition. Visitor counts are never stored; they are
/// queried per request and attached via [`FunnelDetails`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funnel {
    pub id: String,
    pub dashboard_id: String,
    pub name: String,
    pub is_strict: bool,
    pub query_filters: Vec<QueryFilter>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFunnelRequest {
    pub name: String,
    pub query_filters: Vec<QueryFilter>,
    #[serde(default)]
    pub is_strict: bool,
}

impl CreateFunnelRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("name", "name must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::validation(
                "name",
                format!("name must be {MAX_NAME_LEN} characters or fewer"),
            ));
        }
        if self.query_filters.is_empty() {
            return Err(CoreError::validation(
                "query_filters",
                "funnels must have at least one step",
            ));
        }
        for filter in &self.query_filters {
            if filter.value.trim().is_empty() {
                return Err(CoreError::validation(
                    "value",
                    "filter value must not be empty",
                ));
            }
            if filter.value.chars().count() > MAX_FILTER_VALUE_LEN {
                return Err(CoreError::validation(
                    "value",
                    format!("filter value must be {MAX_FILTER_VALUE_LEN} characters or fewer"),
                ));
            }
        }
        Ok(())
    }
}

fn check_aligned(filters: &[QueryFilter], visitors: &[u64]) -> Result<(), CoreError> {
    if filters.len() != visitors.len() {
        return Err(CoreError::StepCountMismatch {
            filters: filters.len(),
            visitors: visitors.len(),
        });
    }
    Ok(())
}

fn labelled_steps(filters: &[QueryFilter], visitors: &[u64]) -> Vec<FunnelStep> {
    filters
        .iter()
        .zip(visitors)
        .map(|(filter, &visitors)| FunnelStep {
            label: filter.format(),
            visitors,
        })
        .collect()
}

/// A funnel together with the visitor count reached at each step.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelDetails {
    #[serde(flatten)]
    pub funnel: Funnel,
    pub visitors: Vec<u64>,
}

impl FunnelDetails {
    pub fn new(funnel: Funnel, visitors: Vec<u64>) -> Result<Self, CoreError> {
        check_aligned(&funnel.query_filters, &visitors)?;
        Ok(Self { funnel, visitors })
    }

    pub fn steps(&self) -> Vec<FunnelStep> {
        labelled_steps(&self.funnel.query_filters, &self.visitors)
    }

    pub fn report(&self) -> FunnelReport {
        FunnelReport {
            id: Some(self.funnel.id.clone()),
            name: self.funnel.name.clone(),
            is_strict: self.funnel.is_strict,
            step_count: self.funnel.query_filters.len(),
            analysis: analyze_funnel(&self.steps()),
        }
    }
}

/// An unsaved funnel evaluated while its steps are being edited.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelPreview {
    pub query_filters: Vec<QueryFilter>,
    pub visitors: Vec<u64>,
    pub is_strict: bool,
}

impl FunnelPreview {
    pub fn new(
        query_filters: Vec<QueryFilter>,
        visitors: Vec<u64>,
        is_strict: bool,
    ) -> Result<Self, CoreError> {
        check_aligned(&query_filters, &visitors)?;
        Ok(Self {
            query_filters,
            visitors,
            is_strict,
        })
    }

    pub fn report(&self) -> FunnelReport {
        FunnelReport {
            id: None,
            name: "Funnel".to_string(),
            is_strict: self.is_strict,
            step_count: self.query_filters.len(),
            analysis: analyze_funnel(&labelled_steps(&self.query_filters, &self.visitors)),
        }
    }
}

/// Analysis output as returned to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct FunnelReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub is_strict: bool,
    pub step_count: usize,
    #[serde(flatten)]
    pub analysis: FunnelAnalysis,
}

/// Input to [`analyze_funnel`]: one labelled step with its visitor count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelStep {
    pub label: String,
    pub visitors: u64,
}

impl FunnelStep {
    pub fn new(label: impl Into<String>, visitors: u64) -> Self {
        Self {
            label: label.into(),
            visitors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitorCount {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStepAnalysis {
    pub filter: String,
    pub visitors: u64,
    pub visitors_ratio: f64,
    /// Visitors lost since the previous step. Negative when a later step has
    /// more visitors than the one before it.
    pub dropoff_count: i64,
    pub dropoff_ratio: f64,
    /// `[previous label, this label]`; the first step's previous label is empty.
    pub step: [String; 2],
}

impl FunnelStepAnalysis {
    /// Stand-in for the biggest drop-off when the funnel has no steps.
    pub fn empty() -> Self {
        Self {
            filter: String::new(),
            visitors: 0,
            visitors_ratio: 0.0,
            dropoff_count: 0,
            dropoff_ratio: 0.0,
            step: [String::new(), String::new()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelAnalysis {
    pub visitor_count: VisitorCount,
    pub steps: Vec<FunnelStepAnalysis>,
    pub biggest_drop_off: FunnelStepAnalysis,
    pub conversion_rate: f64,
}

/// Compute per-step ratios and drop-offs.
///
/// The first step is measured against the largest step count. Denominators
/// are floored at 1 and a zero previous step yields a drop-off ratio of 0, so
/// the function is total over any input.
pub fn analyze_funnel(steps: &[FunnelStep]) -> FunnelAnalysis {
    let visitor_count = VisitorCount {
        min: steps.iter().map(|s| s.visitors).min().unwrap_or(1),
        max: steps.iter().map(|s| s.visitors).max().unwrap_or(1),
    };
    let max_denominator = visitor_count.max.max(1) as f64;

    let mut analysed = Vec::with_capacity(steps.len());
    for (idx, step) in steps.iter().enumerate() {
        let (previous_visitors, previous_label) = match idx.checked_sub(1) {
            Some(prev) => (steps[prev].visitors, steps[prev].label.clone()),
            None => (visitor_count.max, String::new()),
        };

        let dropoff_ratio = if previous_visitors == 0 {
            0.0
        } else {
            1.0 - step.visitors as f64 / previous_visitors as f64
        };

        analysed.push(FunnelStepAnalysis {
            filter: step.label.clone(),
            visitors: step.visitors,
            visitors_ratio: step.visitors as f64 / max_denominator,
            dropoff_count: previous_visitors as i64 - step.visitors as i64,
            dropoff_ratio,
            step: [previous_label, step.label.clone()],
        });
    }

    let biggest_drop_off = analysed
        .iter()
        .fold(None::<&FunnelStepAnalysis>, |best, current| match best {
            Some(best) if current.dropoff_ratio <= best.dropoff_ratio => Some(best),
            _ => Some(current),
        })
        .cloned()
        .unwrap_or_else(FunnelStepAnalysis::empty);

    FunnelAnalysis {
        visitor_count,
        steps: analysed,
        biggest_drop_off,
        conversion_rate: visitor_count.min as f64 / max_denominator,
    }
}
