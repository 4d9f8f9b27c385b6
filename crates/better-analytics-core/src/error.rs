use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown filter column: {0}")]
    UnknownColumn(String),

    #[error("unknown filter operator: {0}")]
    UnknownOperator(String),

    /// A funnel was built with a visitor list that does not line up with its
    /// filters. This is a caller bug, not a data condition.
    #[error("funnel has {filters} steps but {visitors} visitor counts")]
    StepCountMismatch { filters: usize, visitors: usize },

    #[error("validation_error:{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

impl CoreError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
