//! Error types for workout-fit

use thiserror::Error;

/// Errors that can occur while validating, encoding or decoding a workout
#[derive(Debug, Error)]
pub enum FitError {
    #[error("Invalid workout: {0}")]
    Validation(String),

    #[error("Value out of range for {field}: {value}")]
    Range { field: String, value: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Decoding error: {0}")]
    Decode(String),
}

impl FitError {
    pub(crate) fn range(field: impl Into<String>, value: impl ToString) -> Self {
        FitError::Range {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Whether the error was caused by caller input rather than by the encoder.
    ///
    /// Client errors are safe to surface verbatim. Everything else should be
    /// reported as an opaque server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FitError::Validation(_) | FitError::Range { .. } | FitError::Json(_)
        )
    }
}
