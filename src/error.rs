//! Error types
//!
//! Failure taxonomy for the calculation pipeline and its collaborators.
//! Data-quality problems are not errors; they travel as [`DataQualityWarning`]
//! values next to successful results.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;

/// Result type for calculation pipeline operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Top-level error for every pipeline operation
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ingredient '{ingredient}' references {reference}, which does not exist")]
    ReferenceNotFound { ingredient: String, reference: String },

    #[error("Circular sub-recipe reference: {}", chain.join(" -> "))]
    CircularReference { chain: Vec<String> },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Sub-recipe {id} is still used by: {}", referenced_by.join(", "))]
    InUse { id: String, referenced_by: Vec<String> },

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl CalcError {
    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CalcError::Upstream(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Bad caller input; never retried
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("ingredient list is empty")]
    EmptyIngredientList,

    #[error("ingredient '{ingredient}' has invalid quantity {quantity}; quantities must be positive and finite")]
    InvalidQuantity { ingredient: String, quantity: f64 },

    #[error("ingredient '{ingredient}' uses unit '{unit}', which has no known gram weight; add a custom conversion for it")]
    UnknownUnit { ingredient: String, unit: String },

    #[error("final cooked weight must be a positive, finite number of grams (got {0})")]
    InvalidFinalWeight(f64),

    #[error("raw ingredient weight must be positive (got {0} g)")]
    InvalidRawWeight(f64),

    #[error("serving size must be a positive, finite number of grams (got {0})")]
    InvalidServingSize(f64),

    #[error("servings per container must be positive and finite (got {0})")]
    InvalidServingCount(f64),

    #[error("unknown nutrient '{0}'")]
    UnknownNutrient(String),

    #[error("ingredient '{0}' must reference exactly one of a food entry or a sub-recipe")]
    AmbiguousReference(String),

    #[error("malformed stored record: {0}")]
    MalformedRecord(String),

    #[error("{0}")]
    Other(String),
}

/// Which kind of upstream failure happened, so callers can phrase an actionable message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum UpstreamKind {
    RateLimited,
    ServerError(u16),
    Timeout,
    Network,
    /// The service answered but the answer was unusable (4xx, bad JSON)
    Protocol,
}

impl UpstreamKind {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, UpstreamKind::Protocol)
    }
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamKind::RateLimited => write!(f, "rate limited"),
            UpstreamKind::ServerError(status) => write!(f, "server error {}", status),
            UpstreamKind::Timeout => write!(f, "timed out"),
            UpstreamKind::Network => write!(f, "network error"),
            UpstreamKind::Protocol => write!(f, "unexpected response"),
        }
    }
}

/// An external store could not be reached or answered badly
#[derive(Debug, Clone, Error)]
#[error("{service} unavailable ({kind}) after {attempts} attempt(s): {message}")]
pub struct UpstreamError {
    pub service: String,
    pub kind: UpstreamKind,
    pub attempts: u32,
    pub message: String,
}

impl UpstreamError {
    pub fn new(service: impl Into<String>, kind: UpstreamKind, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            kind,
            attempts: 1,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Anomalous but non-fatal data found during a calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityWarning {
    /// Ingredient, sub-recipe or record the warning is about
    pub subject: String,
    pub message: String,
}

impl DataQualityWarning {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Re-home a warning raised inside a sub-recipe under its parent
    pub fn nested_in(self, parent: &str) -> Self {
        Self {
            subject: format!("{} > {}", parent, self.subject),
            message: self.message,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Outcome of a multi-step save that failed part-way
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save failed and {} earlier write(s) were rolled back: {source}", rolled_back.len())]
    Aborted {
        #[source]
        source: CalcError,
        rolled_back: Vec<String>,
    },

    #[error(
        "save failed ({source}) and rollback also failed; orphaned records: {}; rollback errors: {}",
        orphaned.join(", "),
        rollback_errors.join("; ")
    )]
    RollbackFailed {
        #[source]
        source: CalcError,
        orphaned: Vec<String>,
        rollback_errors: Vec<String>,
    },
}

impl SaveError {
    /// The failure that triggered the rollback
    pub fn cause(&self) -> &CalcError {
        match self {
            SaveError::Aborted { source, .. } => source,
            SaveError::RollbackFailed { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_retryable() {
        let e = UpstreamError::new("FoodData Central", UpstreamKind::ServerError(503), "busy");
        assert!(e.is_retryable());
        assert!(CalcError::from(e).is_retryable());

        let e = UpstreamError::new("FoodData Central", UpstreamKind::Protocol, "bad json");
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_validation_not_retryable() {
        let e = CalcError::from(ValidationError::EmptyIngredientList);
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_circular_message_shows_chain() {
        let e = CalcError::CircularReference {
            chain: vec!["sr_a".into(), "sr_b".into(), "sr_a".into()],
        };
        assert_eq!(e.to_string(), "Circular sub-recipe reference: sr_a -> sr_b -> sr_a");
    }

    #[test]
    fn test_nested_warning_subject() {
        let w = DataQualityWarning::new("tomato", "sugars exceed carbohydrate").nested_in("salsa");
        assert_eq!(w.subject, "salsa > tomato");
    }
}
