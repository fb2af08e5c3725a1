//! # Error Types
//!
//! Structured error types for envelope_core. Two kinds are recoverable and
//! never leave the aggregator: a table lookup that found no applicable row
//! (`Unresolved`) and cross-reference data that is missing or contradictory
//! (`InputInconsistency`). Both are turned into a fallback value plus a
//! [`Diagnostic`](crate::diagnostics::Diagnostic).
//!
//! ## Example
//!
//! ```rust
//! use envelope_core::errors::{CalcError, CalcResult};
//!
//! fn validate_area(area_m2: f64) -> CalcResult<()> {
//!     if area_m2 < 0.0 {
//!         return Err(CalcError::InvalidInput {
//!             field: "area_m2".to_string(),
//!             value: area_m2.to_string(),
//!             reason: "Area cannot be negative".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for envelope_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for envelope calculations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// No row of a reference table matched the query
    #[error("No row of '{table}' matches {query}")]
    Unresolved { table: String, query: String },

    /// Cross-reference or method-specific data is missing or contradictory
    #[error("Inconsistent input for '{element}': {reason}")]
    InputInconsistency { element: String, reason: String },

    /// An input value is invalid (out of range, wrong sign, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A reference table the engine needs is absent from the dataset
    #[error("Unknown reference table: {table}")]
    UnknownTable { table: String },

    /// The reference dataset could not be loaded
    #[error("Reference data error: {reason}")]
    ReferenceData { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an Unresolved error
    pub fn unresolved(table: impl Into<String>, query: impl Into<String>) -> Self {
        CalcError::Unresolved {
            table: table.into(),
            query: query.into(),
        }
    }

    /// Create an InputInconsistency error
    pub fn inconsistency(element: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InputInconsistency {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create an UnknownTable error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        CalcError::UnknownTable {
            table: table.into(),
        }
    }

    /// Create a ReferenceData error
    pub fn reference_data(reason: impl Into<String>) -> Self {
        CalcError::ReferenceData {
            reason: reason.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        CalcError::Internal {
            message: message.into(),
        }
    }

    /// Whether the engine substitutes a fallback for this error instead of failing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalcError::Unresolved { .. } | CalcError::InputInconsistency { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::Unresolved { .. } => "UNRESOLVED",
            CalcError::InputInconsistency { .. } => "INPUT_INCONSISTENCY",
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::UnknownTable { .. } => "UNKNOWN_TABLE",
            CalcError::ReferenceData { .. } => "REFERENCE_DATA",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
