//! # Diagnostics
//!
//! Every fallback the engine substitutes is recorded here so a computation
//! can be audited afterwards. Recording also emits a `tracing` warning with
//! structured fields; whether it is printed is up to the subscriber installed
//! by the caller.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::CalcError;

/// Which of the two recoverable failure kinds produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A table lookup or interpolation found no applicable row
    ResolutionFailure,
    /// Required cross-reference or method data was missing
    InputInconsistency,
}

impl DiagnosticKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            DiagnosticKind::ResolutionFailure => "resolution failure",
            DiagnosticKind::InputInconsistency => "input inconsistency",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One substitution made during a computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Reference of the element being computed (or a pseudo-element such as "ventilation")
    pub element: String,
    /// What could not be resolved
    pub detail: String,
    /// The value substituted in its place
    pub fallback: String,
}

/// Collector threaded through every calculator of one dwelling computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a table miss and the value used instead.
    pub fn resolution_failure(
        &mut self,
        element: &str,
        detail: impl Into<String>,
        fallback: impl std::fmt::Display,
    ) {
        self.push(DiagnosticKind::ResolutionFailure, element, detail.into(), fallback.to_string());
    }

    /// Record missing cross-reference data and the default used instead.
    pub fn inconsistency(
        &mut self,
        element: &str,
        detail: impl Into<String>,
        fallback: impl std::fmt::Display,
    ) {
        self.record(element, &CalcError::inconsistency(element, detail), fallback);
    }

    /// Record a recoverable error, picking the kind from its variant.
    ///
    /// Errors that are not recoverable are recorded as input inconsistencies;
    /// the caller has already decided to carry on with a fallback.
    pub fn record(&mut self, element: &str, error: &CalcError, fallback: impl std::fmt::Display) {
        match error {
            CalcError::Unresolved { .. } => self.resolution_failure(element, error.to_string(), fallback),
            CalcError::InputInconsistency { reason, .. } => {
                self.push(DiagnosticKind::InputInconsistency, element, reason.clone(), fallback.to_string())
            }
            _ => self.push(DiagnosticKind::InputInconsistency, element, error.to_string(), fallback.to_string()),
        }
    }

    fn push(&mut self, kind: DiagnosticKind, element: &str, detail: String, fallback: String) {
        warn!(kind = %kind, element, detail = %detail, fallback = %fallback, "substituted fallback value");
        self.entries.push(Diagnostic {
            kind,
            element: element.to_string(),
            detail,
            fallback,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics recorded for one element reference.
    pub fn for_element<'a>(&'a self, element: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.entries.iter().filter(move |d| d.element == element)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_picks_kind_from_error() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record("MUR-1", &CalcError::unresolved("wall_u0", "material=adobe"), 2.5);
        diagnostics.record("PT-1", &CalcError::inconsistency("PT-1", "no wall"), 0.0);

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.count(DiagnosticKind::ResolutionFailure), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::InputInconsistency), 1);
        assert_eq!(diagnostics.entries()[0].fallback, "2.5");
    }

    #[test]
    fn test_inconsistency_goes_through_error() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.inconsistency("PT-3", "no floor found", "interior");

        let entry = &diagnostics.entries()[0];
        assert_eq!(entry.kind, DiagnosticKind::InputInconsistency);
        assert_eq!(entry.detail, "no floor found");
        assert_eq!(entry.fallback, "interior");
    }

    #[test]
    fn test_for_element() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.resolution_failure("a", "miss", 1.0);
        diagnostics.inconsistency("b", "missing thickness", "unknown insulation");
        diagnostics.resolution_failure("a", "miss again", 0.0);

        assert_eq!(diagnostics.for_element("a").count(), 2);
        assert_eq!(diagnostics.for_element("c").count(), 0);
    }

    #[test]
    fn test_serializes_as_list() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.inconsistency("PT-2", "no wall found", 0.0);
        let json = serde_json::to_string(&diagnostics).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"input_inconsistency\""));
    }
}
