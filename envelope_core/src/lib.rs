//! # envelope_core - Building Envelope Heat-Loss Engine
//!
//! `envelope_core` resolves the physical coefficients of a dwelling's envelope
//! (transmittances, reduction factors, thermal-bridge coefficients) from the
//! conventional reference tables, and combines them into heat-loss totals
//! including ventilation and infiltration. All inputs and outputs are
//! JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Best effort**: a table miss never aborts a computation; a fallback is
//!   substituted and recorded as a [`Diagnostic`]
//! - **JSON-First**: all entries and results implement Serialize/Deserialize
//! - **No hidden state**: one computation owns its arena and statistics; the
//!   reference data is immutable and shared
//!
//! ## Quick Start
//!
//! ```rust
//! use envelope_core::context::{ConstructionPeriod, Context};
//! use envelope_core::dwelling::Dwelling;
//! use envelope_core::elements::wall::{WallEntry, WallMaterial};
//!
//! let mut dwelling = Dwelling::new(Context::new(ConstructionPeriod::Before1948, 90.0, 2.6));
//! dwelling.walls.push(WallEntry::new("MUR-NORD", 24.0, WallMaterial::StoneRubble));
//!
//! let result = envelope_core::compute_envelope(&dwelling).unwrap();
//! assert!(result.total_w_per_k > result.subtotals.walls);
//! ```
//!
//! ## Modules
//!
//! - [`reference`] - Reference tables and the query builder
//! - [`resolver`] - Lookup, interpolation and bracket primitives
//! - [`reduction`] - Reduction factor `b`
//! - [`elements`] - Per-family calculators and the thermal-bridge resolver
//! - [`ventilation`] - Ventilation and infiltration losses
//! - [`aggregator`] - The ordered dwelling pass
//! - [`errors`] - Structured error types

pub mod aggregator;
pub mod arena;
pub mod context;
pub mod diagnostics;
pub mod dwelling;
pub mod elements;
pub mod errors;
pub mod reduction;
pub mod reference;
pub mod resolver;
pub mod statistics;
pub mod ventilation;

pub use aggregator::{EnvelopeAggregator, EnvelopeResult, FamilySubtotals};
pub use context::{CalculationOptions, Context};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use dwelling::Dwelling;
pub use errors::{CalcError, CalcResult};
pub use reference::ReferenceData;
pub use statistics::SurfaceStatistics;

/// Validate `dwelling` and compute it against the built-in reference tables.
pub fn compute_envelope(dwelling: &Dwelling) -> CalcResult<EnvelopeResult> {
    dwelling.validate()?;
    let reference = ReferenceData::builtin()?;
    Ok(EnvelopeAggregator::new(reference).compute(dwelling))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::arena::{ElementArena, ReferenceIndex};
    use crate::dwelling::Dwelling;
    use crate::elements::CalcEnv;
    use crate::reference::ReferenceData;

    /// Run `f` with a calculation environment over `dwelling` and the built-in tables.
    pub fn with_env<R>(dwelling: &Dwelling, f: impl FnOnce(&CalcEnv<'_>) -> R) -> R {
        let arena = ElementArena::from_dwelling(dwelling);
        let index = ReferenceIndex::build(&arena);
        let env = CalcEnv {
            context: &dwelling.context,
            reference: ReferenceData::builtin().unwrap(),
            dwelling,
            arena: &arena,
            index: &index,
        };
        f(&env)
    }
}
