//! # Insulation
//!
//! Final transmittance of an opaque element from its base transmittance and
//! the way its insulation is described, and the insulation classification
//! read by the thermal-bridge resolver.
//!
//! ## Methods
//!
//! | Method        | Final transmittance                                   |
//! |---------------|-------------------------------------------------------|
//! | not insulated | base                                                  |
//! | unknown       | min(base, default table for the construction period)  |
//! | thickness     | `1 / (1/base + e·0.01/λ)`                             |
//! | resistance    | `1 / (1/base + R)`                                    |
//! | period        | min(base, default table for the insulation period)    |
//! | direct        | entered value                                         |
//!
//! A method whose value is missing falls back to the unknown-insulation path
//! and records an input inconsistency.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{ConstructionPeriod, Context};
use crate::diagnostics::Diagnostics;
use crate::reference::{Query, ReferenceData, TableName};
use crate::resolver::{add_resistance, round_coefficient};

/// How the insulation of an element is known.
///
/// ```json
/// { "method": "thickness", "thickness_cm": 10.0 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InsulationInput {
    NotInsulated,
    #[default]
    Unknown,
    Thickness {
        #[serde(default)]
        thickness_cm: Option<f64>,
    },
    Resistance {
        #[serde(default)]
        resistance_m2k_w: Option<f64>,
    },
    /// Insulated during a known period, possibly later than construction
    Period { period: ConstructionPeriod },
    Direct {
        #[serde(default)]
        u_value: Option<f64>,
    },
}

impl InsulationInput {
    pub fn display_name(&self) -> &'static str {
        match self {
            InsulationInput::NotInsulated => "not insulated",
            InsulationInput::Unknown => "unknown insulation",
            InsulationInput::Thickness { .. } => "known thickness",
            InsulationInput::Resistance { .. } => "known resistance",
            InsulationInput::Period { .. } => "known insulation period",
            InsulationInput::Direct { .. } => "direct transmittance",
        }
    }
}

/// Where the insulation layer sits, as declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsulationPosition {
    #[default]
    Unknown,
    Interior,
    Exterior,
    /// Insulating structure (aerated concrete, insulating blocks)
    Distributed,
    InteriorExterior,
}

/// Insulation classification used by the thermal-bridge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsulationClass {
    NotInsulated,
    Interior,
    Exterior,
    Distributed,
    InteriorExterior,
}

impl InsulationClass {
    pub fn code(&self) -> &'static str {
        match self {
            InsulationClass::NotInsulated => "not_insulated",
            InsulationClass::Interior => "interior",
            InsulationClass::Exterior => "exterior",
            InsulationClass::Distributed => "distributed",
            InsulationClass::InteriorExterior => "interior_exterior",
        }
    }

    pub fn is_insulated(&self) -> bool {
        *self != InsulationClass::NotInsulated
    }
}

/// Classify an element's insulation.
///
/// Unknown insulation before 1975 counts as none. An insulated element with
/// no declared position counts as insulated from the inside.
pub fn classify(
    input: &InsulationInput,
    position: Option<InsulationPosition>,
    period: ConstructionPeriod,
) -> InsulationClass {
    match input {
        InsulationInput::NotInsulated => return InsulationClass::NotInsulated,
        InsulationInput::Unknown if period.before_1975() => return InsulationClass::NotInsulated,
        _ => {}
    }
    match position.unwrap_or_default() {
        InsulationPosition::Unknown | InsulationPosition::Interior => InsulationClass::Interior,
        InsulationPosition::Exterior => InsulationClass::Exterior,
        InsulationPosition::Distributed => InsulationClass::Distributed,
        InsulationPosition::InteriorExterior => InsulationClass::InteriorExterior,
    }
}

/// Family-specific parameters of the final transmittance.
#[derive(Debug, Clone)]
pub struct InsulationRule {
    /// Table of default transmittances by period, zone and heating type
    pub default_table: TableName,
    /// Conductivity assumed for a known thickness, W/(m.K)
    pub lambda: f64,
    /// Extra criteria of the default table (roof kind)
    pub extra: Query,
}

impl InsulationRule {
    pub fn new(default_table: TableName, lambda: f64) -> Self {
        Self {
            default_table,
            lambda,
            extra: Query::new(),
        }
    }

    pub fn with_extra(mut self, extra: Query) -> Self {
        self.extra = extra;
        self
    }
}

/// Final transmittance, rounded.
pub fn final_transmittance(
    base: f64,
    input: &InsulationInput,
    rule: &InsulationRule,
    context: &Context,
    reference: &ReferenceData,
    element: &str,
    diagnostics: &mut Diagnostics,
) -> f64 {
    let u = match *input {
        InsulationInput::NotInsulated => base,
        InsulationInput::Unknown => default_or_base(base, context.period, rule, context, reference, element, diagnostics),
        InsulationInput::Thickness { thickness_cm: Some(e) } => {
            add_resistance(base, e.max(0.0) * 0.01 / rule.lambda)
        }
        InsulationInput::Resistance { resistance_m2k_w: Some(r) } => add_resistance(base, r.max(0.0)),
        InsulationInput::Period { period } => {
            default_or_base(base, period, rule, context, reference, element, diagnostics)
        }
        InsulationInput::Direct { u_value: Some(u) } => u,
        InsulationInput::Thickness { thickness_cm: None }
        | InsulationInput::Resistance { resistance_m2k_w: None }
        | InsulationInput::Direct { u_value: None } => {
            diagnostics.inconsistency(
                element,
                format!("insulation method '{}' without its value", input.display_name()),
                "unknown insulation",
            );
            default_or_base(base, context.period, rule, context, reference, element, diagnostics)
        }
    };
    round_coefficient(u)
}

/// `min(base, default)`, or the base itself when the default table has no row.
fn default_or_base(
    base: f64,
    period: ConstructionPeriod,
    rule: &InsulationRule,
    context: &Context,
    reference: &ReferenceData,
    element: &str,
    diagnostics: &mut Diagnostics,
) -> f64 {
    let query = rule
        .extra
        .clone()
        .eq("period", period.code())
        .eq("zone", context.zone_or_default())
        .eq("joule", context.joule_heating);
    match reference.table(rule.default_table).value(&query, "u") {
        Ok(u) => {
            debug!(element, period = %period, default_u = u, base, "default transmittance");
            base.min(u)
        }
        Err(e) => {
            diagnostics.record(element, &e, base);
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(period: ConstructionPeriod) -> Context {
        Context::new(period, 100.0, 2.5)
    }

    fn wall_rule() -> InsulationRule {
        InsulationRule::new(TableName::WallDefaultU, 0.04)
    }

    fn compute(base: f64, input: InsulationInput, period: ConstructionPeriod) -> (f64, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let u = final_transmittance(
            base,
            &input,
            &wall_rule(),
            &context(period),
            ReferenceData::builtin().unwrap(),
            "MUR-1",
            &mut diagnostics,
        );
        (u, diagnostics)
    }

    #[test]
    fn test_not_insulated_is_rounded_base() {
        let (u, d) = compute(2.34567, InsulationInput::NotInsulated, ConstructionPeriod::From2006To2012);
        assert_eq!(u, 2.346);
        assert!(d.is_empty());
    }

    #[test]
    fn test_unknown_takes_minimum_with_table() {
        // 2013-2021 default for walls is 0.2
        let (u, _) = compute(2.5, InsulationInput::Unknown, ConstructionPeriod::From2013To2021);
        assert_eq!(u, 0.2);
        // base already below the default
        let (u, _) = compute(0.15, InsulationInput::Unknown, ConstructionPeriod::From2013To2021);
        assert_eq!(u, 0.15);
    }

    #[test]
    fn test_thickness() {
        // 1/(1/2.5 + 0.10/0.04) = 1/2.9
        let (u, _) = compute(2.5, InsulationInput::Thickness { thickness_cm: Some(10.0) }, ConstructionPeriod::Before1948);
        assert!((u - round_coefficient(1.0 / 2.9)).abs() < 1e-12);
    }

    #[test]
    fn test_resistance() {
        let (u, _) = compute(2.0, InsulationInput::Resistance { resistance_m2k_w: Some(2.0) }, ConstructionPeriod::Before1948);
        assert_eq!(u, 0.4);
    }

    #[test]
    fn test_period_uses_insulation_period() {
        let (u, _) = compute(
            2.5,
            InsulationInput::Period { period: ConstructionPeriod::From2001To2005 },
            ConstructionPeriod::Before1948,
        );
        assert_eq!(u, 0.4);
    }

    #[test]
    fn test_direct_passthrough() {
        let (u, _) = compute(2.5, InsulationInput::Direct { u_value: Some(0.31) }, ConstructionPeriod::Before1948);
        assert_eq!(u, 0.31);
    }

    #[test]
    fn test_missing_value_falls_back_to_unknown() {
        let (u, d) = compute(
            2.5,
            InsulationInput::Thickness { thickness_cm: None },
            ConstructionPeriod::From1989To2000,
        );
        // h1 (default zone), no Joule heating, 1989-2000: 0.5
        assert_eq!(u, 0.5);
        assert_eq!(d.len(), 1);
        assert_eq!(d.entries()[0].kind, crate::diagnostics::DiagnosticKind::InputInconsistency);
    }

    #[test]
    fn test_classify() {
        let old = ConstructionPeriod::From1948To1974;
        let recent = ConstructionPeriod::From2006To2012;
        assert_eq!(classify(&InsulationInput::Unknown, None, old), InsulationClass::NotInsulated);
        assert_eq!(classify(&InsulationInput::Unknown, None, recent), InsulationClass::Interior);
        assert_eq!(
            classify(&InsulationInput::Thickness { thickness_cm: Some(8.0) }, Some(InsulationPosition::Exterior), old),
            InsulationClass::Exterior
        );
        assert_eq!(classify(&InsulationInput::NotInsulated, Some(InsulationPosition::Exterior), recent), InsulationClass::NotInsulated);
    }

    #[test]
    fn test_input_json() {
        let input: InsulationInput = serde_json::from_str(r#"{"method": "resistance", "resistance_m2k_w": 2.5}"#).unwrap();
        assert_eq!(input, InsulationInput::Resistance { resistance_m2k_w: Some(2.5) });
        let input: InsulationInput = serde_json::from_str(r#"{"method": "period", "period": "2001_2005"}"#).unwrap();
        assert_eq!(input, InsulationInput::Period { period: ConstructionPeriod::From2001To2005 });
    }
}
