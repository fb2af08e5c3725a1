//! # Wall Calculation
//!
//! Opaque vertical walls.
//!
//! ## Base transmittance
//!
//! ```text
//! u0 = table(material, thickness bracket)
//! u0 = 1 / (1/u0 + R_lining)
//! u0 = 1 / (1/u0 + 0.70)          traditional material with insulating render
//! u0 = min(u0, 2.5)               when the cap option is set
//! ```
//!
//! An entered `u0` replaces the whole chain. The final transmittance then
//! follows the insulation method (see [`super::insulation`]), with λ = 0.040.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::insulation::{classify, final_transmittance, InsulationClass, InsulationInput, InsulationPosition, InsulationRule};
use super::{Adjacency, CalcEnv, ElementCalculator, Family, Intermediate, UnheatedSpace};
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::errors::{CalcError, CalcResult};
use crate::reference::{Query, ReferenceData, TableName};
use crate::resolver::{add_resistance, round_coefficient};

/// Ceiling of the wall base transmittance, W/(m².K); also its fallback.
pub const WALL_BASE_CAP: f64 = 2.5;

/// Conductivity of wall insulation of known thickness, W/(m.K)
pub const WALL_LAMBDA: f64 = 0.040;

/// Added resistance of an insulating render on a traditional wall, m².K/W
pub const INSULATING_RENDER_RESISTANCE: f64 = 0.70;

/// Structural material of a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WallMaterial {
    #[default]
    Unknown,
    StoneRubble,
    StoneWithFill,
    RammedEarth,
    TimberFrameNoFill,
    TimberFrameWithFill,
    SolidWood,
    SolidBrick,
    HollowBrick,
    ConcreteBlock,
    HollowConcreteBlock,
    PouredConcrete,
    AeratedConcrete,
    TimberFrame,
    SandwichPanel,
    PlasterPartition,
}

impl WallMaterial {
    pub const ALL: [WallMaterial; 16] = [
        WallMaterial::Unknown,
        WallMaterial::StoneRubble,
        WallMaterial::StoneWithFill,
        WallMaterial::RammedEarth,
        WallMaterial::TimberFrameNoFill,
        WallMaterial::TimberFrameWithFill,
        WallMaterial::SolidWood,
        WallMaterial::SolidBrick,
        WallMaterial::HollowBrick,
        WallMaterial::ConcreteBlock,
        WallMaterial::HollowConcreteBlock,
        WallMaterial::PouredConcrete,
        WallMaterial::AeratedConcrete,
        WallMaterial::TimberFrame,
        WallMaterial::SandwichPanel,
        WallMaterial::PlasterPartition,
    ];

    /// Code used in `wall_u0`
    pub fn code(&self) -> &'static str {
        match self {
            WallMaterial::Unknown => "unknown",
            WallMaterial::StoneRubble => "stone_rubble",
            WallMaterial::StoneWithFill => "stone_with_fill",
            WallMaterial::RammedEarth => "rammed_earth",
            WallMaterial::TimberFrameNoFill => "timber_frame_no_fill",
            WallMaterial::TimberFrameWithFill => "timber_frame_with_fill",
            WallMaterial::SolidWood => "solid_wood",
            WallMaterial::SolidBrick => "solid_brick",
            WallMaterial::HollowBrick => "hollow_brick",
            WallMaterial::ConcreteBlock => "concrete_block",
            WallMaterial::HollowConcreteBlock => "hollow_concrete_block",
            WallMaterial::PouredConcrete => "poured_concrete",
            WallMaterial::AeratedConcrete => "aerated_concrete",
            WallMaterial::TimberFrame => "timber_frame",
            WallMaterial::SandwichPanel => "sandwich_panel",
            WallMaterial::PlasterPartition => "plaster_partition",
        }
    }

    /// Old-style masonry and half-timbering, eligible for the insulating render bonus
    pub fn is_traditional(&self) -> bool {
        matches!(
            self,
            WallMaterial::StoneRubble
                | WallMaterial::StoneWithFill
                | WallMaterial::RammedEarth
                | WallMaterial::TimberFrameNoFill
                | WallMaterial::TimberFrameWithFill
                | WallMaterial::SolidBrick
        )
    }

    /// Lightweight structures carry no structural thermal bridge
    pub fn is_lightweight(&self) -> bool {
        matches!(
            self,
            WallMaterial::TimberFrameNoFill
                | WallMaterial::TimberFrameWithFill
                | WallMaterial::TimberFrame
                | WallMaterial::SolidWood
        )
    }
}

impl std::fmt::Display for WallMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Interior lining or doubling of the wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Lining {
    #[default]
    None,
    /// Lining of unknown kind, or air gap under 15 mm
    Indeterminate,
    #[serde(rename = "air_gap_over_15mm")]
    AirGapOver15mm,
    KnownLining,
}

impl Lining {
    /// Added thermal resistance, m².K/W
    pub fn resistance(&self) -> f64 {
        match self {
            Lining::None => 0.0,
            Lining::Indeterminate => 0.10,
            Lining::AirGapOver15mm => 0.21,
            Lining::KnownLining => 0.21,
        }
    }
}

/// One wall of the dwelling.
///
/// ## JSON Example
///
/// ```json
/// {
///   "reference": "MUR-NORD",
///   "area_m2": 24.5,
///   "adjacency": "exterior",
///   "material": "stone_rubble",
///   "thickness_cm": 50.0,
///   "lining": "indeterminate",
///   "insulation": { "method": "not_insulated" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallEntry {
    /// Free-text reference, used by thermal bridges
    pub reference: String,

    /// Net area, m²
    pub area_m2: f64,

    #[serde(default)]
    pub adjacency: Adjacency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unheated_space: Option<UnheatedSpace>,

    #[serde(default)]
    pub material: WallMaterial,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_cm: Option<f64>,

    #[serde(default)]
    pub lining: Lining,

    #[serde(default)]
    pub insulating_render: bool,

    /// Entered base transmittance, replaces the tabulated chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u0_override: Option<f64>,

    #[serde(default)]
    pub insulation: InsulationInput,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulation_position: Option<InsulationPosition>,

    /// Filled by [`EnvelopeResult::attach_to`](crate::aggregator::EnvelopeResult::attach_to)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<WallIntermediate>,
}

impl WallEntry {
    pub fn new(reference: impl Into<String>, area_m2: f64, material: WallMaterial) -> Self {
        Self {
            reference: reference.into(),
            area_m2,
            adjacency: Adjacency::Exterior,
            unheated_space: None,
            material,
            thickness_cm: None,
            lining: Lining::None,
            insulating_render: false,
            u0_override: None,
            insulation: InsulationInput::Unknown,
            insulation_position: None,
            intermediate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallIntermediate {
    pub material: WallMaterial,
    pub area_m2: f64,
    /// Base transmittance, W/(m².K)
    pub u0: f64,
    /// Final transmittance, W/(m².K)
    pub u: f64,
    pub b: f64,
    pub insulation_class: InsulationClass,
    pub heat_loss_w_per_k: f64,
}

/// Tabulated base transmittance of a material, before lining and render.
pub fn tabulated_u0(reference: &ReferenceData, material: WallMaterial, thickness_cm: Option<f64>) -> CalcResult<f64> {
    let table = reference.table(TableName::WallU0);
    let query = Query::new().eq("material", material.code());
    let row = table.bracket(&query, "thickness_cm", thickness_cm)?;
    row.number("u0")
        .ok_or_else(|| CalcError::unresolved(TableName::WallU0.as_str(), query.to_string()))
}

pub struct WallCalculator;

impl WallCalculator {
    /// Base transmittance, rounded.
    pub fn base_transmittance(&self, entry: &WallEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> f64 {
        if let Some(u0) = entry.u0_override {
            return round_coefficient(u0);
        }

        let mut u0 = match tabulated_u0(env.reference, entry.material, entry.thickness_cm) {
            Ok(u0) => u0,
            Err(e) => {
                diagnostics.record(&entry.reference, &e, WALL_BASE_CAP);
                WALL_BASE_CAP
            }
        };

        u0 = add_resistance(u0, entry.lining.resistance());
        if entry.insulating_render {
            if entry.material.is_traditional() {
                u0 = add_resistance(u0, INSULATING_RENDER_RESISTANCE);
            } else {
                debug!(element = %entry.reference, material = %entry.material, "insulating render ignored on non-traditional wall");
            }
        }
        if env.context.options.cap_wall_base_transmittance {
            u0 = u0.min(WALL_BASE_CAP);
        }
        round_coefficient(u0)
    }
}

impl ElementCalculator for WallCalculator {
    type Entry = WallEntry;

    const FAMILY: Family = Family::Wall;

    fn entries<'d>(&self, dwelling: &'d Dwelling) -> &'d [WallEntry] {
        &dwelling.walls
    }

    fn compute(&self, entry: &WallEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Intermediate {
        let u0 = self.base_transmittance(entry, env, diagnostics);
        let rule = InsulationRule::new(TableName::WallDefaultU, WALL_LAMBDA);
        let u = final_transmittance(
            u0,
            &entry.insulation,
            &rule,
            env.context,
            env.reference,
            &entry.reference,
            diagnostics,
        );
        let b = self.reduction_factor(
            &entry.reference,
            entry.adjacency,
            entry.unheated_space.as_ref(),
            env,
            diagnostics,
        );

        Intermediate::Wall(WallIntermediate {
            material: entry.material,
            area_m2: entry.area_m2,
            u0,
            u,
            b,
            insulation_class: classify(&entry.insulation, entry.insulation_position, env.context.period),
            heat_loss_w_per_k: b * entry.area_m2 * u,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConstructionPeriod, Context};
    use crate::test_support::with_env;

    fn compute(entry: &WallEntry, context: Context) -> (WallIntermediate, Diagnostics) {
        let mut dwelling = Dwelling::new(context);
        dwelling.walls.push(entry.clone());
        with_env(&dwelling, |env| {
            let mut diagnostics = Diagnostics::new();
            match WallCalculator.compute(entry, env, &mut diagnostics) {
                Intermediate::Wall(w) => (w, diagnostics),
                other => panic!("unexpected {:?}", other),
            }
        })
    }

    fn old_house() -> Context {
        Context::new(ConstructionPeriod::Before1948, 100.0, 2.5)
    }

    #[test]
    fn test_thickness_bracket() {
        let data = ReferenceData::builtin().unwrap();
        assert_eq!(tabulated_u0(data, WallMaterial::StoneRubble, Some(55.0)).unwrap(), 2.15);
        assert_eq!(tabulated_u0(data, WallMaterial::StoneRubble, Some(10.0)).unwrap(), 3.2);
        assert_eq!(tabulated_u0(data, WallMaterial::StoneRubble, Some(120.0)).unwrap(), 1.6);
        assert_eq!(tabulated_u0(data, WallMaterial::TimberFrame, Some(20.0)).unwrap(), 2.0);
    }

    #[test]
    fn test_cap_applies_to_tabulated_base() {
        let mut entry = WallEntry::new("MUR-1", 10.0, WallMaterial::SolidBrick);
        entry.thickness_cm = Some(9.0);
        entry.insulation = InsulationInput::NotInsulated;
        let (w, _) = compute(&entry, old_house());
        assert_eq!(w.u0, 2.5);

        let mut uncapped = old_house();
        uncapped.options.cap_wall_base_transmittance = false;
        let (w, _) = compute(&entry, uncapped);
        assert_eq!(w.u0, 3.8);
    }

    #[test]
    fn test_lining_and_render() {
        let mut entry = WallEntry::new("MUR-1", 10.0, WallMaterial::StoneRubble);
        entry.thickness_cm = Some(60.0);
        entry.lining = Lining::AirGapOver15mm;
        entry.insulating_render = true;
        entry.insulation = InsulationInput::NotInsulated;
        let (w, _) = compute(&entry, old_house());

        let expected = round_coefficient(add_resistance(add_resistance(1.95, 0.21), 0.70));
        assert_eq!(w.u0, expected);
        assert_eq!(w.u, expected);
    }

    #[test]
    fn test_render_ignored_on_modern_material() {
        let mut entry = WallEntry::new("MUR-1", 10.0, WallMaterial::AeratedConcrete);
        entry.thickness_cm = Some(30.0);
        entry.insulating_render = true;
        entry.insulation = InsulationInput::NotInsulated;
        let (w, _) = compute(&entry, old_house());
        assert_eq!(w.u0, 0.45);
    }

    #[test]
    fn test_override_skips_adjustments() {
        let mut entry = WallEntry::new("MUR-1", 10.0, WallMaterial::StoneRubble);
        entry.u0_override = Some(3.1);
        entry.lining = Lining::KnownLining;
        entry.insulation = InsulationInput::NotInsulated;
        let (w, _) = compute(&entry, old_house());
        assert_eq!(w.u0, 3.1);
    }

    #[test]
    fn test_heat_loss_is_b_area_u() {
        let mut entry = WallEntry::new("MUR-1", 10.0, WallMaterial::Unknown);
        entry.insulation = InsulationInput::Direct { u_value: Some(0.5) };
        let (w, d) = compute(&entry, old_house());
        assert_eq!(w.b, 1.0);
        assert!((w.heat_loss_w_per_k - 5.0).abs() < 1e-12);
        assert!(d.is_empty());
    }

    #[test]
    fn test_material_sets() {
        assert!(WallMaterial::StoneRubble.is_traditional());
        assert!(!WallMaterial::PouredConcrete.is_traditional());
        assert!(WallMaterial::SolidWood.is_lightweight());
        assert!(!WallMaterial::SolidBrick.is_lightweight());
    }
}
