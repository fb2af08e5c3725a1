//! # High Floor Calculation
//!
//! Ceilings under lost attics, sloped roofs and roof terraces. Same two-stage
//! shape as walls: tabulated base transmittance capped at 2.5, then the
//! insulation method with λ = 0.040. The unknown-insulation table is refined
//! by the roof kind.

use serde::{Deserialize, Serialize};

use super::insulation::{classify, final_transmittance, InsulationClass, InsulationInput, InsulationPosition, InsulationRule};
use super::{Adjacency, CalcEnv, ElementCalculator, Family, Intermediate, UnheatedSpace};
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::reference::{Query, TableName};
use crate::resolver::round_coefficient;

/// Ceiling of the roof base transmittance, W/(m².K); also its fallback.
pub const HIGH_FLOOR_BASE_CAP: f64 = 2.5;

/// Conductivity of roof insulation of known thickness, W/(m.K)
pub const HIGH_FLOOR_LAMBDA: f64 = 0.040;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HighFloorMaterial {
    #[default]
    Unknown,
    ConcreteSlab,
    HollowBlockBeams,
    TimberJoists,
    MetalJoists,
    TimberRafters,
    PlasterCeiling,
    MetalDeck,
    Thatch,
}

impl HighFloorMaterial {
    pub fn code(&self) -> &'static str {
        match self {
            HighFloorMaterial::Unknown => "unknown",
            HighFloorMaterial::ConcreteSlab => "concrete_slab",
            HighFloorMaterial::HollowBlockBeams => "hollow_block_beams",
            HighFloorMaterial::TimberJoists => "timber_joists",
            HighFloorMaterial::MetalJoists => "metal_joists",
            HighFloorMaterial::TimberRafters => "timber_rafters",
            HighFloorMaterial::PlasterCeiling => "plaster_ceiling",
            HighFloorMaterial::MetalDeck => "metal_deck",
            HighFloorMaterial::Thatch => "thatch",
        }
    }

    /// Heavy structures form a roof/wall thermal bridge
    pub fn is_heavy(&self) -> bool {
        matches!(self, HighFloorMaterial::ConcreteSlab | HighFloorMaterial::HollowBlockBeams)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoofKind {
    Terrace,
    #[default]
    LostAttic,
    Sloped,
}

impl RoofKind {
    pub fn code(&self) -> &'static str {
        match self {
            RoofKind::Terrace => "terrace",
            RoofKind::LostAttic => "lost_attic",
            RoofKind::Sloped => "sloped",
        }
    }
}

/// One ceiling or roof of the dwelling.
///
/// ```json
/// {
///   "reference": "PLAFOND-COMBLES",
///   "area_m2": 80.0,
///   "adjacency": "attic_low_ventilation",
///   "unheated_space": { "interior_area_m2": 80.0, "exterior_area_m2": 95.0 },
///   "material": "timber_joists",
///   "roof_kind": "lost_attic",
///   "insulation": { "method": "thickness", "thickness_cm": 20.0 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighFloorEntry {
    pub reference: String,

    pub area_m2: f64,

    #[serde(default)]
    pub adjacency: Adjacency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unheated_space: Option<UnheatedSpace>,

    #[serde(default)]
    pub material: HighFloorMaterial,

    #[serde(default)]
    pub roof_kind: RoofKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u0_override: Option<f64>,

    #[serde(default)]
    pub insulation: InsulationInput,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulation_position: Option<InsulationPosition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<HighFloorIntermediate>,
}

impl HighFloorEntry {
    pub fn new(reference: impl Into<String>, area_m2: f64, material: HighFloorMaterial) -> Self {
        Self {
            reference: reference.into(),
            area_m2,
            adjacency: Adjacency::Exterior,
            unheated_space: None,
            material,
            roof_kind: RoofKind::LostAttic,
            u0_override: None,
            insulation: InsulationInput::Unknown,
            insulation_position: None,
            intermediate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighFloorIntermediate {
    pub material: HighFloorMaterial,
    pub area_m2: f64,
    pub u0: f64,
    pub u: f64,
    pub b: f64,
    pub insulation_class: InsulationClass,
    pub heavy: bool,
    pub heat_loss_w_per_k: f64,
}

pub struct HighFloorCalculator;

impl HighFloorCalculator {
    fn base_transmittance(&self, entry: &HighFloorEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> f64 {
        let u0 = match entry.u0_override {
            Some(u0) => return round_coefficient(u0),
            None => {
                let query = Query::new().eq("material", entry.material.code());
                match env.reference.table(TableName::HighFloorU0).value(&query, "u0") {
                    Ok(u0) => u0,
                    Err(e) => {
                        diagnostics.record(&entry.reference, &e, HIGH_FLOOR_BASE_CAP);
                        HIGH_FLOOR_BASE_CAP
                    }
                }
            }
        };
        round_coefficient(u0.min(HIGH_FLOOR_BASE_CAP))
    }
}

impl ElementCalculator for HighFloorCalculator {
    type Entry = HighFloorEntry;

    const FAMILY: Family = Family::HighFloor;

    fn entries<'d>(&self, dwelling: &'d Dwelling) -> &'d [HighFloorEntry] {
        &dwelling.high_floors
    }

    fn compute(&self, entry: &HighFloorEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Intermediate {
        let u0 = self.base_transmittance(entry, env, diagnostics);
        let rule = InsulationRule::new(TableName::HighFloorDefaultU, HIGH_FLOOR_LAMBDA)
            .with_extra(Query::new().eq("kind", entry.roof_kind.code()));
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

        Intermediate::HighFloor(HighFloorIntermediate {
            material: entry.material,
            area_m2: entry.area_m2,
            u0,
            u,
            b,
            insulation_class: classify(&entry.insulation, entry.insulation_position, env.context.period),
            heavy: entry.material.is_heavy(),
            heat_loss_w_per_k: b * entry.area_m2 * u,
        })
    }
}
