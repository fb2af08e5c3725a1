//! # Low Floor Calculation
//!
//! Floors over the ground, a crawlspace or an unheated space.
//!
//! The base transmittance is tabulated by structure and capped at 2.0; the
//! final transmittance `upb` follows the insulation method with λ = 0.042.
//!
//! ## Equivalent perimeter
//!
//! Floors over a crawlspace, on grade or over an unheated basement lose heat
//! through the ground. Their transmittance is replaced by `ue`, interpolated on
//! `upb` in `floor_ue` at the bucket nearest to `2S/P`, where `S` and `P` are
//! the total area and exposed perimeter of every floor of the dwelling with
//! the same adjacency.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::insulation::{classify, final_transmittance, InsulationClass, InsulationInput, InsulationPosition, InsulationRule};
use super::{Adjacency, CalcEnv, ElementCalculator, Family, Intermediate, UnheatedSpace};
use crate::context::ConstructionPeriod;
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::errors::CalcResult;
use crate::reference::{Query, ReferenceData, TableName};
use crate::resolver::{nearest, round_coefficient};

/// Ceiling of the floor base transmittance, W/(m².K); also its fallback.
pub const LOW_FLOOR_BASE_CAP: f64 = 2.0;

/// Conductivity of floor insulation of known thickness, W/(m.K)
pub const LOW_FLOOR_LAMBDA: f64 = 0.042;

/// Tabulated `2S/P` buckets of `floor_ue`
pub const PERIMETER_RATIO_BUCKETS: [f64; 8] = [3.0, 4.0, 6.0, 8.0, 10.0, 12.0, 15.0, 20.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LowFloorMaterial {
    #[default]
    Unknown,
    ConcreteSlab,
    TimberJoists,
    MetalJoists,
    BrickVaults,
    HollowBlockBeams,
    InsulatingBlockBeams,
}

impl LowFloorMaterial {
    pub fn code(&self) -> &'static str {
        match self {
            LowFloorMaterial::Unknown => "unknown",
            LowFloorMaterial::ConcreteSlab => "concrete_slab",
            LowFloorMaterial::TimberJoists => "timber_joists",
            LowFloorMaterial::MetalJoists => "metal_joists",
            LowFloorMaterial::BrickVaults => "brick_vaults",
            LowFloorMaterial::HollowBlockBeams => "hollow_block_beams",
            LowFloorMaterial::InsulatingBlockBeams => "insulating_block_beams",
        }
    }
}

/// One low floor of the dwelling.
///
/// ```json
/// {
///   "reference": "PLANCHER-VS",
///   "area_m2": 80.0,
///   "perimeter_m": 36.0,
///   "adjacency": "crawlspace",
///   "material": "timber_joists",
///   "insulation": { "method": "unknown" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowFloorEntry {
    pub reference: String,

    pub area_m2: f64,

    /// Exposed perimeter, m (equivalent-perimeter adjacencies only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perimeter_m: Option<f64>,

    #[serde(default)]
    pub adjacency: Adjacency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unheated_space: Option<UnheatedSpace>,

    #[serde(default)]
    pub material: LowFloorMaterial,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u0_override: Option<f64>,

    #[serde(default)]
    pub insulation: InsulationInput,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insulation_position: Option<InsulationPosition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<LowFloorIntermediate>,
}

impl LowFloorEntry {
    pub fn new(reference: impl Into<String>, area_m2: f64, adjacency: Adjacency) -> Self {
        Self {
            reference: reference.into(),
            area_m2,
            perimeter_m: None,
            adjacency,
            unheated_space: None,
            material: LowFloorMaterial::Unknown,
            u0_override: None,
            insulation: InsulationInput::Unknown,
            insulation_position: None,
            intermediate: None,
        }
    }
}

/// Equivalent-perimeter data of a ground-coupled floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquivalentPerimeter {
    /// Total area of the floors sharing the adjacency, m²
    pub total_area_m2: f64,
    /// Total exposed perimeter of those floors, m
    pub total_perimeter_m: f64,
    /// `round(2S/P)` snapped to the nearest tabulated bucket
    pub ratio_bucket: f64,
    /// Equivalent transmittance, W/(m².K)
    pub ue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowFloorIntermediate {
    pub area_m2: f64,
    pub u0: f64,
    /// Floor transmittance before the ground correction
    pub upb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equivalent: Option<EquivalentPerimeter>,
    /// Transmittance used for the loss: `ue` when available, else `upb`
    pub u: f64,
    pub b: f64,
    pub insulation_class: InsulationClass,
    pub heat_loss_w_per_k: f64,
}

/// `round(2S/P)` snapped to [`PERIMETER_RATIO_BUCKETS`]; `None` without perimeter.
pub fn perimeter_ratio_bucket(total_area_m2: f64, total_perimeter_m: f64) -> Option<f64> {
    if total_perimeter_m <= 0.0 {
        return None;
    }
    let ratio = (2.0 * total_area_m2 / total_perimeter_m).round();
    nearest(&PERIMETER_RATIO_BUCKETS, ratio)
}

/// `ue` for a bucket, interpolated on `upb`.
pub fn equivalent_transmittance(
    reference: &ReferenceData,
    adjacency: Adjacency,
    period: ConstructionPeriod,
    bucket: f64,
    upb: f64,
) -> CalcResult<f64> {
    let mut query = Query::new()
        .eq("kind", adjacency.code())
        .eq("ratio_2s_p", bucket);
    if adjacency == Adjacency::SlabOnGrade {
        query = query.eq("period", period.code());
    }
    reference
        .table(TableName::FloorUe)
        .interpolate(&query, "upb", "ue", upb)
}

pub struct LowFloorCalculator;

impl LowFloorCalculator {
    fn base_transmittance(&self, entry: &LowFloorEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> f64 {
        let u0 = match entry.u0_override {
            Some(u0) => u0,
            None => {
                let query = Query::new().eq("material", entry.material.code());
                match env.reference.table(TableName::LowFloorU0).value(&query, "u0") {
                    Ok(u0) => u0,
                    Err(e) => {
                        diagnostics.record(&entry.reference, &e, LOW_FLOOR_BASE_CAP);
                        LOW_FLOOR_BASE_CAP
                    }
                }
            }
        };
        round_coefficient(u0.min(LOW_FLOOR_BASE_CAP))
    }

    fn equivalent_perimeter(
        &self,
        entry: &LowFloorEntry,
        upb: f64,
        env: &CalcEnv<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<EquivalentPerimeter> {
        let (total_area_m2, total_perimeter_m) = env
            .dwelling
            .low_floors
            .iter()
            .filter(|f| f.adjacency == entry.adjacency)
            .fold((0.0, 0.0), |(s, p), f| (s + f.area_m2, p + f.perimeter_m.unwrap_or(0.0)));

        let Some(bucket) = perimeter_ratio_bucket(total_area_m2, total_perimeter_m) else {
            diagnostics.inconsistency(
                &entry.reference,
                format!("no exposed perimeter for floors of adjacency '{}'", entry.adjacency),
                "floor transmittance without ground correction",
            );
            return None;
        };
        debug!(element = %entry.reference, total_area_m2, total_perimeter_m, bucket, "equivalent perimeter bucket");

        match equivalent_transmittance(env.reference, entry.adjacency, env.context.period, bucket, upb) {
            Ok(ue) => Some(EquivalentPerimeter {
                total_area_m2,
                total_perimeter_m,
                ratio_bucket: bucket,
                ue: round_coefficient(ue),
            }),
            Err(e) => {
                diagnostics.record(&entry.reference, &e, upb);
                None
            }
        }
    }
}

impl ElementCalculator for LowFloorCalculator {
    type Entry = LowFloorEntry;

    const FAMILY: Family = Family::LowFloor;

    fn entries<'d>(&self, dwelling: &'d Dwelling) -> &'d [LowFloorEntry] {
        &dwelling.low_floors
    }

    fn compute(&self, entry: &LowFloorEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Intermediate {
        let u0 = self.base_transmittance(entry, env, diagnostics);
        let rule = InsulationRule::new(TableName::LowFloorDefaultU, LOW_FLOOR_LAMBDA);
        let upb = final_transmittance(
            u0,
            &entry.insulation,
            &rule,
            env.context,
            env.reference,
            &entry.reference,
            diagnostics,
        );

        let equivalent = if entry.adjacency.uses_equivalent_perimeter() {
            self.equivalent_perimeter(entry, upb, env, diagnostics)
        } else {
            None
        };
        let u = equivalent.map_or(upb, |e| e.ue);

        let b = self.reduction_factor(
            &entry.reference,
            entry.adjacency,
            entry.unheated_space.as_ref(),
            env,
            diagnostics,
        );

        Intermediate::LowFloor(LowFloorIntermediate {
            area_m2: entry.area_m2,
            u0,
            upb,
            equivalent,
            u,
            b,
            insulation_class: classify(&entry.insulation, entry.insulation_position, env.context.period),
            heat_loss_w_per_k: b * entry.area_m2 * u,
        })
    }
}
