//! # Door Calculation
//!
//! Doors are tabulated by type; an entered transmittance replaces the table.

use serde::{Deserialize, Serialize};

use super::{Adjacency, CalcEnv, ElementCalculator, Family, Intermediate, UnheatedSpace};
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::reference::{Query, TableName};
use crate::resolver::round_coefficient;

/// Transmittance substituted when the door type has no row, W/(m².K)
pub const FALLBACK_DOOR_U: f64 = 3.5;

/// Standard frame widths of the opening/wall thermal-bridge table, cm
pub const FRAME_WIDTHS_CM: [f64; 2] = [5.0, 10.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DoorType {
    #[default]
    Unknown,
    WoodSolid,
    #[serde(rename = "wood_glazed_under_30")]
    WoodGlazedUnder30,
    #[serde(rename = "wood_glazed_30_60")]
    WoodGlazed30To60,
    PvcSolid,
    PvcGlazed,
    MetalSolid,
    MetalGlazed,
    InsulatedDoubleSkin,
    InsulatedRecent,
}

impl DoorType {
    pub fn code(&self) -> &'static str {
        match self {
            DoorType::Unknown => "unknown",
            DoorType::WoodSolid => "wood_solid",
            DoorType::WoodGlazedUnder30 => "wood_glazed_under_30",
            DoorType::WoodGlazed30To60 => "wood_glazed_30_60",
            DoorType::PvcSolid => "pvc_solid",
            DoorType::PvcGlazed => "pvc_glazed",
            DoorType::MetalSolid => "metal_solid",
            DoorType::MetalGlazed => "metal_glazed",
            DoorType::InsulatedDoubleSkin => "insulated_double_skin",
            DoorType::InsulatedRecent => "insulated_recent",
        }
    }
}

/// How the frame sits in the wall opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pose {
    #[default]
    InnerFace,
    OuterFace,
    Tunnel,
}

impl Pose {
    pub fn code(&self) -> &'static str {
        match self {
            Pose::InnerFace => "inner_face",
            Pose::OuterFace => "outer_face",
            Pose::Tunnel => "tunnel",
        }
    }
}

/// Installation attributes of a window or door, read by opening/wall thermal bridges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    #[serde(default)]
    pub pose: Pose,
    /// Wall insulation is returned onto the reveal
    #[serde(default)]
    pub insulation_return: bool,
    #[serde(default = "default_frame_width")]
    pub frame_width_cm: f64,
}

fn default_frame_width() -> f64 {
    5.0
}

impl Installation {
    /// Frame width snapped to the nearest tabulated width
    pub fn snapped_frame_width_cm(&self) -> f64 {
        crate::resolver::nearest(&FRAME_WIDTHS_CM, self.frame_width_cm).unwrap_or(FRAME_WIDTHS_CM[0])
    }
}

/// One door of the dwelling.
///
/// ```json
/// { "reference": "PORTE-ENTREE", "area_m2": 2.0, "door_type": "wood_solid", "weatherstripped": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorEntry {
    pub reference: String,

    pub area_m2: f64,

    #[serde(default)]
    pub adjacency: Adjacency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unheated_space: Option<UnheatedSpace>,

    #[serde(default)]
    pub door_type: DoorType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u_override: Option<f64>,

    #[serde(default)]
    pub weatherstripped: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation: Option<Installation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<DoorIntermediate>,
}

impl DoorEntry {
    pub fn new(reference: impl Into<String>, area_m2: f64, door_type: DoorType) -> Self {
        Self {
            reference: reference.into(),
            area_m2,
            adjacency: Adjacency::Exterior,
            unheated_space: None,
            door_type,
            u_override: None,
            weatherstripped: false,
            installation: None,
            intermediate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorIntermediate {
    pub area_m2: f64,
    pub u: f64,
    pub b: f64,
    pub weatherstripped: bool,
    pub heat_loss_w_per_k: f64,
}

pub struct DoorCalculator;

impl ElementCalculator for DoorCalculator {
    type Entry = DoorEntry;

    const FAMILY: Family = Family::Door;

    fn entries<'d>(&self, dwelling: &'d Dwelling) -> &'d [DoorEntry] {
        &dwelling.doors
    }

    fn compute(&self, entry: &DoorEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Intermediate {
        let u = match entry.u_override {
            Some(u) => u,
            None => {
                let query = Query::new().eq("door_type", entry.door_type.code());
                match env.reference.table(TableName::DoorU).value(&query, "u") {
                    Ok(u) => u,
                    Err(e) => {
                        diagnostics.record(&entry.reference, &e, FALLBACK_DOOR_U);
                        FALLBACK_DOOR_U
                    }
                }
            }
        };
        let u = round_coefficient(u);
        let b = self.reduction_factor(
            &entry.reference,
            entry.adjacency,
            entry.unheated_space.as_ref(),
            env,
            diagnostics,
        );

        Intermediate::Door(DoorIntermediate {
            area_m2: entry.area_m2,
            u,
            b,
            weatherstripped: entry.weatherstripped,
            heat_loss_w_per_k: b * entry.area_m2 * u,
        })
    }
}
