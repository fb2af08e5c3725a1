//! # Envelope Elements
//!
//! One calculator per element family. Every calculator has the same shape:
//! it reads one entry of the dwelling and produces that entry's intermediate
//! data, resolving its reduction factor `b` through [`crate::reduction`].
//!
//! The aggregator does not know the concrete calculators; it runs an ordered
//! list of [`FamilyPass`] trait objects, each of which is a blanket
//! implementation over an [`ElementCalculator`].
//!
//! ## Families
//!
//! - [`wall`] - opaque vertical walls
//! - [`door`] - opaque or partly glazed doors
//! - [`low_floor`] - floors over the ground, a crawlspace or an unheated space
//! - [`high_floor`] - ceilings and roofs
//! - [`window`] - windows and French doors
//! - [`thermal_bridge`] - linear junctions between two elements

pub mod door;
pub mod high_floor;
pub mod insulation;
pub mod low_floor;
pub mod thermal_bridge;
pub mod wall;
pub mod window;

use serde::{Deserialize, Serialize};

use crate::arena::{ElementArena, ReferenceIndex};
use crate::context::Context;
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::reduction::{resolve_reduction_factor, ReductionInput};
use crate::reference::ReferenceData;

pub use door::{DoorCalculator, DoorEntry, DoorIntermediate, DoorType, Installation, Pose};
pub use high_floor::{HighFloorCalculator, HighFloorEntry, HighFloorIntermediate};
pub use insulation::{InsulationClass, InsulationInput, InsulationPosition};
pub use low_floor::{LowFloorCalculator, LowFloorEntry, LowFloorIntermediate};
pub use thermal_bridge::{KMethod, KSource, Linkage, ThermalBridgeCalculator, ThermalBridgeEntry, ThermalBridgeIntermediate};
pub use wall::{WallCalculator, WallEntry, WallIntermediate};
pub use window::{WindowCalculator, WindowEntry, WindowIntermediate};

/// `b` substituted when the reduction factor cannot be resolved: the element
/// is treated as facing the exterior.
pub const FALLBACK_REDUCTION_FACTOR: f64 = 1.0;

/// Envelope element family, in aggregation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Wall,
    Door,
    LowFloor,
    HighFloor,
    Window,
    ThermalBridge,
}

impl Family {
    /// Aggregation order. Thermal bridges come last so that every element they
    /// reference has already been classified.
    pub const ALL: [Family; 6] = [
        Family::Wall,
        Family::Door,
        Family::LowFloor,
        Family::HighFloor,
        Family::Window,
        Family::ThermalBridge,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Family::Wall => "Wall",
            Family::Door => "Door",
            Family::LowFloor => "Low floor",
            Family::HighFloor => "High floor",
            Family::Window => "Window",
            Family::ThermalBridge => "Thermal bridge",
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// What lies on the other side of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Adjacency {
    #[default]
    Exterior,
    BuriedWall,
    Crawlspace,
    SlabOnGrade,
    UnheatedBasement,
    /// Heated premises of another use (shops, offices)
    NonResidential,
    /// Heated dwelling or heated common part
    HeatedSpace,
    Garage,
    Cellar,
    /// Veranda or glazed buffer space
    SolarBuffer,
    AtticHighVentilation,
    AtticLowVentilation,
    AtticVeryLowVentilation,
    CirculationClosed,
    CirculationOpen,
    CirculationSmokeVent,
    HallAutoClose,
    HallOpen,
    CollectiveGarage,
    OtherOutbuilding,
}

impl Adjacency {
    pub const ALL: [Adjacency; 20] = [
        Adjacency::Exterior,
        Adjacency::BuriedWall,
        Adjacency::Crawlspace,
        Adjacency::SlabOnGrade,
        Adjacency::UnheatedBasement,
        Adjacency::NonResidential,
        Adjacency::HeatedSpace,
        Adjacency::Garage,
        Adjacency::Cellar,
        Adjacency::SolarBuffer,
        Adjacency::AtticHighVentilation,
        Adjacency::AtticLowVentilation,
        Adjacency::AtticVeryLowVentilation,
        Adjacency::CirculationClosed,
        Adjacency::CirculationOpen,
        Adjacency::CirculationSmokeVent,
        Adjacency::HallAutoClose,
        Adjacency::HallOpen,
        Adjacency::CollectiveGarage,
        Adjacency::OtherOutbuilding,
    ];

    /// Code used in the reference tables
    pub fn code(&self) -> &'static str {
        match self {
            Adjacency::Exterior => "exterior",
            Adjacency::BuriedWall => "buried_wall",
            Adjacency::Crawlspace => "crawlspace",
            Adjacency::SlabOnGrade => "slab_on_grade",
            Adjacency::UnheatedBasement => "unheated_basement",
            Adjacency::NonResidential => "non_residential",
            Adjacency::HeatedSpace => "heated_space",
            Adjacency::Garage => "garage",
            Adjacency::Cellar => "cellar",
            Adjacency::SolarBuffer => "solar_buffer",
            Adjacency::AtticHighVentilation => "attic_high_ventilation",
            Adjacency::AtticLowVentilation => "attic_low_ventilation",
            Adjacency::AtticVeryLowVentilation => "attic_very_low_ventilation",
            Adjacency::CirculationClosed => "circulation_closed",
            Adjacency::CirculationOpen => "circulation_open",
            Adjacency::CirculationSmokeVent => "circulation_smoke_vent",
            Adjacency::HallAutoClose => "hall_auto_close",
            Adjacency::HallOpen => "hall_open",
            Adjacency::CollectiveGarage => "collective_garage",
            Adjacency::OtherOutbuilding => "other_outbuilding",
        }
    }

    /// Unheated space whose `b` depends on the interior/exterior contact area ratio
    pub fn requires_area_ratio(&self) -> bool {
        !matches!(
            self,
            Adjacency::Exterior
                | Adjacency::BuriedWall
                | Adjacency::Crawlspace
                | Adjacency::SlabOnGrade
                | Adjacency::UnheatedBasement
                | Adjacency::NonResidential
                | Adjacency::HeatedSpace
        )
    }

    /// Floors whose transmittance is replaced by the equivalent-perimeter value
    pub fn uses_equivalent_perimeter(&self) -> bool {
        matches!(
            self,
            Adjacency::Crawlspace | Adjacency::SlabOnGrade | Adjacency::UnheatedBasement
        )
    }
}

impl std::fmt::Display for Adjacency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Insulation configuration of an unheated space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LncInsulation {
    NeitherInsulated,
    HeatedSideInsulated,
    UnheatedSideInsulated,
    BothInsulated,
    /// The space cannot be visited; `b` no longer depends on its geometry
    Inaccessible,
}

impl LncInsulation {
    pub fn code(&self) -> &'static str {
        match self {
            LncInsulation::NeitherInsulated => "neither_insulated",
            LncInsulation::HeatedSideInsulated => "heated_side_insulated",
            LncInsulation::UnheatedSideInsulated => "unheated_side_insulated",
            LncInsulation::BothInsulated => "both_insulated",
            LncInsulation::Inaccessible => "inaccessible",
        }
    }
}

/// Geometry and insulation of the unheated space behind an element.
///
/// ```json
/// { "interior_area_m2": 18.0, "exterior_area_m2": 30.0, "insulation": "neither_insulated" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnheatedSpace {
    /// Aiu: area between the heated and the unheated space, m²
    #[serde(default)]
    pub interior_area_m2: Option<f64>,
    /// Aue: area between the unheated space and the exterior, m²
    #[serde(default)]
    pub exterior_area_m2: Option<f64>,
    #[serde(default)]
    pub insulation: Option<LncInsulation>,
}

/// Intermediate data of one element, tagged with its family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Intermediate {
    Wall(WallIntermediate),
    Door(DoorIntermediate),
    LowFloor(LowFloorIntermediate),
    HighFloor(HighFloorIntermediate),
    Window(WindowIntermediate),
    ThermalBridge(ThermalBridgeIntermediate),
}

impl Intermediate {
    pub fn family(&self) -> Family {
        match self {
            Intermediate::Wall(_) => Family::Wall,
            Intermediate::Door(_) => Family::Door,
            Intermediate::LowFloor(_) => Family::LowFloor,
            Intermediate::HighFloor(_) => Family::HighFloor,
            Intermediate::Window(_) => Family::Window,
            Intermediate::ThermalBridge(_) => Family::ThermalBridge,
        }
    }

    /// Contribution to the envelope heat loss, W/K
    pub fn heat_loss(&self) -> f64 {
        match self {
            Intermediate::Wall(i) => i.heat_loss_w_per_k,
            Intermediate::Door(i) => i.heat_loss_w_per_k,
            Intermediate::LowFloor(i) => i.heat_loss_w_per_k,
            Intermediate::HighFloor(i) => i.heat_loss_w_per_k,
            Intermediate::Window(i) => i.heat_loss_w_per_k,
            Intermediate::ThermalBridge(i) => i.heat_loss_w_per_k,
        }
    }

    /// Reduction factor (thermal bridges have none)
    pub fn reduction_factor(&self) -> Option<f64> {
        match self {
            Intermediate::Wall(i) => Some(i.b),
            Intermediate::Door(i) => Some(i.b),
            Intermediate::LowFloor(i) => Some(i.b),
            Intermediate::HighFloor(i) => Some(i.b),
            Intermediate::Window(i) => Some(i.b),
            Intermediate::ThermalBridge(_) => None,
        }
    }

    /// Insulation classification of opaque elements
    pub fn insulation_class(&self) -> Option<InsulationClass> {
        match self {
            Intermediate::Wall(i) => Some(i.insulation_class),
            Intermediate::LowFloor(i) => Some(i.insulation_class),
            Intermediate::HighFloor(i) => Some(i.insulation_class),
            _ => None,
        }
    }
}

/// Everything a calculator may read while computing one element.
pub struct CalcEnv<'a> {
    pub context: &'a Context,
    pub reference: &'a ReferenceData,
    pub dwelling: &'a Dwelling,
    /// Intermediate data of the families already computed
    pub arena: &'a ElementArena,
    pub index: &'a ReferenceIndex,
}

/// Heat-loss calculator for one element family.
pub trait ElementCalculator {
    type Entry;

    const FAMILY: Family;

    /// The family's entries, in dwelling order
    fn entries<'d>(&self, dwelling: &'d Dwelling) -> &'d [Self::Entry];

    /// Intermediate data of one entry
    fn compute(&self, entry: &Self::Entry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Intermediate;

    /// Reduction factor `b`, substituting [`FALLBACK_REDUCTION_FACTOR`] on failure.
    fn reduction_factor(
        &self,
        element: &str,
        adjacency: Adjacency,
        space: Option<&UnheatedSpace>,
        env: &CalcEnv<'_>,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        let input = ReductionInput {
            adjacency,
            space,
            climate_zone: env.context.climate_zone,
        };
        match resolve_reduction_factor(env.reference, &input) {
            Ok(b) => b,
            Err(e) => {
                diagnostics.record(element, &e, FALLBACK_REDUCTION_FACTOR);
                FALLBACK_REDUCTION_FACTOR
            }
        }
    }
}

/// Object-safe view of a calculator, run by the aggregator.
pub trait FamilyPass {
    fn family(&self) -> Family;

    /// Intermediate data of every entry of the family, in dwelling order
    fn run(&self, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Vec<Intermediate>;
}

impl<C: ElementCalculator> FamilyPass for C {
    fn family(&self) -> Family {
        C::FAMILY
    }

    fn run(&self, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Vec<Intermediate> {
        self.entries(env.dwelling)
            .iter()
            .map(|entry| self.compute(entry, env, diagnostics))
            .collect()
    }
}

/// The calculators in aggregation order.
pub fn default_passes() -> Vec<Box<dyn FamilyPass>> {
    vec![
        Box::new(WallCalculator),
        Box::new(DoorCalculator),
        Box::new(LowFloorCalculator),
        Box::new(HighFloorCalculator),
        Box::new(WindowCalculator),
        Box::new(ThermalBridgeCalculator),
    ]
}
