//! # Thermal Bridge Resolver
//!
//! Linear heat loss at the junction of a wall with a floor, a roof, an
//! opening, a partition or an intermediate floor.
//!
//! A bridge names its two neighbours by free text. Both references are looked
//! up in the [`ReferenceIndex`](crate::arena::ReferenceIndex) built before
//! the aggregation pass; the one that is a wall gives the wall side, the other
//! one (when the linkage needs it) the floor, roof, window or door side.
//!
//! ## Resolution
//!
//! 1. A justified `k` is used as entered; if it is missing, the default row.
//! 2. No referenced wall: `k = 0`.
//! 3. Lightweight wall (timber structures), except for openings: `k = 0`.
//! 4. Roof/wall junction under a light roof: `k = 0`.
//! 5. Otherwise `thermal_bridge_k` keyed on the linkage and the two insulation
//!    classifications (plus installation attributes for openings). When that
//!    fails, the default row stored under the entry's or the linkage's identifier.
//!
//! The contribution is `length × k × percentage / 100`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::insulation::InsulationClass;
use super::{CalcEnv, ElementCalculator, Family, Intermediate};
use crate::arena::ElementRecord;
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::reference::{Query, TableName};
use crate::resolver::round_coefficient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    FloorWall,
    RoofWall,
    /// Window or door in a wall
    OpeningWall,
    PartitionWall,
    IntermediateFloorWall,
}

impl Linkage {
    pub const ALL: [Linkage; 5] = [
        Linkage::FloorWall,
        Linkage::RoofWall,
        Linkage::OpeningWall,
        Linkage::PartitionWall,
        Linkage::IntermediateFloorWall,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Linkage::FloorWall => "floor_wall",
            Linkage::RoofWall => "roof_wall",
            Linkage::OpeningWall => "opening_wall",
            Linkage::PartitionWall => "partition_wall",
            Linkage::IntermediateFloorWall => "intermediate_floor_wall",
        }
    }

    /// Identifier of the default row in `thermal_bridge_k`
    pub fn default_id(&self) -> &'static str {
        match self {
            Linkage::FloorWall => "floor_wall_default",
            Linkage::RoofWall => "roof_wall_default",
            Linkage::OpeningWall => "opening_wall_default",
            Linkage::PartitionWall => "partition_wall_default",
            Linkage::IntermediateFloorWall => "intermediate_floor_wall_default",
        }
    }

    /// Whether a lightweight wall cancels the bridge
    pub fn ignores_lightweight_walls(&self) -> bool {
        *self != Linkage::OpeningWall
    }

    /// Families the non-wall side may belong to
    pub fn other_families(&self) -> &'static [Family] {
        match self {
            Linkage::FloorWall => &[Family::LowFloor],
            Linkage::RoofWall => &[Family::HighFloor],
            Linkage::OpeningWall => &[Family::Window, Family::Door],
            Linkage::PartitionWall | Linkage::IntermediateFloorWall => &[],
        }
    }
}

impl std::fmt::Display for Linkage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KMethod {
    #[default]
    Tabulated,
    /// Measured or justified by a detailed study
    Justified,
}

/// Where the coefficient `k` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KSource {
    Justified,
    Tabulated,
    DefaultRow,
    /// Lightweight wall or light roof: no bridge
    Ignored,
    /// No referenced wall
    NoWall,
    /// Neither the table nor the default row resolved
    Unresolved,
}

/// One thermal bridge of the dwelling.
///
/// ```json
/// {
///   "reference": "PT-PLANCHER-NORD",
///   "linkage": "floor_wall",
///   "length_m": 9.5,
///   "reference_1": "MUR-NORD",
///   "reference_2": "PLANCHER-VS"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalBridgeEntry {
    pub reference: String,

    pub linkage: Linkage,

    pub length_m: f64,

    /// Share of the length that actually forms a bridge, % (default 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_2: Option<String>,

    #[serde(default)]
    pub k_method: KMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_value: Option<f64>,

    /// Identifier of the default row, overriding the linkage's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_row: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<ThermalBridgeIntermediate>,
}

impl ThermalBridgeEntry {
    pub fn new(reference: impl Into<String>, linkage: Linkage, length_m: f64) -> Self {
        Self {
            reference: reference.into(),
            linkage,
            length_m,
            percentage: None,
            reference_1: None,
            reference_2: None,
            k_method: KMethod::Tabulated,
            k_value: None,
            default_row: None,
            intermediate: None,
        }
    }

    pub fn between(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.reference_1 = Some(first.into());
        self.reference_2 = Some(second.into());
        self
    }

    fn share(&self) -> f64 {
        self.percentage.unwrap_or(100.0) / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalBridgeIntermediate {
    /// Linear coefficient, W/(m.K)
    pub k: f64,
    pub k_source: KSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_reference: Option<String>,
    pub length_m: f64,
    pub heat_loss_w_per_k: f64,
}

pub struct ThermalBridgeCalculator;

impl ThermalBridgeCalculator {
    /// Referenced elements, in entry order, skipping references that match nothing.
    fn neighbours<'e>(&self, entry: &ThermalBridgeEntry, env: &'e CalcEnv<'_>) -> Vec<&'e ElementRecord> {
        let lenient = env.context.options.lenient_references;
        [&entry.reference_1, &entry.reference_2]
            .into_iter()
            .flatten()
            .filter_map(|text| env.index.resolve(text, lenient))
            .filter_map(|id| env.arena.get(id))
            .collect()
    }

    fn default_k(&self, entry: &ThermalBridgeEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> (f64, KSource) {
        let id = entry
            .default_row
            .as_deref()
            .unwrap_or_else(|| entry.linkage.default_id());
        let table = env.reference.table(TableName::ThermalBridgeK);
        match table.by_id(id).map(|row| row.number("k")) {
            Ok(Some(k)) => {
                debug!(element = %entry.reference, id, k, "default thermal bridge coefficient");
                (k, KSource::DefaultRow)
            }
            Ok(None) => {
                diagnostics.resolution_failure(&entry.reference, format!("default row '{}' has no k", id), 0.0);
                (0.0, KSource::Unresolved)
            }
            Err(e) => {
                diagnostics.record(&entry.reference, &e, 0.0);
                (0.0, KSource::Unresolved)
            }
        }
    }

    /// Insulation class of the floor or roof side, defaulting to interior insulation.
    fn other_class(
        &self,
        entry: &ThermalBridgeEntry,
        other: Option<&ElementRecord>,
        diagnostics: &mut Diagnostics,
    ) -> InsulationClass {
        match other.and_then(|r| r.intermediate.as_ref()).and_then(|i| i.insulation_class()) {
            Some(class) => class,
            None => {
                diagnostics.inconsistency(
                    &entry.reference,
                    format!("no {} side found for linkage '{}'", entry.linkage.other_families()[0], entry.linkage),
                    InsulationClass::Interior.code(),
                );
                InsulationClass::Interior
            }
        }
    }

    fn resolve_k(
        &self,
        entry: &ThermalBridgeEntry,
        env: &CalcEnv<'_>,
        diagnostics: &mut Diagnostics,
    ) -> (f64, KSource, Option<String>, Option<String>) {
        if entry.k_method == KMethod::Justified {
            if let Some(k) = entry.k_value {
                return (k, KSource::Justified, None, None);
            }
            diagnostics.inconsistency(&entry.reference, "justified k requested without a value", "default row");
            let (k, source) = self.default_k(entry, env, diagnostics);
            return (k, source, None, None);
        }

        let neighbours = self.neighbours(entry, env);
        let wall = neighbours.iter().copied().find(|r| r.family == Family::Wall);
        let wall_data = wall.and_then(|r| match &r.intermediate {
            Some(Intermediate::Wall(w)) => Some(w),
            _ => None,
        });
        let (Some(wall), Some(wall_data)) = (wall, wall_data) else {
            diagnostics.inconsistency(
                &entry.reference,
                format!(
                    "no wall matches {:?} / {:?}",
                    entry.reference_1.as_deref().unwrap_or(""),
                    entry.reference_2.as_deref().unwrap_or("")
                ),
                0.0,
            );
            return (0.0, KSource::NoWall, None, None);
        };
        let wall_reference = Some(wall.reference.clone());

        let other_families = entry.linkage.other_families();
        let other = neighbours
            .iter()
            .copied()
            .find(|r| r.id != wall.id && other_families.contains(&r.family));
        let other_reference = other.map(|r| r.reference.clone());

        if entry.linkage.ignores_lightweight_walls() && wall_data.material.is_lightweight() {
            debug!(element = %entry.reference, wall = %wall.reference, material = %wall_data.material, "lightweight wall, no thermal bridge");
            return (0.0, KSource::Ignored, wall_reference, other_reference);
        }

        let mut query = Query::new()
            .eq("linkage", entry.linkage.code())
            .eq("wall_insulation", wall_data.insulation_class.code());

        match entry.linkage {
            Linkage::FloorWall => {
                let class = self.other_class(entry, other, diagnostics);
                query = query.eq("other_insulation", class.code());
            }
            Linkage::RoofWall => {
                if let Some(Intermediate::HighFloor(roof)) = other.and_then(|r| r.intermediate.as_ref()) {
                    if !roof.heavy {
                        debug!(element = %entry.reference, "light roof, no thermal bridge");
                        return (0.0, KSource::Ignored, wall_reference, other_reference);
                    }
                }
                let class = self.other_class(entry, other, diagnostics);
                query = query.eq("other_insulation", class.code());
            }
            Linkage::OpeningWall => {
                let installation = other.and_then(|r| match r.family {
                    Family::Window => env.dwelling.windows.get(r.position).and_then(|w| w.installation),
                    Family::Door => env.dwelling.doors.get(r.position).and_then(|d| d.installation),
                    _ => None,
                });
                match installation {
                    Some(install) => {
                        query = query
                            .eq("pose", install.pose.code())
                            .eq("insulation_return", install.insulation_return)
                            .eq("frame_width_cm", install.snapped_frame_width_cm());
                    }
                    None => diagnostics.inconsistency(
                        &entry.reference,
                        "opening installation unknown",
                        "first row of the wall insulation class",
                    ),
                }
            }
            Linkage::PartitionWall | Linkage::IntermediateFloorWall => {}
        }

        match env.reference.table(TableName::ThermalBridgeK).value(&query, "k") {
            Ok(k) => (k, KSource::Tabulated, wall_reference, other_reference),
            Err(e) => {
                diagnostics.record(&entry.reference, &e, "default row");
                let (k, source) = self.default_k(entry, env, diagnostics);
                (k, source, wall_reference, other_reference)
            }
        }
    }
}

impl ElementCalculator for ThermalBridgeCalculator {
    type Entry = ThermalBridgeEntry;

    const FAMILY: Family = Family::ThermalBridge;

    fn entries<'d>(&self, dwelling: &'d Dwelling) -> &'d [ThermalBridgeEntry] {
        &dwelling.thermal_bridges
    }

    fn compute(&self, entry: &ThermalBridgeEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Intermediate {
        let (k, k_source, wall_reference, other_reference) = self.resolve_k(entry, env, diagnostics);
        let k = round_coefficient(k);

        Intermediate::ThermalBridge(ThermalBridgeIntermediate {
            k,
            k_source,
            wall_reference,
            other_reference,
            length_m: entry.length_m,
            heat_loss_w_per_k: entry.length_m * k * entry.share(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::EnvelopeAggregator;
    use crate::context::{ConstructionPeriod, Context};
    use crate::elements::door::{Installation, Pose};
    use crate::elements::high_floor::{HighFloorEntry, HighFloorMaterial};
    use crate::elements::insulation::{InsulationInput, InsulationPosition};
    use crate::elements::low_floor::LowFloorEntry;
    use crate::elements::wall::{WallEntry, WallMaterial};
    use crate::elements::window::{Pane, WindowEntry};
    use crate::elements::Adjacency;
    use crate::reference::ReferenceData;

    fn dwelling() -> Dwelling {
        let mut dwelling = Dwelling::new(Context::new(ConstructionPeriod::From1948To1974, 100.0, 2.5));

        let mut wall = WallEntry::new("Mur Nord", 20.0, WallMaterial::SolidBrick);
        wall.insulation = InsulationInput::Thickness { thickness_cm: Some(8.0) };
        wall.insulation_position = Some(InsulationPosition::Interior);
        dwelling.walls.push(wall);

        let mut timber = WallEntry::new("MUR-BOIS", 15.0, WallMaterial::TimberFrame);
        timber.insulation = InsulationInput::NotInsulated;
        dwelling.walls.push(timber);

        let mut floor = LowFloorEntry::new("PLANCHER", 60.0, Adjacency::HeatedSpace);
        floor.insulation = InsulationInput::NotInsulated;
        dwelling.low_floors.push(floor);

        let mut light_roof = HighFloorEntry::new("TOIT-BOIS", 60.0, HighFloorMaterial::TimberRafters);
        light_roof.insulation = InsulationInput::NotInsulated;
        dwelling.high_floors.push(light_roof);

        let mut window = WindowEntry::new("FEN-1", 1.5, Pane::default());
        window.installation = Some(Installation {
            pose: Pose::Tunnel,
            insulation_return: false,
            frame_width_cm: 9.0,
        });
        dwelling.windows.push(window);

        dwelling
    }

    fn bridge_result(dwelling: &Dwelling, bridge: ThermalBridgeEntry) -> (ThermalBridgeIntermediate, usize) {
        let mut dwelling = dwelling.clone();
        dwelling.thermal_bridges.push(bridge);
        let result = EnvelopeAggregator::new(ReferenceData::builtin().unwrap()).compute(&dwelling);
        let outcome = result
            .elements
            .iter()
            .find(|e| e.family == Family::ThermalBridge)
            .unwrap();
        match &outcome.intermediate {
            Intermediate::ThermalBridge(t) => (t.clone(), result.diagnostics.for_element("PT").count()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_floor_wall_tabulated() {
        let bridge = ThermalBridgeEntry::new("PT", Linkage::FloorWall, 10.0).between("Mur Nord", "PLANCHER");
        let (t, diagnostics) = bridge_result(&dwelling(), bridge);
        // interior-insulated wall, non-insulated floor
        assert_eq!(t.k, 0.47);
        assert_eq!(t.k_source, KSource::Tabulated);
        assert_eq!(t.wall_reference.as_deref(), Some("Mur Nord"));
        assert_eq!(t.other_reference.as_deref(), Some("PLANCHER"));
        assert!((t.heat_loss_w_per_k - 4.7).abs() < 1e-9);
        assert_eq!(diagnostics, 0);
    }

    #[test]
    fn test_references_are_order_independent_and_lenient() {
        let bridge = ThermalBridgeEntry::new("PT", Linkage::FloorWall, 10.0).between("plancher", "  mur nord ");
        let (t, _) = bridge_result(&dwelling(), bridge);
        assert_eq!(t.k, 0.47);

        let mut strict = dwelling();
        strict.context.options.lenient_references = false;
        let bridge = ThermalBridgeEntry::new("PT", Linkage::FloorWall, 10.0).between("plancher", "  mur nord ");
        let (t, diagnostics) = bridge_result(&strict, bridge);
        assert_eq!(t.k, 0.0);
        assert_eq!(t.k_source, KSource::NoWall);
        assert_eq!(diagnostics, 1);
    }

    #[test]
    fn test_lightweight_wall_ignored_for_every_eligible_linkage() {
        for linkage in Linkage::ALL.iter().filter(|l| l.ignores_lightweight_walls()) {
            let bridge = ThermalBridgeEntry::new("PT", *linkage, 10.0).between("MUR-BOIS", "PLANCHER");
            let (t, _) = bridge_result(&dwelling(), bridge);
            assert_eq!(t.k, 0.0, "{}", linkage);
            assert_eq!(t.heat_loss_w_per_k, 0.0);
            assert_eq!(t.k_source, KSource::Ignored);
        }
    }

    #[test]
    fn test_light_roof_ignored() {
        let bridge = ThermalBridgeEntry::new("PT", Linkage::RoofWall, 10.0).between("Mur Nord", "TOIT-BOIS");
        let (t, _) = bridge_result(&dwelling(), bridge);
        assert_eq!(t.k, 0.0);
        assert_eq!(t.k_source, KSource::Ignored);
    }

    #[test]
    fn test_opening_uses_installation() {
        let bridge = ThermalBridgeEntry::new("PT", Linkage::OpeningWall, 5.0).between("FEN-1", "Mur Nord");
        let (t, _) = bridge_result(&dwelling(), bridge);
        // interior insulation, tunnel, no return, frame snapped to 10 cm
        assert_eq!(t.k, 0.38);
        assert_eq!(t.other_reference.as_deref(), Some("FEN-1"));
    }

    #[test]
    fn test_justified_value_and_missing_value() {
        let mut bridge = ThermalBridgeEntry::new("PT", Linkage::PartitionWall, 4.0);
        bridge.k_method = KMethod::Justified;
        bridge.k_value = Some(0.12);
        let (t, _) = bridge_result(&dwelling(), bridge.clone());
        assert_eq!(t.k, 0.12);
        assert_eq!(t.k_source, KSource::Justified);

        bridge.k_value = None;
        let (t, diagnostics) = bridge_result(&dwelling(), bridge);
        assert_eq!(t.k, 0.73);
        assert_eq!(t.k_source, KSource::DefaultRow);
        assert_eq!(diagnostics, 1);
    }

    #[test]
    fn test_percentage() {
        let mut bridge = ThermalBridgeEntry::new("PT", Linkage::PartitionWall, 10.0).between("Mur Nord", "x");
        bridge.percentage = Some(50.0);
        let (t, _) = bridge_result(&dwelling(), bridge);
        assert_eq!(t.k, 0.73);
        assert!((t.heat_loss_w_per_k - 3.65).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_wall_gives_zero() {
        let bridge = ThermalBridgeEntry::new("PT", Linkage::FloorWall, 10.0).between("MUR-SUD", "PLANCHER");
        let (t, diagnostics) = bridge_result(&dwelling(), bridge);
        assert_eq!(t.k, 0.0);
        assert_eq!(t.k_source, KSource::NoWall);
        assert_eq!(diagnostics, 1);
    }
}
