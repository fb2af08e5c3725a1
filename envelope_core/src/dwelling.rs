//! # Dwelling
//!
//! The `Dwelling` is the caller-supplied record the engine reads: the context
//! plus one ordered list of entries per element family. After a computation,
//! [`EnvelopeResult::attach_to`](crate::aggregator::EnvelopeResult::attach_to)
//! writes each element's intermediate data back onto its entry.
//!
//! ## Structure
//!
//! ```text
//! Dwelling
//! ├── context: Context (zone, period, Sh, Hsp, options)
//! ├── walls / doors / low_floors / high_floors / windows: envelope elements
//! ├── thermal_bridges: linear junctions, referencing elements by text
//! └── ventilations: ventilation installations
//! ```

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::elements::{
    DoorEntry, Family, HighFloorEntry, LowFloorEntry, ThermalBridgeEntry, WallEntry, WindowEntry,
};
use crate::errors::{CalcError, CalcResult};
use crate::ventilation::VentilationEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dwelling {
    pub context: Context,

    #[serde(default)]
    pub walls: Vec<WallEntry>,

    #[serde(default)]
    pub doors: Vec<DoorEntry>,

    #[serde(default)]
    pub low_floors: Vec<LowFloorEntry>,

    #[serde(default)]
    pub high_floors: Vec<HighFloorEntry>,

    #[serde(default)]
    pub windows: Vec<WindowEntry>,

    #[serde(default)]
    pub thermal_bridges: Vec<ThermalBridgeEntry>,

    #[serde(default)]
    pub ventilations: Vec<VentilationEntry>,
}

impl Dwelling {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            walls: Vec::new(),
            doors: Vec::new(),
            low_floors: Vec::new(),
            high_floors: Vec::new(),
            windows: Vec::new(),
            thermal_bridges: Vec::new(),
            ventilations: Vec::new(),
        }
    }

    /// Text references of one family, in dwelling order
    pub fn references(&self, family: Family) -> Vec<&str> {
        match family {
            Family::Wall => self.walls.iter().map(|e| e.reference.as_str()).collect(),
            Family::Door => self.doors.iter().map(|e| e.reference.as_str()).collect(),
            Family::LowFloor => self.low_floors.iter().map(|e| e.reference.as_str()).collect(),
            Family::HighFloor => self.high_floors.iter().map(|e| e.reference.as_str()).collect(),
            Family::Window => self.windows.iter().map(|e| e.reference.as_str()).collect(),
            Family::ThermalBridge => self.thermal_bridges.iter().map(|e| e.reference.as_str()).collect(),
        }
    }

    pub fn element_count(&self) -> usize {
        Family::ALL.iter().map(|f| self.references(*f).len()).sum()
    }

    /// Structural checks the engine does not recover from.
    pub fn validate(&self) -> CalcResult<()> {
        if self.context.habitable_surface_m2 <= 0.0 {
            return Err(CalcError::invalid_input(
                "context.habitable_surface_m2",
                self.context.habitable_surface_m2.to_string(),
                "Habitable surface must be positive",
            ));
        }
        if self.context.ceiling_height_m <= 0.0 {
            return Err(CalcError::invalid_input(
                "context.ceiling_height_m",
                self.context.ceiling_height_m.to_string(),
                "Ceiling height must be positive",
            ));
        }

        let areas = self
            .walls
            .iter()
            .map(|e| ("walls", &e.reference, e.area_m2))
            .chain(self.doors.iter().map(|e| ("doors", &e.reference, e.area_m2)))
            .chain(self.low_floors.iter().map(|e| ("low_floors", &e.reference, e.area_m2)))
            .chain(self.high_floors.iter().map(|e| ("high_floors", &e.reference, e.area_m2)))
            .chain(self.windows.iter().map(|e| ("windows", &e.reference, e.area_m2)));
        for (family, reference, area) in areas {
            if !(area >= 0.0) {
                return Err(CalcError::invalid_input(
                    format!("{}[{}].area_m2", family, reference),
                    area.to_string(),
                    "Area cannot be negative",
                ));
            }
        }

        for floor in &self.low_floors {
            if let Some(perimeter) = floor.perimeter_m {
                if perimeter < 0.0 {
                    return Err(CalcError::invalid_input(
                        format!("low_floors[{}].perimeter_m", floor.reference),
                        perimeter.to_string(),
                        "Perimeter cannot be negative",
                    ));
                }
            }
        }

        for bridge in &self.thermal_bridges {
            if !(bridge.length_m >= 0.0) {
                return Err(CalcError::invalid_input(
                    format!("thermal_bridges[{}].length_m", bridge.reference),
                    bridge.length_m.to_string(),
                    "Length cannot be negative",
                ));
            }
            if let Some(pct) = bridge.percentage {
                if !(0.0..=100.0).contains(&pct) {
                    return Err(CalcError::invalid_input(
                        format!("thermal_bridges[{}].percentage", bridge.reference),
                        pct.to_string(),
                        "Percentage must be between 0 and 100",
                    ));
                }
            }
        }

        Ok(())
    }
}
