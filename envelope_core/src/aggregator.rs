//! # Envelope Aggregator
//!
//! One dwelling computation, in a single ordered pass:
//!
//! ```text
//! reset statistics
//!   → walls → doors → low floors → high floors → windows → thermal bridges
//!   → ventilation (from the final statistics)
//!   → total = Σ family subtotals + Hvent + Hperm
//! ```
//!
//! Each family pass reads an immutable view of the arena, so a calculator only
//! ever sees the families committed before it. The pass results are then
//! committed to the arena and folded into the surface statistics and the
//! family subtotals.
//!
//! ## Example
//!
//! ```rust
//! use envelope_core::aggregator::EnvelopeAggregator;
//! use envelope_core::context::{ConstructionPeriod, Context};
//! use envelope_core::dwelling::Dwelling;
//! use envelope_core::elements::{InsulationInput, WallEntry};
//! use envelope_core::elements::wall::WallMaterial;
//! use envelope_core::reference::ReferenceData;
//!
//! let mut dwelling = Dwelling::new(Context::new(ConstructionPeriod::From1948To1974, 80.0, 2.5));
//! let mut wall = WallEntry::new("M1", 10.0, WallMaterial::ConcreteBlock);
//! wall.insulation = InsulationInput::Direct { u_value: Some(0.5) };
//! dwelling.walls.push(wall);
//!
//! let reference = ReferenceData::builtin().unwrap();
//! let result = EnvelopeAggregator::new(reference).compute(&dwelling);
//! assert_eq!(result.subtotals.walls, 5.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::arena::{ElementArena, ElementId, ReferenceIndex};
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::elements::{default_passes, CalcEnv, Family, FamilyPass, Intermediate};
use crate::reference::ReferenceData;
use crate::statistics::SurfaceStatistics;
use crate::ventilation::{VentilationCalculator, VentilationResult};

/// Heat loss per family, W/K.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FamilySubtotals {
    pub walls: f64,
    pub doors: f64,
    pub low_floors: f64,
    pub high_floors: f64,
    pub windows: f64,
    pub thermal_bridges: f64,
    /// `Hvent + Hperm`
    pub ventilation: f64,
}

impl FamilySubtotals {
    fn slot(&mut self, family: Family) -> &mut f64 {
        match family {
            Family::Wall => &mut self.walls,
            Family::Door => &mut self.doors,
            Family::LowFloor => &mut self.low_floors,
            Family::HighFloor => &mut self.high_floors,
            Family::Window => &mut self.windows,
            Family::ThermalBridge => &mut self.thermal_bridges,
        }
    }

    pub fn add(&mut self, family: Family, heat_loss: f64) {
        *self.slot(family) += heat_loss;
    }

    pub fn get(&self, family: Family) -> f64 {
        match family {
            Family::Wall => self.walls,
            Family::Door => self.doors,
            Family::LowFloor => self.low_floors,
            Family::HighFloor => self.high_floors,
            Family::Window => self.windows,
            Family::ThermalBridge => self.thermal_bridges,
        }
    }

    /// Transmission losses of the envelope, without ventilation
    pub fn envelope(&self) -> f64 {
        Family::ALL.iter().map(|f| self.get(*f)).sum()
    }
}

/// Intermediate data of one element, with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementOutcome {
    pub id: ElementId,
    pub family: Family,
    pub position: usize,
    pub reference: String,
    pub intermediate: Intermediate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeResult {
    /// In aggregation order
    pub elements: Vec<ElementOutcome>,
    pub subtotals: FamilySubtotals,
    pub statistics: SurfaceStatistics,
    pub ventilation: VentilationResult,
    /// Envelope plus ventilation losses, W/K
    pub total_w_per_k: f64,
    pub reference_version: String,
    pub diagnostics: Diagnostics,
}

impl EnvelopeResult {
    pub fn element(&self, family: Family, position: usize) -> Option<&ElementOutcome> {
        self.elements
            .iter()
            .find(|e| e.family == family && e.position == position)
    }

    /// Write each element's intermediate data onto the matching entry of `dwelling`.
    pub fn attach_to(&self, dwelling: &mut Dwelling) {
        for outcome in &self.elements {
            let position = outcome.position;
            let attached = match &outcome.intermediate {
                Intermediate::Wall(i) => dwelling.walls.get_mut(position).map(|e| e.intermediate = Some(i.clone())),
                Intermediate::Door(i) => dwelling.doors.get_mut(position).map(|e| e.intermediate = Some(i.clone())),
                Intermediate::LowFloor(i) => dwelling
                    .low_floors
                    .get_mut(position)
                    .map(|e| e.intermediate = Some(i.clone())),
                Intermediate::HighFloor(i) => dwelling
                    .high_floors
                    .get_mut(position)
                    .map(|e| e.intermediate = Some(i.clone())),
                Intermediate::Window(i) => dwelling.windows.get_mut(position).map(|e| e.intermediate = Some(i.clone())),
                Intermediate::ThermalBridge(i) => dwelling
                    .thermal_bridges
                    .get_mut(position)
                    .map(|e| e.intermediate = Some(i.clone())),
            };
            if attached.is_none() {
                warn!(element = %outcome.reference, family = %outcome.family, position, "no entry to attach to");
            }
        }
    }
}

pub struct EnvelopeAggregator<'r> {
    reference: &'r ReferenceData,
    passes: Vec<Box<dyn FamilyPass>>,
}

impl<'r> EnvelopeAggregator<'r> {
    pub fn new(reference: &'r ReferenceData) -> Self {
        Self {
            reference,
            passes: default_passes(),
        }
    }

    pub fn compute(&self, dwelling: &Dwelling) -> EnvelopeResult {
        let mut arena = ElementArena::from_dwelling(dwelling);
        let index = ReferenceIndex::build(&arena);
        let mut diagnostics = Diagnostics::new();
        let mut statistics = SurfaceStatistics::new();
        let mut subtotals = FamilySubtotals::default();

        for pass in &self.passes {
            let family = pass.family();
            let computed = {
                let env = CalcEnv {
                    context: &dwelling.context,
                    reference: self.reference,
                    dwelling,
                    arena: &arena,
                    index: &index,
                };
                pass.run(&env, &mut diagnostics)
            };

            for (position, intermediate) in computed.into_iter().enumerate() {
                statistics.record(&intermediate);
                subtotals.add(family, intermediate.heat_loss());
                let committed = arena
                    .id_of(family, position)
                    .map(|id| arena.set(id, intermediate));
                match committed {
                    Some(Ok(())) => {}
                    Some(Err(e)) => warn!(family = %family, position, error = %e, "element not committed"),
                    None => warn!(family = %family, position, "element missing from arena"),
                }
            }
            debug!(family = %family, subtotal = subtotals.get(family), "family committed");
        }

        let ventilation = VentilationCalculator::new(self.reference, &dwelling.context).compute(
            &dwelling.ventilations,
            &statistics,
            &mut diagnostics,
        );
        subtotals.ventilation = ventilation.total();
        let total_w_per_k = subtotals.envelope() + ventilation.total();

        let elements = arena
            .records()
            .iter()
            .filter_map(|record| {
                record.intermediate.clone().map(|intermediate| ElementOutcome {
                    id: record.id,
                    family: record.family,
                    position: record.position,
                    reference: record.reference.clone(),
                    intermediate,
                })
            })
            .collect();

        debug!(
            total_w_per_k,
            elements = arena.len(),
            diagnostics = diagnostics.len(),
            "envelope computed"
        );

        EnvelopeResult {
            elements,
            subtotals,
            statistics,
            ventilation,
            total_w_per_k,
            reference_version: self.reference.version().to_string(),
            diagnostics,
        }
    }
}
