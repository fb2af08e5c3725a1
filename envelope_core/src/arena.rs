//! # Element Arena
//!
//! Every element instance of a dwelling gets one record with a stable integer
//! id. Calculators read earlier results from the arena instead of from the
//! caller's structures, and thermal bridges find their neighbours through a
//! [`ReferenceIndex`] built once per computation.
//!
//! Ids follow aggregation order: all walls, then doors, low floors, high
//! floors, windows and thermal bridges, each family in dwelling order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dwelling::Dwelling;
use crate::elements::{Family, Intermediate};
use crate::errors::{CalcError, CalcResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub id: ElementId,
    pub family: Family,
    /// Position in the family's list of the dwelling
    pub position: usize,
    pub reference: String,
    /// Set once, when the family's pass commits
    pub intermediate: Option<Intermediate>,
}

#[derive(Debug, Clone, Default)]
pub struct ElementArena {
    records: Vec<ElementRecord>,
    positions: HashMap<(Family, usize), ElementId>,
}

impl ElementArena {
    pub fn from_dwelling(dwelling: &Dwelling) -> Self {
        let mut arena = Self::default();
        for family in Family::ALL {
            for (position, reference) in dwelling.references(family).into_iter().enumerate() {
                arena.push(family, position, reference);
            }
        }
        arena
    }

    fn push(&mut self, family: Family, position: usize, reference: &str) {
        let id = ElementId(self.records.len() as u32);
        self.records.push(ElementRecord {
            id,
            family,
            position,
            reference: reference.to_string(),
            intermediate: None,
        });
        self.positions.insert((family, position), id);
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementRecord> {
        self.records.get(id.index())
    }

    pub fn id_of(&self, family: Family, position: usize) -> Option<ElementId> {
        self.positions.get(&(family, position)).copied()
    }

    /// Store the intermediate data of a record. A record is written at most once.
    pub fn set(&mut self, id: ElementId, intermediate: Intermediate) -> CalcResult<()> {
        let record = self
            .records
            .get_mut(id.index())
            .ok_or_else(|| CalcError::internal(format!("no element {}", id)))?;
        if record.family != intermediate.family() {
            return Err(CalcError::internal(format!(
                "element {} is a {}, got {} data",
                id,
                record.family,
                intermediate.family()
            )));
        }
        if record.intermediate.is_some() {
            return Err(CalcError::internal(format!("element {} already computed", id)));
        }
        record.intermediate = Some(intermediate);
        Ok(())
    }

    pub fn records(&self) -> &[ElementRecord] {
        &self.records
    }

    pub fn family(&self, family: Family) -> impl Iterator<Item = &ElementRecord> {
        self.records.iter().filter(move |r| r.family == family)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize(reference: &str) -> String {
    reference.trim().to_lowercase()
}

/// Text reference to element id, exact and normalized.
///
/// Thermal bridges are not registered: nothing references a bridge.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    exact: HashMap<String, ElementId>,
    normalized: HashMap<String, ElementId>,
}

impl ReferenceIndex {
    pub fn build(arena: &ElementArena) -> Self {
        let mut index = Self::default();
        for record in arena.records() {
            if record.family == Family::ThermalBridge {
                continue;
            }
            if index.exact.contains_key(&record.reference) {
                debug!(reference = %record.reference, id = %record.id, "duplicate reference, first element kept");
                continue;
            }
            index.exact.insert(record.reference.clone(), record.id);
            index.normalized.entry(normalize(&record.reference)).or_insert(record.id);
        }
        index
    }

    /// Element named by `reference`; with `lenient`, ignoring case and surrounding spaces.
    pub fn resolve(&self, reference: &str, lenient: bool) -> Option<ElementId> {
        if let Some(id) = self.exact.get(reference) {
            return Some(*id);
        }
        if lenient {
            return self.normalized.get(&normalize(reference)).copied();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConstructionPeriod, Context};
    use crate::elements::door::{DoorEntry, DoorType};
    use crate::elements::thermal_bridge::{Linkage, ThermalBridgeEntry};
    use crate::elements::wall::{WallEntry, WallMaterial};

    fn dwelling() -> Dwelling {
        let mut dwelling = Dwelling::new(Context::new(ConstructionPeriod::Before1948, 50.0, 2.5));
        dwelling.walls.push(WallEntry::new("Mur Nord", 10.0, WallMaterial::StoneRubble));
        dwelling.walls.push(WallEntry::new("MUR NORD", 12.0, WallMaterial::StoneRubble));
        dwelling.doors.push(DoorEntry::new("Porte", 2.0, DoorType::WoodSolid));
        dwelling
            .thermal_bridges
            .push(ThermalBridgeEntry::new("Porte", Linkage::OpeningWall, 5.0));
        dwelling
    }

    #[test]
    fn test_ids_follow_family_order() {
        let arena = ElementArena::from_dwelling(&dwelling());
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.id_of(Family::Wall, 1), Some(ElementId(1)));
        assert_eq!(arena.id_of(Family::Door, 0), Some(ElementId(2)));
        assert_eq!(arena.id_of(Family::ThermalBridge, 0), Some(ElementId(3)));
        assert_eq!(arena.id_of(Family::Window, 0), None);
        assert_eq!(arena.id_of(Family::Wall, 2), None);
    }

    #[test]
    fn test_id_of_matches_records() {
        let mut dwelling = dwelling();
        for i in 0..50 {
            dwelling.doors.push(DoorEntry::new(format!("P{}", i), 2.0, DoorType::WoodSolid));
        }
        let arena = ElementArena::from_dwelling(&dwelling);
        for record in arena.records() {
            assert_eq!(arena.id_of(record.family, record.position), Some(record.id));
        }
        assert_eq!(arena.id_of(Family::Door, 50), Some(ElementId(52)));
    }

    #[test]
    fn test_exact_then_normalized() {
        let arena = ElementArena::from_dwelling(&dwelling());
        let index = ReferenceIndex::build(&arena);
        assert_eq!(index.resolve("MUR NORD", false), Some(ElementId(1)));
        // first registration wins for the normalized form
        assert_eq!(index.resolve(" mur nord", true), Some(ElementId(0)));
        assert_eq!(index.resolve(" mur nord", false), None);
        // the bridge shares the door's reference but is not registered
        assert_eq!(index.resolve("Porte", false), Some(ElementId(2)));
    }

    #[test]
    fn test_set_once() {
        let mut arena = ElementArena::from_dwelling(&dwelling());
        let door = crate::elements::door::DoorIntermediate {
            area_m2: 2.0,
            u: 3.5,
            b: 1.0,
            weatherstripped: false,
            heat_loss_w_per_k: 7.0,
        };
        assert!(arena.set(ElementId(0), Intermediate::Door(door.clone())).is_err());
        assert!(arena.set(ElementId(2), Intermediate::Door(door.clone())).is_ok());
        assert!(arena.set(ElementId(2), Intermediate::Door(door)).is_err());
        assert!(arena.get(ElementId(2)).unwrap().intermediate.is_some());
    }
}
