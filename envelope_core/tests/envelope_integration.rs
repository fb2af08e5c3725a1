//! End-to-end computations of complete dwellings.

use std::fs;
use std::path::PathBuf;

use envelope_core::context::{ConstructionPeriod, Context};
use envelope_core::elements::high_floor::{HighFloorEntry, HighFloorMaterial};
use envelope_core::elements::low_floor::{LowFloorEntry, LowFloorMaterial};
use envelope_core::elements::thermal_bridge::KSource;
use envelope_core::elements::wall::{WallEntry, WallMaterial};
use envelope_core::elements::{Adjacency, Family, InsulationInput, Intermediate, LncInsulation, UnheatedSpace};
use envelope_core::reference::{TableName, BUILTIN_TABLES};
use envelope_core::{compute_envelope, Dwelling, EnvelopeAggregator, ReferenceData};

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../envelope_cli/samples/detached_house_1960.json")
}

fn sample_dwelling() -> Dwelling {
    let source = fs::read_to_string(sample_path()).expect("read sample dwelling");
    serde_json::from_str(&source).expect("parse sample dwelling")
}

fn context() -> Context {
    Context::new(ConstructionPeriod::From1948To1974, 90.0, 2.5)
}

#[test]
fn test_single_wall_contributes_exactly_five() {
    let mut dwelling = Dwelling::new(context());
    let mut wall = WallEntry::new("M1", 10.0, WallMaterial::PouredConcrete);
    wall.insulation = InsulationInput::Direct { u_value: Some(0.5) };
    dwelling.walls.push(wall);

    let result = compute_envelope(&dwelling).unwrap();
    assert_eq!(result.subtotals.walls, 5.0);
    assert!((result.total_w_per_k - (5.0 + result.ventilation.total())).abs() < 1e-9);
}

#[test]
fn test_total_is_sum_of_subtotals_plus_ventilation() {
    let result = compute_envelope(&sample_dwelling()).unwrap();
    let families: f64 = Family::ALL.iter().map(|f| result.subtotals.get(*f)).sum();
    let expected = families + result.ventilation.hvent + result.ventilation.hperm;
    assert!((result.total_w_per_k - expected).abs() < 1e-9);
    assert_eq!(result.subtotals.ventilation, result.ventilation.total());
}

#[test]
fn test_independent_clones_give_identical_results() {
    let dwelling = sample_dwelling();
    let first = compute_envelope(&dwelling.clone()).unwrap();
    let second = compute_envelope(&dwelling.clone()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_slab_siblings_use_combined_ratio() {
    let mut dwelling = Dwelling::new(context());
    for (reference, area, perimeter) in [("D1", 25.0, 12.0), ("D2", 15.0, 8.0)] {
        let mut floor = LowFloorEntry::new(reference, area, Adjacency::SlabOnGrade);
        floor.perimeter_m = Some(perimeter);
        floor.material = LowFloorMaterial::ConcreteSlab;
        floor.insulation = InsulationInput::NotInsulated;
        dwelling.low_floors.push(floor);
    }

    let result = compute_envelope(&dwelling).unwrap();
    for position in 0..2 {
        match &result.element(Family::LowFloor, position).unwrap().intermediate {
            Intermediate::LowFloor(f) => assert_eq!(f.equivalent.unwrap().ratio_bucket, 4.0),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_zero_exterior_area_cancels_loss() {
    let mut dwelling = Dwelling::new(context());
    let mut wall = WallEntry::new("M-CELLIER", 8.0, WallMaterial::HollowBrick);
    wall.adjacency = Adjacency::Cellar;
    wall.unheated_space = Some(UnheatedSpace {
        interior_area_m2: Some(8.0),
        exterior_area_m2: None,
        insulation: Some(LncInsulation::NeitherInsulated),
    });
    dwelling.walls.push(wall);

    let result = compute_envelope(&dwelling).unwrap();
    assert_eq!(result.subtotals.walls, 0.0);
    assert_eq!(result.statistics.deperditive_area_m2, 0.0);
    match &result.elements[0].intermediate {
        Intermediate::Wall(w) => assert_eq!(w.b, 0.0),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_not_insulated_keeps_base_for_every_opaque_family() {
    let mut dwelling = Dwelling::new(context());
    let mut wall = WallEntry::new("M", 10.0, WallMaterial::StoneRubble);
    wall.insulation = InsulationInput::NotInsulated;
    dwelling.walls.push(wall);
    let mut floor = LowFloorEntry::new("P", 10.0, Adjacency::UnheatedBasement);
    floor.insulation = InsulationInput::NotInsulated;
    floor.material = LowFloorMaterial::TimberJoists;
    dwelling.low_floors.push(floor);
    let mut roof = HighFloorEntry::new("T", 10.0, HighFloorMaterial::TimberJoists);
    roof.insulation = InsulationInput::NotInsulated;
    dwelling.high_floors.push(roof);

    let result = compute_envelope(&dwelling).unwrap();
    for outcome in &result.elements {
        match &outcome.intermediate {
            Intermediate::Wall(w) => assert_eq!(w.u, w.u0),
            Intermediate::LowFloor(f) => assert_eq!(f.upb, f.u0),
            Intermediate::HighFloor(h) => assert_eq!(h.u, h.u0),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn test_sample_thermal_bridges() {
    let result = compute_envelope(&sample_dwelling()).unwrap();
    let k: Vec<(f64, KSource)> = result
        .elements
        .iter()
        .filter_map(|e| match &e.intermediate {
            Intermediate::ThermalBridge(t) => Some((t.k, t.k_source)),
            _ => None,
        })
        .collect();

    assert_eq!(
        k,
        vec![
            // uninsulated wall, uninsulated slab
            (0.39, KSource::Tabulated),
            // interior-insulated wall, exterior-insulated heavy ceiling
            (0.75, KSource::Tabulated),
            // tunnel pose, no return, 7 cm frame snapped to 5 cm
            (0.43, KSource::Tabulated),
            (0.73, KSource::Tabulated),
        ]
    );
    let partition = result.element(Family::ThermalBridge, 3).unwrap();
    assert!((partition.intermediate.heat_loss() - 2.5 * 0.73 * 0.5).abs() < 1e-9);
}

#[test]
fn test_sample_attaches_to_every_entry() {
    let mut dwelling = sample_dwelling();
    let result = compute_envelope(&dwelling).unwrap();
    assert_eq!(result.elements.len(), dwelling.element_count());

    result.attach_to(&mut dwelling);
    assert!(dwelling.walls.iter().all(|w| w.intermediate.is_some()));
    assert!(dwelling.windows.iter().all(|w| w.intermediate.is_some()));
    assert!(dwelling.thermal_bridges.iter().all(|t| t.intermediate.is_some()));

    let json = serde_json::to_value(&dwelling).unwrap();
    assert_eq!(json["walls"][0]["intermediate"]["material"], "solid_brick");
    assert!(json["doors"][0]["intermediate"]["u"].is_number());
}

#[test]
fn test_sample_statistics() {
    let result = compute_envelope(&sample_dwelling()).unwrap();
    let stats = result.statistics;
    // walls 24.5 + 18 + 12, door 2, ceiling 92, windows 2.4 + 1.2
    assert!((stats.deperditive_area_m2 - 152.1).abs() < 1e-9);
    assert!((stats.weatherstripped_area_m2 - 4.4).abs() < 1e-9);
    assert!((stats.non_weatherstripped_area_m2 - 1.2).abs() < 1e-9);
    // concrete block wall of unknown insulation, built before 1975
    assert!((stats.non_insulated_area_m2 - (24.5 + 12.0 + 92.0)).abs() < 1e-9);
    assert!((stats.insulated_area_m2 - (18.0 + 92.0)).abs() < 1e-9);
}

#[test]
fn test_strict_references_drop_case_folded_bridge() {
    let mut dwelling = sample_dwelling();
    dwelling.context.options.lenient_references = false;
    let result = compute_envelope(&dwelling).unwrap();
    match &result.element(Family::ThermalBridge, 1).unwrap().intermediate {
        Intermediate::ThermalBridge(t) => {
            assert_eq!(t.k, 0.0);
            assert_eq!(t.k_source, KSource::NoWall);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(result.diagnostics.for_element("PT-PLAFOND-SUD").count(), 1);
}

#[test]
fn test_alternative_tables() {
    let reference = ReferenceData::from_toml_str(BUILTIN_TABLES).unwrap();
    assert_eq!(reference.version(), "3cl-2021.4");
    assert!(!reference.table(TableName::ThermalBridgeK).is_empty());

    let result = EnvelopeAggregator::new(&reference).compute(&sample_dwelling());
    assert_eq!(result, compute_envelope(&sample_dwelling()).unwrap());

    let truncated = BUILTIN_TABLES.replace("ventilation = [", "ventilation_old = [");
    let err = ReferenceData::from_toml_str(&truncated).unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_TABLE");
}

#[test]
fn test_invalid_dwelling_is_rejected() {
    let mut dwelling = Dwelling::new(context());
    dwelling.context.ceiling_height_m = 0.0;
    let err = compute_envelope(&dwelling).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_INPUT");
}
