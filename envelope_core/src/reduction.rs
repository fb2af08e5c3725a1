//! # Reduction Factor `b`
//!
//! Dimensionless factor in [0, 1] reducing the loss through an element that
//! does not face the exterior directly.
//!
//! Resolution order:
//!
//! 1. Unheated spaces that need a contact-area ratio resolve to 0 when their
//!    exterior contact area is zero or unknown.
//! 2. An inaccessible unheated space uses the adjacency-independent row.
//! 3. Directly exposed or non-deperditive adjacencies are keyed on the class alone.
//! 4. A solar buffer space is keyed on the climate zone (required) and its insulation.
//! 5. Every other unheated space is keyed on its equivalent coefficient `uv_ue`,
//!    its insulation configuration and the ratio `Aiu / Aue`.

use tracing::debug;

use crate::context::ClimateZone;
use crate::elements::{Adjacency, LncInsulation, UnheatedSpace};
use crate::errors::{CalcError, CalcResult};
use crate::reference::{Query, ReferenceData, TableName};

#[derive(Debug, Clone, Copy)]
pub struct ReductionInput<'a> {
    pub adjacency: Adjacency,
    pub space: Option<&'a UnheatedSpace>,
    pub climate_zone: Option<ClimateZone>,
}

impl<'a> ReductionInput<'a> {
    pub fn new(adjacency: Adjacency) -> Self {
        Self {
            adjacency,
            space: None,
            climate_zone: None,
        }
    }

    fn insulation(&self) -> Option<LncInsulation> {
        self.space.and_then(|s| s.insulation)
    }
}

/// Resolve `b` for one element.
///
/// Fails with `MissingField` for a solar buffer space without a climate zone
/// and with `Unresolved` when no row applies.
pub fn resolve_reduction_factor(reference: &ReferenceData, input: &ReductionInput<'_>) -> CalcResult<f64> {
    let table = reference.table(TableName::ReductionFactor);
    let adjacency = input.adjacency;

    if adjacency.requires_area_ratio() {
        let exterior = input.space.and_then(|s| s.exterior_area_m2).unwrap_or(0.0);
        if exterior <= 0.0 {
            debug!(adjacency = %adjacency, "no exterior contact area, b = 0");
            return Ok(0.0);
        }
    }

    if input.insulation() == Some(LncInsulation::Inaccessible) {
        let query = Query::new().eq("isolation", LncInsulation::Inaccessible.code());
        return table.value(&query, "b").map(clamp_unit);
    }

    if !adjacency.requires_area_ratio() {
        let query = Query::new().eq("adjacency", adjacency.code());
        return table.value(&query, "b").map(clamp_unit);
    }

    let isolation = input.insulation().map(|i| i.code());

    // Solar buffer rows carry no ratio bracket: zone prefix and insulation are the whole key.
    if adjacency == Adjacency::SolarBuffer {
        let zone = input
            .climate_zone
            .ok_or_else(|| CalcError::missing_field("climate_zone"))?;
        let query = Query::new()
            .eq("adjacency", adjacency.code())
            .prefix("zone", zone.code())
            .eq_opt("isolation", isolation);
        return table.value(&query, "b").map(clamp_unit);
    }

    let uv_ue = reference
        .table(TableName::LncEquivalentCoefficient)
        .value(&Query::new().eq("adjacency", adjacency.code()), "uv_ue")?;
    let ratio = area_ratio(input.space);
    debug!(adjacency = %adjacency, uv_ue, ratio, "resolving b for unheated space");

    let query = Query::new()
        .eq("uv_ue", uv_ue)
        .eq_opt("isolation", isolation)
        .within("ratio_min", "ratio_max", ratio);
    table.value(&query, "b").map(clamp_unit)
}

/// `Aiu / Aue`; an unknown interior area counts as zero.
fn area_ratio(space: Option<&UnheatedSpace>) -> f64 {
    let Some(space) = space else {
        return 0.0;
    };
    let interior = space.interior_area_m2.unwrap_or(0.0);
    match space.exterior_area_m2 {
        Some(exterior) if exterior > 0.0 => interior / exterior,
        _ => 0.0,
    }
}

fn clamp_unit(b: f64) -> f64 {
    b.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> &'static ReferenceData {
        ReferenceData::builtin().unwrap()
    }

    fn space(aiu: Option<f64>, aue: Option<f64>, insulation: Option<LncInsulation>) -> UnheatedSpace {
        UnheatedSpace {
            interior_area_m2: aiu,
            exterior_area_m2: aue,
            insulation,
        }
    }

    #[test]
    fn test_exterior_is_one() {
        let b = resolve_reduction_factor(data(), &ReductionInput::new(Adjacency::Exterior)).unwrap();
        assert_eq!(b, 1.0);
    }

    #[test]
    fn test_heated_space_is_zero() {
        let b = resolve_reduction_factor(data(), &ReductionInput::new(Adjacency::HeatedSpace)).unwrap();
        assert_eq!(b, 0.0);
        let b = resolve_reduction_factor(data(), &ReductionInput::new(Adjacency::NonResidential)).unwrap();
        assert_eq!(b, 0.2);
    }

    #[test]
    fn test_zero_exterior_area_gives_zero_for_every_ratio_class() {
        for adjacency in Adjacency::ALL.iter().filter(|a| a.requires_area_ratio()) {
            for aue in [None, Some(0.0)] {
                let s = space(Some(12.0), aue, Some(LncInsulation::NeitherInsulated));
                let input = ReductionInput {
                    adjacency: *adjacency,
                    space: Some(&s),
                    climate_zone: None,
                };
                assert_eq!(resolve_reduction_factor(data(), &input).unwrap(), 0.0, "{}", adjacency);
            }
        }
    }

    #[test]
    fn test_inaccessible_ignores_adjacency() {
        let s = space(Some(50.0), Some(10.0), Some(LncInsulation::Inaccessible));
        for adjacency in [Adjacency::Garage, Adjacency::AtticLowVentilation, Adjacency::Cellar] {
            let input = ReductionInput {
                adjacency,
                space: Some(&s),
                climate_zone: None,
            };
            assert_eq!(resolve_reduction_factor(data(), &input).unwrap(), 0.95);
        }
    }

    #[test]
    fn test_solar_buffer_requires_zone() {
        let s = space(Some(10.0), Some(20.0), Some(LncInsulation::NeitherInsulated));
        let mut input = ReductionInput {
            adjacency: Adjacency::SolarBuffer,
            space: Some(&s),
            climate_zone: None,
        };
        let err = resolve_reduction_factor(data(), &input).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");

        input.climate_zone = Some(ClimateZone::H2b);
        assert_eq!(resolve_reduction_factor(data(), &input).unwrap(), 0.80);
    }

    #[test]
    fn test_solar_buffer_ignores_area_ratio() {
        let narrow = space(Some(2.0), Some(20.0), Some(LncInsulation::BothInsulated));
        let wide = space(Some(80.0), Some(20.0), Some(LncInsulation::BothInsulated));
        for s in [&narrow, &wide] {
            let input = ReductionInput {
                adjacency: Adjacency::SolarBuffer,
                space: Some(s),
                climate_zone: Some(ClimateZone::H1a),
            };
            assert_eq!(resolve_reduction_factor(data(), &input).unwrap(), 0.75);
        }
    }

    #[test]
    fn test_unheated_space_ratio_bracket() {
        // garage: uv_ue = 3
        let small = space(Some(5.0), Some(20.0), Some(LncInsulation::NeitherInsulated));
        let large = space(Some(60.0), Some(20.0), Some(LncInsulation::NeitherInsulated));
        let b_small = resolve_reduction_factor(
            data(),
            &ReductionInput {
                adjacency: Adjacency::Garage,
                space: Some(&small),
                climate_zone: None,
            },
        )
        .unwrap();
        let b_large = resolve_reduction_factor(
            data(),
            &ReductionInput {
                adjacency: Adjacency::Garage,
                space: Some(&large),
                climate_zone: None,
            },
        )
        .unwrap();

        assert!(b_small > 0.0 && b_small <= 1.0);
        assert!(b_large > 0.0 && b_large <= 1.0);
        // a larger interior share shields the heated side more
        assert!(b_large < b_small);
    }

    #[test]
    fn test_area_ratio() {
        assert_eq!(area_ratio(None), 0.0);
        assert_eq!(area_ratio(Some(&space(Some(10.0), Some(20.0), None))), 0.5);
        assert_eq!(area_ratio(Some(&space(None, Some(20.0), None))), 0.0);
    }
}
