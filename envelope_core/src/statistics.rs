//! # Surface Statistics
//!
//! Five running area totals accumulated while the aggregator commits opaque
//! and glazed elements. Only elements with `b > 0` count. The ventilation
//! calculator reads the final totals; no element calculation does.

use serde::{Deserialize, Serialize};

use crate::elements::Intermediate;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceStatistics {
    /// Walls, doors, high floors and windows, m²
    pub deperditive_area_m2: f64,
    /// Opaque walls and floors classified as insulated, m²
    pub insulated_area_m2: f64,
    pub non_insulated_area_m2: f64,
    /// Windows and doors with weatherstripping, m²
    pub weatherstripped_area_m2: f64,
    pub non_weatherstripped_area_m2: f64,
}

impl SurfaceStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, intermediate: &Intermediate) {
        if !intermediate.reduction_factor().is_some_and(|b| b > 0.0) {
            return;
        }
        match intermediate {
            Intermediate::Wall(w) => {
                self.deperditive_area_m2 += w.area_m2;
                self.add_insulation(w.area_m2, w.insulation_class.is_insulated());
            }
            Intermediate::Door(d) => {
                self.deperditive_area_m2 += d.area_m2;
                self.add_weatherstripping(d.area_m2, d.weatherstripped);
            }
            Intermediate::LowFloor(f) => {
                self.add_insulation(f.area_m2, f.insulation_class.is_insulated());
            }
            Intermediate::HighFloor(h) => {
                self.deperditive_area_m2 += h.area_m2;
                self.add_insulation(h.area_m2, h.insulation_class.is_insulated());
            }
            Intermediate::Window(w) => {
                self.deperditive_area_m2 += w.area_m2;
                self.add_weatherstripping(w.area_m2, w.weatherstripped);
            }
            Intermediate::ThermalBridge(_) => {}
        }
    }

    fn add_insulation(&mut self, area: f64, insulated: bool) {
        if insulated {
            self.insulated_area_m2 += area;
        } else {
            self.non_insulated_area_m2 += area;
        }
    }

    fn add_weatherstripping(&mut self, area: f64, weatherstripped: bool) {
        if weatherstripped {
            self.weatherstripped_area_m2 += area;
        } else {
            self.non_weatherstripped_area_m2 += area;
        }
    }

    /// More than half of the opaque area is insulated
    pub fn is_mostly_insulated(&self) -> bool {
        self.insulated_area_m2 > self.non_insulated_area_m2
    }

    /// More than half of the openings are weatherstripped
    pub fn is_mostly_weatherstripped(&self) -> bool {
        self.weatherstripped_area_m2 > self.non_weatherstripped_area_m2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::door::DoorIntermediate;
    use crate::elements::insulation::InsulationClass;
    use crate::elements::wall::{WallIntermediate, WallMaterial};

    fn wall(area: f64, b: f64, class: InsulationClass) -> Intermediate {
        Intermediate::Wall(WallIntermediate {
            material: WallMaterial::SolidBrick,
            area_m2: area,
            u0: 2.0,
            u: 2.0,
            b,
            insulation_class: class,
            heat_loss_w_per_k: b * area * 2.0,
        })
    }

    #[test]
    fn test_only_positive_b_counts() {
        let mut stats = SurfaceStatistics::new();
        stats.record(&wall(10.0, 1.0, InsulationClass::Interior));
        stats.record(&wall(20.0, 0.0, InsulationClass::NotInsulated));
        assert_eq!(stats.deperditive_area_m2, 10.0);
        assert_eq!(stats.insulated_area_m2, 10.0);
        assert_eq!(stats.non_insulated_area_m2, 0.0);
        assert!(stats.is_mostly_insulated());
    }

    #[test]
    fn test_doors_feed_weatherstripping() {
        let mut stats = SurfaceStatistics::new();
        stats.record(&Intermediate::Door(DoorIntermediate {
            area_m2: 2.0,
            u: 3.5,
            b: 1.0,
            weatherstripped: false,
            heat_loss_w_per_k: 7.0,
        }));
        assert_eq!(stats.deperditive_area_m2, 2.0);
        assert_eq!(stats.non_weatherstripped_area_m2, 2.0);
        assert!(!stats.is_mostly_weatherstripped());
    }

    #[test]
    fn test_empty_is_neither() {
        let stats = SurfaceStatistics::new();
        assert!(!stats.is_mostly_insulated());
        assert!(!stats.is_mostly_weatherstripped());
    }
}
