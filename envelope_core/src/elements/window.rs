//! # Window Calculation
//!
//! Windows and French doors.
//!
//! ## Transmittance chain
//!
//! ```text
//! ug  = glazing_ug(glazing, gas, low-e)  interpolated on the air gap
//! uw  = window_uw(frame, type)           interpolated on ug   (+0.1 retrofit double glazing)
//! ujn = window_ujn(shutter ΔR)           interpolated on uw
//! u   = ujn with a shutter, else uw
//! ```
//!
//! Each of `ug`, `uw` and `sw` can be entered instead. A secondary window
//! (double window) is computed the same way and combined:
//! `uw = 1 / (1/uw1 + 1/uw2 + 0.07)`, `sw = sw1 × sw2`.
//!
//! ## Solar factor
//!
//! `sw` is tabulated by glazing, frame and opening family. Near masks (`fe1`)
//! and far masks (`fe2`) reduce it multiplicatively; both default to 1 and
//! are floored at 0.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::door::Installation;
use super::{Adjacency, CalcEnv, ElementCalculator, Family, Intermediate, UnheatedSpace};
use crate::diagnostics::Diagnostics;
use crate::dwelling::Dwelling;
use crate::reference::{Query, ReferenceData, TableName};
use crate::resolver::round_coefficient;

/// Penalty on `uw` for double glazing fitted in an existing frame, W/(m².K)
pub const RETROFIT_DOUBLE_GLAZING_PENALTY: f64 = 0.1;

/// Resistance of the air space between the two windows of a double window, m².K/W
pub const DOUBLE_WINDOW_AIR_RESISTANCE: f64 = 0.07;

/// Single glazing transmittance, used when nothing better resolves
pub const FALLBACK_UG: f64 = 5.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    #[default]
    Casement,
    FrenchDoor,
    Fixed,
    RoofWindow,
    Sliding,
    SlidingDoor,
}

impl WindowType {
    pub fn code(&self) -> &'static str {
        match self {
            WindowType::Casement => "casement",
            WindowType::FrenchDoor => "french_door",
            WindowType::Fixed => "fixed",
            WindowType::RoofWindow => "roof_window",
            WindowType::Sliding => "sliding",
            WindowType::SlidingDoor => "sliding_door",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameMaterial {
    #[default]
    Pvc,
    Wood,
    Metal,
    MetalThermalBreak,
    WoodMetal,
}

impl FrameMaterial {
    pub fn code(&self) -> &'static str {
        match self {
            FrameMaterial::Pvc => "pvc",
            FrameMaterial::Wood => "wood",
            FrameMaterial::Metal => "metal",
            FrameMaterial::MetalThermalBreak => "metal_thermal_break",
            FrameMaterial::WoodMetal => "wood_metal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GlazingKind {
    Single,
    #[default]
    Double,
    Triple,
}

impl GlazingKind {
    pub fn code(&self) -> &'static str {
        match self {
            GlazingKind::Single => "single",
            GlazingKind::Double => "double",
            GlazingKind::Triple => "triple",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillGas {
    #[default]
    Air,
    Argon,
}

impl FillGas {
    pub fn code(&self) -> &'static str {
        match self {
            FillGas::Air => "air",
            FillGas::Argon => "argon",
        }
    }
}

/// Closure fitted in front of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shutter {
    MetalRoller,
    MetalFolding,
    PvcRollerThin,
    WoodThin,
    PvcRollerThick,
    WoodThick,
    InsulatedRoller,
}

impl Shutter {
    /// Additional thermal resistance ΔR of the closed shutter, m².K/W
    pub fn delta_r(&self) -> f64 {
        match self {
            Shutter::MetalRoller | Shutter::MetalFolding => 0.08,
            Shutter::PvcRollerThin | Shutter::WoodThin => 0.15,
            Shutter::PvcRollerThick | Shutter::WoodThick => 0.19,
            Shutter::InsulatedRoller => 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    North,
    East,
    #[default]
    South,
    West,
    Horizontal,
}

impl Orientation {
    pub fn code(&self) -> &'static str {
        match self {
            Orientation::North => "north",
            Orientation::East => "east",
            Orientation::South => "south",
            Orientation::West => "west",
            Orientation::Horizontal => "horizontal",
        }
    }
}

/// Obstruction attached to the building, next to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearMask {
    BalconyBottom,
    Overhang,
    SideWallOneSide,
    SideWallsBothSides,
    Loggia,
}

impl NearMask {
    pub fn code(&self) -> &'static str {
        match self {
            NearMask::BalconyBottom => "balcony_bottom",
            NearMask::Overhang => "overhang",
            NearMask::SideWallOneSide => "side_wall_one_side",
            NearMask::SideWallsBothSides => "side_walls_both_sides",
            NearMask::Loggia => "loggia",
        }
    }
}

/// Distant obstruction (buildings, relief).
///
/// ```json
/// { "kind": "homogeneous", "angle_deg": 25.0 }
/// { "kind": "non_homogeneous", "obstructions_pct": [20.0, 35.0] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FarMask {
    /// Continuous horizon at a given elevation angle
    Homogeneous { angle_deg: f64 },
    /// Separate obstructions, each hiding a share of the sky
    NonHomogeneous { obstructions_pct: Vec<f64> },
}

/// Glazing and frame of one window (or of one leaf of a double window).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Pane {
    #[serde(default)]
    pub window_type: WindowType,
    #[serde(default)]
    pub frame: FrameMaterial,
    #[serde(default)]
    pub glazing: GlazingKind,
    #[serde(default)]
    pub gas: FillGas,
    #[serde(default)]
    pub low_e: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_gap_mm: Option<f64>,
    /// Double glazing fitted in the frame of a former single-glazed window
    #[serde(default)]
    pub retrofit_double_glazing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ug_override: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uw_override: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sw_override: Option<f64>,
}

/// One window of the dwelling.
///
/// ## JSON Example
///
/// ```json
/// {
///   "reference": "FEN-SALON",
///   "area_m2": 2.4,
///   "orientation": "south",
///   "pane": { "window_type": "casement", "frame": "wood", "glazing": "double", "air_gap_mm": 12.0 },
///   "shutter": "pvc_roller_thin",
///   "weatherstripped": true,
///   "near_masks": ["balcony_bottom"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub reference: String,

    pub area_m2: f64,

    #[serde(default)]
    pub adjacency: Adjacency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unheated_space: Option<UnheatedSpace>,

    #[serde(default)]
    pub orientation: Orientation,

    #[serde(default)]
    pub pane: Pane,

    /// Second window of a double window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Pane>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutter: Option<Shutter>,

    #[serde(default)]
    pub weatherstripped: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub near_masks: Vec<NearMask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub far_mask: Option<FarMask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation: Option<Installation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate: Option<WindowIntermediate>,
}

impl WindowEntry {
    pub fn new(reference: impl Into<String>, area_m2: f64, pane: Pane) -> Self {
        Self {
            reference: reference.into(),
            area_m2,
            adjacency: Adjacency::Exterior,
            unheated_space: None,
            orientation: Orientation::South,
            pane,
            secondary: None,
            shutter: None,
            weatherstripped: false,
            near_masks: Vec::new(),
            far_mask: None,
            installation: None,
            intermediate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowIntermediate {
    pub area_m2: f64,
    /// Glazing transmittance of the main pane
    pub ug: f64,
    /// Window transmittance (combined for a double window)
    pub uw: f64,
    /// Window with closed shutter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ujn: Option<f64>,
    /// Transmittance used for the loss
    pub u: f64,
    /// Solar factor of the bare window
    pub sw: f64,
    pub fe1: f64,
    pub fe2: f64,
    /// `sw × fe1 × fe2`, consumed by solar gain calculations
    pub sw_effective: f64,
    pub b: f64,
    pub weatherstripped: bool,
    pub heat_loss_w_per_k: f64,
}

/// Transmittance and solar factor of one pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaneValues {
    pub ug: f64,
    pub uw: f64,
    pub sw: f64,
}

/// `1 / (1/u1 + 1/u2 + 0.07)`
pub fn double_window_transmittance(u1: f64, u2: f64) -> f64 {
    if u1 <= 0.0 || u2 <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 / u1 + 1.0 / u2 + DOUBLE_WINDOW_AIR_RESISTANCE)
}

/// Far-mask factor of separate obstructions: `Π (1 - p/100)`, each term held in [0, 1].
pub fn non_homogeneous_far_factor(obstructions_pct: &[f64]) -> f64 {
    obstructions_pct
        .iter()
        .fold(1.0, |fe2, p| fe2 * (1.0 - p / 100.0).clamp(0.0, 1.0))
}

pub struct WindowCalculator;

impl WindowCalculator {
    fn glazing_transmittance(
        &self,
        pane: &Pane,
        reference: &ReferenceData,
        element: &str,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        if let Some(ug) = pane.ug_override {
            return ug;
        }
        let table = reference.table(TableName::GlazingUg);
        let result = if pane.glazing == GlazingKind::Single {
            table.value(&Query::new().eq("glazing", GlazingKind::Single.code()), "ug")
        } else {
            let query = Query::new()
                .eq("glazing", pane.glazing.code())
                .eq("gas", pane.gas.code())
                .eq("low_e", pane.low_e);
            match pane.air_gap_mm {
                Some(gap) => table.interpolate(&query, "air_gap_mm", "ug", gap),
                // Unknown gap: thinnest tabulated gap
                None => table.value(&query, "ug"),
            }
        };
        result.unwrap_or_else(|e| {
            diagnostics.record(element, &e, FALLBACK_UG);
            FALLBACK_UG
        })
    }

    /// Transmittance and solar factor of one pane.
    pub fn pane_values(
        &self,
        pane: &Pane,
        reference: &ReferenceData,
        element: &str,
        diagnostics: &mut Diagnostics,
    ) -> PaneValues {
        let ug = self.glazing_transmittance(pane, reference, element, diagnostics);

        let uw = match pane.uw_override {
            Some(uw) => uw,
            None => {
                let query = Query::new()
                    .eq("frame", pane.frame.code())
                    .eq("window_type", pane.window_type.code());
                let uw = match reference.table(TableName::WindowUw).interpolate(&query, "ug", "uw", ug) {
                    Ok(uw) => uw,
                    Err(e) => {
                        diagnostics.record(element, &e, ug);
                        ug
                    }
                };
                if pane.retrofit_double_glazing {
                    uw + RETROFIT_DOUBLE_GLAZING_PENALTY
                } else {
                    uw
                }
            }
        };

        let sw = match pane.sw_override {
            Some(sw) => sw,
            None => {
                let query = Query::new()
                    .eq("glazing", pane.glazing.code())
                    .eq("frame", pane.frame.code())
                    .eq("window_type", pane.window_type.code());
                match reference.table(TableName::WindowSw).value(&query, "sw") {
                    Ok(sw) => sw,
                    Err(e) => {
                        diagnostics.record(element, &e, 0.0);
                        0.0
                    }
                }
            }
        };

        PaneValues {
            ug: round_coefficient(ug),
            uw: round_coefficient(uw),
            sw: round_coefficient(sw),
        }
    }

    fn near_mask_factor(&self, entry: &WindowEntry, reference: &ReferenceData, diagnostics: &mut Diagnostics) -> f64 {
        let table = reference.table(TableName::NearMask);
        let mut fe1 = 1.0;
        for mask in &entry.near_masks {
            let query = Query::new()
                .eq("mask", mask.code())
                .eq("orientation", entry.orientation.code());
            match table.value(&query, "fe1") {
                Ok(factor) => fe1 *= factor,
                Err(e) => diagnostics.record(&entry.reference, &e, 1.0),
            }
        }
        f64::max(fe1, 0.0)
    }

    fn far_mask_factor(&self, entry: &WindowEntry, reference: &ReferenceData, diagnostics: &mut Diagnostics) -> f64 {
        match &entry.far_mask {
            None => 1.0,
            Some(FarMask::Homogeneous { angle_deg }) => {
                let query = Query::new()
                    .eq("orientation", entry.orientation.code())
                    .within("angle_min", "angle_max", *angle_deg);
                match reference.table(TableName::FarMask).value(&query, "fe2") {
                    Ok(fe2) => fe2.max(0.0),
                    Err(e) => {
                        diagnostics.record(&entry.reference, &e, 1.0);
                        1.0
                    }
                }
            }
            Some(FarMask::NonHomogeneous { obstructions_pct }) => non_homogeneous_far_factor(obstructions_pct),
        }
    }
}

impl ElementCalculator for WindowCalculator {
    type Entry = WindowEntry;

    const FAMILY: Family = Family::Window;

    fn entries<'d>(&self, dwelling: &'d Dwelling) -> &'d [WindowEntry] {
        &dwelling.windows
    }

    fn compute(&self, entry: &WindowEntry, env: &CalcEnv<'_>, diagnostics: &mut Diagnostics) -> Intermediate {
        let element = entry.reference.as_str();
        let main = self.pane_values(&entry.pane, env.reference, element, diagnostics);

        let (uw, sw) = match &entry.secondary {
            Some(secondary) => {
                let second = self.pane_values(secondary, env.reference, element, diagnostics);
                debug!(element, uw1 = main.uw, uw2 = second.uw, "double window");
                (
                    round_coefficient(double_window_transmittance(main.uw, second.uw)),
                    round_coefficient(main.sw * second.sw),
                )
            }
            None => (main.uw, main.sw),
        };

        let ujn = entry.shutter.map(|shutter| {
            let query = Query::new().eq("delta_r", shutter.delta_r());
            match env.reference.table(TableName::WindowUjn).interpolate(&query, "uw", "ujn", uw) {
                Ok(ujn) => round_coefficient(ujn),
                Err(e) => {
                    diagnostics.record(element, &e, uw);
                    uw
                }
            }
        });
        let u = ujn.unwrap_or(uw);

        let fe1 = self.near_mask_factor(entry, env.reference, diagnostics);
        let fe2 = self.far_mask_factor(entry, env.reference, diagnostics);
        let b = self.reduction_factor(element, entry.adjacency, entry.unheated_space.as_ref(), env, diagnostics);

        Intermediate::Window(WindowIntermediate {
            area_m2: entry.area_m2,
            ug: main.ug,
            uw,
            ujn,
            u,
            sw,
            fe1,
            fe2,
            sw_effective: round_coefficient(sw * fe1 * fe2),
            b,
            weatherstripped: entry.weatherstripped,
            heat_loss_w_per_k: b * entry.area_m2 * u,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConstructionPeriod, Context};
    use crate::test_support::with_env;

    fn compute(entry: &WindowEntry) -> (WindowIntermediate, Diagnostics) {
        let dwelling = Dwelling::new(Context::new(ConstructionPeriod::From1989To2000, 100.0, 2.5));
        with_env(&dwelling, |env| {
            let mut diagnostics = Diagnostics::new();
            match WindowCalculator.compute(entry, env, &mut diagnostics) {
                Intermediate::Window(w) => (w, diagnostics),
                other => panic!("unexpected {:?}", other),
            }
        })
    }

    fn pvc_double() -> Pane {
        Pane {
            window_type: WindowType::Casement,
            frame: FrameMaterial::Pvc,
            glazing: GlazingKind::Double,
            gas: FillGas::Air,
            low_e: false,
            air_gap_mm: Some(12.0),
            ..Pane::default()
        }
    }

    #[test]
    fn test_double_window_formula() {
        let u = double_window_transmittance(2.4, 2.4);
        assert!((u - 1.0 / (1.0 / 2.4 + 1.0 / 2.4 + 0.07)).abs() < 1e-12);
        assert!((u - 1.107).abs() < 1e-3);
    }

    #[test]
    fn test_secondary_window_combines_panes() {
        let mut entry = WindowEntry::new("FEN-1", 1.5, Pane { uw_override: Some(2.4), sw_override: Some(0.6), ..pvc_double() });
        entry.secondary = Some(Pane { uw_override: Some(2.4), sw_override: Some(0.5), ..pvc_double() });
        let (w, _) = compute(&entry);
        assert_eq!(w.uw, round_coefficient(double_window_transmittance(2.4, 2.4)));
        assert_eq!(w.sw, 0.3);
        assert_eq!(w.u, w.uw);
    }

    #[test]
    fn test_tabulated_chain() {
        let entry = WindowEntry::new("FEN-1", 2.0, pvc_double());
        let (w, diagnostics) = compute(&entry);
        assert!(diagnostics.is_empty());
        // double, air, no low-e, 12 mm
        assert_eq!(w.ug, 2.8);
        // pvc casement at ug = 2.8 is tabulated
        assert_eq!(w.uw, 2.77);
        assert_eq!(w.sw, 0.45);
        assert_eq!(w.ujn, None);
        assert_eq!(w.fe1, 1.0);
        assert_eq!(w.fe2, 1.0);
    }

    #[test]
    fn test_retrofit_penalty() {
        let plain = compute(&WindowEntry::new("FEN-1", 2.0, pvc_double())).0;
        let retrofit = compute(&WindowEntry::new(
            "FEN-1",
            2.0,
            Pane { retrofit_double_glazing: true, ..pvc_double() },
        ))
        .0;
        assert!((retrofit.uw - plain.uw - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_shutter_lowers_transmittance() {
        let mut entry = WindowEntry::new("FEN-1", 2.0, pvc_double());
        entry.shutter = Some(Shutter::WoodThick);
        let (w, _) = compute(&entry);
        let ujn = w.ujn.unwrap();
        assert!(ujn < w.uw);
        assert_eq!(w.u, ujn);
    }

    #[test]
    fn test_single_glazing_ignores_gap() {
        let pane = Pane { glazing: GlazingKind::Single, air_gap_mm: None, ..pvc_double() };
        let (w, _) = compute(&WindowEntry::new("FEN-1", 1.0, pane));
        assert_eq!(w.ug, 5.8);
    }

    #[test]
    fn test_masks() {
        let mut entry = WindowEntry::new("FEN-1", 2.0, pvc_double());
        entry.orientation = Orientation::South;
        entry.near_masks = vec![NearMask::BalconyBottom, NearMask::SideWallOneSide];
        entry.far_mask = Some(FarMask::Homogeneous { angle_deg: 20.0 });
        let (w, _) = compute(&entry);
        assert!((w.fe1 - 0.54).abs() < 1e-9);
        assert_eq!(w.fe2, 0.82);
        assert_eq!(w.sw_effective, round_coefficient(0.45 * 0.54 * 0.82));
    }

    #[test]
    fn test_non_homogeneous_far_mask() {
        assert!((non_homogeneous_far_factor(&[20.0, 50.0]) - 0.4).abs() < 1e-12);
        assert_eq!(non_homogeneous_far_factor(&[]), 1.0);
        assert_eq!(non_homogeneous_far_factor(&[150.0]), 0.0);
    }

    #[test]
    fn test_far_mask_out_of_range_obstructions() {
        assert_eq!(non_homogeneous_far_factor(&[150.0, 150.0]), 0.0);
        assert_eq!(non_homogeneous_far_factor(&[-50.0]), 1.0);
        assert_eq!(non_homogeneous_far_factor(&[-50.0, 40.0, 120.0]), 0.0);
        assert!((non_homogeneous_far_factor(&[-10.0, 40.0]) - 0.6).abs() < 1e-12);
    }
}
