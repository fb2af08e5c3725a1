//! # Calculation Context
//!
//! Read-only per-dwelling parameters shared by all calculators, plus the
//! options that select alternative resolution behavior.

use serde::{Deserialize, Serialize};

/// Climate sub-zone. Tables are keyed on the zone prefix (`h1`, `h2`, `h3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateZone {
    H1a,
    H1b,
    H1c,
    H2a,
    H2b,
    H2c,
    H2d,
    H3,
}

impl ClimateZone {
    pub const ALL: [ClimateZone; 8] = [
        ClimateZone::H1a,
        ClimateZone::H1b,
        ClimateZone::H1c,
        ClimateZone::H2a,
        ClimateZone::H2b,
        ClimateZone::H2c,
        ClimateZone::H2d,
        ClimateZone::H3,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ClimateZone::H1a => "h1a",
            ClimateZone::H1b => "h1b",
            ClimateZone::H1c => "h1c",
            ClimateZone::H2a => "h2a",
            ClimateZone::H2b => "h2b",
            ClimateZone::H2c => "h2c",
            ClimateZone::H2d => "h2d",
            ClimateZone::H3 => "h3",
        }
    }

    /// Main zone used by the default-transmittance tables
    pub fn prefix(&self) -> &'static str {
        &self.code()[..2]
    }
}

impl std::fmt::Display for ClimateZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Altitude class of the site.
///
/// No envelope coefficient depends on altitude. The class is carried on the
/// context for the heating and cooling need calculators that read the same
/// dwelling record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AltitudeClass {
    #[default]
    #[serde(rename = "below_400m")]
    Below400m,
    #[serde(rename = "400_800m")]
    From400To800m,
    #[serde(rename = "above_800m")]
    Above800m,
}

/// Construction period classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstructionPeriod {
    #[serde(rename = "before_1948")]
    Before1948,
    #[serde(rename = "1948_1974")]
    From1948To1974,
    #[serde(rename = "1975_1977")]
    From1975To1977,
    #[serde(rename = "1978_1982")]
    From1978To1982,
    #[serde(rename = "1983_1988")]
    From1983To1988,
    #[serde(rename = "1989_2000")]
    From1989To2000,
    #[serde(rename = "2001_2005")]
    From2001To2005,
    #[serde(rename = "2006_2012")]
    From2006To2012,
    #[serde(rename = "2013_2021")]
    From2013To2021,
    #[serde(rename = "after_2021")]
    After2021,
}

impl ConstructionPeriod {
    pub const ALL: [ConstructionPeriod; 10] = [
        ConstructionPeriod::Before1948,
        ConstructionPeriod::From1948To1974,
        ConstructionPeriod::From1975To1977,
        ConstructionPeriod::From1978To1982,
        ConstructionPeriod::From1983To1988,
        ConstructionPeriod::From1989To2000,
        ConstructionPeriod::From2001To2005,
        ConstructionPeriod::From2006To2012,
        ConstructionPeriod::From2013To2021,
        ConstructionPeriod::After2021,
    ];

    /// Code used in the reference tables
    pub fn code(&self) -> &'static str {
        match self {
            ConstructionPeriod::Before1948 => "before_1948",
            ConstructionPeriod::From1948To1974 => "1948_1974",
            ConstructionPeriod::From1975To1977 => "1975_1977",
            ConstructionPeriod::From1978To1982 => "1978_1982",
            ConstructionPeriod::From1983To1988 => "1983_1988",
            ConstructionPeriod::From1989To2000 => "1989_2000",
            ConstructionPeriod::From2001To2005 => "2001_2005",
            ConstructionPeriod::From2006To2012 => "2006_2012",
            ConstructionPeriod::From2013To2021 => "2013_2021",
            ConstructionPeriod::After2021 => "after_2021",
        }
    }

    /// Built before the first thermal regulation
    pub fn before_1975(&self) -> bool {
        *self <= ConstructionPeriod::From1948To1974
    }

    /// Whether conventional permeability depends on insulation and weatherstripping shares
    pub fn permeability_refined(&self) -> bool {
        self.before_1975()
    }
}

impl std::fmt::Display for ConstructionPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    #[default]
    House,
    Apartment,
}

impl BuildingType {
    pub fn code(&self) -> &'static str {
        match self {
            BuildingType::House => "house",
            BuildingType::Apartment => "apartment",
        }
    }
}

/// Alternative resolution behaviors, threaded explicitly through the context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationOptions {
    /// Thermal-bridge references fall back to trimmed, case-insensitive matching
    pub lenient_references: bool,
    /// Cap the wall base transmittance at [`WALL_BASE_CAP`](crate::elements::wall::WALL_BASE_CAP)
    pub cap_wall_base_transmittance: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            lenient_references: true,
            cap_wall_base_transmittance: true,
        }
    }
}

/// Per-dwelling read-only parameters.
///
/// ## JSON Example
///
/// ```json
/// {
///   "climate_zone": "h1b",
///   "altitude": "below_400m",
///   "period": "1948_1974",
///   "building_type": "house",
///   "habitable_surface_m2": 92.0,
///   "ceiling_height_m": 2.5,
///   "joule_heating": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub climate_zone: Option<ClimateZone>,

    /// Passed through unchanged, see [`AltitudeClass`]
    #[serde(default)]
    pub altitude: AltitudeClass,

    pub period: ConstructionPeriod,

    #[serde(default)]
    pub building_type: BuildingType,

    /// Habitable surface Sh, m²
    pub habitable_surface_m2: f64,

    /// Mean ceiling height Hsp, m
    pub ceiling_height_m: f64,

    /// Heating is mainly by Joule effect (electric resistance)
    #[serde(default)]
    pub joule_heating: bool,

    #[serde(default)]
    pub options: CalculationOptions,
}

impl Context {
    pub fn new(period: ConstructionPeriod, habitable_surface_m2: f64, ceiling_height_m: f64) -> Self {
        Self {
            climate_zone: None,
            altitude: AltitudeClass::default(),
            period,
            building_type: BuildingType::default(),
            habitable_surface_m2,
            ceiling_height_m,
            joule_heating: false,
            options: CalculationOptions::default(),
        }
    }

    pub fn with_zone(mut self, zone: ClimateZone) -> Self {
        self.climate_zone = Some(zone);
        self
    }

    pub fn zone_prefix(&self) -> Option<&'static str> {
        self.climate_zone.map(|z| z.prefix())
    }

    /// Zone prefix used for tables that always need one; defaults to `h1`.
    pub fn zone_or_default(&self) -> &'static str {
        self.zone_prefix().unwrap_or("h1")
    }
}
