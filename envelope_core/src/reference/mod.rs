//! # Reference Data Store
//!
//! Immutable tables of tabulated coefficients, loaded once and shared by every
//! calculator. The built-in dataset is embedded at compile time from
//! `data/reference_tables.toml`; alternative datasets can be loaded with
//! [`ReferenceData::from_toml_str`].
//!
//! ## Table model
//!
//! A table is an ordered list of rows. A row maps column names to a number or
//! a string; a string containing `|` is a set of alternatives. Row order is
//! significant: lookups return the first matching row.
//!
//! ```rust
//! use envelope_core::reference::{Query, ReferenceData, TableName};
//!
//! let data = ReferenceData::builtin().unwrap();
//! let u = data
//!     .table(TableName::DoorU)
//!     .value(&Query::new().eq("door_type", "wood_solid"), "u")
//!     .unwrap();
//! assert_eq!(u, 3.5);
//! ```

pub mod query;

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{CalcError, CalcResult};

pub use query::{Criterion, Query, QueryValue};

/// Source of the built-in dataset.
pub const BUILTIN_TABLES: &str = include_str!("../../data/reference_tables.toml");

static BUILTIN: OnceCell<ReferenceData> = OnceCell::new();

/// Every table the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    ReductionFactor,
    LncEquivalentCoefficient,
    WallU0,
    WallDefaultU,
    LowFloorU0,
    LowFloorDefaultU,
    FloorUe,
    HighFloorU0,
    HighFloorDefaultU,
    DoorU,
    GlazingUg,
    WindowUw,
    WindowUjn,
    WindowSw,
    NearMask,
    FarMask,
    ThermalBridgeK,
    Q4paConv,
    Ventilation,
}

impl TableName {
    pub const ALL: [TableName; 19] = [
        TableName::ReductionFactor,
        TableName::LncEquivalentCoefficient,
        TableName::WallU0,
        TableName::WallDefaultU,
        TableName::LowFloorU0,
        TableName::LowFloorDefaultU,
        TableName::FloorUe,
        TableName::HighFloorU0,
        TableName::HighFloorDefaultU,
        TableName::DoorU,
        TableName::GlazingUg,
        TableName::WindowUw,
        TableName::WindowUjn,
        TableName::WindowSw,
        TableName::NearMask,
        TableName::FarMask,
        TableName::ThermalBridgeK,
        TableName::Q4paConv,
        TableName::Ventilation,
    ];

    /// Key of the table in the TOML dataset
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::ReductionFactor => "reduction_factor",
            TableName::LncEquivalentCoefficient => "lnc_equivalent_coefficient",
            TableName::WallU0 => "wall_u0",
            TableName::WallDefaultU => "wall_default_u",
            TableName::LowFloorU0 => "low_floor_u0",
            TableName::LowFloorDefaultU => "low_floor_default_u",
            TableName::FloorUe => "floor_ue",
            TableName::HighFloorU0 => "high_floor_u0",
            TableName::HighFloorDefaultU => "high_floor_default_u",
            TableName::DoorU => "door_u",
            TableName::GlazingUg => "glazing_ug",
            TableName::WindowUw => "window_uw",
            TableName::WindowUjn => "window_ujn",
            TableName::WindowSw => "window_sw",
            TableName::NearMask => "near_mask",
            TableName::FarMask => "far_mask",
            TableName::ThermalBridgeK => "thermal_bridge_k",
            TableName::Q4paConv => "q4pa_conv",
            TableName::Ventilation => "ventilation",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single cell. Numbers authored as strings are still usable numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric reading of the cell, parsing text when needed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Members of a pipe-delimited set (a single member for plain values)
    pub fn members(&self) -> Vec<String> {
        match self {
            Value::Number(n) => vec![n.to_string()],
            Value::Text(s) => s.split('|').map(|m| m.trim().to_string()).collect(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One row of a reference table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn has(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }
}

/// An ordered, read-only reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: TableName,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: TableName, rows: Vec<Row>) -> Self {
        Self { name, rows }
    }

    pub fn name(&self) -> TableName {
        self.name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Deserialize)]
struct RawDataset {
    version: String,
    #[serde(flatten)]
    tables: HashMap<String, Vec<Row>>,
}

/// The complete, versioned dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    version: String,
    /// Indexed by `TableName as usize`; every table is present after loading
    tables: Vec<Table>,
}

impl ReferenceData {
    /// The dataset embedded in the crate, parsed on first use.
    pub fn builtin() -> CalcResult<&'static ReferenceData> {
        BUILTIN.get_or_try_init(|| Self::from_toml_str(BUILTIN_TABLES))
    }

    /// Parse a dataset and check that every table the engine reads is present.
    pub fn from_toml_str(source: &str) -> CalcResult<Self> {
        let raw: RawDataset = toml::from_str(source)
            .map_err(|e| CalcError::reference_data(e.to_string()))?;
        let mut by_name = raw.tables;

        let mut tables = Vec::with_capacity(TableName::ALL.len());
        for name in TableName::ALL {
            let rows = by_name
                .remove(name.as_str())
                .ok_or_else(|| CalcError::unknown_table(name.as_str()))?;
            tables.push(Table::new(name, rows));
        }
        for extra in by_name.keys() {
            debug!(table = %extra, "ignoring unused reference table");
        }

        debug!(version = %raw.version, "loaded reference data");
        Ok(Self {
            version: raw.version,
            tables,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn table(&self, name: TableName) -> &Table {
        &self.tables[name.index()]
    }
}
