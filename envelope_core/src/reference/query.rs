//! Composite-key queries over reference table rows.
//!
//! A query is a conjunction of criteria. A criterion whose value is absent is
//! simply not added (`eq_opt`), so it matches any row. A row that lacks a
//! column the query constrains does not match.

use super::{Row, Value};

/// Numbers closer than this compare equal.
const NUMERIC_TOLERANCE: f64 = 1e-9;

/// Value a row cell is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Number(f64),
}

impl QueryValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Number(n) => Some(*n),
            QueryValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Number(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Number(value as f64)
    }
}

/// Flags are tabulated as 0 / 1.
impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Number(if value { 1.0 } else { 0.0 })
    }
}

impl std::fmt::Display for QueryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryValue::Text(s) => write!(f, "{}", s),
            QueryValue::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// The row cell (or one member of its `|` set) equals the value
    Equals { column: String, value: QueryValue },
    /// One member of the row cell is a prefix of the value ("h1" matches "h1b")
    Prefix { column: String, value: String },
    /// `min <= value < max`; a missing bound is open, both missing never matches
    Within {
        min_column: String,
        max_column: String,
        value: f64,
    },
}

impl Criterion {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Criterion::Equals { column, value } => match row.get(column) {
                Some(cell) => cell_equals(cell, value),
                None => false,
            },
            Criterion::Prefix { column, value } => match row.get(column) {
                Some(cell) => cell
                    .members()
                    .iter()
                    .any(|member| !member.is_empty() && value.starts_with(member.as_str())),
                None => false,
            },
            Criterion::Within {
                min_column,
                max_column,
                value,
            } => {
                let min = row.number(min_column);
                let max = row.number(max_column);
                if min.is_none() && max.is_none() {
                    return false;
                }
                min.map_or(true, |m| *value >= m) && max.map_or(true, |m| *value < m)
            }
        }
    }
}

fn cell_equals(cell: &Value, value: &QueryValue) -> bool {
    match cell {
        Value::Number(n) => value
            .as_f64()
            .map_or(false, |q| (n - q).abs() < NUMERIC_TOLERANCE),
        Value::Text(_) => cell.members().iter().any(|member| match value {
            QueryValue::Text(q) => member == q,
            QueryValue::Number(q) => member
                .parse::<f64>()
                .map_or(false, |m| (m - q).abs() < NUMERIC_TOLERANCE),
        }),
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criterion::Equals { column, value } => write!(f, "{}={}", column, value),
            Criterion::Prefix { column, value } => write!(f, "{}^={}", column, value),
            Criterion::Within {
                min_column,
                max_column,
                value,
            } => write!(f, "{}<={}<{}", min_column, value, max_column),
        }
    }
}

/// Builder for a composite-key lookup.
///
/// ```rust
/// use envelope_core::reference::Query;
///
/// let query = Query::new()
///     .eq("material", "stone_rubble")
///     .eq_opt("gas", None::<&str>)
///     .prefix("zone", "h2c");
/// assert_eq!(query.to_string(), "material=stone_rubble, zone^=h2c");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    criteria: Vec<Criterion>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<QueryValue>) -> Self {
        self.criteria.push(Criterion::Equals {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn eq_opt<V: Into<QueryValue>>(self, column: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub fn prefix(mut self, column: &str, value: impl Into<String>) -> Self {
        self.criteria.push(Criterion::Prefix {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn prefix_opt(self, column: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.prefix(column, v),
            None => self,
        }
    }

    pub fn within(mut self, min_column: &str, max_column: &str, value: f64) -> Self {
        self.criteria.push(Criterion::Within {
            min_column: min_column.to_string(),
            max_column: max_column.to_string(),
            value,
        });
        self
    }

    pub fn within_opt(self, min_column: &str, max_column: &str, value: Option<f64>) -> Self {
        match value {
            Some(v) => self.within(min_column, max_column, v),
            None => self,
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.criteria.iter().all(|c| c.matches(row))
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.criteria.is_empty() {
            return write!(f, "<any>");
        }
        for (i, criterion) in self.criteria.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", criterion)?;
        }
        Ok(())
    }
}
