//! # Coefficient Resolver
//!
//! Lookup and interpolation primitives shared by every calculator:
//!
//! - exact composite-key match (first matching row wins)
//! - linear interpolation over a tabulated dimension, extrapolating with the
//!   nearest pair outside the tabulated range
//! - nearest-value selection (ties go to the first value)
//! - thickness bracket selection
//!
//! A lookup that finds nothing returns [`CalcError::Unresolved`]; deciding the
//! fallback is the caller's job.

use tracing::debug;

use crate::errors::{CalcError, CalcResult};
use crate::reference::{Query, Row, Table};

/// Decimal places kept on every resolved coefficient.
pub const COEFFICIENT_DECIMALS: i32 = 3;

impl Table {
    /// First row matching every criterion of the query.
    pub fn find(&self, query: &Query) -> CalcResult<&Row> {
        self.rows()
            .iter()
            .find(|row| query.matches(row))
            .ok_or_else(|| CalcError::unresolved(self.name().as_str(), query.to_string()))
    }

    /// All matching rows, in table order.
    pub fn filter(&self, query: &Query) -> Vec<&Row> {
        self.rows().iter().filter(|row| query.matches(row)).collect()
    }

    /// Row stored under an identifier (`id` column).
    pub fn by_id(&self, id: &str) -> CalcResult<&Row> {
        self.find(&Query::new().eq("id", id))
    }

    /// Numeric column of the first matching row.
    pub fn value(&self, query: &Query, column: &str) -> CalcResult<f64> {
        let row = self.find(query)?;
        row.number(column).ok_or_else(|| {
            CalcError::unresolved(self.name().as_str(), format!("{} (no '{}' column)", query, column))
        })
    }

    /// Interpolate `y_column` over `x_column` among the rows matching `query`.
    pub fn interpolate(&self, query: &Query, x_column: &str, y_column: &str, target: f64) -> CalcResult<f64> {
        let points: Vec<(f64, f64)> = self
            .filter(query)
            .into_iter()
            .filter_map(|row| Some((row.number(x_column)?, row.number(y_column)?)))
            .collect();
        interpolate_points(&points, target).ok_or_else(|| {
            CalcError::unresolved(
                self.name().as_str(),
                format!("{} ({} at {}={})", query, y_column, x_column, target),
            )
        })
    }

    /// Row whose thickness bracket contains `value` among the rows matching `query`.
    ///
    /// See [`bracket_row`].
    pub fn bracket(&self, query: &Query, column: &str, value: Option<f64>) -> CalcResult<&Row> {
        let rows = self.filter(query);
        bracket_row(&rows, column, value)
            .ok_or_else(|| CalcError::unresolved(self.name().as_str(), query.to_string()))
    }
}

/// Linear interpolation over tabulated `(x, y)` points.
///
/// - a target equal to a tabulated `x` returns that row's `y` (first one wins)
/// - a target between two tabulated values interpolates linearly
/// - outside the range, extrapolates with the nearest pair of distinct points
/// - a single distinct `x` returns its `y`
///
/// Results are floored at 0. Returns `None` when there are no points.
pub fn interpolate_points(points: &[(f64, f64)], target: f64) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    if let Some((_, y)) = points.iter().find(|(x, _)| *x == target) {
        return Some(*y);
    }

    let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    let mut ordered = points.to_vec();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
    for point in ordered {
        // Stable sort keeps table order among duplicates; keep the first
        if sorted.last().map_or(true, |last| last.0 != point.0) {
            sorted.push(point);
        }
    }
    if sorted.len() == 1 {
        return Some(sorted[0].1);
    }

    let upper = sorted.iter().position(|(x, _)| *x > target);
    let (lo, hi) = match upper {
        Some(0) => (sorted[0], sorted[1]),
        Some(i) => (sorted[i - 1], sorted[i]),
        None => (sorted[sorted.len() - 2], sorted[sorted.len() - 1]),
    };
    let slope = (hi.1 - lo.1) / (hi.0 - lo.0);
    Some((lo.1 + slope * (target - lo.0)).max(0.0))
}

/// Value closest to `target`; ties go to the first one.
pub fn nearest(values: &[f64], target: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for &v in values {
        match best {
            Some(b) if (v - target).abs() >= (b - target).abs() => {}
            _ => best = Some(v),
        }
    }
    best
}

/// Select the row whose bracket on `column` contains `value`.
///
/// Rows carrying the column are taken in ascending order of that column. The
/// first row whose successor's threshold exceeds `value` wins; past the last
/// threshold the last row wins. An absent value selects the first row, as
/// does a set of rows without the column (single fixed-value material).
pub fn bracket_row<'a>(rows: &[&'a Row], column: &str, value: Option<f64>) -> Option<&'a Row> {
    let mut graded: Vec<(f64, &'a Row)> = rows
        .iter()
        .filter_map(|row| row.number(column).map(|t| (t, *row)))
        .collect();
    if graded.is_empty() {
        return rows.first().copied();
    }
    graded.sort_by(|a, b| a.0.total_cmp(&b.0));

    let value = match value {
        Some(v) => v,
        None => return Some(graded[0].1),
    };
    for (i, (_, row)) in graded.iter().enumerate() {
        match graded.get(i + 1) {
            Some((next, _)) if *next > value => {
                debug!(column, value, threshold = graded[i].0, "selected bracket row");
                return Some(*row);
            }
            Some(_) => continue,
            None => return Some(*row),
        }
    }
    None
}

/// Round to the published precision.
pub fn round_coefficient(value: f64) -> f64 {
    let factor = 10f64.powi(COEFFICIENT_DECIMALS);
    (value * factor).round() / factor
}

/// Add a thermal resistance in series: `1 / (1/u + r)`.
pub fn add_resistance(u: f64, r: f64) -> f64 {
    if u <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 / u + r)
}
