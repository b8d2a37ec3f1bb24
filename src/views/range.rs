//! Value-range narrowing for the per-exam count/total table.

use super::ViewError;
use crate::data::currency::format_plain;

/// Observed bounds of a column; only built when `min < max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Bounds of `values`, or `InsufficientVariation` when every value is equal.
    /// `None` when there are no values at all.
    pub fn observe(column: &str, values: &[f64]) -> Option<Result<Self, ViewError>> {
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        if min == max {
            return Some(Err(ViewError::InsufficientVariation {
                column: column.to_string(),
                value: format_plain(min, 2),
            }));
        }
        Some(Ok(Self { min, max }))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// User-chosen bounds; `None` leaves that column unfiltered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeSelection {
    pub count: Option<ValueRange>,
    pub total: Option<ValueRange>,
}

impl RangeSelection {
    pub fn accepts(&self, count: f64, total: f64) -> bool {
        self.count.map_or(true, |r| r.contains(count))
            && self.total.map_or(true, |r| r.contains(total))
    }
}
