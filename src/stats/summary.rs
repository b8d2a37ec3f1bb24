//! Amount Summary Module
//! Descriptive statistics of monetary amounts.

use statrs::statistics::{Data, Max, Median, Min, OrderStatistics, Statistics};

/// Descriptive statistics for a set of amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountSummary {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for AmountSummary {
    fn default() -> Self {
        Self {
            count: 0,
            total: 0.0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Summarize `values`; an empty slice gives NaN statistics and zero totals.
    pub fn summarize(values: &[f64]) -> AmountSummary {
        let n = values.len();
        if n == 0 {
            return AmountSummary::default();
        }

        let std = if n > 1 { values.std_dev() } else { 0.0 };
        let mut data = Data::new(values.to_vec());

        AmountSummary {
            count: n,
            total: values.iter().sum(),
            mean: values.mean(),
            median: data.median(),
            std,
            min: data.min(),
            max: data.max(),
            p05: data.percentile(5),
            p95: data.percentile(95),
        }
    }
}
