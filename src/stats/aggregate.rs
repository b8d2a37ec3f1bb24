//! Aggregation Module
//! Grouped counts, sums and means over the prepared frames.
//!
//! Every grouping uses `group_by_stable`, and every ranking sort keeps
//! insertion order for ties, so equal groups stay in first-encounter order.
//! Rows whose grouping key is null are left out of that grouping only.

use crate::data::Period;
use polars::prelude::*;
use std::collections::HashMap;

/// What each group is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Count,
    Sum,
    Mean,
}

impl Metric {
    fn expr(self, value: &str) -> Expr {
        match self {
            Metric::Count => len().cast(DataType::Float64),
            Metric::Sum => col(value).sum(),
            Metric::Mean => col(value).mean(),
        }
        .alias("value")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupValue {
    pub group: String,
    pub value: f64,
}

/// Count, total and mean ("ticket médio") of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    pub group: String,
    pub count: u64,
    pub total: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketOrder {
    Count,
    Total,
    Mean,
}

/// A group's share of its period total, in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareRow {
    pub period: Period,
    pub group: String,
    pub value: f64,
    pub percent: f64,
}

/// One point of a per-period series; `series` is the secondary key, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodPoint {
    pub period: Period,
    pub series: Option<String>,
    pub value: f64,
}

/// Two-key table; absent combinations hold 0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Crosstab {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Crosstab {
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        Some(self.values[r][c])
    }

    /// Sort rows by one column, descending; ties keep their order.
    pub fn sort_rows_by(&mut self, column: &str) {
        let Some(c) = self.columns.iter().position(|x| x == column) else {
            return;
        };
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by(|&a, &b| self.values[b][c].total_cmp(&self.values[a][c]));
        self.rows = order.iter().map(|&i| self.rows[i].clone()).collect();
        self.values = order.iter().map(|&i| self.values[i].clone()).collect();
    }

    /// Put the listed columns first, in the given order.
    pub fn order_columns(&mut self, order: &[&str]) {
        let mut index: Vec<usize> = order
            .iter()
            .filter_map(|name| self.columns.iter().position(|c| c == name))
            .collect();
        let rest: Vec<usize> = (0..self.columns.len())
            .filter(|i| !index.contains(i))
            .collect();
        index.extend(rest);
        self.columns = index.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.values {
            *row = index.iter().map(|&i| row[i]).collect();
        }
    }

    /// Put the listed rows first, in the given order.
    pub fn order_rows(&mut self, order: &[&str]) {
        let mut index: Vec<usize> = order
            .iter()
            .filter_map(|name| self.rows.iter().position(|r| r == name))
            .collect();
        let rest: Vec<usize> = (0..self.rows.len())
            .filter(|i| !index.contains(i))
            .collect();
        index.extend(rest);
        self.rows = index.iter().map(|&i| self.rows[i].clone()).collect();
        self.values = index.iter().map(|&i| self.values[i].clone()).collect();
    }
}

/// Stateless grouped aggregations over polars frames.
pub struct Aggregator;

impl Aggregator {
    /// Groups ranked by `metric`, descending, optionally truncated to `top`.
    pub fn ranking(
        df: &DataFrame,
        key: &str,
        value: &str,
        metric: Metric,
        top: Option<usize>,
    ) -> PolarsResult<Vec<GroupValue>> {
        let mut lf = grouped(df, &[key])
            .agg([metric.expr(value)])
            .sort(["value"], descending());
        if let Some(n) = top {
            lf = lf.limit(n as IdxSize);
        }
        let out = lf.collect()?;

        let groups = strings(&out, key)?;
        let values = floats(&out, "value")?;
        Ok(groups
            .into_iter()
            .zip(values)
            .map(|(group, value)| GroupValue { group, value })
            .collect())
    }

    /// Per-group aggregate in first-encounter order, unsorted.
    pub fn per_group(
        df: &DataFrame,
        key: &str,
        value: &str,
        metric: Metric,
    ) -> PolarsResult<Vec<GroupValue>> {
        let out = grouped(df, &[key]).agg([metric.expr(value)]).collect()?;
        let groups = strings(&out, key)?;
        let values = floats(&out, "value")?;
        Ok(groups
            .into_iter()
            .zip(values)
            .map(|(group, value)| GroupValue { group, value })
            .collect())
    }

    /// Count, total and mean per group, sorted descending by `order`.
    pub fn tickets(
        df: &DataFrame,
        key: &str,
        value: &str,
        order: TicketOrder,
    ) -> PolarsResult<Vec<TicketRow>> {
        let sort_by = match order {
            TicketOrder::Count => "count",
            TicketOrder::Total => "total",
            TicketOrder::Mean => "mean",
        };
        let out = grouped(df, &[key])
            .agg([
                len().cast(DataType::UInt64).alias("count"),
                col(value).sum().alias("total"),
                col(value).mean().alias("mean"),
            ])
            .sort([sort_by], descending())
            .collect()?;

        let groups = strings(&out, key)?;
        let counts = floats(&out, "count")?;
        let totals = floats(&out, "total")?;
        let means = floats(&out, "mean")?;
        Ok(groups
            .into_iter()
            .zip(counts)
            .zip(totals.into_iter().zip(means))
            .map(|((group, count), (total, mean))| TicketRow {
                group,
                count: count as u64,
                total,
                mean,
            })
            .collect())
    }

    /// Each group's share of its period, by sum (`Metric::Sum`) or row count.
    /// Periods totalling zero have no shares and are left out.
    pub fn shares(
        df: &DataFrame,
        period: &str,
        key: &str,
        value: &str,
        metric: Metric,
    ) -> PolarsResult<Vec<ShareRow>> {
        let points = Self::series(df, period, Some(key), value, metric)?;

        let mut totals: HashMap<Period, f64> = HashMap::new();
        for p in &points {
            *totals.entry(p.period).or_default() += p.value;
        }

        Ok(points
            .into_iter()
            .filter_map(|p| {
                let total = totals.get(&p.period).copied().filter(|t| *t > 0.0)?;
                Some(ShareRow {
                    period: p.period,
                    group: p.series.unwrap_or_default(),
                    value: p.value,
                    percent: p.value / total * 100.0,
                })
            })
            .collect())
    }

    /// Per-period series, ascending by period, optionally split by `secondary`.
    pub fn series(
        df: &DataFrame,
        period: &str,
        secondary: Option<&str>,
        value: &str,
        metric: Metric,
    ) -> PolarsResult<Vec<PeriodPoint>> {
        let keys: Vec<&str> = std::iter::once(period).chain(secondary).collect();
        let out = grouped(df, &keys)
            .agg([metric.expr(value)])
            .sort([period], SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;

        let periods = strings(&out, period)?;
        let series = match secondary {
            Some(name) => strings(&out, name)?.into_iter().map(Some).collect(),
            None => vec![None; out.height()],
        };
        let values = floats(&out, "value")?;

        Ok(periods
            .iter()
            .zip(series)
            .zip(values)
            .filter_map(|((key, series), value)| {
                Period::from_key(key).map(|period| PeriodPoint {
                    period,
                    series,
                    value,
                })
            })
            .collect())
    }

    /// Two-key table of `metric`, rows and columns in first-encounter order.
    pub fn crosstab(
        df: &DataFrame,
        row: &str,
        column: &str,
        value: &str,
        metric: Metric,
    ) -> PolarsResult<Crosstab> {
        let out = grouped(df, &[row, column])
            .agg([metric.expr(value)])
            .collect()?;

        let row_keys = strings(&out, row)?;
        let column_keys = strings(&out, column)?;
        let values = floats(&out, "value")?;

        let mut table = Crosstab::default();
        for r in &row_keys {
            if !table.rows.contains(r) {
                table.rows.push(r.clone());
            }
        }
        for c in &column_keys {
            if !table.columns.contains(c) {
                table.columns.push(c.clone());
            }
        }
        table.values = vec![vec![0.0; table.columns.len()]; table.rows.len()];
        for ((r, c), v) in row_keys.iter().zip(&column_keys).zip(values) {
            let (Some(ri), Some(ci)) = (
                table.rows.iter().position(|x| x == r),
                table.columns.iter().position(|x| x == c),
            ) else {
                continue;
            };
            table.values[ri][ci] = v;
        }
        Ok(table)
    }

    /// Mean over days of the per-day row count, per period.
    pub fn daily_average_per_period(
        df: &DataFrame,
        period: &str,
        day: &str,
    ) -> PolarsResult<Vec<PeriodPoint>> {
        let per_day = grouped(df, &[period, day])
            .agg([len().cast(DataType::Float64).alias("count")])
            .collect()?;
        let out = per_day
            .lazy()
            .group_by_stable([col(period)])
            .agg([col("count").mean().alias("value")])
            .sort([period], SortMultipleOptions::default().with_maintain_order(true))
            .collect()?;

        let periods = strings(&out, period)?;
        let values = floats(&out, "value")?;
        Ok(periods
            .iter()
            .zip(values)
            .filter_map(|(key, value)| {
                Period::from_key(key).map(|period| PeriodPoint {
                    period,
                    series: None,
                    value,
                })
            })
            .collect())
    }
}

/// Stable grouping on `keys`, dropping rows with a null key.
fn grouped(df: &DataFrame, keys: &[&str]) -> LazyGroupBy {
    let not_null = keys
        .iter()
        .map(|k| col(*k).is_not_null())
        .reduce(|a, b| a.and(b))
        .unwrap_or_else(|| lit(true));
    df.clone()
        .lazy()
        .filter(not_null)
        .group_by_stable(keys.iter().map(|k| col(*k)).collect::<Vec<_>>())
}

fn descending() -> SortMultipleOptions {
    SortMultipleOptions::default()
        .with_order_descending(true)
        .with_maintain_order(true)
}

fn strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();
    Ok(values)
}

fn floats(df: &DataFrame, name: &str) -> PolarsResult<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();
    Ok(values)
}
