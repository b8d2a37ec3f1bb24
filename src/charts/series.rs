//! Chart Series Module
//! Toolkit-independent chart description built from aggregation results.

use crate::data::currency::{format_brl, format_percent, format_plain};
use crate::data::Period;
use crate::stats::{GroupValue, PeriodPoint, ShareRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bars,
    HorizontalBars,
    StackedBars,
    Lines,
}

/// How y values are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    Count,
    Decimal,
    Currency,
    Percent,
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            ValueFormat::Count => format_plain(value, 0),
            ValueFormat::Decimal => format_plain(value, 1),
            ValueFormat::Currency => format_brl(value, 2),
            ValueFormat::Percent => format_percent(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Categories on x, one or more aligned series on y.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub kind: ChartKind,
    pub x_labels: Vec<String>,
    pub series: Vec<Series>,
    pub y_title: String,
    pub format: ValueFormat,
}

impl ChartData {
    /// One bar per group, in ranking order.
    pub fn from_groups(
        kind: ChartKind,
        name: &str,
        groups: &[GroupValue],
        y_title: &str,
        format: ValueFormat,
    ) -> Self {
        Self {
            kind,
            x_labels: groups.iter().map(|g| g.group.clone()).collect(),
            series: vec![Series {
                name: name.to_string(),
                values: groups.iter().map(|g| g.value).collect(),
            }],
            y_title: y_title.to_string(),
            format,
        }
    }

    /// Periods on x; one series per secondary key, or a single `name` series.
    /// Periods missing from a series are drawn as 0.
    pub fn from_points(
        kind: ChartKind,
        name: &str,
        points: &[PeriodPoint],
        y_title: &str,
        format: ValueFormat,
    ) -> Self {
        let periods = sorted_periods(points.iter().map(|p| p.period));
        let mut series: Vec<Series> = Vec::new();

        for point in points {
            let series_name = point.series.as_deref().unwrap_or(name);
            let index = match series.iter().position(|s| s.name == series_name) {
                Some(i) => i,
                None => {
                    series.push(Series {
                        name: series_name.to_string(),
                        values: vec![0.0; periods.len()],
                    });
                    series.len() - 1
                }
            };
            if let Some(x) = periods.iter().position(|p| *p == point.period) {
                series[index].values[x] = point.value;
            }
        }

        Self {
            kind,
            x_labels: periods.iter().map(Period::to_string).collect(),
            series,
            y_title: y_title.to_string(),
            format,
        }
    }

    /// Stacked percentage bars: periods on x, one series per group.
    pub fn from_shares(shares: &[ShareRow], y_title: &str) -> Self {
        let points: Vec<PeriodPoint> = shares
            .iter()
            .map(|s| PeriodPoint {
                period: s.period,
                series: Some(s.group.clone()),
                value: s.percent,
            })
            .collect();
        Self::from_points(
            ChartKind::StackedBars,
            "",
            &points,
            y_title,
            ValueFormat::Percent,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.x_labels.is_empty() || self.series.is_empty()
    }

    /// Largest bar height, counting stacks as their sum.
    pub fn max_value(&self) -> f64 {
        let per_x = |x: usize| -> f64 {
            match self.kind {
                ChartKind::StackedBars => self.series.iter().map(|s| s.values[x]).sum(),
                _ => self
                    .series
                    .iter()
                    .map(|s| s.values[x])
                    .fold(f64::MIN, f64::max),
            }
        };
        (0..self.x_labels.len()).map(per_x).fold(0.0, f64::max)
    }
}

/// Category label at axis position `value`, if it sits on a category slot.
/// `reversed` maps slot 0 to the last label, as horizontal bars are drawn.
pub fn category_at(labels: &[String], value: f64, reversed: bool) -> Option<&String> {
    let rounded = value.round();
    if (value - rounded).abs() > 0.01 || rounded < 0.0 {
        return None;
    }
    let slot = rounded as usize;
    let index = if reversed {
        labels.len().checked_sub(slot + 1)?
    } else {
        slot
    };
    labels.get(index)
}

fn sorted_periods(periods: impl Iterator<Item = Period>) -> Vec<Period> {
    let mut out: Vec<Period> = periods.collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(key: &str) -> Period {
        Period::from_key(key).unwrap()
    }

    #[test]
    fn points_align_series_on_sorted_periods() {
        let points = vec![
            PeriodPoint { period: period("2025-02"), series: Some("F".into()), value: 3.0 },
            PeriodPoint { period: period("2025-01"), series: Some("M".into()), value: 1.0 },
            PeriodPoint { period: period("2025-01"), series: Some("F".into()), value: 2.0 },
        ];
        let chart = ChartData::from_points(ChartKind::Lines, "Total", &points, "R$", ValueFormat::Currency);

        assert_eq!(chart.x_labels, vec!["01/2025", "02/2025"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "F");
        assert_eq!(chart.series[0].values, vec![2.0, 3.0]);
        assert_eq!(chart.series[1].values, vec![1.0, 0.0]);
        assert_eq!(chart.max_value(), 3.0);
    }

    #[test]
    fn single_series_uses_given_name() {
        let points = vec![PeriodPoint { period: period("2025-01"), series: None, value: 5.0 }];
        let chart = ChartData::from_points(ChartKind::Bars, "Média", &points, "", ValueFormat::Decimal);
        assert_eq!(chart.series[0].name, "Média");
    }

    #[test]
    fn stacked_max_is_column_sum() {
        let shares = vec![
            ShareRow { period: period("2025-01"), group: "A".into(), value: 1.0, percent: 25.0 },
            ShareRow { period: period("2025-01"), group: "B".into(), value: 3.0, percent: 75.0 },
        ];
        let chart = ChartData::from_shares(&shares, "%");
        assert_eq!(chart.kind, ChartKind::StackedBars);
        assert!((chart.max_value() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn category_lookup_on_slots_only() {
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(category_at(&labels, 1.0, false).map(String::as_str), Some("B"));
        assert_eq!(category_at(&labels, 0.0, true).map(String::as_str), Some("C"));
        assert_eq!(category_at(&labels, 0.5, false), None);
        assert_eq!(category_at(&labels, 3.0, false), None);
        assert_eq!(category_at(&labels, 3.0, true), None);
        assert_eq!(category_at(&labels, -1.0, false), None);
    }

    #[test]
    fn value_formats() {
        assert_eq!(ValueFormat::Currency.format(1234.5), "R$ 1.234,50");
        assert_eq!(ValueFormat::Count.format(1500.0), "1.500");
        assert_eq!(ValueFormat::Percent.format(12.345), "12.3%");
    }
}
