//! Views module - pure (view, filters) -> panels functions for both dashboards

mod exams;
mod patients;
mod range;

pub use exams::{ExamDashboard, ExamFilters, ExamView, RangeBounds, TemporalMetric};
pub use patients::{PatientDashboard, PatientView, FEMALE, MALE};
pub use range::{RangeSelection, ValueRange};

use crate::charts::ChartData;
use crate::stats::{Crosstab, GroupValue, TicketRow};
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Aggregation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("Not enough variation in '{column}': every value is {value}")]
    InsufficientVariation { column: String, value: String },
}

/// One headline number.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    pub detail: Option<String>,
}

impl MetricCard {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Already-formatted table cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn from_groups(
        headers: [&str; 2],
        groups: &[GroupValue],
        format: impl Fn(f64) -> String,
    ) -> Self {
        let mut table = Self::new(&headers);
        for g in groups {
            table.push(vec![g.group.clone(), format(g.value)]);
        }
        table
    }

    /// Group, count, total and mean columns.
    pub fn from_tickets(key: &str, rows: &[TicketRow]) -> Self {
        use crate::data::currency::{format_brl, format_plain};

        let mut table = Self::new(&[key, "Quantidade", "Valor total", "Ticket médio"]);
        for r in rows {
            table.push(vec![
                r.group.clone(),
                format_plain(r.count as f64, 0),
                format_brl(r.total, 2),
                format_brl(r.mean, 2),
            ]);
        }
        table
    }

    pub fn from_crosstab(corner: &str, crosstab: &Crosstab, format: impl Fn(f64) -> String) -> Self {
        let mut headers = vec![corner.to_string()];
        headers.extend(crosstab.columns.iter().cloned());
        let rows = crosstab
            .rows
            .iter()
            .zip(&crosstab.values)
            .map(|(name, values)| {
                std::iter::once(name.clone())
                    .chain(values.iter().map(|v| format(*v)))
                    .collect()
            })
            .collect();
        Self { headers, rows }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Metrics(Vec<MetricCard>),
    Table(DataTable),
    Chart(ChartData),
    Notice(String),
}

/// A titled block of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub content: PanelContent,
}

impl Panel {
    pub fn metrics(title: impl Into<String>, cards: Vec<MetricCard>) -> Self {
        Self::new(title, PanelContent::Metrics(cards))
    }

    pub fn table(title: impl Into<String>, table: DataTable) -> Self {
        Self::new(title, PanelContent::Table(table))
    }

    pub fn chart(title: impl Into<String>, chart: ChartData) -> Self {
        Self::new(title, PanelContent::Chart(chart))
    }

    pub fn notice(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(title, PanelContent::Notice(text.into()))
    }

    fn new(title: impl Into<String>, content: PanelContent) -> Self {
        Self {
            title: title.into(),
            content,
        }
    }

    pub fn as_chart(&self) -> Option<&ChartData> {
        match &self.content {
            PanelContent::Chart(chart) => Some(chart),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_table_formats_cells() {
        let rows = vec![TicketRow {
            group: "UNIMED".into(),
            count: 1200,
            total: 1234.5,
            mean: 1.5,
        }];
        let table = DataTable::from_tickets("Convênio", &rows);
        assert_eq!(table.headers[0], "Convênio");
        assert_eq!(
            table.rows[0],
            vec!["UNIMED", "1.200", "R$ 1.234,50", "R$ 1,50"]
        );
    }

    #[test]
    fn crosstab_table_has_corner_header() {
        let crosstab = Crosstab {
            rows: vec!["UNIMED".into()],
            columns: vec!["F".into(), "M".into()],
            values: vec![vec![10.0, 0.0]],
        };
        let table = DataTable::from_crosstab("Convênio", &crosstab, |v| format!("{v:.0}"));
        assert_eq!(table.headers, vec!["Convênio", "F", "M"]);
        assert_eq!(table.rows[0], vec!["UNIMED", "10", "0"]);
    }
}
