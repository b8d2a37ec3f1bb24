//! Exam Billing Table
//! Preparation of the exam export: one row per exam transaction.

use super::currency::parse_decimal_comma;
use super::dates::{parse_date, Period};
use super::{DataLoader, Dataset, LoadError, ParseError};
use crate::config::{DashboardConfig, ExamColumns};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// One prepared exam transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamRecord {
    pub date: NaiveDate,
    pub description: String,
    pub insurer: String,
    pub amount: f64,
    pub period: Period,
}

/// Immutable, date-sorted exam table.
#[derive(Debug, Clone, Default)]
pub struct ExamTable {
    records: Vec<ExamRecord>,
}

impl ExamTable {
    /// Prepare the raw export. Any malformed cell aborts the load.
    pub fn prepare(df: &DataFrame, columns: &ExamColumns) -> Result<Self, LoadError> {
        let dates = DataLoader::text_column(df, &columns.date)?;
        let descriptions = DataLoader::text_column(df, &columns.description)?;
        let insurers = DataLoader::text_column(df, &columns.insurer)?;
        let amounts = DataLoader::text_column(df, &columns.amount)?;

        let mut records = Vec::with_capacity(df.height());
        for (i, (((date, description), insurer), amount)) in dates
            .into_iter()
            .zip(descriptions)
            .zip(insurers)
            .zip(amounts)
            .enumerate()
        {
            // Header is spreadsheet row 1.
            let row = i + 2;
            let date = required(date, row, &columns.date)
                .and_then(|s| parse_date(&s).map_err(|e| invalid(row, &columns.date, e)))?;
            let amount = required(amount, row, &columns.amount).and_then(|s| {
                parse_decimal_comma(&s).map_err(|e| invalid(row, &columns.amount, e))
            })?;

            records.push(ExamRecord {
                date,
                description: required(description, row, &columns.description)?,
                insurer: required(insurer, row, &columns.insurer)?,
                amount,
                period: Period::of(date),
            });
        }

        // Stable, so same-day rows keep file order.
        records.sort_by_key(|r| r.date);
        info!("Prepared {} exam records", records.len());
        Ok(Self { records })
    }

    pub fn from_records(mut records: Vec<ExamRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[ExamRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Distinct insurers in first-encounter order.
    pub fn insurers<'a>(records: impl IntoIterator<Item = &'a ExamRecord>) -> Vec<String> {
        distinct(records.into_iter().map(|r| r.insurer.as_str()))
    }

    /// Distinct exam descriptions in first-encounter order.
    pub fn descriptions<'a>(records: impl IntoIterator<Item = &'a ExamRecord>) -> Vec<String> {
        distinct(records.into_iter().map(|r| r.description.as_str()))
    }
}

impl Dataset for ExamTable {
    fn load(path: &Path, config: &DashboardConfig) -> Result<Self, LoadError> {
        let separator = config.separator().unwrap_or(b',');
        let df = DataLoader::new(separator).load(path)?;
        Self::prepare(&df, &config.exam_columns)
    }

    fn row_count(&self) -> usize {
        self.len()
    }
}

/// Frame used by the aggregations: `day`, `period`, `description`, `insurer`, `amount`.
pub fn exam_frame(records: &[&ExamRecord]) -> PolarsResult<DataFrame> {
    let days: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
    let periods: Vec<String> = records.iter().map(|r| r.period.key()).collect();
    let descriptions: Vec<&str> = records.iter().map(|r| r.description.as_str()).collect();
    let insurers: Vec<&str> = records.iter().map(|r| r.insurer.as_str()).collect();
    let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();

    DataFrame::new(vec![
        Column::new("day".into(), days),
        Column::new("period".into(), periods),
        Column::new("description".into(), descriptions),
        Column::new("insurer".into(), insurers),
        Column::new("amount".into(), amounts),
    ])
}

fn required(value: Option<String>, row: usize, column: &str) -> Result<String, LoadError> {
    value.ok_or_else(|| invalid(row, column, ParseError::Empty))
}

fn invalid(row: usize, column: &str, source: ParseError) -> LoadError {
    LoadError::InvalidCell {
        row,
        column: column.to_string(),
        source,
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[(&str, &str, &str, &str)]) -> DataFrame {
        DataFrame::new(vec![
            Column::new("Data".into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Column::new("Descrição".into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Column::new("Convênio".into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Column::new("Valor".into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn prepares_and_sorts_by_date() {
        let df = raw(&[
            ("2025-04-02", "Hemograma", "UNIMED", "35,00"),
            ("2025-03-31", "Glicemia", "PARTICULAR", "12,5"),
            ("2025-04-02", "Ureia", "UNIMED", "20,10"),
        ]);
        let table = ExamTable::prepare(&df, &ExamColumns::default()).unwrap();

        let records = table.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].description, "Glicemia");
        assert_eq!(records[0].amount, 12.5);
        assert_eq!(records[1].description, "Hemograma");
        assert_eq!(records[2].description, "Ureia");
        assert_eq!(records[2].period.key(), "2025-04");
        assert_eq!(
            table.max_date(),
            NaiveDate::from_ymd_opt(2025, 4, 2)
        );
    }

    #[test]
    fn malformed_amount_is_fatal_with_location() {
        let df = raw(&[
            ("2025-04-02", "Hemograma", "UNIMED", "35,00"),
            ("2025-04-02", "Ureia", "UNIMED", "vinte"),
        ]);
        let err = ExamTable::prepare(&df, &ExamColumns::default()).unwrap_err();
        match err {
            LoadError::InvalidCell { row, column, source } => {
                assert_eq!(row, 3);
                assert_eq!(column, "Valor");
                assert_eq!(source, ParseError::Currency("vinte".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_date_is_fatal() {
        let df = raw(&[("02-04-2025x", "Hemograma", "UNIMED", "35,00")]);
        let err = ExamTable::prepare(&df, &ExamColumns::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidCell { row: 2, source: ParseError::Date(_), .. }
        ));
    }

    #[test]
    fn distinct_values_keep_encounter_order() {
        let df = raw(&[
            ("2025-04-01", "A", "UNIMED", "1,00"),
            ("2025-04-01", "B", "AMIL", "1,00"),
            ("2025-04-01", "A", "UNIMED", "1,00"),
            ("2025-04-01", "C", "BRADESCO", "1,00"),
        ]);
        let table = ExamTable::prepare(&df, &ExamColumns::default()).unwrap();
        assert_eq!(
            ExamTable::insurers(table.records()),
            vec!["UNIMED", "AMIL", "BRADESCO"]
        );
        assert_eq!(ExamTable::descriptions(table.records()), vec!["A", "B", "C"]);
    }

    #[test]
    fn frame_has_aggregation_columns() {
        let df = raw(&[("2025-04-01", "A", "UNIMED", "1,50")]);
        let table = ExamTable::prepare(&df, &ExamColumns::default()).unwrap();
        let refs: Vec<&ExamRecord> = table.records().iter().collect();
        let frame = exam_frame(&refs).unwrap();
        assert_eq!(frame.height(), 1);
        assert_eq!(
            frame
                .get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            vec!["day", "period", "description", "insurer", "amount"]
        );
    }
}
