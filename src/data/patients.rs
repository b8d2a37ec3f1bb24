//! Patient Registration Table
//! Preparation of the patient export: one row per visit, with derived age,
//! age band, period and the exploded visit → exam relationship.

use super::currency::parse_brl_cents;
use super::dates::{age_years, parse_date_lenient, AgeBand, Period};
use super::{DataLoader, Dataset, LoadError, ParseError};
use crate::config::{DashboardConfig, PatientColumns};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// One prepared patient visit.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub birth_date: Option<NaiveDate>,
    pub registration_date: Option<NaiveDate>,
    pub age: Option<i64>,
    pub age_band: Option<AgeBand>,
    pub sex: Option<String>,
    pub insurer: Option<String>,
    pub fee_amount: f64,
    pub final_amount: f64,
    pub exams: Vec<String>,
    pub period: Option<Period>,
}

/// A source row that was left out of the prepared table.
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    pub row: usize,
    pub column: String,
    pub error: ParseError,
}

/// What preparation dropped or degraded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparationReport {
    pub dropped: Vec<RowIssue>,
    pub missing_birth_dates: usize,
    pub missing_registration_dates: usize,
}

/// One exam performed in one visit.
#[derive(Debug, Clone, Copy)]
pub struct ExamLink<'a> {
    pub patient: &'a PatientRecord,
    pub exam: &'a str,
}

/// Immutable patient table plus its preparation report.
#[derive(Debug, Clone, Default)]
pub struct PatientTable {
    records: Vec<PatientRecord>,
    report: PreparationReport,
}

impl PatientTable {
    /// Prepare the raw export.
    ///
    /// Unparseable dates become missing values. Rows whose amounts cannot be
    /// normalized are dropped and listed in the report.
    pub fn prepare(df: &DataFrame, columns: &PatientColumns) -> Result<Self, LoadError> {
        let births = DataLoader::text_column(df, &columns.birth_date)?;
        let registrations = DataLoader::text_column(df, &columns.registration_date)?;
        let sexes = DataLoader::text_column(df, &columns.sex)?;
        let insurers = DataLoader::text_column(df, &columns.insurer)?;
        let fees = DataLoader::text_column(df, &columns.fee_amount)?;
        let finals = DataLoader::text_column(df, &columns.final_amount)?;
        let exams = DataLoader::text_column(df, &columns.exams)?;

        let mut report = PreparationReport::default();
        let mut records = Vec::with_capacity(df.height());

        for i in 0..df.height() {
            let row = i + 2;

            let fee_amount = match amount(&fees[i]) {
                Ok(v) => v,
                Err(error) => {
                    report.drop_row(row, &columns.fee_amount, error);
                    continue;
                }
            };
            let final_amount = match amount(&finals[i]) {
                Ok(v) => v,
                Err(error) => {
                    report.drop_row(row, &columns.final_amount, error);
                    continue;
                }
            };

            let birth_date = births[i].as_deref().and_then(parse_date_lenient);
            let registration_date = registrations[i].as_deref().and_then(parse_date_lenient);
            if birth_date.is_none() {
                report.missing_birth_dates += 1;
            }
            if registration_date.is_none() {
                report.missing_registration_dates += 1;
            }

            let age = age_years(birth_date, registration_date);
            records.push(PatientRecord {
                birth_date,
                registration_date,
                age,
                age_band: age.and_then(AgeBand::from_age),
                sex: sexes[i].clone(),
                insurer: insurers[i].clone(),
                fee_amount,
                final_amount,
                exams: exams[i].as_deref().map(split_exams).unwrap_or_default(),
                period: registration_date.map(Period::of),
            });
        }

        info!(
            "Prepared {} patient records ({} dropped, {} without birth date)",
            records.len(),
            report.dropped.len(),
            report.missing_birth_dates
        );
        Ok(Self { records, report })
    }

    pub fn from_records(records: Vec<PatientRecord>) -> Self {
        Self {
            records,
            report: PreparationReport::default(),
        }
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn report(&self) -> &PreparationReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Explode visits into one link per performed exam.
    pub fn exam_links(&self) -> Vec<ExamLink<'_>> {
        self.records
            .iter()
            .flat_map(|patient| {
                patient
                    .exams
                    .iter()
                    .map(move |exam| ExamLink {
                        patient,
                        exam: exam.as_str(),
                    })
            })
            .collect()
    }
}

impl PreparationReport {
    fn drop_row(&mut self, row: usize, column: &str, error: ParseError) {
        warn!("Dropping patient row {}: column '{}' {}", row, column, error);
        self.dropped.push(RowIssue {
            row,
            column: column.to_string(),
            error,
        });
    }
}

impl Dataset for PatientTable {
    fn load(path: &Path, config: &DashboardConfig) -> Result<Self, LoadError> {
        let separator = config.separator().unwrap_or(b',');
        let df = DataLoader::new(separator).load(path)?;
        Self::prepare(&df, &config.patient_columns)
    }

    fn row_count(&self) -> usize {
        self.len()
    }
}

/// Split a comma-separated exam list, trimming names and skipping blanks.
pub fn split_exams(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn amount(raw: &Option<String>) -> Result<f64, ParseError> {
    match raw {
        Some(s) => parse_brl_cents(s),
        None => Err(ParseError::Empty),
    }
}

/// Frame used by the aggregations: `period`, `insurer`, `sex`, `age_band`,
/// `fee_amount`, `final_amount`. Missing values are nulls.
pub fn patient_frame(records: &[&PatientRecord]) -> PolarsResult<DataFrame> {
    let periods: Vec<Option<String>> = records.iter().map(|r| r.period.map(|p| p.key())).collect();
    let insurers: Vec<Option<&str>> = records.iter().map(|r| r.insurer.as_deref()).collect();
    let sexes: Vec<Option<&str>> = records.iter().map(|r| r.sex.as_deref()).collect();
    let bands: Vec<Option<&str>> = records
        .iter()
        .map(|r| r.age_band.map(|b| b.label()))
        .collect();
    let fees: Vec<f64> = records.iter().map(|r| r.fee_amount).collect();
    let finals: Vec<f64> = records.iter().map(|r| r.final_amount).collect();

    DataFrame::new(vec![
        Column::new("period".into(), periods),
        Column::new("insurer".into(), insurers),
        Column::new("sex".into(), sexes),
        Column::new("age_band".into(), bands),
        Column::new("fee_amount".into(), fees),
        Column::new("final_amount".into(), finals),
    ])
}

/// Frame of exploded exams: `exam`, `sex`, `age_band`.
pub fn exam_link_frame(links: &[ExamLink<'_>]) -> PolarsResult<DataFrame> {
    let exams: Vec<&str> = links.iter().map(|l| l.exam).collect();
    let sexes: Vec<Option<&str>> = links.iter().map(|l| l.patient.sex.as_deref()).collect();
    let bands: Vec<Option<&str>> = links
        .iter()
        .map(|l| l.patient.age_band.map(|b| b.label()))
        .collect();

    DataFrame::new(vec![
        Column::new("exam".into(), exams),
        Column::new("sex".into(), sexes),
        Column::new("age_band".into(), bands),
    ])
}
