//! Rolling Window Module
//! Selects the "yesterday", "last days" and "last month" subsets of the exam table.

use crate::data::{ExamRecord, Period};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeSet;

/// How the month window is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MonthWindow {
    /// Rows in the period of the latest observed date.
    LatestMonth,
    /// Rows within `days` calendar days up to and including the latest date.
    TrailingDays { days: u32 },
}

impl Default for MonthWindow {
    fn default() -> Self {
        MonthWindow::LatestMonth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
    #[default]
    Yesterday,
    LastDays,
    LastMonth,
}

impl WindowKind {
    pub const ALL: [WindowKind; 3] = [
        WindowKind::Yesterday,
        WindowKind::LastDays,
        WindowKind::LastMonth,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WindowKind::Yesterday => "Ontem",
            WindowKind::LastDays => "Últimos dias",
            WindowKind::LastMonth => "Último mês",
        }
    }
}

/// A borrowed subset of the exam table.
#[derive(Debug, Clone, Default)]
pub struct Window<'a> {
    pub rows: Vec<&'a ExamRecord>,
    pub distinct_days: usize,
}

impl<'a> Window<'a> {
    fn from_rows(rows: Vec<&'a ExamRecord>) -> Self {
        let distinct_days = rows.iter().map(|r| r.date).collect::<BTreeSet<_>>().len();
        Self {
            rows,
            distinct_days,
        }
    }

    pub fn exam_count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_amount(&self) -> f64 {
        self.rows.iter().map(|r| r.amount).sum()
    }

    /// Rows per distinct observed day; gaps in the data raise the average.
    pub fn daily_average(&self) -> f64 {
        if self.distinct_days == 0 {
            0.0
        } else {
            self.exam_count() as f64 / self.distinct_days as f64
        }
    }

    /// Restrict the window to one insurer.
    pub fn for_insurer(&self, insurer: &str) -> Window<'a> {
        Self::from_rows(
            self.rows
                .iter()
                .copied()
                .filter(|r| r.insurer == insurer)
                .collect(),
        )
    }
}

/// The three rolling windows, anchored on the latest observed date.
#[derive(Debug, Clone, Default)]
pub struct RollingWindows<'a> {
    pub yesterday: Window<'a>,
    pub last_days: Window<'a>,
    pub last_month: Window<'a>,
}

impl<'a> RollingWindows<'a> {
    pub fn select(records: &'a [ExamRecord], recent_days: usize, month: MonthWindow) -> Self {
        let Some(latest) = records.iter().map(|r| r.date).max() else {
            return Self::default();
        };

        let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
        let recent: BTreeSet<NaiveDate> = dates.iter().rev().take(recent_days).copied().collect();

        let in_month = |date: NaiveDate| match month {
            MonthWindow::LatestMonth => Period::of(latest).contains(date),
            MonthWindow::TrailingDays { days } => date > latest - Duration::days(i64::from(days)),
        };

        Self {
            yesterday: filtered(records, |r| r.date == latest),
            last_days: filtered(records, |r| recent.contains(&r.date)),
            last_month: filtered(records, |r| in_month(r.date)),
        }
    }

    pub fn get(&self, kind: WindowKind) -> &Window<'a> {
        match kind {
            WindowKind::Yesterday => &self.yesterday,
            WindowKind::LastDays => &self.last_days,
            WindowKind::LastMonth => &self.last_month,
        }
    }
}

fn filtered<'a>(records: &'a [ExamRecord], keep: impl Fn(&ExamRecord) -> bool) -> Window<'a> {
    Window::from_rows(records.iter().filter(|r| keep(r)).collect())
}
