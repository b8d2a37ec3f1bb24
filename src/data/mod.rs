//! Data module - spreadsheet loading, cleaning and derived columns

mod cache;
pub mod currency;
pub mod dates;
mod exams;
mod loader;
mod patients;

pub use cache::{Dataset, DatasetCache};
pub use dates::{AgeBand, Period};
pub use exams::{exam_frame, ExamRecord, ExamTable};
pub use loader::{DataLoader, LoadError};
pub use patients::{
    exam_link_frame, patient_frame, split_exams, ExamLink, PatientRecord, PatientTable,
    PreparationReport, RowIssue,
};

use thiserror::Error;

/// A single cell that could not be normalized.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid monetary value '{0}'")]
    Currency(String),
    #[error("invalid date '{0}'")]
    Date(String),
    #[error("empty value")]
    Empty,
}
