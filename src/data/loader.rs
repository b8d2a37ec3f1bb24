//! Spreadsheet Loader Module
//! Reads the first sheet of a workbook, or a CSV file, into a text-only
//! Polars DataFrame. Typing happens in the preparers.

use super::ParseError;
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("Failed to build table: {0}")]
    Polars(#[from] PolarsError),
    #[error("Spreadsheet {0} has no sheets")]
    NoSheet(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("Missing column '{0}'")]
    MissingColumn(String),
    #[error("Row {row}, column '{column}': {source}")]
    InvalidCell {
        row: usize,
        column: String,
        source: ParseError,
    },
}

/// Reads raw tables; every column comes back as nullable text.
pub struct DataLoader {
    separator: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl DataLoader {
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }

    /// Load a spreadsheet (`.xlsx`, `.xlsm`, `.xls`, `.ods`) or a `.csv` file.
    pub fn load(&self, path: &Path) -> Result<DataFrame, LoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let df = match extension.as_str() {
            "csv" => self.load_csv(path)?,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::load_workbook(path)?,
            _ => return Err(LoadError::UnsupportedFormat(path.display().to_string())),
        };

        info!(
            "Loaded {} rows, {} columns from {}",
            df.height(),
            df.width(),
            path.display()
        );
        Ok(df)
    }

    /// Load a CSV file with Polars, keeping every column as text.
    fn load_csv(&self, path: &Path) -> Result<DataFrame, LoadError> {
        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_separator(self.separator)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;
        Ok(df)
    }

    /// Load the first sheet of a workbook; the first row is the header.
    fn load_workbook(path: &Path) -> Result<DataFrame, LoadError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::NoSheet(path.display().to_string()))??;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(DataFrame::empty());
        };
        let names: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, cell)| cell_to_text(cell).unwrap_or_else(|| format!("column_{}", i + 1)))
            .collect();

        let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        for row in rows {
            for (i, column) in values.iter_mut().enumerate() {
                column.push(row.get(i).and_then(cell_to_text));
            }
        }
        debug!("Sheet header: {:?}", names);

        let columns = names
            .into_iter()
            .zip(values)
            .map(|(name, vals)| Column::new(name.into(), vals))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// Read a column as nullable text; blank strings count as missing.
    pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, LoadError> {
        let column = df
            .column(name)
            .map_err(|_| LoadError::MissingColumn(name.to_string()))?;
        let text = column.cast(&DataType::String)?;
        let values = text
            .str()?
            .into_iter()
            .map(|v| {
                v.map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .collect();
        Ok(values)
    }
}

/// Render a workbook cell as the text an export would contain.
///
/// Numeric cells use a decimal comma, so they go through the same currency
/// parsers as text amounts. Cent-exact values keep two decimals; anything finer
/// is written in full.
fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(v) => Some(float_text(*v).replace('.', ",")),
        Data::Int(v) => Some(format!("{},00", v)),
        Data::Bool(v) => Some(v.to_string()),
        Data::DateTime(v) => v
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

fn float_text(v: f64) -> String {
    let cents = format!("{:.2}", v);
    if cents.parse::<f64>() == Ok(v) {
        cents
    } else {
        v.to_string()
    }
}
