//! Dashboard configuration, read from an optional JSON file.

use crate::stats::MonthWindow;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "PAINEL_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("CSV separator must be a single ASCII character, got '{0}'")]
    Separator(String),
}

/// Source headers of the exam billing export.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExamColumns {
    pub date: String,
    pub description: String,
    pub insurer: String,
    pub amount: String,
}

impl Default for ExamColumns {
    fn default() -> Self {
        Self {
            date: "Data".to_string(),
            description: "Descrição".to_string(),
            insurer: "Convênio".to_string(),
            amount: "Valor".to_string(),
        }
    }
}

/// Source headers of the patient registration export.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatientColumns {
    pub birth_date: String,
    pub registration_date: String,
    pub sex: String,
    pub insurer: String,
    pub fee_amount: String,
    pub final_amount: String,
    pub exams: String,
}

impl Default for PatientColumns {
    fn default() -> Self {
        Self {
            birth_date: "Data Nasc.".to_string(),
            registration_date: "Data Cad.".to_string(),
            sex: "Sexo".to_string(),
            insurer: "Convênio".to_string(),
            fee_amount: "Valor R$".to_string(),
            final_amount: "Valor Final".to_string(),
            exams: "Exames".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub exams_path: PathBuf,
    pub patients_path: PathBuf,
    pub csv_separator: String,
    pub exam_columns: ExamColumns,
    pub patient_columns: PatientColumns,
    /// Rows in the "recent" rankings.
    pub top_n: usize,
    /// Rows in the general rankings and charts.
    pub top_n_general: usize,
    /// Distinct observed dates in the short rolling window.
    pub recent_days: usize,
    pub month_window: MonthWindow,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            exams_path: PathBuf::from("convenio_detalhado_linha.xlsx"),
            patients_path: PathBuf::from("paciente_por_data.xlsx"),
            csv_separator: ",".to_string(),
            exam_columns: ExamColumns::default(),
            patient_columns: PatientColumns::default(),
            top_n: 5,
            top_n_general: 10,
            recent_days: 7,
            month_window: MonthWindow::LatestMonth,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.separator()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config from an explicit path, then `PAINEL_CONFIG`, then defaults.
    pub fn resolve(arg: Option<String>) -> Result<Self, ConfigError> {
        match arg.or_else(|| std::env::var(CONFIG_ENV).ok()) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                info!("No configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// CSV field separator as a byte.
    pub fn separator(&self) -> Result<u8, ConfigError> {
        match self.csv_separator.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::Separator(self.csv_separator.clone())),
        }
    }
}
