//! Charts module - chart data, interactive plotting and PNG export

mod export;
mod plotter;
mod series;

pub use export::{ChartExporter, ExportError};
pub use plotter::ChartPlotter;
pub use series::{category_at, ChartData, ChartKind, Series, ValueFormat};
