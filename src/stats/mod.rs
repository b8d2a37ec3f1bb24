//! Stats module - rolling windows, grouped aggregations and amount summaries

mod aggregate;
mod summary;
mod window;

pub use aggregate::{
    Aggregator, Crosstab, GroupValue, Metric, PeriodPoint, ShareRow, TicketOrder, TicketRow,
};
pub use summary::{AmountSummary, StatsCalculator};
pub use window::{MonthWindow, RollingWindows, Window, WindowKind};
