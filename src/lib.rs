//! Painel Clínico - exam billing and patient registration dashboards
//!
//! Loads the clinic's spreadsheet exports, prepares typed tables and builds
//! the panels shown by the desktop dashboards.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod stats;
pub mod views;
