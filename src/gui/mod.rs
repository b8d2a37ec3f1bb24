//! GUI module - User interface components

mod app;
mod control_panel;
mod panel_viewer;

pub use app::PainelApp;
pub use control_panel::{ControlPanel, ControlPanelAction, Dashboard};
pub use panel_viewer::PanelViewer;
