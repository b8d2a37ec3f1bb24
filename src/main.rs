//! Painel Clínico - Clinic Exam & Patient Dashboards
//!
//! Usage: painel_clinico [config.json]

use eframe::egui;
use painel_clinico::config::DashboardConfig;
use painel_clinico::gui::PainelApp;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = DashboardConfig::resolve(std::env::args().nth(1))?;
    info!(
        "Exams from {}, patients from {}",
        config.exams_path.display(),
        config.patients_path.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Painel Clínico"),
        ..Default::default()
    };

    eframe::run_native(
        "Painel Clínico",
        options,
        Box::new(|cc| Ok(Box::new(PainelApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
