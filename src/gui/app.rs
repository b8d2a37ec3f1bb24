//! Painel Clínico Main Application
//! Main window with control panel and dashboard panels.

use crate::charts::ChartExporter;
use crate::config::DashboardConfig;
use crate::data::{Dataset, DatasetCache, ExamTable, PatientTable};
use crate::gui::{ControlPanel, ControlPanelAction, Dashboard, PanelViewer};
use crate::views::{ExamDashboard, Panel, PatientDashboard, ViewError};
use egui::SidePanel;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Main application window.
pub struct PainelApp {
    config: DashboardConfig,
    exam_cache: DatasetCache<ExamTable>,
    patient_cache: DatasetCache<PatientTable>,
    exams: Option<Arc<ExamTable>>,
    patients: Option<Arc<PatientTable>>,
    control_panel: ControlPanel,
    panel_viewer: PanelViewer,
}

impl PainelApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let mut control_panel = ControlPanel::new();
        control_panel.exams_path = Some(config.exams_path.clone());
        control_panel.patients_path = Some(config.patients_path.clone());

        let mut app = Self {
            config,
            exam_cache: DatasetCache::new(),
            patient_cache: DatasetCache::new(),
            exams: None,
            patients: None,
            control_panel,
            panel_viewer: PanelViewer::new(),
        };
        app.load(&[Dashboard::Exams, Dashboard::Patients], false);
        app
    }

    /// Fetch `targets` through the caches, then rebuild the active view.
    /// Unchanged files are served from the cache.
    fn load(&mut self, targets: &[Dashboard], reload: bool) {
        let mut failure: Option<String> = None;

        for target in targets {
            let result = match target {
                Dashboard::Exams => {
                    fetch(&mut self.exam_cache, &self.config.exams_path, &self.config, reload)
                        .map(|table| {
                            self.control_panel.update_exam_choices(
                                ExamTable::insurers(table.records()),
                                ExamTable::descriptions(table.records()),
                            );
                            self.exams = Some(table);
                        })
                }
                Dashboard::Patients => {
                    fetch(&mut self.patient_cache, &self.config.patients_path, &self.config, reload)
                        .map(|table| self.patients = Some(table))
                }
            };
            if let Err(message) = result {
                error!("{}", message);
                failure = Some(message);
            }
        }

        let status = match failure {
            Some(message) => format!("Erro: {}", message),
            None => self.loaded_summary(),
        };
        self.control_panel.set_status(&status);
        self.refresh();
    }

    fn loaded_summary(&self) -> String {
        let exams = self.exams.as_ref().map_or(0, |t| t.row_count());
        let patients = self.patients.as_ref().map_or(0, |t| t.row_count());
        format!("{} exames, {} atendimentos carregados", exams, patients)
    }

    /// Rebuild the panels of the active view from the cached tables.
    fn refresh(&mut self) {
        let settings = self.control_panel.settings.clone();
        let result = match settings.dashboard {
            Dashboard::Exams => match self.exams.clone() {
                Some(table) => self.exam_panels(&table).map(|panels| {
                    (settings.exam_view.label(), panels)
                }),
                None => Ok((settings.exam_view.label(), Vec::new())),
            },
            Dashboard::Patients => match self.patients.clone() {
                Some(table) => PatientDashboard::new(&table, &self.config)
                    .build(settings.patient_view)
                    .map(|panels| (settings.patient_view.label(), panels)),
                None => Ok((settings.patient_view.label(), Vec::new())),
            },
        };

        match result {
            Ok((heading, panels)) => {
                self.panel_viewer.set_panels(heading, panels);
                self.control_panel.export_enabled = self.panel_viewer.first_chart().is_some();
            }
            Err(e) => {
                error!("Failed to build view: {}", e);
                self.panel_viewer.clear();
                self.control_panel.export_enabled = false;
                self.control_panel.set_status(&format!("Erro: {}", e));
            }
        }
    }

    fn exam_panels(&mut self, table: &ExamTable) -> Result<Vec<Panel>, ViewError> {
        let dashboard = ExamDashboard::new(table, &self.config);
        let bounds = dashboard.range_bounds(&self.control_panel.settings.filters)?;
        self.control_panel.update_range_bounds(bounds);
        let settings = &self.control_panel.settings;
        dashboard.build(settings.exam_view, &settings.filters)
    }

    /// Handle source file selection for one dashboard
    fn handle_open(&mut self, target: Dashboard) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Planilhas", &["xlsx", "xls", "ods", "csv"])
            .pick_file()
        else {
            return;
        };

        info!("Selected {} for {}", path.display(), target.label());
        match target {
            Dashboard::Exams => {
                self.config.exams_path = path.clone();
                self.control_panel.exams_path = Some(path);
            }
            Dashboard::Patients => {
                self.config.patients_path = path.clone();
                self.control_panel.patients_path = Some(path);
            }
        }
        self.control_panel.settings.dashboard = target;
        self.load(&[target], false);
    }

    /// Export the first chart of the current view to PNG and open it.
    fn handle_export_chart(&mut self) {
        let Some((title, chart)) = self.panel_viewer.first_chart() else {
            self.control_panel.set_status("Nenhum gráfico para exportar");
            return;
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("grafico.png")
            .save_file()
        else {
            return;
        };

        let status = match ChartExporter::export_png(chart, title, &path) {
            Ok(()) => {
                open_exported(&path);
                format!("Gráfico exportado: {}", path.display())
            }
            Err(e) => {
                error!("Chart export failed: {}", e);
                format!("Erro: {}", e)
            }
        };
        self.control_panel.set_status(&status);
    }
}

/// Get or reload one table, with the failing path in the message.
fn fetch<T: Dataset>(
    cache: &mut DatasetCache<T>,
    path: &Path,
    config: &DashboardConfig,
    reload: bool,
) -> Result<Arc<T>, String> {
    let result = if reload {
        cache.reload(path, config)
    } else {
        cache.get_or_load(path, config)
    };
    result.map_err(|e| format!("{}: {}", path.display(), e))
}

fn open_exported(path: &Path) {
    if let Err(e) = open::that(path) {
        warn!("Could not open {}: {}", path.display(), e);
    }
}

impl eframe::App for PainelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::OpenExams => self.handle_open(Dashboard::Exams),
                        ControlPanelAction::OpenPatients => self.handle_open(Dashboard::Patients),
                        ControlPanelAction::DashboardChanged => {
                            let target = self.control_panel.settings.dashboard;
                            self.load(&[target], false);
                        }
                        ControlPanelAction::SettingsChanged => self.refresh(),
                        ControlPanelAction::Reload => {
                            self.load(&[Dashboard::Exams, Dashboard::Patients], true)
                        }
                        ControlPanelAction::ExportChart => self.handle_export_chart(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - dashboard panels
        egui::CentralPanel::default().show(ctx, |ui| {
            self.panel_viewer.show(ui);
        });
    }
}
