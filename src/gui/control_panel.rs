//! Control Panel Widget
//! Left side panel with data sources, view selection and filters.

use crate::stats::WindowKind;
use crate::views::{ExamFilters, ExamView, PatientView, RangeBounds, TemporalMetric, ValueRange};
use egui::{Color32, ComboBox, RichText, ScrollArea};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dashboard {
    #[default]
    Exams,
    Patients,
}

impl Dashboard {
    pub fn label(&self) -> &'static str {
        match self {
            Dashboard::Exams => "Faturamento de exames",
            Dashboard::Patients => "Cadastro de pacientes",
        }
    }
}

/// What the user is looking at.
#[derive(Debug, Clone, Default)]
pub struct UserSettings {
    pub dashboard: Dashboard,
    pub exam_view: ExamView,
    pub patient_view: PatientView,
    pub filters: ExamFilters,
}

/// Slider bounds for one range control, or why none is offered.
#[derive(Debug, Clone, PartialEq)]
enum RangeControl {
    Hidden,
    Fixed(String),
    Slider(ValueRange),
}

impl RangeControl {
    fn from_bounds(bounds: Option<Result<ValueRange, crate::views::ViewError>>) -> Self {
        match bounds {
            None => RangeControl::Hidden,
            Some(Ok(range)) => RangeControl::Slider(range),
            Some(Err(err)) => RangeControl::Fixed(err.to_string()),
        }
    }

    /// Keep `selection` inside the new bounds; drop it when there is no slider.
    fn fit(&self, selection: Option<ValueRange>) -> Option<ValueRange> {
        let RangeControl::Slider(bounds) = self else {
            return None;
        };
        selection.map(|s| ValueRange {
            min: s.min.clamp(bounds.min, bounds.max),
            max: s.max.clamp(bounds.min, bounds.max),
        })
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub exams_path: Option<PathBuf>,
    pub patients_path: Option<PathBuf>,
    insurers: Vec<String>,
    descriptions: Vec<String>,
    count_range: RangeControl,
    total_range: RangeControl,
    pub status: String,
    pub export_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            exams_path: None,
            patients_path: None,
            insurers: Vec::new(),
            descriptions: Vec::new(),
            count_range: RangeControl::Hidden,
            total_range: RangeControl::Hidden,
            status: "Pronto".to_string(),
            export_enabled: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter choices after the exam table (re)loads. Stale selections are dropped.
    pub fn update_exam_choices(&mut self, insurers: Vec<String>, descriptions: Vec<String>) {
        let filters = &mut self.settings.filters;
        if filters
            .insurer
            .as_ref()
            .is_some_and(|i| !insurers.contains(i))
        {
            filters.insurer = None;
        }
        filters.exams.retain(|e| descriptions.contains(e));
        self.insurers = insurers;
        self.descriptions = descriptions;
    }

    /// Range controls for the current window; selections outside the new bounds are clamped.
    pub fn update_range_bounds(&mut self, bounds: RangeBounds) {
        self.count_range = RangeControl::from_bounds(bounds.count);
        self.total_range = RangeControl::from_bounds(bounds.total);
        let ranges = &mut self.settings.filters.ranges;
        ranges.count = self.count_range.fit(ranges.count);
        ranges.total = self.total_range.fit(ranges.total);
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🏥 Painel Clínico")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Sources =====
        ui.label(RichText::new("📁 Arquivos").size(14.0).strong());
        ui.add_space(5.0);
        if Self::file_row(ui, "Exames", self.exams_path.as_deref()) {
            action = ControlPanelAction::OpenExams;
        }
        ui.add_space(4.0);
        if Self::file_row(ui, "Pacientes", self.patients_path.as_deref()) {
            action = ControlPanelAction::OpenPatients;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Dashboard and View =====
        ui.label(RichText::new("📊 Painel").size(14.0).strong());
        ui.add_space(5.0);
        ui.horizontal(|ui| {
            for dashboard in [Dashboard::Exams, Dashboard::Patients] {
                if ui
                    .radio_value(&mut self.settings.dashboard, dashboard, dashboard.label())
                    .changed()
                {
                    action = ControlPanelAction::DashboardChanged;
                }
            }
        });
        ui.add_space(5.0);

        match self.settings.dashboard {
            Dashboard::Exams => {
                ComboBox::from_id_salt("exam_view")
                    .width(220.0)
                    .selected_text(self.settings.exam_view.label())
                    .show_ui(ui, |ui| {
                        for view in ExamView::ALL {
                            if ui
                                .selectable_value(&mut self.settings.exam_view, view, view.label())
                                .changed()
                            {
                                action = ControlPanelAction::SettingsChanged;
                            }
                        }
                    });
                ui.add_space(10.0);
                if self.exam_filters(ui) && action == ControlPanelAction::None {
                    action = ControlPanelAction::SettingsChanged;
                }
            }
            Dashboard::Patients => {
                ComboBox::from_id_salt("patient_view")
                    .width(220.0)
                    .selected_text(self.settings.patient_view.label())
                    .show_ui(ui, |ui| {
                        for view in PatientView::ALL {
                            if ui
                                .selectable_value(
                                    &mut self.settings.patient_view,
                                    view,
                                    view.label(),
                                )
                                .changed()
                            {
                                action = ControlPanelAction::SettingsChanged;
                            }
                        }
                    });
            }
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Actions =====
        ui.vertical_centered(|ui| {
            let button = egui::Button::new(RichText::new("🔄 Recarregar dados").size(14.0))
                .min_size(egui::vec2(200.0, 30.0));
            if ui.add(button).clicked() {
                action = ControlPanelAction::Reload;
            }
            ui.add_space(8.0);
            ui.add_enabled_ui(self.export_enabled, |ui| {
                let button = egui::Button::new(RichText::new("🖼 Exportar gráfico").size(14.0))
                    .min_size(egui::vec2(200.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportChart;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            let status_color = if self.status.starts_with("Erro") {
                Color32::from_rgb(220, 53, 69)
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(&self.status).size(11.0).color(status_color));
        });

        action
    }

    /// File name with a browse button; true when the button was clicked.
    fn file_row(ui: &mut egui::Ui, label: &str, path: Option<&Path>) -> bool {
        let mut clicked = false;
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let name = path
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "Nenhum arquivo".to_string());
                    ui.label(RichText::new(format!("{label}: {name}")).size(12.0));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂").on_hover_text("Abrir arquivo").clicked() {
                            clicked = true;
                        }
                    });
                });
            });
        clicked
    }

    /// Filters of the exam dashboard; true when any of them changed.
    fn exam_filters(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;
        let view = self.settings.exam_view;
        let filters = &mut self.settings.filters;

        ui.label(RichText::new("🔧 Filtros").size(14.0).strong());
        ui.add_space(5.0);

        if view.takes_insurer_filter() {
            let label = filters.insurer.clone().unwrap_or_else(|| "Todos".to_string());
            ui.horizontal(|ui| {
                ui.add_sized([90.0, 20.0], egui::Label::new("Convênio:"));
                ComboBox::from_id_salt("insurer")
                    .width(160.0)
                    .selected_text(label)
                    .show_ui(ui, |ui| {
                        changed |= ui
                            .selectable_value(&mut filters.insurer, None, "Todos")
                            .changed();
                        for insurer in &self.insurers {
                            changed |= ui
                                .selectable_value(&mut filters.insurer, Some(insurer.clone()), insurer)
                                .changed();
                        }
                    });
            });
        }

        if view == ExamView::Recent {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                for kind in WindowKind::ALL {
                    changed |= ui
                        .radio_value(&mut filters.window, kind, kind.label())
                        .changed();
                }
            });
            ui.add_space(5.0);
            changed |= range_slider(ui, "Quantidade", &self.count_range, &mut filters.ranges.count);
            changed |= range_slider(ui, "Valor total", &self.total_range, &mut filters.ranges.total);
        }

        if view == ExamView::Temporal {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                changed |= ui
                    .radio_value(&mut filters.temporal_metric, TemporalMetric::Value, "Valor")
                    .changed();
                changed |= ui
                    .radio_value(&mut filters.temporal_metric, TemporalMetric::Count, "Quantidade")
                    .changed();
            });
            ui.add_space(5.0);
            ui.label("Exames:");
            egui::Frame::none()
                .fill(ui.visuals().widgets.noninteractive.bg_fill)
                .rounding(5.0)
                .inner_margin(5.0)
                .show(ui, |ui| {
                    ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                        for description in &self.descriptions {
                            let mut selected = filters.exams.contains(description);
                            if ui.checkbox(&mut selected, description).changed() {
                                if selected {
                                    filters.exams.push(description.clone());
                                } else {
                                    filters.exams.retain(|e| e != description);
                                }
                                changed = true;
                            }
                        }
                    });
                });
            ui.add_space(5.0);
            if ui.small_button("Limpar seleção").clicked() && !filters.exams.is_empty() {
                filters.exams.clear();
                changed = true;
            }
        }

        changed
    }
}

/// Two sliders narrowing `selection` within the bounds of `control`.
fn range_slider(
    ui: &mut egui::Ui,
    label: &str,
    control: &RangeControl,
    selection: &mut Option<ValueRange>,
) -> bool {
    match control {
        RangeControl::Hidden => false,
        RangeControl::Fixed(message) => {
            ui.label(RichText::new(message).size(11.0).color(Color32::GRAY));
            false
        }
        RangeControl::Slider(bounds) => {
            let mut current = selection.unwrap_or(*bounds);
            ui.label(label);
            let low = ui.add(egui::Slider::new(&mut current.min, bounds.min..=bounds.max).text("mín"));
            let high = ui.add(egui::Slider::new(&mut current.max, bounds.min..=bounds.max).text("máx"));
            if !(low.changed() || high.changed()) {
                return false;
            }
            if current.min > current.max {
                std::mem::swap(&mut current.min, &mut current.max);
            }
            *selection = (current != *bounds).then_some(current);
            true
        }
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    OpenExams,
    OpenPatients,
    DashboardChanged,
    SettingsChanged,
    Reload,
    ExportChart,
}
