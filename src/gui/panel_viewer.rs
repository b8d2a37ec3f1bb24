//! Panel Viewer Widget
//! Central scrollable area rendering dashboard panels as cards.

use crate::charts::{ChartData, ChartPlotter};
use crate::views::{DataTable, MetricCard, Panel, PanelContent};
use egui::{Color32, RichText, ScrollArea};

const CARD_SPACING: f32 = 15.0;
const CHART_HEIGHT: f32 = 360.0;
const METRIC_WIDTH: f32 = 180.0;

/// Renders the panels of the active view, top to bottom.
#[derive(Default)]
pub struct PanelViewer {
    pub panels: Vec<Panel>,
    pub heading: String,
}

impl PanelViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_panels(&mut self, heading: &str, panels: Vec<Panel>) {
        self.heading = heading.to_string();
        self.panels = panels;
    }

    pub fn clear(&mut self) {
        self.panels.clear();
        self.heading.clear();
    }

    /// First chart of the current view with its panel title.
    pub fn first_chart(&self) -> Option<(&str, &ChartData)> {
        self.panels
            .iter()
            .find_map(|p| p.as_chart().map(|c| (p.title.as_str(), c)))
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        if self.panels.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Sem dados").size(20.0));
            });
            return;
        }

        ui.label(RichText::new(&self.heading).size(20.0).strong());
        ui.add_space(CARD_SPACING);

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for (index, panel) in self.panels.iter().enumerate() {
                    Self::draw_card(ui, index, panel);
                    ui.add_space(CARD_SPACING);
                }
            });
    }

    fn draw_card(ui: &mut egui::Ui, index: usize, panel: &Panel) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, Color32::from_rgb(100, 149, 237)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(&panel.title).size(16.0).strong());
                ui.add_space(8.0);

                match &panel.content {
                    PanelContent::Metrics(cards) => Self::draw_metrics(ui, cards),
                    PanelContent::Table(table) => Self::draw_table(ui, index, table),
                    PanelContent::Chart(chart) => {
                        ChartPlotter::draw(ui, &format!("panel_chart_{index}"), chart, CHART_HEIGHT)
                    }
                    PanelContent::Notice(text) => {
                        ui.label(RichText::new(text).color(Color32::from_rgb(243, 156, 18)));
                    }
                }
            });
    }

    fn draw_metrics(ui: &mut egui::Ui, cards: &[MetricCard]) {
        ui.horizontal_wrapped(|ui| {
            for card in cards {
                egui::Frame::none()
                    .fill(ui.visuals().extreme_bg_color)
                    .rounding(5.0)
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        ui.set_min_width(METRIC_WIDTH);
                        ui.vertical(|ui| {
                            ui.label(RichText::new(&card.label).size(12.0).color(Color32::GRAY));
                            ui.label(RichText::new(&card.value).size(20.0).strong());
                            if let Some(detail) = &card.detail {
                                ui.label(RichText::new(detail).size(11.0).color(Color32::GRAY));
                            }
                        });
                    });
            }
        });
    }

    fn draw_table(ui: &mut egui::Ui, index: usize, table: &DataTable) {
        if table.rows.is_empty() {
            ui.label(RichText::new("Nenhuma linha").color(Color32::GRAY));
            return;
        }
        ScrollArea::both()
            .id_salt(("panel_table", index))
            .max_height(320.0)
            .show(ui, |ui| {
                egui::Grid::new(("panel_grid", index))
                    .striped(true)
                    .spacing([20.0, 4.0])
                    .show(ui, |ui| {
                        for header in &table.headers {
                            ui.label(RichText::new(header).strong());
                        }
                        ui.end_row();
                        for row in &table.rows {
                            for cell in row {
                                ui.label(cell);
                            }
                            ui.end_row();
                        }
                    });
            });
    }
}
