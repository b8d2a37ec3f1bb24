//! Chart Plotter Module
//! Draws interactive dashboard charts using egui_plot.

use super::{category_at, ChartData, ChartKind, ValueFormat};
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(121, 85, 72),   // Brown
    Color32::from_rgb(96, 125, 139),  // Blue Grey
];

/// Share of a category slot taken by its bars.
const GROUP_WIDTH: f64 = 0.8;

pub struct ChartPlotter;

impl ChartPlotter {
    pub fn series_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Offset of series `index` of `count` within a category slot.
    pub fn bar_offset(index: usize, count: usize) -> f64 {
        if count <= 1 {
            return 0.0;
        }
        let width = GROUP_WIDTH / count as f64;
        (index as f64 - (count - 1) as f64 / 2.0) * width
    }

    /// Draw `chart` in the current ui, sized to `height`.
    pub fn draw(ui: &mut egui::Ui, id: &str, chart: &ChartData, height: f32) {
        let labels = chart.x_labels.clone();
        let n = labels.len();
        let format = chart.format;
        let horizontal = chart.kind == ChartKind::HorizontalBars;
        let category = move |value: f64| {
            category_at(&labels, value, horizontal)
                .cloned()
                .unwrap_or_default()
        };

        let mut plot = Plot::new(id)
            .height(height)
            .allow_scroll(false)
            .allow_drag(false)
            .allow_zoom(false)
            .show_grid([!horizontal, horizontal])
            .legend(Legend::default());

        if horizontal {
            plot = plot
                .y_axis_formatter(move |mark, _range| category(mark.value))
                .x_axis_formatter(move |mark, _range| format.format(mark.value))
                .x_axis_label(chart.y_title.clone())
                .include_x(0.0);
        } else {
            plot = plot
                .x_axis_formatter(move |mark, _range| category(mark.value))
                .y_axis_formatter(move |mark, _range| format.format(mark.value))
                .y_axis_label(chart.y_title.clone())
                .include_y(0.0);
        }

        plot.show(ui, |plot_ui| match chart.kind {
            ChartKind::Lines => {
                for (s, series) in chart.series.iter().enumerate() {
                    let points: PlotPoints = series
                        .values
                        .iter()
                        .enumerate()
                        .map(|(i, &v)| [i as f64, v])
                        .collect();
                    plot_ui.line(
                        Line::new(points)
                            .color(Self::series_color(s))
                            .width(2.0)
                            .name(&series.name),
                    );
                }
            }
            ChartKind::StackedBars => {
                let mut stacked: Vec<BarChart> = Vec::new();
                for (s, series) in chart.series.iter().enumerate() {
                    let bars = Self::bars(&series.values, 0.0, GROUP_WIDTH, false, n, format);
                    let next = {
                        let below: Vec<&BarChart> = stacked.iter().collect();
                        BarChart::new(bars)
                            .color(Self::series_color(s))
                            .name(&series.name)
                            .stack_on(&below)
                    };
                    stacked.push(next);
                }
                for bar_chart in stacked {
                    plot_ui.bar_chart(bar_chart);
                }
            }
            ChartKind::Bars | ChartKind::HorizontalBars => {
                let count = chart.series.len();
                let width = GROUP_WIDTH / count.max(1) as f64;
                for (s, series) in chart.series.iter().enumerate() {
                    let offset = Self::bar_offset(s, count);
                    let bars = Self::bars(&series.values, offset, width, horizontal, n, format);
                    let mut bar_chart = BarChart::new(bars)
                        .color(Self::series_color(s))
                        .name(&series.name);
                    if horizontal {
                        bar_chart = bar_chart.horizontal();
                    }
                    plot_ui.bar_chart(bar_chart);
                }
            }
        });
    }

    fn bars(
        values: &[f64],
        offset: f64,
        width: f64,
        reversed: bool,
        n: usize,
        format: ValueFormat,
    ) -> Vec<Bar> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let slot = if reversed { n - 1 - i } else { i };
                Bar::new(slot as f64 + offset, v)
                    .width(width)
                    .name(format.format(v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_bar_offsets_are_centered() {
        assert_eq!(ChartPlotter::bar_offset(0, 1), 0.0);
        let left = ChartPlotter::bar_offset(0, 2);
        let right = ChartPlotter::bar_offset(1, 2);
        assert!((left + right).abs() < 1e-12);
        assert!((right - left - 0.4).abs() < 1e-12);
    }

    #[test]
    fn palette_wraps() {
        assert_eq!(ChartPlotter::series_color(0), ChartPlotter::series_color(10));
    }
}
