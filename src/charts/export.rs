//! Static Chart Export
//! Renders a dashboard chart to a PNG file with plotters.

use super::{category_at, ChartData, ChartKind};
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const WIDTH: u32 = 1400;
const HEIGHT: u32 = 800;
const GROUP_WIDTH: f64 = 0.8;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Chart has no data to export")]
    Empty,
    #[error("Failed to draw chart: {0}")]
    Drawing(String),
}

fn drawing<E: std::fmt::Display>(err: E) -> ExportError {
    ExportError::Drawing(err.to_string())
}

pub struct ChartExporter;

impl ChartExporter {
    /// Write `chart` to `path` as a PNG titled `title`.
    pub fn export_png(chart: &ChartData, title: &str, path: &Path) -> Result<(), ExportError> {
        if chart.is_empty() {
            return Err(ExportError::Empty);
        }

        let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let n = chart.x_labels.len();
        let top = (chart.max_value() * 1.1).max(1.0);
        let slots = -0.5f64..(n as f64 - 0.5);
        let horizontal = chart.kind == ChartKind::HorizontalBars;
        let category = |v: &f64| {
            category_at(&chart.x_labels, *v, horizontal)
                .cloned()
                .unwrap_or_default()
        };
        let value = |v: &f64| chart.format.format(*v);

        let mut builder = ChartBuilder::on(&root);
        builder
            .caption(title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(if horizontal { 240 } else { 110 });

        if horizontal {
            let mut ctx = builder
                .build_cartesian_2d(0f64..top, slots)
                .map_err(drawing)?;
            ctx.configure_mesh()
                .disable_y_mesh()
                .y_labels(n)
                .y_label_formatter(&category)
                .x_label_formatter(&value)
                .x_desc(chart.y_title.as_str())
                .draw()
                .map_err(drawing)?;

            for (s, series) in chart.series.iter().enumerate() {
                let color = Palette99::pick(s);
                ctx.draw_series(series.values.iter().enumerate().map(|(i, &v)| {
                    let slot = (n - 1 - i) as f64;
                    Rectangle::new(
                        [(0.0, slot - GROUP_WIDTH / 2.0), (v, slot + GROUP_WIDTH / 2.0)],
                        color.filled(),
                    )
                }))
                .map_err(drawing)?;
            }
        } else {
            let mut ctx = builder
                .build_cartesian_2d(slots, 0f64..top)
                .map_err(drawing)?;
            ctx.configure_mesh()
                .disable_x_mesh()
                .x_labels(n)
                .x_label_formatter(&category)
                .y_label_formatter(&value)
                .y_desc(chart.y_title.as_str())
                .draw()
                .map_err(drawing)?;

            let count = chart.series.len();
            let mut base = vec![0.0; n];
            for (s, series) in chart.series.iter().enumerate() {
                let color = Palette99::pick(s);
                let legend_color = Palette99::pick(s);
                let anno = match chart.kind {
                    ChartKind::Lines => ctx
                        .draw_series(LineSeries::new(
                            series.values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                            color.stroke_width(3),
                        ))
                        .map_err(drawing)?,
                    ChartKind::StackedBars => {
                        let bars: Vec<_> = series
                            .values
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| {
                                let x = i as f64;
                                let bottom = base[i];
                                base[i] += v;
                                Rectangle::new(
                                    [(x - GROUP_WIDTH / 2.0, bottom), (x + GROUP_WIDTH / 2.0, bottom + v)],
                                    color.filled(),
                                )
                            })
                            .collect();
                        ctx.draw_series(bars).map_err(drawing)?
                    }
                    _ => {
                        let width = GROUP_WIDTH / count as f64;
                        let offset = (s as f64 - (count - 1) as f64 / 2.0) * width;
                        ctx.draw_series(series.values.iter().enumerate().map(|(i, &v)| {
                            let x = i as f64 + offset;
                            Rectangle::new(
                                [(x - width / 2.0, 0.0), (x + width / 2.0, v)],
                                color.filled(),
                            )
                        }))
                        .map_err(drawing)?
                    }
                };
                anno.label(series.name.as_str()).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 12, y + 5)], legend_color.filled())
                });
            }

            if count > 1 {
                ctx.configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(&BLACK)
                    .draw()
                    .map_err(drawing)?;
            }
        }

        root.present().map_err(drawing)?;
        info!("Exported chart '{}' to {}", title, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{Series, ValueFormat};

    #[test]
    fn empty_chart_is_rejected() {
        let chart = ChartData {
            kind: ChartKind::Bars,
            x_labels: Vec::new(),
            series: vec![Series {
                name: "Total".into(),
                values: Vec::new(),
            }],
            y_title: String::new(),
            format: ValueFormat::Count,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        assert!(matches!(
            ChartExporter::export_png(&chart, "Vazio", &path),
            Err(ExportError::Empty)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn grouped_chart_with_legend_is_written() {
        let chart = ChartData {
            kind: ChartKind::Bars,
            x_labels: vec!["01/2025".into(), "02/2025".into()],
            series: vec![
                Series { name: "F".into(), values: vec![3.0, 4.0] },
                Series { name: "M".into(), values: vec![1.0, 2.0] },
            ],
            y_title: "Atendimentos".into(),
            format: ValueFormat::Count,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        // Hosts without system fonts fail text layout; that surfaces as a drawing error.
        match ChartExporter::export_png(&chart, "Por sexo", &path) {
            Ok(()) => assert!(path.exists()),
            Err(err) => assert!(matches!(err, ExportError::Drawing(_))),
        }
    }
}
