//! Exam billing dashboard views.

use super::range::{RangeSelection, ValueRange};
use super::{DataTable, MetricCard, Panel, ViewError};
use crate::charts::{ChartData, ChartKind, ValueFormat};
use crate::config::DashboardConfig;
use crate::data::currency::{format_brl, format_plain};
use crate::data::{exam_frame, ExamRecord, ExamTable};
use crate::stats::{
    Aggregator, Metric, RollingWindows, StatsCalculator, TicketOrder, TicketRow, Window,
    WindowKind,
};
use polars::prelude::DataFrame;

const COUNT_COLUMN: &str = "Quantidade";
const TOTAL_COLUMN: &str = "Valor total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExamView {
    #[default]
    Recent,
    ByExamType,
    Temporal,
    ByInsurer,
}

impl ExamView {
    pub const ALL: [ExamView; 4] = [
        ExamView::Recent,
        ExamView::ByExamType,
        ExamView::Temporal,
        ExamView::ByInsurer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExamView::Recent => "Exames recentes",
            ExamView::ByExamType => "Por tipo de exame",
            ExamView::Temporal => "Evolução temporal",
            ExamView::ByInsurer => "Por convênio",
        }
    }

    /// The insurer comparison always spans every insurer.
    pub fn takes_insurer_filter(&self) -> bool {
        *self != ExamView::ByInsurer
    }
}

/// Whether the monthly evolution plots amounts or exam counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemporalMetric {
    #[default]
    Value,
    Count,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExamFilters {
    pub window: WindowKind,
    pub insurer: Option<String>,
    /// Exams shown in the monthly evolution; empty means all, unsplit.
    pub exams: Vec<String>,
    pub temporal_metric: TemporalMetric,
    pub ranges: RangeSelection,
}

/// Bounds offered to the range controls of the recent view.
#[derive(Debug)]
pub struct RangeBounds {
    pub count: Option<Result<ValueRange, ViewError>>,
    pub total: Option<Result<ValueRange, ViewError>>,
}

pub struct ExamDashboard<'a> {
    table: &'a ExamTable,
    config: &'a DashboardConfig,
}

impl<'a> ExamDashboard<'a> {
    pub fn new(table: &'a ExamTable, config: &'a DashboardConfig) -> Self {
        Self { table, config }
    }

    /// Panels for `view` under `filters`. Recomputed from the base table each call.
    pub fn build(&self, view: ExamView, filters: &ExamFilters) -> Result<Vec<Panel>, ViewError> {
        if self.table.is_empty() {
            return Ok(vec![Panel::notice(view.label(), "Nenhum exame carregado")]);
        }
        match view {
            ExamView::Recent => self.recent(filters),
            ExamView::ByExamType => self.by_exam_type(filters),
            ExamView::Temporal => self.temporal(filters),
            ExamView::ByInsurer => self.by_insurer(),
        }
    }

    /// Count and total bounds of the per-exam table in the selected window.
    pub fn range_bounds(&self, filters: &ExamFilters) -> Result<RangeBounds, ViewError> {
        let window = self.window(filters);
        if window.rows.is_empty() {
            return Ok(RangeBounds {
                count: None,
                total: None,
            });
        }
        let rows = per_exam(&exam_frame(&window.rows)?)?;
        Ok(bounds(&rows))
    }

    fn windows(&self) -> RollingWindows<'a> {
        RollingWindows::select(
            self.table.records(),
            self.config.recent_days,
            self.config.month_window,
        )
    }

    fn window(&self, filters: &ExamFilters) -> Window<'a> {
        scoped(self.windows().get(filters.window), filters.insurer.as_deref())
    }

    fn scoped_records(&self, insurer: Option<&str>) -> Vec<&'a ExamRecord> {
        self.table
            .records()
            .iter()
            .filter(|r| insurer.map_or(true, |i| r.insurer == i))
            .collect()
    }

    fn recent(&self, filters: &ExamFilters) -> Result<Vec<Panel>, ViewError> {
        let windows = self.windows();
        let insurer = filters.insurer.as_deref();

        let cards = WindowKind::ALL
            .iter()
            .map(|&kind| {
                let w = scoped(windows.get(kind), insurer);
                MetricCard::new(kind.label(), format_plain(w.exam_count() as f64, 0))
                    .with_detail(format!("Média diária: {}", format_plain(w.daily_average(), 1)))
            })
            .collect();
        let mut panels = vec![Panel::metrics("Quantidade de exames", cards)];

        let window = scoped(windows.get(filters.window), insurer);
        if window.rows.is_empty() {
            panels.push(Panel::notice(
                filters.window.label(),
                "Nenhum exame no período selecionado",
            ));
            return Ok(panels);
        }

        let df = exam_frame(&window.rows)?;
        let top = self.config.top_n;
        let by_count = Aggregator::ranking(&df, "description", "amount", Metric::Count, Some(top))?;
        panels.push(Panel::table(
            format!("Top {top} exames por quantidade"),
            DataTable::from_groups(["Exame", COUNT_COLUMN], &by_count, |v| format_plain(v, 0)),
        ));
        let by_value = Aggregator::ranking(&df, "description", "amount", Metric::Sum, Some(top))?;
        panels.push(Panel::table(
            format!("Top {top} exames por valor"),
            DataTable::from_groups(["Exame", TOTAL_COLUMN], &by_value, |v| format_brl(v, 2)),
        ));

        match insurer {
            None => {
                let rows = Aggregator::tickets(&df, "insurer", "amount", TicketOrder::Total)?;
                let mut table = DataTable::new(&["Convênio", TOTAL_COLUMN, COUNT_COLUMN]);
                for r in &rows {
                    table.push(vec![
                        r.group.clone(),
                        format_brl(r.total, 2),
                        format_plain(r.count as f64, 0),
                    ]);
                }
                panels.push(Panel::table("Convênios", table));
            }
            Some(name) => panels.push(Panel::metrics(
                name,
                vec![
                    MetricCard::new(TOTAL_COLUMN, format_brl(window.total_amount(), 2)),
                    MetricCard::new("Exames", format_plain(window.exam_count() as f64, 0)),
                ],
            )),
        }

        panels.extend(range_panels(&df, &filters.ranges)?);
        Ok(panels)
    }

    fn by_exam_type(&self, filters: &ExamFilters) -> Result<Vec<Panel>, ViewError> {
        let rows = self.scoped_records(filters.insurer.as_deref());
        if rows.is_empty() {
            return Ok(vec![Panel::notice("Por tipo de exame", "Nenhum exame para o convênio")]);
        }
        let amounts: Vec<f64> = rows.iter().map(|r| r.amount).collect();
        let summary = StatsCalculator::summarize(&amounts);
        let mut panels = vec![Panel::metrics(
            "Resumo dos valores",
            vec![
                MetricCard::new("Exames", format_plain(summary.count as f64, 0)),
                MetricCard::new(TOTAL_COLUMN, format_brl(summary.total, 2)),
                MetricCard::new("Ticket médio", format_brl(summary.mean, 2)),
                MetricCard::new("Mediana", format_brl(summary.median, 2)),
                MetricCard::new("Desvio padrão", format_brl(summary.std, 2)),
                MetricCard::new("P05", format_brl(summary.p05, 2)),
                MetricCard::new("P95", format_brl(summary.p95, 2)),
            ],
        )];

        let df = exam_frame(&rows)?;
        let tickets = Aggregator::tickets(&df, "description", "amount", TicketOrder::Mean)?;
        panels.push(Panel::table(
            "Ticket médio por exame",
            DataTable::from_tickets("Exame", &tickets),
        ));

        let top = self.config.top_n_general;
        let by_value = Aggregator::ranking(&df, "description", "amount", Metric::Sum, Some(top))?;
        panels.push(Panel::chart(
            format!("Top {top} exames por valor"),
            ChartData::from_groups(
                ChartKind::HorizontalBars,
                TOTAL_COLUMN,
                &by_value,
                "Valor (R$)",
                ValueFormat::Currency,
            ),
        ));
        let by_count = Aggregator::ranking(&df, "description", "amount", Metric::Count, Some(top))?;
        panels.push(Panel::chart(
            format!("Top {top} exames por quantidade"),
            ChartData::from_groups(
                ChartKind::HorizontalBars,
                COUNT_COLUMN,
                &by_count,
                COUNT_COLUMN,
                ValueFormat::Count,
            ),
        ));
        Ok(panels)
    }

    fn temporal(&self, filters: &ExamFilters) -> Result<Vec<Panel>, ViewError> {
        let rows = self.scoped_records(filters.insurer.as_deref());
        if rows.is_empty() {
            return Ok(vec![Panel::notice("Evolução temporal", "Nenhum exame para o convênio")]);
        }

        let all: Vec<&ExamRecord> = self.table.records().iter().collect();
        let daily = Aggregator::daily_average_per_period(&exam_frame(&all)?, "period", "day")?;
        let mut panels = vec![Panel::chart(
            "Média diária de exames por mês",
            ChartData::from_points(
                ChartKind::Bars,
                "Média diária",
                &daily,
                "Exames por dia",
                ValueFormat::Decimal,
            ),
        )];

        let selected: Vec<&ExamRecord> = rows
            .iter()
            .copied()
            .filter(|r| filters.exams.is_empty() || filters.exams.contains(&r.description))
            .collect();
        if selected.is_empty() {
            panels.push(Panel::notice(
                "Evolução mensal",
                "Nenhum exame selecionado encontrado",
            ));
            return Ok(panels);
        }

        let (metric, title, y_title, format) = match filters.temporal_metric {
            TemporalMetric::Value => (
                Metric::Sum,
                "Evolução mensal do valor",
                "Valor (R$)",
                ValueFormat::Currency,
            ),
            TemporalMetric::Count => (
                Metric::Count,
                "Evolução mensal da quantidade",
                COUNT_COLUMN,
                ValueFormat::Count,
            ),
        };
        let secondary = (!filters.exams.is_empty()).then_some("description");
        let points = Aggregator::series(&exam_frame(&selected)?, "period", secondary, "amount", metric)?;
        panels.push(Panel::chart(
            title,
            ChartData::from_points(ChartKind::Lines, "Total", &points, y_title, format),
        ));
        Ok(panels)
    }

    fn by_insurer(&self) -> Result<Vec<Panel>, ViewError> {
        let rows: Vec<&ExamRecord> = self.table.records().iter().collect();
        let df = exam_frame(&rows)?;

        let tickets = Aggregator::tickets(&df, "insurer", "amount", TicketOrder::Mean)?;
        let value_share = Aggregator::shares(&df, "period", "insurer", "amount", Metric::Sum)?;
        let count_share = Aggregator::shares(&df, "period", "insurer", "amount", Metric::Count)?;

        Ok(vec![
            Panel::table(
                "Ticket médio por convênio",
                DataTable::from_tickets("Convênio", &tickets),
            ),
            Panel::chart(
                "Participação no valor por mês",
                ChartData::from_shares(&value_share, "% do valor"),
            ),
            Panel::chart(
                "Participação na quantidade por mês",
                ChartData::from_shares(&count_share, "% dos exames"),
            ),
        ])
    }
}

fn scoped<'a>(window: &Window<'a>, insurer: Option<&str>) -> Window<'a> {
    match insurer {
        Some(name) => window.for_insurer(name),
        None => window.clone(),
    }
}

fn per_exam(df: &DataFrame) -> Result<Vec<TicketRow>, ViewError> {
    Ok(Aggregator::tickets(df, "description", "amount", TicketOrder::Count)?)
}

fn bounds(rows: &[TicketRow]) -> RangeBounds {
    let counts: Vec<f64> = rows.iter().map(|r| r.count as f64).collect();
    let totals: Vec<f64> = rows.iter().map(|r| r.total).collect();
    RangeBounds {
        count: ValueRange::observe(COUNT_COLUMN, &counts),
        total: ValueRange::observe(TOTAL_COLUMN, &totals),
    }
}

/// Per-exam count/total table narrowed by the selection, plus a notice for
/// each column too uniform to narrow.
fn range_panels(df: &DataFrame, selection: &RangeSelection) -> Result<Vec<Panel>, ViewError> {
    let rows = per_exam(df)?;
    let bounds = bounds(&rows);
    let mut panels = Vec::new();
    let mut effective = *selection;

    if let Some(Err(err)) = &bounds.count {
        effective.count = None;
        panels.push(Panel::notice("Faixa de quantidade", err.to_string()));
    }
    if let Some(Err(err)) = &bounds.total {
        effective.total = None;
        panels.push(Panel::notice("Faixa de valor", err.to_string()));
    }

    let mut table = DataTable::new(&["Exame", COUNT_COLUMN, TOTAL_COLUMN]);
    for r in rows
        .iter()
        .filter(|r| effective.accepts(r.count as f64, r.total))
    {
        table.push(vec![
            r.group.clone(),
            format_plain(r.count as f64, 0),
            format_brl(r.total, 2),
        ]);
    }
    panels.push(Panel::table("Exames por faixa de quantidade e valor", table));
    Ok(panels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Period;
    use crate::views::PanelContent;
    use chrono::NaiveDate;

    fn record(date: &str, description: &str, insurer: &str, amount: f64) -> ExamRecord {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        ExamRecord {
            date,
            description: description.to_string(),
            insurer: insurer.to_string(),
            amount,
            period: Period::of(date),
        }
    }

    fn table() -> ExamTable {
        ExamTable::from_records(vec![
            record("2025-03-10", "Hemograma", "UNIMED", 30.0),
            record("2025-04-01", "Hemograma", "UNIMED", 30.0),
            record("2025-04-01", "Glicemia", "AMIL", 10.0),
            record("2025-04-02", "Hemograma", "AMIL", 30.0),
            record("2025-04-02", "Ureia", "UNIMED", 20.0),
            record("2025-04-02", "Glicemia", "UNIMED", 10.0),
        ])
    }

    fn find<'p>(panels: &'p [Panel], title: &str) -> &'p PanelContent {
        &panels
            .iter()
            .find(|p| p.title == title)
            .unwrap_or_else(|| panic!("no panel '{title}'"))
            .content
    }

    #[test]
    fn recent_view_headlines_all_windows() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::Recent, &ExamFilters::default())
            .unwrap();

        let PanelContent::Metrics(cards) = find(&panels, "Quantidade de exames") else {
            panic!("expected metrics");
        };
        assert_eq!(cards.len(), 3);
        // Yesterday is 2025-04-02: three exams.
        assert_eq!(cards[0].value, "3");
        assert_eq!(cards[2].value, "5");

        let PanelContent::Table(top) = find(&panels, "Top 5 exames por quantidade") else {
            panic!("expected table");
        };
        assert_eq!(top.rows.len(), 3);
        assert!(matches!(find(&panels, "Convênios"), PanelContent::Table(_)));
    }

    #[test]
    fn insurer_filter_shows_metric_card() {
        let table = table();
        let config = DashboardConfig::default();
        let filters = ExamFilters {
            window: WindowKind::LastMonth,
            insurer: Some("AMIL".to_string()),
            ..Default::default()
        };
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::Recent, &filters)
            .unwrap();

        let PanelContent::Metrics(cards) = find(&panels, "AMIL") else {
            panic!("expected insurer card");
        };
        assert_eq!(cards[0].value, "R$ 40,00");
        assert_eq!(cards[1].value, "2");
    }

    #[test]
    fn uniform_counts_raise_insufficient_variation() {
        let table = table();
        let config = DashboardConfig::default();
        // Yesterday: one each of Hemograma, Ureia and Glicemia.
        let dashboard = ExamDashboard::new(&table, &config);
        let bounds = dashboard.range_bounds(&ExamFilters::default()).unwrap();
        assert!(matches!(
            bounds.count,
            Some(Err(ViewError::InsufficientVariation { .. }))
        ));
        assert!(matches!(bounds.total, Some(Ok(_))));

        let panels = dashboard
            .build(ExamView::Recent, &ExamFilters::default())
            .unwrap();
        assert!(matches!(
            find(&panels, "Faixa de quantidade"),
            PanelContent::Notice(_)
        ));
    }

    #[test]
    fn range_selection_narrows_table() {
        let table = table();
        let config = DashboardConfig::default();
        let filters = ExamFilters {
            window: WindowKind::LastMonth,
            ranges: RangeSelection {
                count: None,
                total: Some(ValueRange { min: 25.0, max: 100.0 }),
            },
            ..Default::default()
        };
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::Recent, &filters)
            .unwrap();
        let PanelContent::Table(narrowed) = find(&panels, "Exames por faixa de quantidade e valor")
        else {
            panic!("expected table");
        };
        assert_eq!(narrowed.rows.len(), 1);
        assert_eq!(narrowed.rows[0][0], "Hemograma");
    }

    #[test]
    fn temporal_splits_selected_exams() {
        let table = table();
        let config = DashboardConfig::default();
        let filters = ExamFilters {
            exams: vec!["Hemograma".to_string(), "Glicemia".to_string()],
            temporal_metric: TemporalMetric::Count,
            ..Default::default()
        };
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::Temporal, &filters)
            .unwrap();

        let chart = panels[1].as_chart().unwrap();
        assert_eq!(chart.kind, ChartKind::Lines);
        assert_eq!(chart.x_labels, vec!["03/2025", "04/2025"]);
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Hemograma", "Glicemia"]);
        assert_eq!(chart.series[0].values, vec![1.0, 2.0]);
        assert_eq!(chart.series[1].values, vec![0.0, 2.0]);

        let daily = panels[0].as_chart().unwrap();
        // April: 2 exams on the 1st, 3 on the 2nd.
        assert_eq!(daily.series[0].values, vec![1.0, 2.5]);
    }

    #[test]
    fn insurer_view_has_share_charts() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::ByInsurer, &ExamFilters::default())
            .unwrap();
        assert_eq!(panels.len(), 3);
        let share = panels[1].as_chart().unwrap();
        assert_eq!(share.kind, ChartKind::StackedBars);
        assert!((share.max_value() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn insurer_tickets_rank_by_mean() {
        let mut records: Vec<ExamRecord> = (1..=5)
            .map(|day| record(&format!("2025-04-0{day}"), "Hemograma", "UNIMED", 30.0))
            .collect();
        records.push(record("2025-04-01", "Ressonância", "AMIL", 100.0));
        let table = ExamTable::from_records(records);
        let config = DashboardConfig::default();
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::ByInsurer, &ExamFilters::default())
            .unwrap();

        let PanelContent::Table(tickets) = find(&panels, "Ticket médio por convênio") else {
            panic!("expected table");
        };
        let order: Vec<&str> = tickets.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(order, vec!["AMIL", "UNIMED"]);
        assert_eq!(tickets.rows[1][1], "5");
    }

    #[test]
    fn daily_average_ignores_insurer_filter() {
        let table = table();
        let config = DashboardConfig::default();
        let filters = ExamFilters {
            insurer: Some("AMIL".to_string()),
            ..Default::default()
        };
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::Temporal, &filters)
            .unwrap();

        let daily = find(&panels, "Média diária de exames por mês");
        let PanelContent::Chart(daily) = daily else {
            panic!("expected chart");
        };
        assert_eq!(daily.x_labels, vec!["03/2025", "04/2025"]);
        assert_eq!(daily.series[0].values, vec![1.0, 2.5]);
    }

    #[test]
    fn value_summary_lists_both_tails() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::ByExamType, &ExamFilters::default())
            .unwrap();

        let PanelContent::Metrics(cards) = find(&panels, "Resumo dos valores") else {
            panic!("expected metrics");
        };
        let labels: Vec<&str> = cards.iter().map(|c| c.label.as_str()).collect();
        assert!(labels.contains(&"P05"));
        assert!(labels.contains(&"P95"));
        assert_eq!(cards[0].value, "6");
    }

    #[test]
    fn insurer_view_ignores_insurer_filter() {
        let table = table();
        let config = DashboardConfig::default();
        let dashboard = ExamDashboard::new(&table, &config);
        let filters = ExamFilters {
            insurer: Some("AMIL".to_string()),
            ..Default::default()
        };
        assert!(!ExamView::ByInsurer.takes_insurer_filter());
        assert!(ExamView::Temporal.takes_insurer_filter());
        assert_eq!(
            dashboard.build(ExamView::ByInsurer, &filters).unwrap(),
            dashboard.build(ExamView::ByInsurer, &ExamFilters::default()).unwrap()
        );
    }

    #[test]
    fn empty_table_gives_notice() {
        let table = ExamTable::default();
        let config = DashboardConfig::default();
        let panels = ExamDashboard::new(&table, &config)
            .build(ExamView::ByExamType, &ExamFilters::default())
            .unwrap();
        assert!(matches!(panels[0].content, PanelContent::Notice(_)));
    }
}
