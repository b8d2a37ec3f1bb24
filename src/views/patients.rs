//! Patient registration dashboard views.
//!
//! Sex categories are looked up by label. Visits without an age band are
//! left out of band groupings and still counted everywhere else.

use super::{DataTable, MetricCard, Panel, ViewError};
use crate::charts::{ChartData, ChartKind, ValueFormat};
use crate::config::DashboardConfig;
use crate::data::currency::{format_brl, format_percent, format_plain};
use crate::data::{
    exam_link_frame, patient_frame, AgeBand, PatientRecord, PatientTable, PreparationReport,
};
use crate::stats::{Aggregator, GroupValue, Metric, PeriodPoint, StatsCalculator};
use polars::prelude::*;

pub const FEMALE: &str = "F";
pub const MALE: &str = "M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatientView {
    #[default]
    Overview,
    Exams,
    Insurers,
    BySex,
    ByAgeBand,
}

impl PatientView {
    pub const ALL: [PatientView; 5] = [
        PatientView::Overview,
        PatientView::Exams,
        PatientView::Insurers,
        PatientView::BySex,
        PatientView::ByAgeBand,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PatientView::Overview => "Visão geral",
            PatientView::Exams => "Exames realizados",
            PatientView::Insurers => "Por convênio",
            PatientView::BySex => "Por sexo",
            PatientView::ByAgeBand => "Por faixa etária",
        }
    }
}

pub struct PatientDashboard<'a> {
    table: &'a PatientTable,
    config: &'a DashboardConfig,
}

impl<'a> PatientDashboard<'a> {
    pub fn new(table: &'a PatientTable, config: &'a DashboardConfig) -> Self {
        Self { table, config }
    }

    pub fn build(&self, view: PatientView) -> Result<Vec<Panel>, ViewError> {
        if self.table.is_empty() {
            return Ok(vec![Panel::notice(view.label(), "Nenhum paciente carregado")]);
        }
        let rows: Vec<&PatientRecord> = self.table.records().iter().collect();
        let df = patient_frame(&rows)?;

        match view {
            PatientView::Overview => self.overview(&rows, &df),
            PatientView::Exams => self.exams(),
            PatientView::Insurers => insurers(&df),
            PatientView::BySex => by_sex(&df),
            PatientView::ByAgeBand => by_age_band(&df),
        }
    }

    fn overview(&self, rows: &[&PatientRecord], df: &DataFrame) -> Result<Vec<Panel>, ViewError> {
        let total = rows.len() as f64;
        let share = |n: usize| format_percent(n as f64 / total * 100.0);
        let count_sex = |label: &str| rows.iter().filter(|r| r.sex.as_deref() == Some(label)).count();
        let female = count_sex(FEMALE);
        let male = count_sex(MALE);
        let other = rows.len() - female - male;

        let mut sex_cards = vec![
            MetricCard::new("Pacientes", format_plain(total, 0)),
            MetricCard::new("Feminino", format_plain(female as f64, 0)).with_detail(share(female)),
            MetricCard::new("Masculino", format_plain(male as f64, 0)).with_detail(share(male)),
        ];
        if other > 0 {
            sex_cards.push(
                MetricCard::new("Outros / não informado", format_plain(other as f64, 0))
                    .with_detail(share(other)),
            );
        }
        let mut panels = vec![Panel::metrics("Pacientes por sexo", sex_cards)];

        let banded = rows.iter().filter(|r| r.age_band.is_some()).count();
        let mut bands = DataTable::new(&["Faixa etária", "Pacientes", "Percentual"]);
        for band in AgeBand::ALL {
            let n = rows.iter().filter(|r| r.age_band == Some(band)).count();
            let percent = if banded > 0 { n as f64 / banded as f64 * 100.0 } else { 0.0 };
            bands.push(vec![band.label().to_string(), format_plain(n as f64, 0), format_percent(percent)]);
        }
        panels.push(Panel::table("Pacientes por faixa etária", bands));

        let amounts: Vec<f64> = rows.iter().map(|r| r.final_amount).collect();
        let summary = StatsCalculator::summarize(&amounts);
        panels.push(Panel::metrics(
            "Valor final",
            vec![
                MetricCard::new("Total", format_brl(summary.total, 2)),
                MetricCard::new("Ticket médio", format_brl(summary.mean, 2)),
                MetricCard::new("Mediana", format_brl(summary.median, 2)),
                MetricCard::new("Desvio padrão", format_brl(summary.std, 2)),
                MetricCard::new("Mínimo", format_brl(summary.min, 2)),
                MetricCard::new("Máximo", format_brl(summary.max, 2)),
            ],
        ));

        let monthly = Aggregator::series(df, "period", None, "final_amount", Metric::Mean)?;
        panels.push(Panel::chart(
            "Ticket médio por mês",
            ChartData::from_points(
                ChartKind::Bars,
                "Ticket médio",
                &monthly,
                "Valor (R$)",
                ValueFormat::Currency,
            ),
        ));

        let quality = data_quality(self.table.report(), rows.len() - banded);
        if !quality.is_empty() {
            panels.push(Panel::notice("Qualidade dos dados", quality.join("\n")));
        }
        Ok(panels)
    }

    fn exams(&self) -> Result<Vec<Panel>, ViewError> {
        let links = self.table.exam_links();
        if links.is_empty() {
            return Ok(vec![Panel::notice("Exames realizados", "Nenhum exame informado")]);
        }
        let df = exam_link_frame(&links)?;
        let top = self.config.top_n_general;
        let top_band = self.config.top_n;
        let count_table = |groups: &[GroupValue]| {
            DataTable::from_groups(["Exame", "Quantidade"], groups, |v| format_plain(v, 0))
        };

        let overall = Aggregator::ranking(&df, "exam", "exam", Metric::Count, Some(top))?;
        let mut panels = vec![Panel::chart(
            format!("Top {top} exames"),
            ChartData::from_groups(
                ChartKind::HorizontalBars,
                "Quantidade",
                &overall,
                "Quantidade",
                ValueFormat::Count,
            ),
        )];

        for (sex, label) in [(FEMALE, "feminino"), (MALE, "masculino")] {
            let subset = filter_eq(&df, "sex", sex)?;
            let ranked = Aggregator::ranking(&subset, "exam", "exam", Metric::Count, Some(top))?;
            panels.push(Panel::table(
                format!("Top {top} exames - sexo {label}"),
                count_table(&ranked),
            ));
        }

        for band in AgeBand::ALL {
            let subset = filter_eq(&df, "age_band", band.label())?;
            let ranked = Aggregator::ranking(&subset, "exam", "exam", Metric::Count, Some(top_band))?;
            panels.push(Panel::table(
                format!("Top {top_band} exames - {band} anos"),
                count_table(&ranked),
            ));
        }
        Ok(panels)
    }
}

fn insurers(df: &DataFrame) -> Result<Vec<Panel>, ViewError> {
    let mean = Aggregator::series(df, "period", Some("insurer"), "final_amount", Metric::Mean)?;
    let share = Aggregator::shares(df, "period", "insurer", "final_amount", Metric::Sum)?;
    Ok(vec![
        Panel::chart(
            "Ticket médio por convênio e mês",
            ChartData::from_points(
                ChartKind::Lines,
                "Ticket médio",
                &mean,
                "Valor (R$)",
                ValueFormat::Currency,
            ),
        ),
        Panel::chart(
            "Participação no valor por convênio",
            ChartData::from_shares(&share, "% do valor"),
        ),
    ])
}

fn by_sex(df: &DataFrame) -> Result<Vec<Panel>, ViewError> {
    let mean = Aggregator::per_group(df, "sex", "final_amount", Metric::Mean)?;
    let mut crosstab = Aggregator::crosstab(df, "insurer", "sex", "final_amount", Metric::Mean)?;
    crosstab.order_columns(&[FEMALE, MALE]);
    crosstab.sort_rows_by(FEMALE);
    let monthly = Aggregator::series(df, "period", Some("sex"), "final_amount", Metric::Sum)?;

    Ok(vec![
        Panel::chart(
            "Ticket médio por sexo",
            ChartData::from_groups(
                ChartKind::Bars,
                "Ticket médio",
                &mean,
                "Valor (R$)",
                ValueFormat::Currency,
            ),
        ),
        Panel::table(
            "Ticket médio por convênio e sexo",
            DataTable::from_crosstab("Convênio", &crosstab, |v| format_brl(v, 2)),
        ),
        Panel::chart(
            "Valor mensal por sexo",
            ChartData::from_points(
                ChartKind::Lines,
                "Total",
                &monthly,
                "Valor (R$)",
                ValueFormat::Currency,
            ),
        ),
    ])
}

fn by_age_band(df: &DataFrame) -> Result<Vec<Panel>, ViewError> {
    let labels: Vec<&str> = AgeBand::ALL.iter().map(|b| b.label()).collect();

    let mut mean = Aggregator::per_group(df, "age_band", "final_amount", Metric::Mean)?;
    mean.sort_by_key(|g| AgeBand::from_label(&g.group));

    let mut by_insurer =
        Aggregator::crosstab(df, "insurer", "age_band", "final_amount", Metric::Mean)?;
    by_insurer.order_columns(&labels);

    let mut by_sex = Aggregator::crosstab(df, "age_band", "sex", "final_amount", Metric::Count)?;
    by_sex.order_rows(&labels);
    by_sex.order_columns(&[FEMALE, MALE]);

    let monthly = band_ordered(Aggregator::series(
        df,
        "period",
        Some("age_band"),
        "final_amount",
        Metric::Sum,
    )?);

    Ok(vec![
        Panel::chart(
            "Ticket médio por faixa etária",
            ChartData::from_groups(
                ChartKind::Bars,
                "Ticket médio",
                &mean,
                "Valor (R$)",
                ValueFormat::Currency,
            ),
        ),
        Panel::table(
            "Ticket médio por convênio e faixa etária",
            DataTable::from_crosstab("Convênio", &by_insurer, |v| format_brl(v, 2)),
        ),
        Panel::table(
            "Pacientes por faixa etária e sexo",
            DataTable::from_crosstab("Faixa etária", &by_sex, |v| format_plain(v, 0)),
        ),
        Panel::chart(
            "Valor mensal por faixa etária",
            ChartData::from_points(
                ChartKind::Lines,
                "Total",
                &monthly,
                "Valor (R$)",
                ValueFormat::Currency,
            ),
        ),
    ])
}

/// Order series points so the legend lists bands youngest first.
/// One line per data problem found while preparing the table.
fn data_quality(report: &PreparationReport, unbanded: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.dropped.is_empty() {
        let rows: Vec<String> = report.dropped.iter().map(|i| i.row.to_string()).collect();
        lines.push(format!(
            "{} linha(s) descartada(s) por valor inválido: {}",
            report.dropped.len(),
            rows.join(", ")
        ));
    }
    if unbanded > 0 {
        lines.push(format!("{unbanded} atendimento(s) sem idade, fora das faixas etárias"));
    }
    if report.missing_birth_dates > 0 {
        lines.push(format!("{} data(s) de nascimento ausente(s) ou inválida(s)", report.missing_birth_dates));
    }
    if report.missing_registration_dates > 0 {
        lines.push(format!(
            "{} data(s) de cadastro ausente(s) ou inválida(s)",
            report.missing_registration_dates
        ));
    }
    lines
}

fn band_ordered(mut points: Vec<PeriodPoint>) -> Vec<PeriodPoint> {
    points.sort_by_key(|p| (p.series.as_deref().and_then(AgeBand::from_label), p.period));
    points
}

fn filter_eq(df: &DataFrame, column: &str, value: &str) -> PolarsResult<DataFrame> {
    df.clone()
        .lazy()
        .filter(col(column).eq(lit(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Period;
    use crate::views::PanelContent;
    use chrono::NaiveDate;

    fn patient(
        birth: Option<&str>,
        registration: &str,
        sex: &str,
        insurer: &str,
        amount: f64,
        exams: &[&str],
    ) -> PatientRecord {
        let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let birth_date = birth.map(parse);
        let registration_date = Some(parse(registration));
        let age = crate::data::dates::age_years(birth_date, registration_date);
        PatientRecord {
            birth_date,
            registration_date,
            age,
            age_band: age.and_then(AgeBand::from_age),
            sex: Some(sex.to_string()),
            insurer: Some(insurer.to_string()),
            fee_amount: amount,
            final_amount: amount,
            exams: exams.iter().map(|e| e.to_string()).collect(),
            period: registration_date.map(Period::of),
        }
    }

    fn table() -> PatientTable {
        PatientTable::from_records(vec![
            patient(Some("2010-05-01"), "2025-01-10", "F", "UNIMED", 100.0, &["Hemograma", "Glicemia"]),
            patient(Some("1950-02-01"), "2025-01-12", "M", "AMIL", 50.0, &["Hemograma"]),
            patient(None, "2025-02-03", "F", "UNIMED", 30.0, &["Ureia"]),
            patient(Some("1990-07-20"), "2025-02-04", "M", "UNIMED", 20.0, &["Glicemia", "Hemograma"]),
        ])
    }

    fn content<'p>(panels: &'p [Panel], title: &str) -> &'p PanelContent {
        &panels
            .iter()
            .find(|p| p.title == title)
            .unwrap_or_else(|| panic!("no panel '{title}'"))
            .content
    }

    #[test]
    fn overview_counts_sex_by_label() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = PatientDashboard::new(&table, &config)
            .build(PatientView::Overview)
            .unwrap();

        let PanelContent::Metrics(cards) = content(&panels, "Pacientes por sexo") else {
            panic!("expected metrics");
        };
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[1].value, "2");
        assert_eq!(cards[1].detail.as_deref(), Some("50.0%"));

        let PanelContent::Table(bands) = content(&panels, "Pacientes por faixa etária") else {
            panic!("expected table");
        };
        assert_eq!(bands.rows.len(), AgeBand::ALL.len());
        assert!(bands.rows.iter().all(|r| r[0] != "Sem idade"));

        let PanelContent::Notice(text) = content(&panels, "Qualidade dos dados") else {
            panic!("expected notice");
        };
        assert!(text.contains("1 atendimento(s) sem idade"));

        let PanelContent::Metrics(amounts) = content(&panels, "Valor final") else {
            panic!("expected metrics");
        };
        assert_eq!(amounts[4].value, "R$ 20,00");
        assert_eq!(amounts[5].value, "R$ 100,00");
    }

    #[test]
    fn band_shares_cover_banded_visits_only() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = PatientDashboard::new(&table, &config)
            .build(PatientView::Overview)
            .unwrap();
        let PanelContent::Table(bands) = content(&panels, "Pacientes por faixa etária") else {
            panic!("expected table");
        };

        let shares: Vec<f64> = bands
            .rows
            .iter()
            .map(|r| r[2].trim_end_matches('%').parse::<f64>().unwrap())
            .collect();
        assert!((shares.iter().sum::<f64>() - 100.0).abs() < 0.2);
        let banded: Vec<&Vec<String>> = bands.rows.iter().filter(|r| r[1] == "1").collect();
        assert_eq!(banded.len(), 3);
        assert!(banded.iter().all(|r| r[2] == "33.3%"));
    }

    #[test]
    fn quality_lines_name_each_problem() {
        let report = PreparationReport {
            dropped: Vec::new(),
            missing_birth_dates: 2,
            missing_registration_dates: 1,
        };
        let lines = data_quality(&report, 2);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2 data(s) de nascimento"));
        assert!(lines[2].starts_with("1 data(s) de cadastro"));
        assert!(data_quality(&PreparationReport::default(), 0).is_empty());
    }

    #[test]
    fn missing_band_excluded_from_band_groupings_only() {
        let table = table();
        let rows: Vec<&PatientRecord> = table.records().iter().collect();
        let df = patient_frame(&rows).unwrap();

        let by_band = Aggregator::per_group(&df, "age_band", "final_amount", Metric::Count).unwrap();
        assert_eq!(by_band.iter().map(|g| g.value).sum::<f64>(), 3.0);

        let by_sex = Aggregator::per_group(&df, "sex", "final_amount", Metric::Count).unwrap();
        let female = by_sex.iter().find(|g| g.group == FEMALE).unwrap();
        assert_eq!(female.value, 2.0);
    }

    #[test]
    fn exams_view_explodes_visits() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = PatientDashboard::new(&table, &config)
            .build(PatientView::Exams)
            .unwrap();

        let chart = panels[0].as_chart().unwrap();
        assert_eq!(chart.x_labels, vec!["Hemograma", "Glicemia", "Ureia"]);
        assert_eq!(chart.series[0].values, vec![3.0, 2.0, 1.0]);

        // Overall chart, two sexes, six bands.
        assert_eq!(panels.len(), 9);
        let PanelContent::Table(female) = content(&panels, "Top 10 exames - sexo feminino") else {
            panic!("expected table");
        };
        assert_eq!(female.rows.len(), 3);
        let PanelContent::Table(elderly) = content(&panels, "Top 5 exames - 60+ anos") else {
            panic!("expected table");
        };
        assert_eq!(elderly.rows, vec![vec!["Hemograma".to_string(), "1".to_string()]]);
    }

    #[test]
    fn sex_crosstab_sorted_by_female() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = PatientDashboard::new(&table, &config)
            .build(PatientView::BySex)
            .unwrap();

        let PanelContent::Table(crosstab) = content(&panels, "Ticket médio por convênio e sexo")
        else {
            panic!("expected table");
        };
        assert_eq!(crosstab.headers, vec!["Convênio", "F", "M"]);
        assert_eq!(crosstab.rows[0][0], "UNIMED");
        assert_eq!(crosstab.rows[1], vec!["AMIL", "R$ 0,00", "R$ 50,00"]);
    }

    #[test]
    fn age_band_views_follow_band_order() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = PatientDashboard::new(&table, &config)
            .build(PatientView::ByAgeBand)
            .unwrap();

        let mean = panels[0].as_chart().unwrap();
        assert_eq!(mean.x_labels, vec!["0-17", "26-35", "60+"]);

        let PanelContent::Table(by_sex) = content(&panels, "Pacientes por faixa etária e sexo")
        else {
            panic!("expected table");
        };
        let first_column: Vec<&str> = by_sex.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(first_column, vec!["0-17", "26-35", "60+"]);

        let monthly = panels[3].as_chart().unwrap();
        let names: Vec<&str> = monthly.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["0-17", "26-35", "60+"]);
    }

    #[test]
    fn insurer_shares_per_period() {
        let table = table();
        let config = DashboardConfig::default();
        let panels = PatientDashboard::new(&table, &config)
            .build(PatientView::Insurers)
            .unwrap();
        let share = panels[1].as_chart().unwrap();
        assert_eq!(share.x_labels, vec!["01/2025", "02/2025"]);
        assert!((share.max_value() - 100.0).abs() < 1e-9);
    }
}
