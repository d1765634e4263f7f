//! Chart rendering: one PNG score bar chart per report section. A thin
//! layer over the scored tables; failures here never abort a run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;

use crate::report::{Cell, Section};

const CHART_SIZE: (u32, u32) = (1280, 720);

/// Render a chart for every section that nominates a score column. Returns
/// the files written.
pub fn create_dashboard(sections: &[Section], dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create visualization dir {}", dir.display()))?;

    let mut written = Vec::new();
    for section in sections {
        let Some(column) = section.chart_column else {
            continue;
        };
        if section.rows.is_empty() {
            continue;
        }
        let labels: Vec<String> = section
            .rows
            .iter()
            .map(|row| match row.first() {
                Some(Cell::Text(name)) => name.clone(),
                _ => String::new(),
            })
            .collect();
        let values: Vec<f64> = section
            .rows
            .iter()
            .map(|row| match row.get(column) {
                Some(Cell::Num(v)) => *v,
                Some(Cell::Int(v)) => *v as f64,
                _ => 0.0,
            })
            .collect();

        let path = dir.join(format!("{prefix}{}.png", section.key));
        render_score_chart(&path, &section.title, &labels, &values)
            .with_context(|| format!("render chart {}", path.display()))?;
        tracing::info!(chart = %path.display(), "rendered chart");
        written.push(path);
    }
    Ok(written)
}

/// Vertical bar chart of one score per player, ranked order preserved.
/// Infinite scores are drawn clamped to the top of the axis.
fn render_score_chart(path: &Path, title: &str, labels: &[String], values: &[f64]) -> Result<()> {
    if labels.len() != values.len() || labels.is_empty() {
        return Err(anyhow!("chart input mismatch: {} labels, {} values", labels.len(), values.len()));
    }

    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let max = finite.iter().copied().fold(0.0_f64, f64::max);
    let min = finite.iter().copied().fold(0.0_f64, f64::min);
    let (y_lo, y_hi) = if max > min {
        (min * 1.05, max * 1.05)
    } else {
        (min - 0.5, max + 0.5)
    };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let count = labels.len();
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..count as f64, y_lo..y_hi)?;

    let owned_labels = labels.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(count)
        .x_label_formatter(&move |x: &f64| {
            let idx = x.floor() as usize;
            owned_labels.get(idx).cloned().unwrap_or_default()
        })
        .y_desc("score")
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        let top = v.clamp(y_lo, y_hi);
        let x0 = i as f64 + 0.1;
        let x1 = i as f64 + 0.9;
        let (lo, hi) = if top >= 0.0 { (0.0, top) } else { (top, 0.0) };
        Rectangle::new([(x0, lo), (x1, hi)], BLUE.mix(0.6).filled())
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Cell;

    fn section_with_scores(scores: &[f64]) -> Section {
        let mut section = Section::new(
            "playmakers",
            "Playmakers",
            vec!["Player".into(), "Score".into()],
        )
        .with_chart_column(1);
        for (i, score) in scores.iter().enumerate() {
            section
                .rows
                .push(vec![Cell::Text(format!("P{i}")), Cell::Num(*score)]);
        }
        section
    }

    #[test]
    fn writes_one_chart_per_charted_section() {
        let dir = std::env::temp_dir().join("pitchscout_viz_test");
        let _ = std::fs::remove_dir_all(&dir);
        let sections = vec![
            section_with_scores(&[3.0, 2.0, 1.0]),
            Section::new("no_chart", "No Chart", vec!["Player".into()]),
        ];
        let written = create_dashboard(&sections, &dir, "basic_").unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("basic_playmakers.png"));
        assert!(written[0].exists());
    }

    #[test]
    fn infinite_and_negative_scores_do_not_fail() {
        let dir = std::env::temp_dir().join("pitchscout_viz_test_inf");
        let _ = std::fs::remove_dir_all(&dir);
        let sections = vec![section_with_scores(&[f64::INFINITY, 1.5, -0.75])];
        let written = create_dashboard(&sections, &dir, "advanced_").unwrap();
        assert_eq!(written.len(), 1);
    }
}
