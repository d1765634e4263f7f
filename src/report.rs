//! Markdown report assembly. Analyses hand over uniform `Section` tables;
//! this module renders them under a parameters header and timestamp. The
//! same sections feed persistence and chart rendering.

use chrono::{DateTime, Utc};

use crate::config::AnalysisParams;

/// One table cell. Numbers keep full precision here; formatting only
/// happens at render time (persistence stores the raw value).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Num(f64),
    Int(i64),
}

impl Cell {
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Num(v) if v.is_infinite() && *v > 0.0 => "inf".to_string(),
            Cell::Num(v) if v.is_infinite() => "-inf".to_string(),
            Cell::Num(v) => format!("{v:.2}"),
            Cell::Int(v) => v.to_string(),
        }
    }
}

/// One analysis category, rendered as one report section and persisted as
/// one table.
#[derive(Debug, Clone)]
pub struct Section {
    /// snake_case stem used for table names and chart file names.
    pub key: String,
    pub title: String,
    pub blurb: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Column to chart as a score bar per player, if any.
    pub chart_column: Option<usize>,
}

impl Section {
    pub fn new(key: &str, title: &str, headers: Vec<String>) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            blurb: None,
            headers,
            rows: Vec::new(),
            chart_column: None,
        }
    }

    pub fn with_blurb(mut self, blurb: &str) -> Self {
        self.blurb = Some(blurb.to_string());
        self
    }

    pub fn with_chart_column(mut self, column: usize) -> Self {
        self.chart_column = Some(column);
        self
    }
}

/// Render a full report: title, timestamp, parameters block, one section per
/// analysis category.
pub fn render_markdown(
    title: &str,
    generated_at: DateTime<Utc>,
    params: &AnalysisParams,
    analysis_type: &str,
    sections: &[Section],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {title}\n\n"));
    out.push_str(&format!(
        "Generated on: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    out.push_str("## Analysis Parameters\n\n");
    out.push_str(&format!("- **analysis_type**: {analysis_type}\n"));
    out.push_str(&format!("- **min_shots**: {}\n", params.min_shots));
    out.push_str(&format!("- **top_n**: {}\n", params.top_n));
    out.push_str(&format!("- **positions**: {}\n", params.positions.join("; ")));
    out.push_str(&format!("- **min_90s**: {}\n", params.min_90s));
    out.push_str(&format!("- **max_age**: {}\n", params.max_age));
    out.push('\n');

    for section in sections {
        if section.rows.is_empty() {
            continue;
        }
        out.push_str(&format!("## {}\n\n", section.title));
        if let Some(blurb) = &section.blurb {
            out.push_str(blurb);
            out.push_str("\n\n");
        }
        out.push_str(&markdown_table(&section.headers, &section.rows));
        out.push('\n');
    }
    out
}

fn markdown_table(headers: &[String], rows: &[Vec<Cell>]) -> String {
    let mut rendered: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    rendered.push(headers.to_vec());
    for row in rows {
        rendered.push(row.iter().map(Cell::render).collect());
    }

    // Pad columns so the raw markdown stays readable in a terminal.
    let columns = headers.len();
    let mut widths = vec![0usize; columns];
    for row in &rendered {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    for (row_no, row) in rendered.iter().enumerate() {
        out.push('|');
        for (i, &width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            out.push_str(&format!(" {cell:<width$} |"));
        }
        out.push('\n');
        if row_no == 0 {
            out.push('|');
            for &width in &widths {
                out.push_str(&format!("{:-<w$}|", "", w = width + 2));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> Section {
        let mut s = Section::new(
            "playmakers",
            "Playmakers",
            vec!["Player".into(), "Score".into()],
        );
        s.rows.push(vec![Cell::Text("Ana".into()), Cell::Num(1.23456)]);
        s.rows.push(vec![Cell::Text("Bo".into()), Cell::Num(f64::INFINITY)]);
        s
    }

    #[test]
    fn renders_params_and_timestamp_header() {
        let when = DateTime::from_timestamp(1_755_000_000, 0).unwrap();
        let md = render_markdown(
            "Player Scouting Report",
            when,
            &AnalysisParams::default(),
            "basic",
            &[section()],
        );
        assert!(md.starts_with("# Player Scouting Report"));
        assert!(md.contains("Generated on: 2025-08-12"));
        assert!(md.contains("- **min_shots**: 20"));
        assert!(md.contains("- **positions**: MF; FW, MF; MF,DF"));
        assert!(md.contains("## Playmakers"));
    }

    #[test]
    fn formats_scores_and_infinities() {
        let md = render_markdown(
            "R",
            Utc::now(),
            &AnalysisParams::default(),
            "basic",
            &[section()],
        );
        assert!(md.contains("1.23"));
        assert!(md.contains("| inf"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let empty = Section::new("nothing", "Nothing", vec!["Player".into()]);
        let md = render_markdown(
            "R",
            Utc::now(),
            &AnalysisParams::default(),
            "basic",
            &[empty],
        );
        assert!(!md.contains("## Nothing"));
    }
}
