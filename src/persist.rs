//! SQLite persistence: one table per analysis category holding the
//! full-precision scored rows, keyed by (player, squad, run). A `runs`
//! table records the parameters behind each run.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};

use crate::config::AnalysisParams;
use crate::report::{Cell, Section};

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            analysis_type TEXT NOT NULL,
            min_shots INTEGER NOT NULL,
            top_n INTEGER NOT NULL,
            positions TEXT NOT NULL,
            min_90s REAL NOT NULL,
            max_age INTEGER NOT NULL
        );
        "#,
    )
    .context("init runs schema")?;
    Ok(())
}

/// Insert the run metadata row and return its id, the key every category
/// row of this invocation carries.
pub fn record_run(
    conn: &Connection,
    analysis_type: &str,
    params: &AnalysisParams,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let positions = serde_json::to_string(&params.positions).context("encode positions")?;
    conn.execute(
        "INSERT INTO runs (created_at, analysis_type, min_shots, top_n, positions, min_90s, max_age)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            created_at.to_rfc3339(),
            analysis_type,
            params.min_shots,
            params.top_n as i64,
            positions,
            params.min_90s,
            params.max_age,
        ],
    )
    .context("insert run metadata")?;
    Ok(conn.last_insert_rowid())
}

/// Append one section's rows into its category table, creating the table on
/// first use. Returns the number of rows written.
pub fn save_section(
    conn: &Connection,
    prefix: &str,
    run_id: i64,
    section: &Section,
) -> Result<usize> {
    if section.rows.is_empty() {
        tracing::warn!(section = %section.key, "nothing to persist");
        return Ok(0);
    }

    let table = sanitize_identifier(&format!("{prefix}{}", section.key));
    let columns: Vec<String> = section
        .headers
        .iter()
        .map(|h| sanitize_identifier(h))
        .collect();

    let mut column_defs = vec!["run_id INTEGER NOT NULL".to_string()];
    for (column, cell) in columns.iter().zip(&section.rows[0]) {
        let sql_type = match cell {
            Cell::Text(_) => "TEXT",
            Cell::Num(_) => "REAL",
            Cell::Int(_) => "INTEGER",
        };
        column_defs.push(format!("{column} {sql_type}"));
    }
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} ({});",
        column_defs.join(", ")
    ))
    .with_context(|| format!("create table {table}"))?;

    let placeholders: Vec<String> = (1..=columns.len() + 1).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {table} (run_id, {}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    let mut statement = conn
        .prepare(&sql)
        .with_context(|| format!("prepare insert into {table}"))?;

    for row in &section.rows {
        let mut values: Vec<Value> = Vec::with_capacity(row.len() + 1);
        values.push(Value::Integer(run_id));
        for cell in row {
            values.push(match cell {
                Cell::Text(s) => Value::Text(s.clone()),
                Cell::Num(v) => Value::Real(*v),
                Cell::Int(v) => Value::Integer(*v),
            });
        }
        statement
            .execute(params_from_iter(values))
            .with_context(|| format!("insert row into {table}"))?;
    }
    tracing::info!(table = %table, rows = section.rows.len(), "persisted section");
    Ok(section.rows.len())
}

/// Persist every section under the category prefix for one run.
pub fn save_all(
    conn: &Connection,
    prefix: &str,
    analysis_type: &str,
    params: &AnalysisParams,
    created_at: DateTime<Utc>,
    sections: &[Section],
) -> Result<usize> {
    let run_id = record_run(conn, analysis_type, params, created_at)?;
    let mut written = 0;
    for section in sections {
        written += save_section(conn, prefix, run_id, section)?;
    }
    Ok(written)
}

/// Lowercase alphanumeric/underscore identifier for table and column names.
fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "col".to_string()
    } else if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("c_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Cell;

    fn sample_section() -> Section {
        let mut section = Section::new(
            "playmakers",
            "Playmakers",
            vec![
                "Player".into(),
                "Squad".into(),
                "Age".into(),
                "Pos".into(),
                "Playmaker Score".into(),
            ],
        );
        section.rows.push(vec![
            Cell::Text("Ana Silva".into()),
            Cell::Text("Porto".into()),
            Cell::Int(24),
            Cell::Text("MF".into()),
            Cell::Num(0.87654321),
        ]);
        section.rows.push(vec![
            Cell::Text("Novak Gray".into()),
            Cell::Text("Vitesse".into()),
            Cell::Int(21),
            Cell::Text("FW,MF".into()),
            Cell::Num(0.5),
        ]);
        section
    }

    #[test]
    fn saves_rows_keyed_by_run() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let params = AnalysisParams::default();

        let first = record_run(&conn, "basic", &params, Utc::now()).unwrap();
        save_section(&conn, "basic_", first, &sample_section()).unwrap();
        let second = record_run(&conn, "basic", &params, Utc::now()).unwrap();
        save_section(&conn, "basic_", second, &sample_section()).unwrap();
        assert_ne!(first, second);

        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM basic_playmakers", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 4);

        // Full precision survives the round trip.
        let score: f64 = conn
            .query_row(
                "SELECT playmaker_score FROM basic_playmakers WHERE player = 'Ana Silva' AND run_id = ?1",
                [first],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(score, 0.87654321);
    }

    #[test]
    fn run_metadata_captures_parameters() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let params = AnalysisParams {
            min_shots: 30,
            ..AnalysisParams::default()
        };
        let run_id = record_run(&conn, "shooting", &params, Utc::now()).unwrap();
        let (analysis_type, min_shots): (String, i64) = conn
            .query_row(
                "SELECT analysis_type, min_shots FROM runs WHERE run_id = ?1",
                [run_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(analysis_type, "shooting");
        assert_eq!(min_shots, 30);
    }

    #[test]
    fn identifiers_are_sanitized() {
        assert_eq!(sanitize_identifier("Playmaker Score"), "playmaker_score");
        assert_eq!(sanitize_identifier("SoT%"), "sot");
        assert_eq!(sanitize_identifier("90s"), "c_90s");
        assert_eq!(sanitize_identifier("xPI (pos)"), "xpi_pos");
    }
}
