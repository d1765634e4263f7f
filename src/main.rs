use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use pitchscout::config::{AnalysisParams, PositionMatch, ScoringWeights};
use pitchscout::dataset::DataLoader;
use pitchscout::normalize::NormMethod;
use pitchscout::pipeline::{self, PipelineContext};
use pitchscout::report::{Section, render_markdown};
use pitchscout::{persist, viz};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AnalysisType {
    Basic,
    Advanced,
    Shooting,
    All,
}

impl AnalysisType {
    fn label(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Shooting => "shooting",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PositionMatchMode {
    /// Match any individual role tag against the allowed set.
    AnyTag,
    /// Match the full tag-string literally.
    Exact,
}

/// Batch scouting analysis over tabular player statistics: filter a cohort,
/// compute composite scores, rank, and emit a Markdown report with optional
/// charts and SQLite persistence.
#[derive(Debug, Parser)]
#[command(name = "pitchscout", version)]
struct Cli {
    /// Which analysis pipeline(s) to run.
    #[arg(long, value_enum, default_value_t = AnalysisType::Basic)]
    analysis_type: AnalysisType,

    /// Directory holding the stat table CSV files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Minimum shot count for the shooting analyses.
    #[arg(long, default_value_t = 20)]
    min_shots: u32,

    /// Rows kept per ranked table.
    #[arg(long, default_value_t = 20)]
    top_n: usize,

    /// Allowed position entries; repeat the flag for multiple entries.
    #[arg(long = "position")]
    positions: Vec<String>,

    /// How position entries are matched.
    #[arg(long, value_enum, default_value_t = PositionMatchMode::AnyTag)]
    position_match: PositionMatchMode,

    /// Minimum matches-equivalent playing time.
    #[arg(long = "min-90s", default_value_t = 5.0)]
    min_90s: f64,

    /// Maximum player age in completed years.
    #[arg(long, default_value_t = 30)]
    max_age: u32,

    /// Reload tables from disk even when cached in this invocation.
    #[arg(long)]
    force_reload: bool,

    /// Skip database persistence.
    #[arg(long)]
    no_save: bool,

    /// SQLite database file for persisted results.
    #[arg(long, default_value = "scouting.db")]
    db_path: PathBuf,

    /// Skip chart rendering.
    #[arg(long)]
    no_visualizations: bool,

    /// Output directory for rendered charts.
    #[arg(long, default_value = "visualizations")]
    viz_dir: PathBuf,

    /// Write the Markdown report to this file as well as stdout.
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// TOML file overriding the default score weights.
    #[arg(long)]
    weights_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let params = analysis_params(&cli);
    let weights = match &cli.weights_file {
        Some(path) => ScoringWeights::from_toml_file(path)?,
        None => ScoringWeights::default(),
    };

    let requested = match cli.analysis_type {
        AnalysisType::All => vec![
            AnalysisType::Basic,
            AnalysisType::Advanced,
            AnalysisType::Shooting,
        ],
        single => vec![single],
    };
    let skip_failed_categories = cli.analysis_type == AnalysisType::All;

    let mut loader = DataLoader::new(&cli.data_dir, true);
    let mut results: Vec<(AnalysisType, Vec<Section>)> = Vec::new();

    for &analysis in &requested {
        let mut ctx = PipelineContext {
            loader: &mut loader,
            params: &params,
            weights: &weights,
            method: NormMethod::MinMax,
            force_reload: cli.force_reload,
        };
        tracing::info!(analysis = analysis.label(), "running analysis");
        let outcome = match analysis {
            AnalysisType::Basic => pipeline::run_basic(&mut ctx),
            AnalysisType::Advanced => pipeline::run_advanced(&mut ctx),
            AnalysisType::Shooting => pipeline::run_shooting(&mut ctx),
            AnalysisType::All => unreachable!("expanded above"),
        };
        match outcome {
            Ok(sections) => results.push((analysis, sections)),
            Err(err) if skip_failed_categories => {
                tracing::error!(analysis = analysis.label(), error = %err, "category skipped");
            }
            Err(err) => return Err(err),
        }
    }
    if results.is_empty() {
        return Err(anyhow!("every analysis category failed"));
    }

    let generated_at = Utc::now();

    // The report is assembled and printed before any persistence or chart
    // I/O, so an external failure can never discard computed results.
    let mut report = String::new();
    for (analysis, sections) in &results {
        let title = match analysis {
            AnalysisType::Basic => "Player Basic Analysis Report",
            AnalysisType::Advanced => "Player Advanced Analysis Report",
            AnalysisType::Shooting => "Shooting Analysis Report",
            AnalysisType::All => unreachable!(),
        };
        report.push_str(&render_markdown(
            title,
            generated_at,
            &params,
            analysis.label(),
            sections,
        ));
        report.push('\n');
    }
    println!("{report}");

    let mut io_failures: Vec<String> = Vec::new();

    if let Some(path) = &cli.report_file {
        match std::fs::write(path, &report)
            .with_context(|| format!("write report to {}", path.display()))
        {
            Ok(()) => tracing::info!(report = %path.display(), "report written"),
            Err(err) => {
                tracing::error!(error = %err, "report file write failed");
                io_failures.push(format!("{err:#}"));
            }
        }
    }

    if !cli.no_visualizations {
        for (analysis, sections) in &results {
            let prefix = format!("{}_", analysis.label());
            match viz::create_dashboard(sections, &cli.viz_dir, &prefix) {
                Ok(files) => {
                    tracing::info!(analysis = analysis.label(), charts = files.len(), "charts rendered");
                }
                Err(err) => {
                    tracing::error!(analysis = analysis.label(), error = %err, "chart rendering failed");
                    io_failures.push(format!("{err:#}"));
                }
            }
        }
    }

    if !cli.no_save {
        match persist::open_db(&cli.db_path) {
            Ok(conn) => {
                for (analysis, sections) in &results {
                    let prefix = format!("{}_", analysis.label());
                    match persist::save_all(
                        &conn,
                        &prefix,
                        analysis.label(),
                        &params,
                        generated_at,
                        sections,
                    ) {
                        Ok(rows) => {
                            tracing::info!(analysis = analysis.label(), rows, "results persisted");
                        }
                        Err(err) => {
                            tracing::error!(analysis = analysis.label(), error = %err, "persistence failed");
                            io_failures.push(format!("{err:#}"));
                        }
                    }
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "database unavailable");
                io_failures.push(format!("{err:#}"));
            }
        }
    }

    if !io_failures.is_empty() {
        return Err(anyhow!(
            "analysis completed but {} output step(s) failed: {}",
            io_failures.len(),
            io_failures.join("; ")
        ));
    }
    Ok(())
}

fn analysis_params(cli: &Cli) -> AnalysisParams {
    let defaults = AnalysisParams::default();
    AnalysisParams {
        min_shots: cli.min_shots,
        top_n: cli.top_n,
        positions: if cli.positions.is_empty() {
            defaults.positions
        } else {
            cli.positions.clone()
        },
        position_match: match cli.position_match {
            PositionMatchMode::AnyTag => PositionMatch::AnyTag,
            PositionMatchMode::Exact => PositionMatch::Exact,
        },
        min_90s: cli.min_90s,
        max_age: cli.max_age,
    }
}
