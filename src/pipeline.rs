//! Analysis pipelines: load tables, filter the cohort, run the score
//! calculators and shape the results into report sections. One pipeline per
//! analysis type; `all` runs them back to back over the shared loader cache.

use anyhow::{Result, anyhow};

use crate::clustering::{self, midfield_features};
use crate::config::{AnalysisParams, ScoringWeights};
use crate::dataset::{DataLoader, PlayerRecord, StatTable};
use crate::filters::filter_cohort;
use crate::normalize::NormMethod;
use crate::possession_impact::expected_possession_impact;
use crate::progression::{ProgressionRow, analyze_progressive_actions};
use crate::report::{Cell, Section};
use crate::scores::{
    self, Identity, analyze_passing_quality, find_clinical_forwards, find_complete_midfielders,
    identify_playmakers,
};
use crate::shooting::{
    analyze_shooting_efficiency, analyze_shooting_profile, analyze_shot_quality,
    calculate_finishing_skill, identify_shot_creation_specialists,
};
use crate::versatility::calculate_versatility;

pub struct PipelineContext<'a> {
    pub loader: &'a mut DataLoader,
    pub params: &'a AnalysisParams,
    pub weights: &'a ScoringWeights,
    pub method: NormMethod,
    pub force_reload: bool,
}

impl PipelineContext<'_> {
    fn cohort(&mut self, table: StatTable) -> Result<Vec<PlayerRecord>> {
        let records = self.loader.get(table, self.force_reload)?;
        Ok(filter_cohort(&records, self.params))
    }

    fn require_cohort(&mut self, table: StatTable) -> Result<Vec<PlayerRecord>> {
        let cohort = self.cohort(table)?;
        if cohort.is_empty() {
            return Err(anyhow!(
                "empty {} cohort after filtering (positions={:?}, max_age={}, min_90s={})",
                table.label(),
                self.params.positions,
                self.params.max_age,
                self.params.min_90s,
            ));
        }
        Ok(cohort)
    }
}

const BASE_HEADERS: [&str; 4] = ["Player", "Squad", "Age", "Pos"];

fn base_headers(extra: &[&str]) -> Vec<String> {
    BASE_HEADERS
        .iter()
        .chain(extra)
        .map(|s| s.to_string())
        .collect()
}

fn identity_cells(id: &Identity) -> Vec<Cell> {
    vec![
        Cell::Text(id.player.clone()),
        Cell::Text(id.squad.clone()),
        Cell::Int(i64::from(id.age.years)),
        Cell::Text(id.pos.clone()),
    ]
}

fn truncated<T>(rows: &[T], top_n: usize) -> &[T] {
    &rows[..rows.len().min(top_n)]
}

/// Basic analysis: the six fixed-weight composite score tables.
pub fn run_basic(ctx: &mut PipelineContext) -> Result<Vec<Section>> {
    let passing = ctx.require_cohort(StatTable::Passing)?;
    let shooting = ctx.cohort(StatTable::Shooting)?;
    let possession = ctx.cohort(StatTable::Possession)?;
    let defense = ctx.cohort(StatTable::Defense)?;

    let top_n = ctx.params.top_n;
    let mut sections = Vec::new();

    let playmakers = identify_playmakers(&passing, &ctx.weights.playmaker, ctx.method);
    let mut section = Section::new(
        "playmakers",
        "Playmakers",
        base_headers(&["Playmaker Score"]),
    )
    .with_blurb("Creative passers ranked by progressive passing, chance creation and assists.")
    .with_chart_column(4);
    for row in truncated(&playmakers, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.playmaker_score));
        section.rows.push(cells);
    }
    sections.push(section);

    let forwards = find_clinical_forwards(
        &shooting,
        ctx.params.min_shots,
        &ctx.weights.forward,
        ctx.method,
    );
    let mut section = Section::new(
        "clinical_forwards",
        "Clinical Forwards",
        base_headers(&["Gls", "Sh", "Conversion", "xG Diff", "Efficiency Score"]),
    )
    .with_blurb("Forwards who finish the chances they take.")
    .with_chart_column(8);
    for row in truncated(&forwards, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.goals));
        cells.push(Cell::Num(row.shots));
        cells.push(Cell::Num(row.conversion_rate));
        cells.push(Cell::Num(row.xg_difference));
        cells.push(Cell::Num(row.efficiency_score));
        section.rows.push(cells);
    }
    sections.push(section);

    let progressive =
        scores::progressive_midfielders(&possession, &ctx.weights.progressive, ctx.method);
    let mut section = Section::new(
        "progressive_midfielders",
        "Progressive Midfielders",
        base_headers(&["Progression Score"]),
    )
    .with_blurb("Players who move the ball forward by carrying and receiving.")
    .with_chart_column(4);
    for row in truncated(&progressive, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.progression_score));
        section.rows.push(cells);
    }
    sections.push(section);

    let pressing = scores::pressing_midfielders(&defense, &ctx.weights.pressing, ctx.method);
    let mut section = Section::new(
        "pressing_midfielders",
        "Pressing Midfielders",
        base_headers(&["Pressing Score"]),
    )
    .with_blurb("Midfielders who win the ball back through tackles and interceptions.")
    .with_chart_column(4);
    for row in truncated(&pressing, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.pressing_score));
        section.rows.push(cells);
    }
    sections.push(section);

    let quality = analyze_passing_quality(&passing);
    let mut section = Section::new(
        "passing_quality",
        "Passing Quality",
        base_headers(&[
            "Passes/90",
            "Cmp%",
            "Accuracy Score",
            "Progression Score",
            "Chance Creation Score",
            "Passing Quality Score",
        ]),
    )
    .with_blurb("Blend of passing accuracy, progression and chance creation.")
    .with_chart_column(9);
    for row in truncated(&quality, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.passes_per_90));
        cells.push(Cell::Num(row.pass_completion_pct));
        cells.push(Cell::Num(row.passing_accuracy_score));
        cells.push(Cell::Num(row.progression_score));
        cells.push(Cell::Num(row.chance_creation_score));
        cells.push(Cell::Num(row.passing_quality_score));
        section.rows.push(cells);
    }
    sections.push(section);

    let complete = find_complete_midfielders(
        &passing,
        &possession,
        &defense,
        &ctx.weights.playmaker,
        &ctx.weights.progressive,
        &ctx.weights.pressing,
        &ctx.weights.complete_midfielder,
        ctx.method,
    );
    let mut section = Section::new(
        "complete_midfielders",
        "Complete Midfielders",
        base_headers(&[
            "Progression Score",
            "Pressing Score",
            "Playmaker Score",
            "Complete Midfielder Score",
        ]),
    )
    .with_blurb("Midfielders contributing in progression, defense and creation at once.")
    .with_chart_column(7);
    for row in truncated(&complete, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.progression_score));
        cells.push(Cell::Num(row.pressing_score));
        cells.push(Cell::Num(row.playmaker_score));
        cells.push(Cell::Num(row.complete_midfielder_score));
        section.rows.push(cells);
    }
    sections.push(section);

    Ok(sections)
}

/// Advanced analysis: versatility, progression decomposition, xPI and
/// profile clustering.
pub fn run_advanced(ctx: &mut PipelineContext) -> Result<Vec<Section>> {
    let passing = ctx.require_cohort(StatTable::Passing)?;
    let possession = ctx.require_cohort(StatTable::Possession)?;
    let defense = ctx.cohort(StatTable::Defense)?;
    let shooting = ctx.cohort(StatTable::Shooting)?;

    let top_n = ctx.params.top_n;
    let mut sections = Vec::new();

    let versatility = calculate_versatility(
        &passing,
        &possession,
        &defense,
        Some(&shooting),
        &ctx.weights.versatility,
        ctx.method,
    );
    let mut section = Section::new(
        "versatile_players",
        "Most Versatile Players",
        base_headers(&[
            "Passing",
            "Possession",
            "Defensive",
            "Shooting",
            "Versatility",
            "Adjusted Versatility",
            "Age Adjusted",
        ]),
    )
    .with_blurb("Players strong across several skill areas at once; a wide best-to-worst spread lowers the adjusted score.")
    .with_chart_column(9);
    for row in truncated(&versatility, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.passing_score));
        cells.push(Cell::Num(row.possession_score));
        cells.push(Cell::Num(row.defensive_score));
        cells.push(Cell::Num(row.shooting_score.unwrap_or(0.0)));
        cells.push(Cell::Num(row.versatility_score));
        cells.push(Cell::Num(row.adjusted_versatility));
        cells.push(Cell::Num(row.age_adjusted_versatility));
        section.rows.push(cells);
    }
    sections.push(section);

    let progression =
        analyze_progressive_actions(&possession, &passing, ctx.weights, ctx.method, top_n);
    sections.push(progression_section(
        "overall_progressors",
        "Top Overall Progressors",
        "Ranked by dominant progression mode: carrying, passing or receiving.",
        &progression.overall,
    ));
    sections.push(progression_section(
        "top_carriers",
        "Top Ball Carriers",
        "Players who progress the ball by carrying it.",
        &progression.top_carriers,
    ));
    sections.push(progression_section(
        "top_passers",
        "Top Progressive Passers",
        "Players who progress the ball by passing it.",
        &progression.top_passers,
    ));
    sections.push(progression_section(
        "top_receivers",
        "Top Progressive Receivers",
        "Players who find space to receive progressive passes.",
        &progression.top_receivers,
    ));
    sections.push(progression_section(
        "versatile_progressors",
        "Most Versatile Progressors",
        "Players who progress the ball effectively in several ways.",
        &progression.versatile,
    ));

    let xpi = expected_possession_impact(&possession, &ctx.weights.possession_impact, ctx.method);
    let mut section = Section::new(
        "possession_impact",
        "Highest Expected Possession Impact (xPI)",
        base_headers(&["Group", "xPI", "Position Relative xPI"]),
    )
    .with_blurb("Blended possession contribution; 1.0 is the cohort average.")
    .with_chart_column(5);
    for row in truncated(&xpi, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Text(row.position_group.label().to_string()));
        cells.push(Cell::Num(row.xpi));
        cells.push(Cell::Num(row.position_relative_xpi));
        section.rows.push(cells);
    }
    sections.push(section);

    match clustering::cluster_player_profiles(
        &crate::filters::with_role_tag(&possession, "MF"),
        &midfield_features(),
        &ctx.weights.clustering,
    ) {
        Ok(result) => {
            let mut section = Section::new(
                "midfielder_clusters",
                "Midfielder Profile Clusters",
                base_headers(&["Cluster"]),
            )
            .with_blurb("Groups of midfielders with similar statistical profiles.");
            for row in truncated(&result.rows, top_n) {
                let mut cells = identity_cells(&row.id);
                cells.push(Cell::Int(row.cluster as i64));
                section.rows.push(cells);
            }
            sections.push(section);

            let mut reps = Section::new(
                "cluster_representatives",
                "Cluster Representatives",
                vec![
                    "Cluster".to_string(),
                    "Size".to_string(),
                    "Player".to_string(),
                    "Squad".to_string(),
                    "Pos".to_string(),
                ],
            )
            .with_blurb("The member closest to each cluster's centroid.");
            for rep in &result.info.representatives {
                reps.rows.push(vec![
                    Cell::Int(rep.cluster as i64),
                    Cell::Int(result.info.sizes[rep.cluster] as i64),
                    Cell::Text(rep.player.clone()),
                    Cell::Text(rep.squad.clone()),
                    Cell::Text(rep.pos.clone()),
                ]);
            }
            sections.push(reps);
        }
        Err(err) => {
            tracing::error!(error = %err, "midfielder clustering skipped");
        }
    }

    Ok(sections)
}

fn progression_section(
    key: &str,
    title: &str,
    blurb: &str,
    rows: &[ProgressionRow],
) -> Section {
    let mut section = Section::new(
        key,
        title,
        base_headers(&[
            "Type",
            "Carrying",
            "Passing",
            "Receiving",
            "Total Progression Score",
        ]),
    )
    .with_blurb(blurb)
    .with_chart_column(8);
    for row in rows {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Text(row.progression_type.label().to_string()));
        cells.push(Cell::Num(row.carrying_score));
        cells.push(Cell::Num(row.passing_score));
        cells.push(Cell::Num(row.receiving_score));
        cells.push(Cell::Num(row.total_progression_score));
        section.rows.push(cells);
    }
    section
}

/// Shooting analysis: efficiency, profiles, finishing, shot quality and
/// creation specialists.
pub fn run_shooting(ctx: &mut PipelineContext) -> Result<Vec<Section>> {
    let shooting = ctx.require_cohort(StatTable::Shooting)?;
    // The shot-creation table is an optional enrichment.
    let creation = match ctx.cohort(StatTable::ShotCreation) {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(error = %err, "shot-creation table unavailable");
            Vec::new()
        }
    };

    let top_n = ctx.params.top_n;
    let min_shots = ctx.params.min_shots;
    let mut sections = Vec::new();

    let forwards =
        find_clinical_forwards(&shooting, min_shots, &ctx.weights.forward, ctx.method);
    let mut section = Section::new(
        "clinical_forwards",
        "Clinical Forwards",
        base_headers(&["Gls", "Sh", "Conversion", "Efficiency Score"]),
    )
    .with_blurb("Forwards who finish the chances they take.")
    .with_chart_column(7);
    for row in truncated(&forwards, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.goals));
        cells.push(Cell::Num(row.shots));
        cells.push(Cell::Num(row.conversion_rate));
        cells.push(Cell::Num(row.efficiency_score));
        section.rows.push(cells);
    }
    sections.push(section);

    let efficiency = analyze_shooting_efficiency(
        &shooting,
        min_shots,
        ctx.params.min_90s,
        &ctx.weights.shooting_efficiency,
        ctx.method,
    );
    let mut section = Section::new(
        "shooting_efficiency",
        "Shooting Efficiency",
        base_headers(&["Gls", "Sh", "SoT%", "Shot Quality", "Finishing Skill", "Efficiency Score"]),
    )
    .with_blurb("Overall shooting efficiency from conversion, accuracy and chance quality.")
    .with_chart_column(9);
    for row in truncated(&efficiency, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.goals));
        cells.push(Cell::Num(row.shots));
        cells.push(Cell::Num(row.shot_on_target_pct));
        cells.push(Cell::Num(row.shot_quality));
        cells.push(Cell::Num(row.finishing_skill));
        cells.push(Cell::Num(row.shooting_efficiency_score));
        section.rows.push(cells);
    }
    sections.push(section);

    let profiles = analyze_shooting_profile(&shooting, min_shots, ctx.method);
    let mut section = Section::new(
        "shooting_profiles",
        "Shooting Profiles",
        base_headers(&["Sh", "SoT%", "Dist", "Profile"]),
    )
    .with_blurb("Shot pattern classification; the first matching rule decides the label.");
    for row in truncated(&profiles, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.shots));
        cells.push(Cell::Num(row.shot_on_target_pct));
        cells.push(Cell::Num(row.shot_distance));
        cells.push(Cell::Text(row.profile.to_string()));
        section.rows.push(cells);
    }
    sections.push(section);

    let finishing = calculate_finishing_skill(&shooting, min_shots, ctx.params.min_90s);
    let mut section = Section::new(
        "finishing_skill",
        "Finishing Skill",
        base_headers(&["Gls", "xG", "NP Goals Above xG", "NP Finishing Index", "Category"]),
    )
    .with_blurb("Goals above expectation per shot, indexed so the cohort average is 100.")
    .with_chart_column(7);
    for row in truncated(&finishing, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.goals));
        cells.push(Cell::Num(row.xg));
        cells.push(Cell::Num(row.np_goals_above_xg));
        cells.push(Cell::Num(row.np_finishing_index));
        cells.push(Cell::Text(row.category.to_string()));
        section.rows.push(cells);
    }
    sections.push(section);

    let quality = analyze_shot_quality(&shooting, min_shots, &ctx.weights.shot_quality, ctx.method);
    let mut section = Section::new(
        "shot_quality",
        "Shot Quality",
        base_headers(&["Sh", "npxG/Shot", "Placement", "Selection Score", "Category"]),
    )
    .with_blurb("Chance value and shot location; long-range speculation scores down.")
    .with_chart_column(7);
    for row in truncated(&quality, top_n) {
        let mut cells = identity_cells(&row.id);
        cells.push(Cell::Num(row.shots));
        cells.push(Cell::Num(row.npxg_per_shot));
        cells.push(Cell::Num(row.shot_placement));
        cells.push(Cell::Num(row.shot_selection_score));
        cells.push(Cell::Text(row.category.to_string()));
        section.rows.push(cells);
    }
    sections.push(section);

    if !creation.is_empty() {
        let specialists = identify_shot_creation_specialists(
            &shooting,
            &creation,
            ctx.params.min_90s,
            ctx.method,
        );
        let mut section = Section::new(
            "shot_creation_specialists",
            "Shot Creation Specialists",
            base_headers(&["Gls", "SCA90", "GCA90", "Contribution Type", "Contribution Score"]),
        )
        .with_blurb("Players who both take and create shots.")
        .with_chart_column(8);
        for row in truncated(&specialists, top_n) {
            let mut cells = identity_cells(&row.id);
            cells.push(Cell::Num(row.goals));
            cells.push(Cell::Num(row.sca_per_90));
            cells.push(Cell::Num(row.gca_per_90));
            cells.push(Cell::Text(row.contribution_type.to_string()));
            cells.push(Cell::Num(row.shot_contribution_score));
            section.rows.push(cells);
        }
        sections.push(section);
    }

    Ok(sections)
}
