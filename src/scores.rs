//! Basic composite scores: fixed weighted sums of cohort-normalized
//! features. Input cohorts are expected to be eligibility-filtered already.

use std::collections::HashMap;

use crate::config::{
    CompleteMidfielderWeights, ForwardWeights, PlaymakerWeights, PressingWeights,
    ProgressiveWeights,
};
use crate::dataset::{Age, PlayerRecord, RawStat};
use crate::filters::{filter_min_shots, with_role_tag};
use crate::normalize::{NormMethod, WeightedColumn, normalize, weighted_score};
use crate::rank::sort_desc_by;

/// Identity columns carried through every scored row.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub player: String,
    pub squad: String,
    pub age: Age,
    pub pos: String,
    pub ninety: f64,
}

impl Identity {
    pub fn of(record: &PlayerRecord) -> Self {
        Self {
            player: record.name.clone(),
            squad: record.squad.clone(),
            age: record.age,
            pos: record.position.clone(),
            ninety: record.ninety,
        }
    }
}

/// Column of raw stat values across a cohort.
pub fn stat_column(cohort: &[PlayerRecord], stat: RawStat) -> Vec<Option<f64>> {
    cohort.iter().map(|r| r.stat(stat)).collect()
}

/// Column of per-90 rates across a cohort.
pub fn per90_column(cohort: &[PlayerRecord], stat: RawStat) -> Vec<Option<f64>> {
    cohort.iter().map(|r| r.per90(stat)).collect()
}

/// Ratio with defined zero-denominator behavior: a nonzero numerator over a
/// zero denominator is infinite (ranking places it first), while 0/0 is 0 so
/// NaN never enters a composite score.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator == 0.0 {
            0.0
        } else if numerator > 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    } else {
        numerator / denominator
    }
}

#[derive(Debug, Clone)]
pub struct PlaymakerRow {
    pub id: Identity,
    pub playmaker_score: f64,
}

/// Creative passers: progressive passing, chance creation and assist rates
/// against overall completion.
pub fn identify_playmakers(
    cohort: &[PlayerRecord],
    weights: &PlaymakerWeights,
    method: NormMethod,
) -> Vec<PlaymakerRow> {
    let columns = [
        WeightedColumn::new(
            per90_column(cohort, RawStat::ProgressivePasses),
            weights.progressive_passes,
        ),
        WeightedColumn::new(per90_column(cohort, RawStat::KeyPasses), weights.key_passes),
        WeightedColumn::new(
            stat_column(cohort, RawStat::PassCompletionPct),
            weights.pass_completion,
        ),
        WeightedColumn::new(per90_column(cohort, RawStat::Assists), weights.assists),
    ];
    let scores = weighted_score(&columns, method);

    let mut rows: Vec<PlaymakerRow> = cohort
        .iter()
        .zip(scores)
        .map(|(record, playmaker_score)| PlaymakerRow {
            id: Identity::of(record),
            playmaker_score,
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.playmaker_score);
    rows
}

#[derive(Debug, Clone)]
pub struct ClinicalForwardRow {
    pub id: Identity,
    pub goals: f64,
    pub shots: f64,
    pub conversion_rate: f64,
    pub xg_difference: f64,
    pub efficiency_score: f64,
}

/// Efficient finishers among players clearing the shot-count floor.
pub fn find_clinical_forwards(
    cohort: &[PlayerRecord],
    min_shots: u32,
    weights: &ForwardWeights,
    method: NormMethod,
) -> Vec<ClinicalForwardRow> {
    let shooters = filter_min_shots(cohort, min_shots);
    if shooters.is_empty() {
        tracing::warn!(min_shots, "no players clear the shot-count floor");
        return Vec::new();
    }

    let conversion: Vec<Option<f64>> = shooters
        .iter()
        .map(|r| {
            Some(ratio(
                r.stat_or_zero(RawStat::Goals),
                r.stat_or_zero(RawStat::Shots),
            ))
        })
        .collect();
    let xg_diff: Vec<Option<f64>> = shooters
        .iter()
        .map(|r| Some(r.stat_or_zero(RawStat::Goals) - r.stat_or_zero(RawStat::Xg)))
        .collect();

    let columns = [
        WeightedColumn::new(conversion.clone(), weights.conversion_rate),
        WeightedColumn::new(
            stat_column(&shooters, RawStat::ShotsOnTargetPct),
            weights.shot_on_target_pct,
        ),
        WeightedColumn::new(xg_diff.clone(), weights.xg_difference),
        WeightedColumn::new(per90_column(&shooters, RawStat::Goals), weights.goals_per_90),
    ];
    let scores = weighted_score(&columns, method);

    let mut rows: Vec<ClinicalForwardRow> = shooters
        .iter()
        .enumerate()
        .map(|(i, record)| ClinicalForwardRow {
            id: Identity::of(record),
            goals: record.stat_or_zero(RawStat::Goals),
            shots: record.stat_or_zero(RawStat::Shots),
            conversion_rate: conversion[i].unwrap_or(0.0),
            xg_difference: xg_diff[i].unwrap_or(0.0),
            efficiency_score: scores[i],
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.efficiency_score);
    rows
}

#[derive(Debug, Clone)]
pub struct ProgressiveMidfielderRow {
    pub id: Identity,
    pub progression_score: f64,
}

/// Ball progressors: carry distance, progressive carries, final-third
/// entries and progressive receptions, all per 90.
pub fn progressive_midfielders(
    cohort: &[PlayerRecord],
    weights: &ProgressiveWeights,
    method: NormMethod,
) -> Vec<ProgressiveMidfielderRow> {
    let columns = [
        WeightedColumn::new(
            per90_column(cohort, RawStat::ProgressiveDistance),
            weights.carry_distance,
        ),
        WeightedColumn::new(
            per90_column(cohort, RawStat::ProgressiveCarries),
            weights.progressive_carries,
        ),
        WeightedColumn::new(
            per90_column(cohort, RawStat::FinalThirdEntries),
            weights.final_third_entries,
        ),
        WeightedColumn::new(
            per90_column(cohort, RawStat::ProgressiveReceptions),
            weights.progressive_receptions,
        ),
    ];
    let scores = weighted_score(&columns, method);

    let mut rows: Vec<ProgressiveMidfielderRow> = cohort
        .iter()
        .zip(scores)
        .map(|(record, progression_score)| ProgressiveMidfielderRow {
            id: Identity::of(record),
            progression_score,
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.progression_score);
    rows
}

#[derive(Debug, Clone)]
pub struct PressingMidfielderRow {
    pub id: Identity,
    pub pressing_score: f64,
}

/// Defensive-action intensity for midfielders: tackles, interceptions,
/// tackle win rate and pressing high up the pitch.
pub fn pressing_midfielders(
    cohort: &[PlayerRecord],
    weights: &PressingWeights,
    method: NormMethod,
) -> Vec<PressingMidfielderRow> {
    let midfielders = with_role_tag(cohort, "MF");
    if midfielders.is_empty() {
        tracing::warn!("no midfielders in defensive cohort");
        return Vec::new();
    }

    let columns = [
        WeightedColumn::new(per90_column(&midfielders, RawStat::Tackles), weights.tackles),
        WeightedColumn::new(
            per90_column(&midfielders, RawStat::Interceptions),
            weights.interceptions,
        ),
        WeightedColumn::new(
            stat_column(&midfielders, RawStat::TackleWinPct),
            weights.tackle_win_pct,
        ),
        WeightedColumn::new(
            per90_column(&midfielders, RawStat::AttackingThirdTackles),
            weights.attacking_third_tackles,
        ),
    ];
    let scores = weighted_score(&columns, method);

    let mut rows: Vec<PressingMidfielderRow> = midfielders
        .iter()
        .zip(scores)
        .map(|(record, pressing_score)| PressingMidfielderRow {
            id: Identity::of(record),
            pressing_score,
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.pressing_score);
    rows
}

#[derive(Debug, Clone)]
pub struct CompleteMidfielderRow {
    pub id: Identity,
    pub progression_score: f64,
    pub pressing_score: f64,
    pub playmaker_score: f64,
    pub complete_midfielder_score: f64,
}

/// Well-rounded midfielders: the intersection of the progression, pressing
/// and playmaking cohorts, re-normalized and blended. Joined on
/// (player, squad) so a mid-season transfer stays two separate rows.
pub fn find_complete_midfielders(
    passing: &[PlayerRecord],
    possession: &[PlayerRecord],
    defense: &[PlayerRecord],
    playmaker_weights: &PlaymakerWeights,
    progressive_weights: &ProgressiveWeights,
    pressing_weights: &PressingWeights,
    weights: &CompleteMidfielderWeights,
    method: NormMethod,
) -> Vec<CompleteMidfielderRow> {
    let progression = progressive_midfielders(possession, progressive_weights, method);
    let pressing = pressing_midfielders(defense, pressing_weights, method);
    let playmaking = identify_playmakers(passing, playmaker_weights, method);

    if progression.is_empty() || pressing.is_empty() || playmaking.is_empty() {
        tracing::warn!("a component cohort is empty; no complete-midfielder scores");
        return Vec::new();
    }

    let key = |id: &Identity| (id.player.clone(), id.squad.clone());
    let pressing_by_key: HashMap<_, f64> = pressing
        .iter()
        .map(|r| (key(&r.id), r.pressing_score))
        .collect();
    let playmaking_by_key: HashMap<_, f64> = playmaking
        .iter()
        .map(|r| (key(&r.id), r.playmaker_score))
        .collect();

    let mut joined: Vec<CompleteMidfielderRow> = progression
        .iter()
        .filter_map(|p| {
            let k = key(&p.id);
            let pressing_score = *pressing_by_key.get(&k)?;
            let playmaker_score = *playmaking_by_key.get(&k)?;
            Some(CompleteMidfielderRow {
                id: p.id.clone(),
                progression_score: p.progression_score,
                pressing_score,
                playmaker_score,
                complete_midfielder_score: 0.0,
            })
        })
        .collect();

    let progression_norm = normalize(
        &joined.iter().map(|r| Some(r.progression_score)).collect::<Vec<_>>(),
        method,
    );
    let pressing_norm = normalize(
        &joined.iter().map(|r| Some(r.pressing_score)).collect::<Vec<_>>(),
        method,
    );
    let playmaker_norm = normalize(
        &joined.iter().map(|r| Some(r.playmaker_score)).collect::<Vec<_>>(),
        method,
    );

    for (i, row) in joined.iter_mut().enumerate() {
        row.complete_midfielder_score = progression_norm[i] * weights.progression
            + pressing_norm[i] * weights.pressing
            + playmaker_norm[i] * weights.playmaking;
    }
    sort_desc_by(&mut joined, |r| r.complete_midfielder_score);
    joined
}

#[derive(Debug, Clone)]
pub struct PassingQualityRow {
    pub id: Identity,
    pub passes_per_90: f64,
    pub pass_completion_pct: f64,
    pub key_passes_per_90: f64,
    pub xa_per_90: f64,
    pub passing_accuracy_score: f64,
    pub progression_score: f64,
    pub chance_creation_score: f64,
    pub passing_quality_score: f64,
}

/// Passing quality blend of accuracy, progression and chance creation. The
/// progression and creation terms are ratios to the cohort maximum; a
/// cohort-wide zero denominator leaves an infinite ratio in place, which
/// ranking keeps at the head of the table.
pub fn analyze_passing_quality(cohort: &[PlayerRecord]) -> Vec<PassingQualityRow> {
    if cohort.is_empty() {
        return Vec::new();
    }

    let passes_90: Vec<f64> = cohort
        .iter()
        .map(|r| r.stat_or_zero(RawStat::PassesCompleted) / r.ninety)
        .collect();
    let prog_passes_90: Vec<f64> = cohort
        .iter()
        .map(|r| r.stat_or_zero(RawStat::ProgressivePasses) / r.ninety)
        .collect();
    let key_passes_90: Vec<f64> = cohort
        .iter()
        .map(|r| r.stat_or_zero(RawStat::KeyPasses) / r.ninety)
        .collect();
    let xa_90: Vec<f64> = cohort
        .iter()
        .map(|r| r.stat_or_zero(RawStat::Xa) / r.ninety)
        .collect();

    let completed: Vec<f64> = cohort
        .iter()
        .map(|r| r.stat_or_zero(RawStat::PassesCompleted))
        .collect();
    let completed_median = median(&completed);

    let max_of = |values: &[f64]| values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let prog_max = max_of(&prog_passes_90);
    let prog_dist_max = max_of(
        &cohort
            .iter()
            .map(|r| r.stat_or_zero(RawStat::ProgressiveDistance))
            .collect::<Vec<_>>(),
    );
    let kp_max = max_of(&key_passes_90);
    let xa_max = max_of(&xa_90);
    let ppa_max = max_of(
        &cohort
            .iter()
            .map(|r| r.stat_or_zero(RawStat::PassesIntoPenaltyArea))
            .collect::<Vec<_>>(),
    );

    let mut rows: Vec<PassingQualityRow> = cohort
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let volume_bonus = if completed[i] > completed_median { 1.2 } else { 1.0 };
            let passing_accuracy_score =
                record.stat_or_zero(RawStat::PassCompletionPct) / 100.0 * volume_bonus;

            let progression_score = (ratio(prog_passes_90[i], prog_max)
                + ratio(record.stat_or_zero(RawStat::ProgressiveDistance), prog_dist_max))
                / 2.0;

            let chance_creation_score = (ratio(key_passes_90[i], kp_max)
                + ratio(xa_90[i], xa_max)
                + ratio(record.stat_or_zero(RawStat::PassesIntoPenaltyArea), ppa_max))
                / 3.0;

            let passing_quality_score = passing_accuracy_score * 0.3
                + progression_score * 0.3
                + chance_creation_score * 0.4;

            PassingQualityRow {
                id: Identity::of(record),
                passes_per_90: passes_90[i],
                pass_completion_pct: record.stat_or_zero(RawStat::PassCompletionPct),
                key_passes_per_90: key_passes_90[i],
                xa_per_90: xa_90[i],
                passing_accuracy_score,
                progression_score,
                chance_creation_score,
                passing_quality_score,
            }
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.passing_quality_score);
    rows
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, pos: &str, ninety: f64) -> PlayerRecord {
        PlayerRecord::new(name, "Club", pos, Age { years: 24, days: 0 }, ninety)
    }

    fn passing_cohort() -> Vec<PlayerRecord> {
        vec![
            record("creator", "MF", 10.0)
                .with_stat(RawStat::ProgressivePasses, 80.0)
                .with_stat(RawStat::KeyPasses, 30.0)
                .with_stat(RawStat::PassCompletionPct, 88.0)
                .with_stat(RawStat::Assists, 8.0),
            record("recycler", "MF", 10.0)
                .with_stat(RawStat::ProgressivePasses, 30.0)
                .with_stat(RawStat::KeyPasses, 5.0)
                .with_stat(RawStat::PassCompletionPct, 92.0)
                .with_stat(RawStat::Assists, 1.0),
            record("passenger", "MF", 10.0)
                .with_stat(RawStat::ProgressivePasses, 10.0)
                .with_stat(RawStat::KeyPasses, 2.0)
                .with_stat(RawStat::PassCompletionPct, 70.0)
                .with_stat(RawStat::Assists, 0.0),
        ]
    }

    #[test]
    fn playmaker_score_favors_the_creator() {
        let rows = identify_playmakers(
            &passing_cohort(),
            &PlaymakerWeights::default(),
            NormMethod::MinMax,
        );
        assert_eq!(rows[0].id.player, "creator");
        assert_eq!(rows.last().unwrap().id.player, "passenger");
    }

    #[test]
    fn clinical_forwards_applies_shot_floor() {
        let cohort = vec![
            record("sniper", "FW", 10.0)
                .with_stat(RawStat::Shots, 40.0)
                .with_stat(RawStat::Goals, 12.0)
                .with_stat(RawStat::Xg, 8.0)
                .with_stat(RawStat::ShotsOnTargetPct, 55.0),
            record("shy", "FW", 10.0)
                .with_stat(RawStat::Shots, 5.0)
                .with_stat(RawStat::Goals, 2.0),
        ];
        let rows = find_clinical_forwards(&cohort, 20, &ForwardWeights::default(), NormMethod::MinMax);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.player, "sniper");
        assert!((rows[0].conversion_rate - 0.3).abs() < 1e-12);
        assert!((rows[0].xg_difference - 4.0).abs() < 1e-12);
    }

    #[test]
    fn pressing_keeps_only_midfield_tags() {
        let cohort = vec![
            record("destroyer", "MF", 10.0)
                .with_stat(RawStat::Tackles, 40.0)
                .with_stat(RawStat::Interceptions, 20.0)
                .with_stat(RawStat::TackleWinPct, 60.0),
            record("striker", "FW", 10.0)
                .with_stat(RawStat::Tackles, 5.0)
                .with_stat(RawStat::Interceptions, 2.0),
        ];
        let rows = pressing_midfielders(&cohort, &PressingWeights::default(), NormMethod::MinMax);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.player, "destroyer");
    }

    #[test]
    fn complete_midfielders_join_on_player_and_squad() {
        let passing = passing_cohort();
        let possession: Vec<PlayerRecord> = passing
            .iter()
            .enumerate()
            .map(|(i, r)| {
                record(&r.name, "Club", 10.0)
                    .with_stat(RawStat::ProgressiveDistance, 1000.0 - 200.0 * i as f64)
                    .with_stat(RawStat::ProgressiveCarries, 50.0 - 10.0 * i as f64)
                    .with_stat(RawStat::FinalThirdEntries, 40.0 - 8.0 * i as f64)
                    .with_stat(RawStat::ProgressiveReceptions, 30.0 - 6.0 * i as f64)
            })
            .collect();
        let mut defense: Vec<PlayerRecord> = passing
            .iter()
            .map(|r| {
                record(&r.name, "Club", 10.0)
                    .with_stat(RawStat::Tackles, 30.0)
                    .with_stat(RawStat::Interceptions, 15.0)
                    .with_stat(RawStat::TackleWinPct, 55.0)
            })
            .collect();
        // Same player name at a different squad must not join.
        defense.push(
            PlayerRecord::new("creator", "Elsewhere", "MF", Age { years: 24, days: 0 }, 10.0)
                .with_stat(RawStat::Tackles, 99.0),
        );

        let rows = find_complete_midfielders(
            &passing,
            &possession,
            &defense,
            &PlaymakerWeights::default(),
            &ProgressiveWeights::default(),
            &PressingWeights::default(),
            &CompleteMidfielderWeights::default(),
            NormMethod::MinMax,
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id.player, "creator");
        assert_eq!(rows[0].id.squad, "Club");
    }

    #[test]
    fn passing_quality_blend_and_ordering() {
        let cohort: Vec<PlayerRecord> = passing_cohort()
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                r.with_stat(RawStat::PassesCompleted, 500.0 - 100.0 * i as f64)
                    .with_stat(RawStat::ProgressiveDistance, 900.0 - 150.0 * i as f64)
                    .with_stat(RawStat::Xa, 6.0 - 2.0 * i as f64)
                    .with_stat(RawStat::PassesIntoPenaltyArea, 20.0 - 5.0 * i as f64)
            })
            .collect();
        let rows = analyze_passing_quality(&cohort);
        assert_eq!(rows[0].id.player, "creator");
        // The leader tops every ratio, so their component scores are exact.
        assert!((rows[0].progression_score - 1.0).abs() < 1e-12);
        assert!((rows[0].chance_creation_score - 1.0).abs() < 1e-12);
        // Above-median volume earns the 1.2 accuracy bonus.
        assert!((rows[0].passing_accuracy_score - 0.88 * 1.2).abs() < 1e-12);
    }

    #[test]
    fn ratio_edge_cases_are_defined() {
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 0.0), f64::INFINITY);
        assert_eq!(ratio(-3.0, 0.0), f64::NEG_INFINITY);
        assert_eq!(ratio(6.0, 3.0), 2.0);
    }
}
