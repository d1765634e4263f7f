//! Shooting analysis: efficiency, profile classification, shot quality and
//! finishing skill from shot volume, location and outcome aggregates.

use std::collections::HashMap;

use crate::config::{ShootingEfficiencyWeights, ShotQualityWeights};
use crate::dataset::{PlayerRecord, RawStat};
use crate::filters::filter_min_shots;
use crate::normalize::{NormMethod, WeightedColumn, mean, normalize, weighted_score};
use crate::rank::sort_desc_by;
use crate::scores::{Identity, ratio};

#[derive(Debug, Clone)]
pub struct ShootingEfficiencyRow {
    pub id: Identity,
    pub goals: f64,
    pub shots: f64,
    pub shot_on_target_pct: f64,
    pub conversion_rate: f64,
    /// Non-penalty xG per shot.
    pub shot_quality: f64,
    /// Goals minus expected goals.
    pub finishing_skill: f64,
    pub goals_per_90: f64,
    pub shooting_efficiency_score: f64,
}

/// Blend of conversion, accuracy, chance quality and finishing over players
/// clearing both the shot-count and playing-time floors.
pub fn analyze_shooting_efficiency(
    cohort: &[PlayerRecord],
    min_shots: u32,
    min_90s: f64,
    weights: &ShootingEfficiencyWeights,
    method: NormMethod,
) -> Vec<ShootingEfficiencyRow> {
    let eligible: Vec<PlayerRecord> = filter_min_shots(cohort, min_shots)
        .into_iter()
        .filter(|r| r.ninety >= min_90s)
        .collect();
    if eligible.is_empty() {
        tracing::warn!(min_shots, min_90s, "no players eligible for shooting efficiency");
        return Vec::new();
    }

    let conversion: Vec<f64> = eligible
        .iter()
        .map(|r| ratio(r.stat_or_zero(RawStat::Goals), r.stat_or_zero(RawStat::Shots)))
        .collect();
    let shot_quality: Vec<f64> = eligible
        .iter()
        .map(|r| ratio(r.stat_or_zero(RawStat::NpXg), r.stat_or_zero(RawStat::Shots)))
        .collect();
    let finishing: Vec<f64> = eligible
        .iter()
        .map(|r| r.stat_or_zero(RawStat::Goals) - r.stat_or_zero(RawStat::Xg))
        .collect();

    let columns = [
        WeightedColumn::new(some(&conversion), weights.conversion_rate),
        WeightedColumn::new(
            eligible.iter().map(|r| r.stat(RawStat::ShotsOnTargetPct)).collect(),
            weights.shot_on_target_pct,
        ),
        WeightedColumn::new(some(&shot_quality), weights.shot_quality),
        WeightedColumn::new(some(&finishing), weights.finishing_skill),
        WeightedColumn::new(
            eligible.iter().map(|r| r.per90(RawStat::Goals)).collect(),
            weights.goals_per_90,
        ),
    ];
    let scores = weighted_score(&columns, method);

    let mut rows: Vec<ShootingEfficiencyRow> = eligible
        .iter()
        .enumerate()
        .map(|(i, record)| ShootingEfficiencyRow {
            id: Identity::of(record),
            goals: record.stat_or_zero(RawStat::Goals),
            shots: record.stat_or_zero(RawStat::Shots),
            shot_on_target_pct: record.stat_or_zero(RawStat::ShotsOnTargetPct),
            conversion_rate: conversion[i],
            shot_quality: shot_quality[i],
            finishing_skill: finishing[i],
            goals_per_90: record.per90(RawStat::Goals).unwrap_or(0.0),
            shooting_efficiency_score: scores[i],
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.shooting_efficiency_score);
    rows
}

#[derive(Debug, Clone)]
pub struct ShootingProfileRow {
    pub id: Identity,
    pub shots: f64,
    pub shot_on_target_pct: f64,
    pub shot_distance: f64,
    pub profile: &'static str,
}

/// Categorize shooters by volume, distance and efficiency. The rules are
/// mutually exclusive by evaluation order: the first match wins, and a
/// player matching nothing is a Balanced Shooter.
pub fn analyze_shooting_profile(
    cohort: &[PlayerRecord],
    min_shots: u32,
    method: NormMethod,
) -> Vec<ShootingProfileRow> {
    let eligible = filter_min_shots(cohort, min_shots);
    if eligible.is_empty() {
        tracing::warn!(min_shots, "no players clear the shot floor for profiling");
        return Vec::new();
    }

    let shots_p90 = normalize(
        &eligible.iter().map(|r| r.per90(RawStat::Shots)).collect::<Vec<_>>(),
        method,
    );
    let accuracy = normalize(
        &eligible
            .iter()
            .map(|r| {
                Some(ratio(
                    r.stat_or_zero(RawStat::ShotsOnTarget),
                    r.stat_or_zero(RawStat::Shots),
                ))
            })
            .collect::<Vec<_>>(),
        method,
    );
    let conversion = normalize(
        &eligible
            .iter()
            .map(|r| {
                Some(ratio(
                    r.stat_or_zero(RawStat::Goals),
                    r.stat_or_zero(RawStat::Shots),
                ))
            })
            .collect::<Vec<_>>(),
        method,
    );
    let distance = normalize(
        &eligible.iter().map(|r| r.stat(RawStat::ShotDistance)).collect::<Vec<_>>(),
        method,
    );

    let rows = eligible
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let profile = classify_profile(shots_p90[i], accuracy[i], conversion[i], distance[i]);
            ShootingProfileRow {
                id: Identity::of(record),
                shots: record.stat_or_zero(RawStat::Shots),
                shot_on_target_pct: record.stat_or_zero(RawStat::ShotsOnTargetPct),
                shot_distance: record.stat_or_zero(RawStat::ShotDistance),
                profile,
            }
        })
        .collect();
    rows
}

/// Threshold rules over normalized profile metrics, in priority order.
fn classify_profile(shots_p90: f64, accuracy: f64, conversion: f64, distance: f64) -> &'static str {
    if shots_p90 > 0.7 && distance < 0.3 && accuracy > 0.6 {
        "Penalty Box Scorer"
    } else if shots_p90 < 0.4 && accuracy > 0.7 && distance < 0.3 {
        "Efficient Poacher"
    } else if distance > 0.7 && shots_p90 > 0.5 {
        "Distance Shooter"
    } else if conversion > 0.7 && shots_p90 > 0.4 && shots_p90 < 0.7 {
        "Clinical Finisher"
    } else if shots_p90 > 0.8 {
        "Volume Shooter"
    } else {
        "Balanced Shooter"
    }
}

#[derive(Debug, Clone)]
pub struct FinishingSkillRow {
    pub id: Identity,
    pub goals: f64,
    pub xg: f64,
    pub goals_above_xg: f64,
    pub np_goals_above_xg: f64,
    /// Per-shot over/under-performance scaled so the cohort average is 100.
    pub finishing_index: f64,
    pub np_finishing_index: f64,
    pub category: &'static str,
}

/// Finishing skill: goals above expectation per shot, indexed to the cohort
/// average (=100) and banded into finisher categories.
pub fn calculate_finishing_skill(
    cohort: &[PlayerRecord],
    min_shots: u32,
    min_90s: f64,
) -> Vec<FinishingSkillRow> {
    let eligible: Vec<PlayerRecord> = filter_min_shots(cohort, min_shots)
        .into_iter()
        .filter(|r| r.ninety >= min_90s)
        .collect();
    if eligible.is_empty() {
        tracing::warn!(min_shots, min_90s, "no players eligible for finishing skill");
        return Vec::new();
    }

    let per_shot: Vec<f64> = eligible
        .iter()
        .map(|r| {
            let above = r.stat_or_zero(RawStat::Goals) - r.stat_or_zero(RawStat::Xg);
            ratio(above, r.stat_or_zero(RawStat::Shots))
        })
        .collect();
    let np_per_shot: Vec<f64> = eligible
        .iter()
        .map(|r| {
            let above = r.stat_or_zero(RawStat::Goals)
                - r.stat_or_zero(RawStat::PensMade)
                - r.stat_or_zero(RawStat::NpXg);
            let np_shots = r.stat_or_zero(RawStat::Shots) - r.stat_or_zero(RawStat::PensAttempted);
            ratio(above, np_shots)
        })
        .collect();

    let index = |values: &[f64]| -> Vec<f64> {
        let avg = mean(values);
        if avg == 0.0 {
            vec![100.0; values.len()]
        } else {
            values.iter().map(|v| v / avg * 100.0).collect()
        }
    };
    let finishing_index = index(&per_shot);
    let np_finishing_index = index(&np_per_shot);

    let mut rows: Vec<FinishingSkillRow> = eligible
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let goals = record.stat_or_zero(RawStat::Goals);
            let xg = record.stat_or_zero(RawStat::Xg);
            FinishingSkillRow {
                id: Identity::of(record),
                goals,
                xg,
                goals_above_xg: goals - xg,
                np_goals_above_xg: goals
                    - record.stat_or_zero(RawStat::PensMade)
                    - record.stat_or_zero(RawStat::NpXg),
                finishing_index: finishing_index[i],
                np_finishing_index: np_finishing_index[i],
                category: finisher_category(np_finishing_index[i]),
            }
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.np_finishing_index);
    rows
}

fn finisher_category(np_index: f64) -> &'static str {
    if np_index >= 115.0 {
        "Elite Finisher"
    } else if np_index >= 105.0 {
        "Good Finisher"
    } else if np_index >= 95.0 {
        "Average Finisher"
    } else if np_index >= 85.0 {
        "Below Average Finisher"
    } else {
        "Poor Finisher"
    }
}

#[derive(Debug, Clone)]
pub struct ShotQualityRow {
    pub id: Identity,
    pub shots: f64,
    pub xg_per_shot: f64,
    pub npxg_per_shot: f64,
    /// On-target share of all shots.
    pub shot_placement: f64,
    pub shot_selection_score: f64,
    pub category: &'static str,
}

/// Shot quality from chance value and location: high npxG per shot and good
/// placement score up, long average distance scores down.
pub fn analyze_shot_quality(
    cohort: &[PlayerRecord],
    min_shots: u32,
    weights: &ShotQualityWeights,
    method: NormMethod,
) -> Vec<ShotQualityRow> {
    let eligible = filter_min_shots(cohort, min_shots);
    if eligible.is_empty() {
        tracing::warn!(min_shots, "no players clear the shot floor for shot quality");
        return Vec::new();
    }

    let xg_per_shot: Vec<f64> = eligible
        .iter()
        .map(|r| ratio(r.stat_or_zero(RawStat::Xg), r.stat_or_zero(RawStat::Shots)))
        .collect();
    let npxg_per_shot: Vec<f64> = eligible
        .iter()
        .map(|r| {
            let np_shots = r.stat_or_zero(RawStat::Shots) - r.stat_or_zero(RawStat::PensAttempted);
            ratio(r.stat_or_zero(RawStat::NpXg), np_shots)
        })
        .collect();
    let placement: Vec<f64> = eligible
        .iter()
        .map(|r| {
            ratio(
                r.stat_or_zero(RawStat::ShotsOnTarget),
                r.stat_or_zero(RawStat::Shots),
            )
        })
        .collect();

    let npxg_norm = normalize(&some(&npxg_per_shot), method);
    let placement_norm = normalize(&some(&placement), method);
    let distance_norm = normalize(
        &eligible.iter().map(|r| r.stat(RawStat::ShotDistance)).collect::<Vec<_>>(),
        method,
    );

    let mut rows: Vec<ShotQualityRow> = eligible
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let shot_selection_score = npxg_norm[i] * weights.npxg_per_shot
                + placement_norm[i] * weights.placement
                - distance_norm[i] * weights.distance;
            ShotQualityRow {
                id: Identity::of(record),
                shots: record.stat_or_zero(RawStat::Shots),
                xg_per_shot: xg_per_shot[i],
                npxg_per_shot: npxg_per_shot[i],
                shot_placement: placement[i],
                shot_selection_score,
                category: selection_category(shot_selection_score),
            }
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.shot_selection_score);
    rows
}

fn selection_category(score: f64) -> &'static str {
    if score >= 0.8 {
        "Elite Shot Selector"
    } else if score >= 0.6 {
        "Good Shot Selector"
    } else if score >= 0.4 {
        "Average Shot Selector"
    } else if score >= 0.2 {
        "Below Average Shot Selector"
    } else {
        "Poor Shot Selector"
    }
}

#[derive(Debug, Clone)]
pub struct ShotContributionRow {
    pub id: Identity,
    pub goals: f64,
    pub sca_per_90: f64,
    pub gca_per_90: f64,
    pub shooting_component: f64,
    pub creation_component: f64,
    pub shot_contribution_score: f64,
    pub contribution_type: &'static str,
}

/// Players who both finish and create: balanced blend of goal output and
/// shot/goal-creating actions, joined across the shooting and shot-creation
/// tables on (player, squad).
pub fn identify_shot_creation_specialists(
    shooting: &[PlayerRecord],
    creation: &[PlayerRecord],
    min_90s: f64,
    method: NormMethod,
) -> Vec<ShotContributionRow> {
    let shooting: Vec<&PlayerRecord> =
        shooting.iter().filter(|r| r.ninety >= min_90s).collect();
    let creation_by_key: HashMap<(String, String), &PlayerRecord> = creation
        .iter()
        .filter(|r| r.ninety >= min_90s)
        .map(|r| ((r.name.clone(), r.squad.clone()), r))
        .collect();

    let joined: Vec<(&PlayerRecord, &PlayerRecord)> = shooting
        .iter()
        .filter_map(|s| {
            creation_by_key
                .get(&(s.name.clone(), s.squad.clone()))
                .map(|c| (*s, *c))
        })
        .collect();
    if joined.is_empty() {
        tracing::warn!("no players shared between shooting and shot-creation tables");
        return Vec::new();
    }

    let goals_p90 = normalize(
        &joined.iter().map(|(s, _)| s.per90(RawStat::Goals)).collect::<Vec<_>>(),
        method,
    );
    let xg_p90 = normalize(
        &joined.iter().map(|(s, _)| s.per90(RawStat::Xg)).collect::<Vec<_>>(),
        method,
    );
    let sca90_raw: Vec<Option<f64>> = joined
        .iter()
        .map(|(_, c)| {
            c.stat(RawStat::ShotCreatingActionsPer90)
                .or_else(|| c.per90(RawStat::ShotCreatingActions))
        })
        .collect();
    let gca90_raw: Vec<Option<f64>> = joined
        .iter()
        .map(|(_, c)| {
            c.stat(RawStat::GoalCreatingActionsPer90)
                .or_else(|| c.per90(RawStat::GoalCreatingActions))
        })
        .collect();
    let sca90 = normalize(&sca90_raw, method);
    let gca90 = normalize(&gca90_raw, method);

    let mut rows: Vec<ShotContributionRow> = joined
        .iter()
        .enumerate()
        .map(|(i, (record, _))| {
            let shooting_component = goals_p90[i] * 0.6 + xg_p90[i] * 0.4;
            let creation_component = sca90[i] * 0.6 + gca90[i] * 0.4;
            ShotContributionRow {
                id: Identity::of(record),
                goals: record.stat_or_zero(RawStat::Goals),
                sca_per_90: sca90_raw[i].unwrap_or(0.0),
                gca_per_90: gca90_raw[i].unwrap_or(0.0),
                shooting_component,
                creation_component,
                shot_contribution_score: shooting_component * 0.5 + creation_component * 0.5,
                contribution_type: contribution_type(shooting_component, creation_component),
            }
        })
        .collect();
    sort_desc_by(&mut rows, |r| r.shot_contribution_score);
    rows
}

fn contribution_type(shooting: f64, creation: f64) -> &'static str {
    if shooting > creation * 1.5 {
        "Shooter"
    } else if creation > shooting * 1.5 {
        "Creator"
    } else if (shooting - creation).abs() < 0.1 {
        "Balanced Contributor"
    } else {
        "Mixed Contributor"
    }
}

fn some(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Age;

    fn shooter(
        name: &str,
        shots: f64,
        on_target: f64,
        goals: f64,
        xg: f64,
        dist: f64,
        ninety: f64,
    ) -> PlayerRecord {
        PlayerRecord::new(name, "Club", "FW", Age { years: 24, days: 0 }, ninety)
            .with_stat(RawStat::Shots, shots)
            .with_stat(RawStat::ShotsOnTarget, on_target)
            .with_stat(RawStat::ShotsOnTargetPct, ratio(on_target, shots) * 100.0)
            .with_stat(RawStat::Goals, goals)
            .with_stat(RawStat::Xg, xg)
            .with_stat(RawStat::NpXg, xg * 0.9)
            .with_stat(RawStat::PensMade, 0.0)
            .with_stat(RawStat::PensAttempted, 0.0)
            .with_stat(RawStat::ShotDistance, dist)
    }

    #[test]
    fn efficiency_ranks_the_overperformer_first() {
        let cohort = vec![
            shooter("clinical", 40.0, 24.0, 14.0, 8.0, 12.0, 20.0),
            shooter("average", 40.0, 16.0, 6.0, 6.0, 16.0, 20.0),
            shooter("wasteful", 50.0, 12.0, 3.0, 7.0, 22.0, 20.0),
        ];
        let rows = analyze_shooting_efficiency(
            &cohort,
            20,
            5.0,
            &ShootingEfficiencyWeights::default(),
            NormMethod::MinMax,
        );
        assert_eq!(rows[0].id.player, "clinical");
        assert_eq!(rows.last().unwrap().id.player, "wasteful");
        assert!((rows[0].conversion_rate - 0.35).abs() < 1e-12);
    }

    #[test]
    fn profile_rules_fire_in_priority_order() {
        assert_eq!(classify_profile(0.8, 0.7, 0.5, 0.1), "Penalty Box Scorer");
        assert_eq!(classify_profile(0.2, 0.8, 0.5, 0.1), "Efficient Poacher");
        assert_eq!(classify_profile(0.6, 0.5, 0.5, 0.9), "Distance Shooter");
        assert_eq!(classify_profile(0.5, 0.5, 0.8, 0.5), "Clinical Finisher");
        assert_eq!(classify_profile(0.9, 0.5, 0.5, 0.5), "Volume Shooter");
        assert_eq!(classify_profile(0.5, 0.5, 0.5, 0.5), "Balanced Shooter");
        // A profile matching both the box-scorer and volume rules takes the
        // earlier one.
        assert_eq!(classify_profile(0.9, 0.7, 0.9, 0.1), "Penalty Box Scorer");
    }

    #[test]
    fn finishing_index_averages_to_one_hundred() {
        let cohort = vec![
            shooter("hot", 30.0, 15.0, 10.0, 6.0, 14.0, 20.0),
            shooter("cold", 30.0, 10.0, 3.0, 6.0, 14.0, 20.0),
        ];
        let rows = calculate_finishing_skill(&cohort, 20, 5.0);
        let avg = rows.iter().map(|r| r.finishing_index).sum::<f64>() / rows.len() as f64;
        assert!((avg - 100.0).abs() < 1e-9);
        assert_eq!(rows[0].id.player, "hot");
        assert!(rows[0].np_finishing_index > rows[1].np_finishing_index);
    }

    #[test]
    fn finisher_bands_cover_the_scale() {
        assert_eq!(finisher_category(130.0), "Elite Finisher");
        assert_eq!(finisher_category(108.0), "Good Finisher");
        assert_eq!(finisher_category(100.0), "Average Finisher");
        assert_eq!(finisher_category(90.0), "Below Average Finisher");
        assert_eq!(finisher_category(60.0), "Poor Finisher");
    }

    #[test]
    fn shot_quality_penalizes_distance() {
        let cohort = vec![
            shooter("close", 30.0, 18.0, 8.0, 7.5, 8.0, 20.0),
            shooter("far", 30.0, 9.0, 3.0, 2.0, 25.0, 20.0),
        ];
        let rows = analyze_shot_quality(&cohort, 20, &ShotQualityWeights::default(), NormMethod::MinMax);
        assert_eq!(rows[0].id.player, "close");
        assert!(rows[0].shot_selection_score > rows[1].shot_selection_score);
        assert_eq!(rows[0].category, "Elite Shot Selector");
    }

    #[test]
    fn specialists_join_and_classify_balance() {
        let shooting = vec![
            shooter("finisher", 60.0, 30.0, 18.0, 15.0, 11.0, 20.0),
            shooter("architect", 20.0, 8.0, 2.0, 2.5, 18.0, 20.0),
        ];
        let creation = vec![
            PlayerRecord::new("finisher", "Club", "FW", Age { years: 24, days: 0 }, 20.0)
                .with_stat(RawStat::ShotCreatingActionsPer90, 1.5)
                .with_stat(RawStat::GoalCreatingActionsPer90, 0.2),
            PlayerRecord::new("architect", "Club", "FW", Age { years: 24, days: 0 }, 20.0)
                .with_stat(RawStat::ShotCreatingActionsPer90, 6.0)
                .with_stat(RawStat::GoalCreatingActionsPer90, 1.1),
        ];
        let rows = identify_shot_creation_specialists(&shooting, &creation, 5.0, NormMethod::MinMax);
        assert_eq!(rows.len(), 2);
        let by_name = |name: &str| rows.iter().find(|r| r.id.player == name).unwrap();
        assert_eq!(by_name("finisher").contribution_type, "Shooter");
        assert_eq!(by_name("architect").contribution_type, "Creator");
    }
}
