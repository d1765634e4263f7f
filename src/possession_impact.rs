//! Expected Possession Impact (xPI): a blended estimate of a player's
//! contribution to team possession play, scaled so the cohort average sits
//! at 1.0.

use crate::config::PossessionImpactWeights;
use crate::dataset::{PlayerRecord, RawStat};
use crate::normalize::{NormMethod, WeightedColumn, mean, normalize, weighted_score};
use crate::rank::sort_desc_by;
use crate::scores::Identity;

/// Coarse role buckets for position-relative scoring. A multi-tag player
/// takes the most attacking bucket their tags reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionGroup {
    Forwards,
    Midfielders,
    Defenders,
    Other,
}

impl PositionGroup {
    pub fn of(position: &str) -> Self {
        if position.contains("FW") {
            Self::Forwards
        } else if position.contains("MF") {
            Self::Midfielders
        } else if position.contains("DF") {
            Self::Defenders
        } else {
            Self::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Forwards => "Forwards",
            Self::Midfielders => "Midfielders",
            Self::Defenders => "Defenders",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PossessionImpactRow {
    pub id: Identity,
    pub position_group: PositionGroup,
    /// Share of possession actions kept, `1 - losses / actions`. Absent when
    /// the player recorded no carries or receptions.
    pub retention_ratio: Option<f64>,
    /// Blended impact, cohort average = 1.0.
    pub xpi: f64,
    /// Impact re-normalized among same-position-group peers.
    pub position_relative_xpi: f64,
}

/// Compute xPI over a possession cohort. Penalty-area entries join the blend
/// only when the cohort actually carries them, with the weight set
/// renormalized to sum to 1 in that case.
pub fn expected_possession_impact(
    cohort: &[PlayerRecord],
    weights: &PossessionImpactWeights,
    method: NormMethod,
) -> Vec<PossessionImpactRow> {
    if cohort.is_empty() {
        return Vec::new();
    }

    let retention: Vec<Option<f64>> = cohort.iter().map(retention_ratio).collect();

    let has_cpa = cohort
        .iter()
        .any(|r| r.stat(RawStat::PenaltyAreaEntries).is_some());

    let mut columns = vec![
        WeightedColumn::new(per90(cohort, RawStat::Touches), weights.touches),
        WeightedColumn::new(per90(cohort, RawStat::Carries), weights.carries),
        WeightedColumn::new(per90(cohort, RawStat::SuccessfulDribbles), weights.dribbles),
        WeightedColumn::new(
            per90(cohort, RawStat::ProgressiveCarries),
            weights.progressive_carries,
        ),
        WeightedColumn::new(
            per90(cohort, RawStat::FinalThirdEntries),
            weights.final_third_entries,
        ),
        WeightedColumn::new(
            per90(cohort, RawStat::ProgressiveReceptions),
            weights.progressive_receptions,
        ),
        WeightedColumn::new(retention.clone(), weights.retention),
    ];
    if has_cpa {
        columns.push(WeightedColumn::new(
            per90(cohort, RawStat::PenaltyAreaEntries),
            weights.penalty_area_entries,
        ));
        let total: f64 = columns.iter().map(|c| c.weight).sum();
        for column in &mut columns {
            column.weight /= total;
        }
    }

    let raw = weighted_score(&columns, method);

    // Scale to the cohort baseline: an average contributor reads 1.0.
    let baseline = mean(&raw);
    let xpi: Vec<f64> = if baseline.abs() > 1e-9 {
        raw.iter().map(|v| v / baseline).collect()
    } else {
        raw
    };

    let mut rows: Vec<PossessionImpactRow> = cohort
        .iter()
        .enumerate()
        .map(|(i, record)| PossessionImpactRow {
            id: Identity::of(record),
            position_group: PositionGroup::of(&record.position),
            retention_ratio: retention[i],
            xpi: xpi[i],
            position_relative_xpi: 0.0,
        })
        .collect();

    for group in [
        PositionGroup::Forwards,
        PositionGroup::Midfielders,
        PositionGroup::Defenders,
        PositionGroup::Other,
    ] {
        let indices: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.position_group == group)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }
        let group_xpi: Vec<Option<f64>> = indices.iter().map(|&i| Some(rows[i].xpi)).collect();
        for (&i, value) in indices.iter().zip(normalize(&group_xpi, method)) {
            rows[i].position_relative_xpi = value;
        }
    }

    sort_desc_by(&mut rows, |r| r.xpi);
    rows
}

fn per90(cohort: &[PlayerRecord], stat: RawStat) -> Vec<Option<f64>> {
    cohort.iter().map(|r| r.per90(stat)).collect()
}

/// `1 - (miscontrols + dispossessions) / (carries + receptions)`, undefined
/// for a player with no possession actions.
fn retention_ratio(record: &PlayerRecord) -> Option<f64> {
    let actions =
        record.stat_or_zero(RawStat::Carries) + record.stat_or_zero(RawStat::PassesReceived);
    if actions <= 0.0 {
        return None;
    }
    let losses =
        record.stat_or_zero(RawStat::Miscontrols) + record.stat_or_zero(RawStat::Dispossessed);
    Some(1.0 - losses / actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Age;

    fn record(name: &str, pos: &str, scale: f64) -> PlayerRecord {
        PlayerRecord::new(name, "Club", pos, Age { years: 24, days: 0 }, 10.0)
            .with_stat(RawStat::Touches, 600.0 * scale)
            .with_stat(RawStat::Carries, 300.0 * scale)
            .with_stat(RawStat::SuccessfulDribbles, 20.0 * scale)
            .with_stat(RawStat::ProgressiveCarries, 40.0 * scale)
            .with_stat(RawStat::FinalThirdEntries, 30.0 * scale)
            .with_stat(RawStat::ProgressiveReceptions, 50.0 * scale)
            .with_stat(RawStat::PassesReceived, 400.0 * scale)
            .with_stat(RawStat::Miscontrols, 12.0)
            .with_stat(RawStat::Dispossessed, 8.0)
    }

    #[test]
    fn cohort_average_is_the_unit_baseline() {
        let cohort = vec![
            record("low", "MF", 0.4),
            record("mid", "MF", 0.8),
            record("high", "MF", 1.2),
        ];
        let rows = expected_possession_impact(
            &cohort,
            &PossessionImpactWeights::default(),
            NormMethod::MinMax,
        );
        let avg = rows.iter().map(|r| r.xpi).sum::<f64>() / rows.len() as f64;
        assert!((avg - 1.0).abs() < 1e-9);
        assert_eq!(rows[0].id.player, "high");
    }

    #[test]
    fn position_relative_rescales_within_groups() {
        let cohort = vec![
            record("df-low", "DF", 0.2),
            record("df-high", "DF", 0.5),
            record("fw-low", "FW", 0.9),
            record("fw-high", "FW", 1.4),
        ];
        let rows = expected_possession_impact(
            &cohort,
            &PossessionImpactWeights::default(),
            NormMethod::MinMax,
        );
        let by_name = |name: &str| rows.iter().find(|r| r.id.player == name).unwrap();
        // Both group leaders top their own scale even though the defenders
        // trail every forward in absolute terms.
        assert!((by_name("df-high").position_relative_xpi - 1.0).abs() < 1e-9);
        assert!((by_name("fw-high").position_relative_xpi - 1.0).abs() < 1e-9);
        assert!(by_name("df-high").xpi < by_name("fw-low").xpi);
    }

    #[test]
    fn multi_tag_positions_take_most_attacking_group() {
        assert_eq!(PositionGroup::of("FW, MF"), PositionGroup::Forwards);
        assert_eq!(PositionGroup::of("MF,DF"), PositionGroup::Midfielders);
        assert_eq!(PositionGroup::of("DF"), PositionGroup::Defenders);
        assert_eq!(PositionGroup::of("GK"), PositionGroup::Other);
    }

    #[test]
    fn no_possession_actions_leaves_retention_absent() {
        let idle = PlayerRecord::new("idle", "Club", "MF", Age { years: 24, days: 0 }, 10.0);
        assert_eq!(retention_ratio(&idle), None);
        let active = record("active", "MF", 1.0);
        let r = retention_ratio(&active).unwrap();
        assert!((r - (1.0 - 20.0 / 700.0)).abs() < 1e-12);
    }
}
