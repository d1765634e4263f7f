//! Progression decomposition: how a player moves the ball forward, split
//! into carrying, passing and receiving modes. The total score classifies
//! the dominant mode instead of blending the three.

use std::collections::HashMap;
use std::fmt;

use crate::config::{ProgressionComponentWeights, ScoringWeights};
use crate::dataset::{PlayerRecord, RawStat};
use crate::normalize::{NormMethod, WeightedColumn, normalize, weighted_score};
use crate::rank::sort_desc_by;
use crate::scores::Identity;

/// Dominant progression mode. On ties the earlier variant wins, so a player
/// equally strong everywhere is a Carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionType {
    Carrier,
    Passer,
    Receiver,
}

impl ProgressionType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Carrier => "Carrier",
            Self::Passer => "Passer",
            Self::Receiver => "Receiver",
        }
    }
}

impl fmt::Display for ProgressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct ProgressionRow {
    pub id: Identity,
    pub carrying_score: f64,
    pub passing_score: f64,
    pub receiving_score: f64,
    /// Maximum of the three sub-scores.
    pub total_progression_score: f64,
    pub progression_type: ProgressionType,
    /// 1 minus the sample standard deviation of the three sub-scores; close
    /// to 1 means the player progresses effectively in every mode.
    pub versatility: f64,
}

/// Ranked views over one decomposition run.
#[derive(Debug, Clone)]
pub struct ProgressionResults {
    pub overall: Vec<ProgressionRow>,
    pub top_carriers: Vec<ProgressionRow>,
    pub top_passers: Vec<ProgressionRow>,
    pub top_receivers: Vec<ProgressionRow>,
    pub versatile: Vec<ProgressionRow>,
}

/// Decompose progression for players present in both the possession and the
/// passing cohorts (joined on player and squad).
pub fn analyze_progressive_actions(
    possession: &[PlayerRecord],
    passing: &[PlayerRecord],
    weights: &ScoringWeights,
    method: NormMethod,
    top_n: usize,
) -> ProgressionResults {
    let passing_by_key: HashMap<(String, String), &PlayerRecord> = passing
        .iter()
        .map(|r| ((r.name.clone(), r.squad.clone()), r))
        .collect();

    let joined: Vec<(&PlayerRecord, &PlayerRecord)> = possession
        .iter()
        .filter_map(|p| {
            passing_by_key
                .get(&(p.name.clone(), p.squad.clone()))
                .map(|pass| (p, *pass))
        })
        .collect();

    let possession_rows: Vec<&PlayerRecord> = joined.iter().map(|(p, _)| *p).collect();
    let carrying = carrying_scores(&possession_rows, &weights.progression_components, method);

    let passing_rates: Vec<Option<f64>> = joined
        .iter()
        .map(|(_, pass)| pass.per90(RawStat::ProgressivePasses))
        .collect();
    let passing_scores = normalize(&passing_rates, method);

    let receiving_rates: Vec<Option<f64>> = possession_rows
        .iter()
        .map(|p| p.per90(RawStat::ProgressiveReceptions))
        .collect();
    let receiving_scores = normalize(&receiving_rates, method);

    let mut rows: Vec<ProgressionRow> = joined
        .iter()
        .enumerate()
        .map(|(i, (record, _))| {
            let carrying_score = carrying[i];
            let passing_score = passing_scores[i];
            let receiving_score = receiving_scores[i];
            let (total_progression_score, progression_type) =
                dominant_mode(carrying_score, passing_score, receiving_score);
            let components = [carrying_score, passing_score, receiving_score];
            let mean = components.iter().sum::<f64>() / 3.0;
            ProgressionRow {
                id: Identity::of(record),
                carrying_score,
                passing_score,
                receiving_score,
                total_progression_score,
                progression_type,
                versatility: 1.0 - sample_std(&components, mean),
            }
        })
        .collect();

    sort_desc_by(&mut rows, |r| r.total_progression_score);

    let take = |mut rows: Vec<ProgressionRow>, key: fn(&ProgressionRow) -> f64| {
        sort_desc_by(&mut rows, key);
        rows.truncate(top_n);
        rows
    };

    let overall: Vec<ProgressionRow> = rows.iter().take(top_n).cloned().collect();
    let top_carriers = take(rows.clone(), |r| r.carrying_score);
    let top_passers = take(rows.clone(), |r| r.passing_score);
    let top_receivers = take(rows.clone(), |r| r.receiving_score);
    // Already ordered by total score; the stable re-sort on versatility acts
    // as the secondary key.
    let mut versatile = rows;
    versatile.sort_by(|a, b| {
        b.total_progression_score
            .total_cmp(&a.total_progression_score)
            .then(b.versatility.total_cmp(&a.versatility))
    });
    versatile.truncate(top_n);

    ProgressionResults {
        overall,
        top_carriers,
        top_passers,
        top_receivers,
        versatile,
    }
}

fn carrying_scores(
    cohort: &[&PlayerRecord],
    weights: &ProgressionComponentWeights,
    method: NormMethod,
) -> Vec<f64> {
    let col = |stat: RawStat| -> Vec<Option<f64>> {
        cohort.iter().map(|r| r.per90(stat)).collect()
    };
    let columns = [
        WeightedColumn::new(col(RawStat::ProgressiveCarries), weights.progressive_carries),
        WeightedColumn::new(col(RawStat::ProgressiveDistance), weights.carry_distance),
        WeightedColumn::new(col(RawStat::FinalThirdEntries), weights.final_third_entries),
        WeightedColumn::new(col(RawStat::PenaltyAreaEntries), weights.penalty_area_entries),
    ];
    weighted_score(&columns, method)
}

/// Maximum sub-score and its mode. Ties resolve Carrier > Passer > Receiver.
fn dominant_mode(carrying: f64, passing: f64, receiving: f64) -> (f64, ProgressionType) {
    let mut best = (carrying, ProgressionType::Carrier);
    if passing > best.0 {
        best = (passing, ProgressionType::Passer);
    }
    if receiving > best.0 {
        best = (receiving, ProgressionType::Receiver);
    }
    best
}

/// Sample (n-1) standard deviation, matching the reference versatility
/// calculation over the three component scores.
fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Age;

    fn pair(name: &str, prg_c: f64, prg_p: f64, prg_r: f64) -> (PlayerRecord, PlayerRecord) {
        let possession = PlayerRecord::new(name, "Club", "MF", Age { years: 23, days: 0 }, 10.0)
            .with_stat(RawStat::ProgressiveCarries, prg_c)
            .with_stat(RawStat::ProgressiveDistance, prg_c * 10.0)
            .with_stat(RawStat::FinalThirdEntries, prg_c / 2.0)
            .with_stat(RawStat::ProgressiveReceptions, prg_r);
        let passing = PlayerRecord::new(name, "Club", "MF", Age { years: 23, days: 0 }, 10.0)
            .with_stat(RawStat::ProgressivePasses, prg_p);
        (possession, passing)
    }

    fn run(pairs: Vec<(PlayerRecord, PlayerRecord)>) -> ProgressionResults {
        let (possession, passing): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        analyze_progressive_actions(
            &possession,
            &passing,
            &ScoringWeights::default(),
            NormMethod::MinMax,
            20,
        )
    }

    #[test]
    fn total_is_maximum_of_components() {
        let results = run(vec![
            pair("carrier", 90.0, 10.0, 5.0),
            pair("passer", 10.0, 95.0, 5.0),
            pair("receiver", 5.0, 10.0, 80.0),
            pair("baseline", 20.0, 20.0, 20.0),
        ]);
        for row in &results.overall {
            let expected = row
                .carrying_score
                .max(row.passing_score)
                .max(row.receiving_score);
            assert_eq!(row.total_progression_score, expected);
        }
    }

    #[test]
    fn type_labels_follow_the_dominant_mode() {
        let results = run(vec![
            pair("carrier", 90.0, 10.0, 5.0),
            pair("passer", 10.0, 95.0, 5.0),
            pair("receiver", 5.0, 10.0, 80.0),
            pair("baseline", 0.0, 0.0, 0.0),
        ]);
        let by_name = |name: &str| {
            results
                .overall
                .iter()
                .find(|r| r.id.player == name)
                .unwrap()
                .progression_type
        };
        assert_eq!(by_name("carrier"), ProgressionType::Carrier);
        assert_eq!(by_name("passer"), ProgressionType::Passer);
        assert_eq!(by_name("receiver"), ProgressionType::Receiver);
    }

    #[test]
    fn ties_prefer_carrier_then_passer() {
        assert_eq!(dominant_mode(0.5, 0.5, 0.5).1, ProgressionType::Carrier);
        assert_eq!(dominant_mode(0.2, 0.5, 0.5).1, ProgressionType::Passer);
        assert_eq!(dominant_mode(0.2, 0.3, 0.5).1, ProgressionType::Receiver);
    }

    #[test]
    fn only_players_in_both_tables_are_scored() {
        let (mut possession, passing): (Vec<_>, Vec<_>) = vec![
            pair("both", 50.0, 40.0, 30.0),
            pair("both2", 30.0, 20.0, 10.0),
        ]
        .into_iter()
        .unzip();
        possession.push(
            PlayerRecord::new("only-possession", "Club", "MF", Age { years: 23, days: 0 }, 9.0)
                .with_stat(RawStat::ProgressiveCarries, 99.0),
        );
        let results = analyze_progressive_actions(
            &possession,
            &passing,
            &ScoringWeights::default(),
            NormMethod::MinMax,
            20,
        );
        assert_eq!(results.overall.len(), 2);
        assert!(results.overall.iter().all(|r| r.id.player != "only-possession"));
    }
}
