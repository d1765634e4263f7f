//! Versatility: how strong a player is across passing, possession,
//! defensive and shooting work at once. A single dominant axis is not
//! enough; the adjustment penalizes the spread between the player's best
//! and worst category.

use std::collections::HashMap;

use crate::config::VersatilityWeights;
use crate::dataset::{PlayerRecord, RawStat};
use crate::normalize::{NormMethod, normalize};
use crate::rank::sort_desc_by;
use crate::scores::Identity;

/// Playing time at which the minutes-reliability ramp saturates.
const FULL_NINETY: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct VersatilityRow {
    pub id: Identity,
    pub passing_score: f64,
    pub possession_score: f64,
    pub defensive_score: f64,
    /// Absent when no shooting table was provided for the run.
    pub shooting_score: Option<f64>,
    /// Weighted average of the category scores.
    pub versatility_score: f64,
    /// Weighted average penalized by the best-minus-worst category spread
    /// and shrunk for thin playing time.
    pub adjusted_versatility: f64,
    /// Adjusted score additionally discounted for age relative to the
    /// youngest cohort member.
    pub age_adjusted_versatility: f64,
}

/// Score versatility over the intersection of the passing, possession and
/// defensive cohorts (joined on player and squad). The shooting cohort is
/// optional; when absent the three remaining category weights are used
/// renormalized.
pub fn calculate_versatility(
    passing: &[PlayerRecord],
    possession: &[PlayerRecord],
    defense: &[PlayerRecord],
    shooting: Option<&[PlayerRecord]>,
    weights: &VersatilityWeights,
    method: NormMethod,
) -> Vec<VersatilityRow> {
    let passing_scores = category_means(
        passing,
        &[
            RawStat::PassesCompleted,
            RawStat::ProgressivePasses,
            RawStat::KeyPasses,
            RawStat::Xa,
        ],
        method,
    );
    let possession_scores = category_means(
        possession,
        &[
            RawStat::Carries,
            RawStat::ProgressiveCarries,
            RawStat::FinalThirdEntries,
        ],
        method,
    );
    let defensive_scores = category_means(
        defense,
        &[RawStat::Tackles, RawStat::Interceptions, RawStat::Blocks],
        method,
    );
    let shooting_scores = shooting.map(|cohort| {
        category_means(
            cohort,
            &[RawStat::Shots, RawStat::Goals, RawStat::Xg],
            method,
        )
    });

    let possession_by_key = index_scores(possession, &possession_scores);
    let defensive_by_key = index_scores(defense, &defensive_scores);
    let shooting_by_key = shooting
        .zip(shooting_scores.as_deref())
        .map(|(cohort, scores)| index_scores(cohort, scores));

    let mut rows: Vec<VersatilityRow> = passing
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let key = (record.name.clone(), record.squad.clone());
            let possession_score = *possession_by_key.get(&key)?;
            let defensive_score = *defensive_by_key.get(&key)?;
            let shooting_score = match &shooting_by_key {
                // A player missing from the shooting table simply took no
                // shots; that is a zero category, not a dropped row.
                Some(by_key) => Some(by_key.get(&key).copied().unwrap_or(0.0)),
                None => None,
            };
            let passing_score = passing_scores[i];

            let mut categories = vec![
                (passing_score, weights.passing),
                (possession_score, weights.possession),
                (defensive_score, weights.defensive),
            ];
            if let Some(score) = shooting_score {
                categories.push((score, weights.shooting));
            }
            let weight_total: f64 = categories.iter().map(|(_, w)| w).sum();
            let versatility_score = if weight_total > 0.0 {
                categories.iter().map(|(s, w)| s * w).sum::<f64>() / weight_total
            } else {
                0.0
            };

            let best = categories.iter().map(|(s, _)| *s).fold(f64::NEG_INFINITY, f64::max);
            let worst = categories.iter().map(|(s, _)| *s).fold(f64::INFINITY, f64::min);
            let spread_factor = (1.0 - weights.spread_penalty * (best - worst)).max(0.0);

            let reliability = (record.ninety / FULL_NINETY).clamp(0.0, 1.0).sqrt();
            let adjusted_versatility = versatility_score * spread_factor * reliability;

            Some(VersatilityRow {
                id: Identity::of(record),
                passing_score,
                possession_score,
                defensive_score,
                shooting_score,
                versatility_score,
                adjusted_versatility,
                age_adjusted_versatility: adjusted_versatility,
            })
        })
        .collect();

    apply_age_adjustment(&mut rows, weights.age_penalty);
    sort_desc_by(&mut rows, |r| r.adjusted_versatility);
    rows
}

/// Mean of the normalized per-90 feature columns, the category sub-score.
fn category_means(cohort: &[PlayerRecord], features: &[RawStat], method: NormMethod) -> Vec<f64> {
    if cohort.is_empty() {
        return Vec::new();
    }
    let mut sums = vec![0.0; cohort.len()];
    for stat in features {
        let column: Vec<Option<f64>> = cohort.iter().map(|r| r.per90(*stat)).collect();
        for (sum, value) in sums.iter_mut().zip(normalize(&column, method)) {
            *sum += value;
        }
    }
    let count = features.len().max(1) as f64;
    sums.into_iter().map(|s| s / count).collect()
}

fn index_scores(
    cohort: &[PlayerRecord],
    scores: &[f64],
) -> HashMap<(String, String), f64> {
    cohort
        .iter()
        .zip(scores)
        .map(|(r, s)| ((r.name.clone(), r.squad.clone()), *s))
        .collect()
}

/// Older players are discounted on a curve anchored at the youngest cohort
/// member, so two equal profiles rank the younger one first.
fn apply_age_adjustment(rows: &mut [VersatilityRow], age_penalty: f64) {
    if rows.is_empty() {
        return;
    }
    let ages: Vec<Option<f64>> = rows.iter().map(|r| Some(f64::from(r.id.age.years))).collect();
    let age_norm = normalize(&ages, NormMethod::MinMax);
    for (row, norm) in rows.iter_mut().zip(age_norm) {
        let age_factor = 1.0 - norm * age_penalty;
        row.age_adjusted_versatility = row.adjusted_versatility * age_factor;
    }
}
