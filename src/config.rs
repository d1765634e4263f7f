use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// How a player's position tag-string is matched against the allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionMatch {
    /// A player matches when any of their individual role tags appears in
    /// the allowed set (tags on both sides are split on commas and trimmed).
    AnyTag,
    /// A player matches only when their full tag-string equals an allowed
    /// entry literally, spacing and ordering included.
    Exact,
}

/// Eligibility thresholds for one analysis run. Passed explicitly into every
/// computation; there is no process-wide mutable default.
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    pub min_shots: u32,
    pub top_n: usize,
    pub positions: Vec<String>,
    pub position_match: PositionMatch,
    pub min_90s: f64,
    pub max_age: u32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            min_shots: 20,
            top_n: 20,
            positions: vec![
                "MF".to_string(),
                "FW, MF".to_string(),
                "MF,DF".to_string(),
            ],
            position_match: PositionMatch::AnyTag,
            min_90s: 5.0,
            max_age: 30,
        }
    }
}

impl AnalysisParams {
    /// Allowed individual role tags, derived by splitting every configured
    /// entry. Used by the `AnyTag` match mode.
    pub fn allowed_tags(&self) -> BTreeSet<String> {
        self.positions
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaymakerWeights {
    pub progressive_passes: f64,
    pub key_passes: f64,
    pub pass_completion: f64,
    pub assists: f64,
}

impl Default for PlaymakerWeights {
    fn default() -> Self {
        Self {
            progressive_passes: 0.35,
            key_passes: 0.30,
            pass_completion: 0.20,
            assists: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForwardWeights {
    pub conversion_rate: f64,
    pub shot_on_target_pct: f64,
    pub xg_difference: f64,
    pub goals_per_90: f64,
}

impl Default for ForwardWeights {
    fn default() -> Self {
        Self {
            conversion_rate: 0.30,
            shot_on_target_pct: 0.25,
            xg_difference: 0.25,
            goals_per_90: 0.20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressiveWeights {
    pub carry_distance: f64,
    pub progressive_carries: f64,
    pub final_third_entries: f64,
    pub progressive_receptions: f64,
}

impl Default for ProgressiveWeights {
    fn default() -> Self {
        Self {
            carry_distance: 0.35,
            progressive_carries: 0.30,
            final_third_entries: 0.20,
            progressive_receptions: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PressingWeights {
    pub tackles: f64,
    pub interceptions: f64,
    pub tackle_win_pct: f64,
    pub attacking_third_tackles: f64,
}

impl Default for PressingWeights {
    fn default() -> Self {
        Self {
            tackles: 0.35,
            interceptions: 0.30,
            tackle_win_pct: 0.20,
            attacking_third_tackles: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompleteMidfielderWeights {
    pub progression: f64,
    pub pressing: f64,
    pub playmaking: f64,
}

impl Default for CompleteMidfielderWeights {
    fn default() -> Self {
        Self {
            progression: 0.40,
            pressing: 0.30,
            playmaking: 0.30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VersatilityWeights {
    pub passing: f64,
    pub possession: f64,
    pub defensive: f64,
    pub shooting: f64,
    /// Multiplier on the best-minus-worst category spread when computing the
    /// adjusted score. Larger spread lowers the adjustment.
    pub spread_penalty: f64,
    /// Penalty factor applied to older players in the age-adjusted variant.
    pub age_penalty: f64,
}

impl Default for VersatilityWeights {
    fn default() -> Self {
        Self {
            passing: 0.30,
            possession: 0.30,
            defensive: 0.30,
            shooting: 0.10,
            spread_penalty: 0.5,
            age_penalty: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PossessionImpactWeights {
    pub touches: f64,
    pub carries: f64,
    pub dribbles: f64,
    pub progressive_carries: f64,
    pub final_third_entries: f64,
    pub progressive_receptions: f64,
    pub retention: f64,
    /// Only applied when the cohort carries penalty-area entry counts; the
    /// full weight set is renormalized to sum to 1 in that case.
    pub penalty_area_entries: f64,
}

impl Default for PossessionImpactWeights {
    fn default() -> Self {
        Self {
            touches: 0.05,
            carries: 0.10,
            dribbles: 0.15,
            progressive_carries: 0.20,
            final_third_entries: 0.15,
            progressive_receptions: 0.15,
            retention: 0.20,
            penalty_area_entries: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProgressionComponentWeights {
    pub progressive_carries: f64,
    pub carry_distance: f64,
    pub final_third_entries: f64,
    pub penalty_area_entries: f64,
}

impl Default for ProgressionComponentWeights {
    fn default() -> Self {
        Self {
            progressive_carries: 0.30,
            carry_distance: 0.35,
            final_third_entries: 0.20,
            penalty_area_entries: 0.10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShootingEfficiencyWeights {
    pub conversion_rate: f64,
    pub shot_on_target_pct: f64,
    pub shot_quality: f64,
    pub finishing_skill: f64,
    pub goals_per_90: f64,
}

impl Default for ShootingEfficiencyWeights {
    fn default() -> Self {
        Self {
            conversion_rate: 0.25,
            shot_on_target_pct: 0.20,
            shot_quality: 0.20,
            finishing_skill: 0.15,
            goals_per_90: 0.20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShotQualityWeights {
    pub npxg_per_shot: f64,
    pub placement: f64,
    pub distance: f64,
}

impl Default for ShotQualityWeights {
    fn default() -> Self {
        Self {
            npxg_per_shot: 0.5,
            placement: 0.3,
            distance: 0.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    pub cluster_count: usize,
    pub seed: u64,
    pub restarts: usize,
    pub max_iterations: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            cluster_count: 5,
            seed: 42,
            restarts: 10,
            max_iterations: 300,
        }
    }
}

/// All score weights for one run. Defaults mirror the shipped weighting
/// tables; any subset can be overridden from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub playmaker: PlaymakerWeights,
    pub forward: ForwardWeights,
    pub progressive: ProgressiveWeights,
    pub pressing: PressingWeights,
    pub complete_midfielder: CompleteMidfielderWeights,
    pub versatility: VersatilityWeights,
    pub possession_impact: PossessionImpactWeights,
    pub progression_components: ProgressionComponentWeights,
    pub shooting_efficiency: ShootingEfficiencyWeights,
    pub shot_quality: ShotQualityWeights,
    pub clustering: ClusterParams,
}

impl ScoringWeights {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read weights file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse weights file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_tags_split_and_trim() {
        let params = AnalysisParams::default();
        let tags = params.allowed_tags();
        assert!(tags.contains("MF"));
        assert!(tags.contains("FW"));
        assert!(tags.contains("DF"));
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn weights_file_overrides_subset() {
        let parsed: ScoringWeights = toml::from_str(
            r#"
            [playmaker]
            progressive_passes = 0.5

            [clustering]
            cluster_count = 3
            "#,
        )
        .unwrap();
        assert_eq!(parsed.playmaker.progressive_passes, 0.5);
        // Untouched fields keep their defaults.
        assert_eq!(parsed.playmaker.key_passes, 0.30);
        assert_eq!(parsed.clustering.cluster_count, 3);
        assert_eq!(parsed.forward.conversion_rate, 0.30);
    }
}
