use crate::config::{AnalysisParams, PositionMatch};
use crate::dataset::{PlayerRecord, RawStat};

/// Whether a position tag-string passes the configured allow-list.
pub fn position_matches(position: &str, params: &AnalysisParams) -> bool {
    match params.position_match {
        PositionMatch::Exact => params
            .positions
            .iter()
            .any(|allowed| allowed == position.trim()),
        PositionMatch::AnyTag => {
            let allowed = params.allowed_tags();
            position
                .split(',')
                .map(str::trim)
                .any(|tag| !tag.is_empty() && allowed.contains(tag))
        }
    }
}

/// Eligibility filtering: a pure intersection of position, age and playing
/// time predicates. Applied before any scoring, so every normalization
/// distribution is computed over the surviving cohort only.
pub fn filter_cohort(records: &[PlayerRecord], params: &AnalysisParams) -> Vec<PlayerRecord> {
    records
        .iter()
        .filter(|r| position_matches(&r.position, params))
        .filter(|r| r.age.years <= params.max_age)
        .filter(|r| r.ninety >= params.min_90s)
        .cloned()
        .collect()
}

/// Shot-count floor for the shooting analyses. An absent shot count never
/// qualifies.
pub fn filter_min_shots(records: &[PlayerRecord], min_shots: u32) -> Vec<PlayerRecord> {
    records
        .iter()
        .filter(|r| r.stat(RawStat::Shots).is_some_and(|sh| sh >= min_shots as f64))
        .cloned()
        .collect()
}

/// Sub-cohort whose tag-string contains the given role tag.
pub fn with_role_tag(records: &[PlayerRecord], tag: &str) -> Vec<PlayerRecord> {
    records
        .iter()
        .filter(|r| r.position.split(',').any(|t| t.trim() == tag))
        .cloned()
        .collect()
}
