//! Profile clustering: group a cohort by statistical shape using k-means
//! over standardized features. Cluster ids are labels for one run only;
//! the run is deterministic for a fixed seed and input order.

use anyhow::{Result, anyhow};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ClusterParams;
use crate::dataset::{PlayerRecord, RawStat};
use crate::normalize::{mean, std_dev};
use crate::scores::Identity;

/// A feature used for clustering, either a season total or a per-90 rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterFeature {
    Total(RawStat),
    Per90(RawStat),
}

impl ClusterFeature {
    pub fn label(self) -> String {
        match self {
            Self::Total(stat) => format!("{stat:?}"),
            Self::Per90(stat) => format!("{stat:?}Per90"),
        }
    }

    fn value(self, record: &PlayerRecord) -> Option<f64> {
        match self {
            Self::Total(stat) => record.stat(stat),
            Self::Per90(stat) => record.per90(stat),
        }
    }
}

/// Feature set for midfield profile clustering over the possession table.
pub fn midfield_features() -> Vec<ClusterFeature> {
    vec![
        ClusterFeature::Total(RawStat::ProgressiveCarries),
        ClusterFeature::Total(RawStat::Carries),
        ClusterFeature::Per90(RawStat::FinalThirdEntries),
        ClusterFeature::Per90(RawStat::ProgressiveCarries),
        ClusterFeature::Per90(RawStat::Touches),
    ]
}

#[derive(Debug, Clone)]
pub struct ClusteredPlayerRow {
    pub id: Identity,
    pub cluster: usize,
}

#[derive(Debug, Clone)]
pub struct ClusterRepresentative {
    pub cluster: usize,
    pub player: String,
    pub squad: String,
    pub pos: String,
}

#[derive(Debug, Clone)]
pub struct ClusterInfo {
    /// Centroids mapped back to the original feature scale.
    pub centers: Vec<Vec<f64>>,
    pub sizes: Vec<usize>,
    /// Closest member to each centroid.
    pub representatives: Vec<ClusterRepresentative>,
    pub feature_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ClusterResult {
    pub rows: Vec<ClusteredPlayerRow>,
    pub info: ClusterInfo,
}

/// Cluster a cohort over the given features. A cohort smaller than the
/// configured cluster count is grouped into fewer clusters instead of
/// failing; only an empty cohort is an error.
pub fn cluster_player_profiles(
    cohort: &[PlayerRecord],
    features: &[ClusterFeature],
    params: &ClusterParams,
) -> Result<ClusterResult> {
    if cohort.is_empty() {
        return Err(anyhow!("empty cohort, nothing to cluster"));
    }
    if features.is_empty() {
        return Err(anyhow!("no clustering features configured"));
    }

    let k = params.cluster_count.clamp(1, cohort.len());
    if k < params.cluster_count {
        tracing::warn!(
            requested = params.cluster_count,
            actual = k,
            "cohort smaller than cluster count, reducing"
        );
    }

    // Assemble the feature matrix, filling absences with the column mean so
    // one missing stat does not eject a player from the cohort.
    let mut matrix: Vec<Vec<f64>> = vec![vec![0.0; features.len()]; cohort.len()];
    let mut col_means = vec![0.0; features.len()];
    let mut col_stds = vec![0.0; features.len()];

    for (j, feature) in features.iter().enumerate() {
        let raw: Vec<Option<f64>> = cohort.iter().map(|r| feature.value(r)).collect();
        let present: Vec<f64> = raw
            .iter()
            .filter_map(|v| *v)
            .filter(|v| v.is_finite())
            .collect();
        let fill = mean(&present);
        let column: Vec<f64> = raw
            .iter()
            .map(|v| match v {
                Some(x) if x.is_finite() => *x,
                _ => fill,
            })
            .collect();
        let m = mean(&column);
        let s = std_dev(&column, m);
        col_means[j] = m;
        col_stds[j] = s;
        for (i, value) in column.iter().enumerate() {
            matrix[i][j] = if s > 1e-9 { (value - m) / s } else { 0.0 };
        }
    }

    let (assignments, centroids) = best_kmeans(&matrix, k, params);

    let mut sizes = vec![0usize; k];
    for &a in &assignments {
        sizes[a] += 1;
    }

    let mut representatives = Vec::with_capacity(k);
    for cluster in 0..k {
        let best = assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == cluster)
            .min_by(|(i, _), (j, _)| {
                squared_distance(&matrix[*i], &centroids[cluster])
                    .total_cmp(&squared_distance(&matrix[*j], &centroids[cluster]))
            })
            .map(|(i, _)| i);
        if let Some(i) = best {
            representatives.push(ClusterRepresentative {
                cluster,
                player: cohort[i].name.clone(),
                squad: cohort[i].squad.clone(),
                pos: cohort[i].position.clone(),
            });
        }
    }

    let centers = centroids
        .iter()
        .map(|c| {
            c.iter()
                .enumerate()
                .map(|(j, v)| v * col_stds[j] + col_means[j])
                .collect()
        })
        .collect();

    let rows = cohort
        .iter()
        .zip(&assignments)
        .map(|(record, &cluster)| ClusteredPlayerRow {
            id: Identity::of(record),
            cluster,
        })
        .collect();

    Ok(ClusterResult {
        rows,
        info: ClusterInfo {
            centers,
            sizes,
            representatives,
            feature_names: features.iter().map(|f| f.label()).collect(),
        },
    })
}

/// Run several seeded k-means restarts and keep the lowest-inertia fit.
fn best_kmeans(matrix: &[Vec<f64>], k: usize, params: &ClusterParams) -> (Vec<usize>, Vec<Vec<f64>>) {
    let mut best = (Vec::new(), Vec::new());
    let mut best_inertia = f64::INFINITY;
    for restart in 0..params.restarts.max(1) {
        let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(restart as u64));
        let (assignments, centroids) = lloyd(matrix, k, params.max_iterations, &mut rng);
        let inertia: f64 = matrix
            .iter()
            .zip(&assignments)
            .map(|(row, &a)| squared_distance(row, &centroids[a]))
            .sum();
        if inertia < best_inertia {
            best_inertia = inertia;
            best = (assignments, centroids);
        }
    }
    best
}

fn lloyd(
    matrix: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<Vec<f64>>) {
    let mut centroids = init_plus_plus(matrix, k, rng);
    let mut assignments = vec![0usize; matrix.len()];

    for _ in 0..max_iterations.max(1) {
        let mut changed = false;
        for (i, row) in matrix.iter().enumerate() {
            let nearest = nearest_centroid(row, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0; matrix[0].len()]; k];
        let mut counts = vec![0usize; k];
        for (row, &a) in matrix.iter().zip(&assignments) {
            counts[a] += 1;
            for (sum, value) in sums[a].iter_mut().zip(row) {
                *sum += value;
            }
        }
        for (cluster, sum) in sums.into_iter().enumerate() {
            // An emptied cluster keeps its previous centroid.
            if counts[cluster] > 0 {
                centroids[cluster] = sum
                    .into_iter()
                    .map(|v| v / counts[cluster] as f64)
                    .collect();
            }
        }

        if !changed {
            break;
        }
    }
    (assignments, centroids)
}

/// k-means++ seeding: spread the initial centroids out proportionally to
/// squared distance from the ones already chosen.
fn init_plus_plus(matrix: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    let first = rng.gen_range(0..matrix.len());
    centroids.push(matrix[first].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = matrix
            .iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|c| squared_distance(row, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = matrix.len() - 1;
            for (i, d) in distances.iter().enumerate() {
                if target <= *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // All points coincide with a centroid already; any index works.
            rng.gen_range(0..matrix.len())
        };
        centroids.push(matrix[next].clone());
    }
    centroids
}

fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Age;

    fn record(name: &str, touches: f64, carries: f64) -> PlayerRecord {
        PlayerRecord::new(name, "Club", "MF", Age { years: 24, days: 0 }, 10.0)
            .with_stat(RawStat::Touches, touches)
            .with_stat(RawStat::Carries, carries)
            .with_stat(RawStat::ProgressiveCarries, carries / 5.0)
            .with_stat(RawStat::FinalThirdEntries, carries / 10.0)
    }

    fn two_blob_cohort() -> Vec<PlayerRecord> {
        vec![
            record("a1", 100.0, 50.0),
            record("a2", 110.0, 55.0),
            record("a3", 105.0, 52.0),
            record("b1", 800.0, 400.0),
            record("b2", 820.0, 410.0),
            record("b3", 790.0, 395.0),
        ]
    }

    fn params(k: usize) -> ClusterParams {
        ClusterParams {
            cluster_count: k,
            ..ClusterParams::default()
        }
    }

    #[test]
    fn separates_obvious_blobs() {
        let cohort = two_blob_cohort();
        let result = cluster_player_profiles(&cohort, &midfield_features(), &params(2)).unwrap();
        let cluster_of = |name: &str| {
            result
                .rows
                .iter()
                .find(|r| r.id.player == name)
                .unwrap()
                .cluster
        };
        assert_eq!(cluster_of("a1"), cluster_of("a2"));
        assert_eq!(cluster_of("a1"), cluster_of("a3"));
        assert_eq!(cluster_of("b1"), cluster_of("b2"));
        assert_ne!(cluster_of("a1"), cluster_of("b1"));
    }

    #[test]
    fn identical_inputs_and_seed_reproduce_assignments() {
        let cohort = two_blob_cohort();
        let first = cluster_player_profiles(&cohort, &midfield_features(), &params(3)).unwrap();
        let second = cluster_player_profiles(&cohort, &midfield_features(), &params(3)).unwrap();
        let labels = |r: &ClusterResult| -> Vec<usize> {
            r.rows.iter().map(|row| row.cluster).collect()
        };
        assert_eq!(labels(&first), labels(&second));
        let reps = |r: &ClusterResult| -> Vec<(usize, String)> {
            r.info
                .representatives
                .iter()
                .map(|rep| (rep.cluster, rep.player.clone()))
                .collect()
        };
        assert_eq!(reps(&first), reps(&second));
    }

    #[test]
    fn small_cohort_reduces_cluster_count() {
        let cohort = vec![record("solo", 100.0, 50.0), record("duo", 500.0, 250.0)];
        let result = cluster_player_profiles(&cohort, &midfield_features(), &params(5)).unwrap();
        assert_eq!(result.info.sizes.len(), 2);
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn empty_cohort_is_an_error() {
        let err = cluster_player_profiles(&[], &midfield_features(), &params(5)).unwrap_err();
        assert!(format!("{err}").contains("empty cohort"));
    }

    #[test]
    fn representative_is_closest_to_centroid() {
        let cohort = vec![
            record("edge-low", 100.0, 50.0),
            record("middle", 150.0, 75.0),
            record("edge-high", 200.0, 100.0),
        ];
        let result = cluster_player_profiles(&cohort, &midfield_features(), &params(1)).unwrap();
        assert_eq!(result.info.representatives.len(), 1);
        // With one cluster the centroid is the mean profile; the middle
        // player sits on it.
        assert_eq!(result.info.representatives[0].player, "middle");
    }
}
