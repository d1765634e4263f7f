//! Cohort-relative scaling of raw stat columns. Every function recomputes
//! its reference distribution from the slice it is given, so values are only
//! comparable within one filtered cohort.

/// Scaling method for a stat column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormMethod {
    /// `(x - mean) / std`; degenerate (all-equal) input maps to all zeros.
    ZScore,
    /// `(x - min) / (max - min)`; degenerate input maps to all zeros.
    #[default]
    MinMax,
    /// Fraction of the cohort strictly below `x`, in `[0, 1]`.
    Percentile,
    /// Min-max between the 5th and 95th percentile values, which keeps a
    /// handful of outliers from compressing everyone else into a sliver.
    Robust,
}

const EPSILON: f64 = 1e-9;

/// Normalize a column over the current cohort. Absent and non-finite values
/// are excluded from the reference distribution and map to `0.0`, so they
/// can never push a NaN into a composite score. An empty column yields an
/// empty result.
pub fn normalize(values: &[Option<f64>], method: NormMethod) -> Vec<f64> {
    let present: Vec<f64> = values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| v.is_finite())
        .collect();
    if present.is_empty() {
        return vec![0.0; values.len()];
    }

    let scale: Box<dyn Fn(f64) -> f64> = match method {
        NormMethod::ZScore => {
            let mean = mean(&present);
            let std = std_dev(&present, mean);
            if std < EPSILON {
                Box::new(|_| 0.0)
            } else {
                Box::new(move |x| (x - mean) / std)
            }
        }
        NormMethod::MinMax => {
            let min = present.iter().copied().fold(f64::INFINITY, f64::min);
            let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            range_scale(min, max)
        }
        NormMethod::Robust => {
            let mut sorted = present.clone();
            sorted.sort_by(f64::total_cmp);
            let lo = quantile(&sorted, 0.05);
            let hi = quantile(&sorted, 0.95);
            range_scale(lo, hi)
        }
        NormMethod::Percentile => {
            let mut sorted = present.clone();
            sorted.sort_by(f64::total_cmp);
            let n = sorted.len() as f64;
            Box::new(move |x| sorted.partition_point(|v| *v < x) as f64 / n)
        }
    };

    values
        .iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => scale(*x),
            _ => 0.0,
        })
        .collect()
}

fn range_scale(lo: f64, hi: f64) -> Box<dyn Fn(f64) -> f64> {
    if (hi - lo).abs() < EPSILON {
        Box::new(|_| 0.0)
    } else {
        Box::new(move |x| (x - lo) / (hi - lo))
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; the cohort is the full universe of
/// interest, not a sample from it.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linearly interpolated quantile of an ascending-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// A normalized column paired with its weight in a composite score.
pub struct WeightedColumn {
    pub values: Vec<Option<f64>>,
    pub weight: f64,
}

impl WeightedColumn {
    pub fn new(values: Vec<Option<f64>>, weight: f64) -> Self {
        Self { values, weight }
    }
}

/// Weighted sum of normalized columns. A column with no present values
/// contributes nothing; the result is rescaled by the total weight actually
/// applied, so a cohort missing one input column still scores on the same
/// footing as a complete one.
pub fn weighted_score(columns: &[WeightedColumn], method: NormMethod) -> Vec<f64> {
    let Some(len) = columns.first().map(|c| c.values.len()) else {
        return Vec::new();
    };
    let mut totals = vec![0.0; len];
    let mut applied_weight = 0.0;

    for column in columns {
        debug_assert_eq!(column.values.len(), len);
        if !column.values.iter().any(|v| v.is_some_and(f64::is_finite)) {
            continue;
        }
        applied_weight += column.weight;
        for (total, norm) in totals.iter_mut().zip(normalize(&column.values, method)) {
            *total += norm * column.weight;
        }
    }

    if applied_weight > EPSILON && (applied_weight - 1.0).abs() > EPSILON {
        for total in &mut totals {
            *total /= applied_weight;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn zscore_is_centered_and_unit_scaled() {
        let out = normalize(&col(&[1.0, 2.0, 3.0, 4.0, 5.0]), NormMethod::ZScore);
        let m = mean(&out);
        let s = std_dev(&out, m);
        assert!(m.abs() < 1e-12);
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zscore_all_equal_is_all_zero() {
        let out = normalize(&col(&[7.0, 7.0, 7.0]), NormMethod::ZScore);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn minmax_spans_unit_interval() {
        let out = normalize(&col(&[10.0, 20.0, 30.0, 40.0, 50.0]), NormMethod::MinMax);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[4], 1.0);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn minmax_all_equal_is_all_zero() {
        let out = normalize(&col(&[3.0, 3.0, 3.0, 3.0]), NormMethod::MinMax);
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn percentile_is_strict_fraction_below() {
        let out = normalize(&col(&[10.0, 20.0, 20.0, 40.0]), NormMethod::Percentile);
        assert_eq!(out, vec![0.0, 0.25, 0.25, 0.75]);
    }

    #[test]
    fn empty_cohort_yields_empty_result() {
        assert!(normalize(&[], NormMethod::ZScore).is_empty());
        assert!(weighted_score(&[], NormMethod::MinMax).is_empty());
    }

    #[test]
    fn absent_values_are_excluded_then_zeroed() {
        let out = normalize(
            &[Some(10.0), None, Some(20.0), Some(f64::NAN), Some(30.0)],
            NormMethod::MinMax,
        );
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert_eq!(out[2], 0.5);
        assert_eq!(out[3], 0.0);
        assert_eq!(out[4], 1.0);
    }

    #[test]
    fn robust_scaling_clips_outlier_influence() {
        let mut values = vec![0.0; 19];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as f64;
        }
        values.push(1_000.0);
        let out = normalize(&col(&values), NormMethod::Robust);
        let plain = normalize(&col(&values), NormMethod::MinMax);
        // The middle of the pack keeps meaningful spread instead of being
        // crushed near zero by the outlier; the outlier itself exceeds 1.
        assert!(out[10] > 5.0 * plain[10]);
        assert!(out[19] > 1.0);
    }

    #[test]
    fn weighted_score_rescales_by_applied_weight() {
        let present = WeightedColumn::new(col(&[0.0, 10.0]), 0.6);
        let missing = WeightedColumn::new(vec![None, None], 0.4);
        let out = weighted_score(&[present, missing], NormMethod::MinMax);
        // Only 0.6 of the weight applied, so the top row rescales to 1.0.
        assert_eq!(out, vec![0.0, 1.0]);
    }
}
