//! Ranking helpers shared by every analysis: stable descending sort with a
//! defined place for infinite scores, then top-N truncation.

/// Stable descending sort by a score key. `f64::total_cmp` gives infinities
/// a defined position (`+inf` first) instead of panicking or scrambling, and
/// equal scores keep their input order so repeated runs are reproducible.
pub fn sort_desc_by<T>(rows: &mut [T], score: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| score(b).total_cmp(&score(a)));
}

/// Sort descending and keep the top N rows.
pub fn rank_top_n<T>(mut rows: Vec<T>, score: impl Fn(&T) -> f64, top_n: usize) -> Vec<T> {
    sort_desc_by(&mut rows, score);
    rows.truncate(top_n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinity_ranks_first_without_error() {
        let rows = vec![5.47, f64::INFINITY, 3.07, 4.53];
        let top = rank_top_n(rows, |v| *v, 3);
        assert!(top[0].is_infinite());
        assert_eq!(&top[1..], &[5.47, 4.53]);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let rows = vec![("a", 1.0), ("b", 2.0), ("c", 1.0), ("d", 2.0)];
        let ranked = rank_top_n(rows, |(_, v)| *v, 4);
        let names: Vec<&str> = ranked.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn truncates_to_top_n() {
        let ranked = rank_top_n(vec![1.0, 9.0, 5.0], |v| *v, 2);
        assert_eq!(ranked, vec![9.0, 5.0]);
    }
}
