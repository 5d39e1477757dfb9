//! Pure similarity scoring helpers shared by the matching engine.
//!
//! Nothing in here holds state; every function is deterministic for a given
//! pair of inputs so match scores are reproducible.

use strsim::normalized_levenshtein;

/// Normalized edit-distance similarity between two strings, in `[0, 1]`.
///
/// Two empty strings are considered identical (1.0) rather than undefined.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    clamp_unit(normalized_levenshtein(a, b))
}

/// Similarity of two URL paths, computed as edit distance over `/`-split
/// segments rather than characters, so `/app/users/42` and `/app/users/57`
/// score closer than a character diff would suggest.
pub fn path_similarity(a: &str, b: &str) -> f64 {
    let seg_a: Vec<&str> = a.split('/').filter(|s| !s.is_empty()).collect();
    let seg_b: Vec<&str> = b.split('/').filter(|s| !s.is_empty()).collect();

    if seg_a.is_empty() && seg_b.is_empty() {
        return 1.0;
    }

    let distance = levenshtein(&seg_a, &seg_b);
    let longest = seg_a.len().max(seg_b.len());
    clamp_unit(1.0 - distance as f64 / longest as f64)
}

/// Clamp a score into the unit interval.
pub fn clamp_unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Generic Levenshtein distance over comparable slices.
///
/// Single-row dynamic programming; used for path segments where the
/// alphabet is whole segments, not characters.
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, item_a) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;

        for (j, item_b) in b.iter().enumerate() {
            let cost = if item_a == item_b { 0 } else { 1 };
            let next = (prev_diag + cost).min(row[j] + 1).min(row[j + 1] + 1);
            prev_diag = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(string_similarity("Submit order", "Submit order"), 1.0);
    }

    #[test]
    fn empty_pair_scores_one() {
        assert_eq!(string_similarity("", ""), 1.0);
        assert_eq!(path_similarity("", ""), 1.0);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert!(string_similarity("email", "zzzzz") < 0.3);
    }

    #[test]
    fn segment_levenshtein() {
        assert_eq!(levenshtein::<u8>(&[], &[]), 0);
        assert_eq!(levenshtein(&["a", "b"], &["a", "b"]), 0);
        assert_eq!(levenshtein(&["a", "b", "c"], &["a", "x", "c"]), 1);
        assert_eq!(levenshtein(&["a"], &["a", "b", "c"]), 2);
    }

    #[test]
    fn path_similarity_prefers_shared_segments() {
        let same = path_similarity("/app/users/42", "/app/users/57");
        let different = path_similarity("/app/users/42", "/billing/invoices");
        assert!(same > different);
        assert!((path_similarity("/app/users", "/app/users") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn trailing_slashes_are_ignored() {
        assert_eq!(path_similarity("/checkout/", "/checkout"), 1.0);
    }
}
