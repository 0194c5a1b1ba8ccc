//! Jaccard similarity over character sets.

use std::collections::HashSet;

/// Compute the Jaccard index of the two strings' character sets, in `[0, 1]`.
///
/// Each string is treated as a *set* of its distinct characters, so the
/// measure tolerates typos and repeated characters but is insensitive to
/// character order. Callers are expected to lowercase both sides first.
pub fn similarity(left: &str, right: &str) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let left: HashSet<char> = left.chars().collect();
    let right: HashSet<char> = right.chars().collect();
    let intersection = left.intersection(&right).count();
    let union = left.len() + right.len() - intersection;

    intersection as f64 / union as f64
}
