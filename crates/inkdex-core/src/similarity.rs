use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Cosine of the angle between two sparse term-count vectors.
///
/// Zero when either vector is empty or when they share no term.
#[must_use]
pub fn cosine_similarity<K, S>(left: &HashMap<K, u32, S>, right: &HashMap<K, u32, S>) -> f64
where
    K: Eq + Hash,
    S: BuildHasher,
{
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    let dot = small
        .iter()
        .filter_map(|(term, count)| {
            large
                .get(term)
                .map(|other| f64::from(*count) * f64::from(*other))
        })
        .sum::<f64>();
    if dot == 0.0 {
        return 0.0;
    }
    let magnitude = magnitude(left) * magnitude(right);
    if magnitude == 0.0 {
        return 0.0;
    }
    (dot / magnitude).clamp(0.0, 1.0)
}

fn magnitude<K, S>(vector: &HashMap<K, u32, S>) -> f64 {
    vector
        .values()
        .map(|count| f64::from(*count).powi(2))
        .sum::<f64>()
        .sqrt()
}
