//! Frequency, location and proximity scoring over a [`QueryPlan`].
//!
//! Per candidate document the three raw measures are computed in closed form
//! from the per-term position lists instead of scanning the fanned-out join:
//!
//! - frequency: number of join rows, the product of the list lengths;
//! - location: the smallest position sum over rows, the sum of per-term minima;
//! - distance: the smallest `sum |pos_i - pos_{i-1}|` over rows, found by a
//!   chain dynamic program with one forward and one backward sweep per term.
//!
//! Each measure is normalized into `(0, 1]` with the best candidate at `1.0`,
//! then combined by [`ScoreWeights`].

use std::cmp::Ordering;

use crate::config::ScoreWeights;
use crate::models::{DocumentId, ScoreBreakdown, SearchHit};
use crate::query::{DocumentMatch, QueryPlan};

/// Guard for normalization denominators.
pub const NORMALIZATION_EPSILON: f64 = 0.00001;

/// Raw, unnormalized measures of one candidate document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawScores {
    pub document_id: DocumentId,
    pub frequency: u64,
    pub location: u64,
    /// `None` for single-term queries.
    pub distance: Option<u64>,
}

impl RawScores {
    #[must_use]
    pub fn from_match(candidate: &DocumentMatch) -> Self {
        let location = candidate
            .positions
            .iter()
            .map(|positions| positions.iter().copied().min().map_or(0, u64::from))
            .sum();
        let distance = (candidate.positions.len() >= 2)
            .then(|| min_chain_distance(&candidate.positions));
        Self {
            document_id: candidate.document_id,
            frequency: candidate.row_count(),
            location,
            distance,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    #[must_use]
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Every candidate, best first. Ties go to the smaller document id.
    #[must_use]
    pub fn score(&self, plan: &QueryPlan) -> Vec<SearchHit> {
        let raw = plan
            .matches()
            .iter()
            .map(RawScores::from_match)
            .collect::<Vec<_>>();
        self.score_raw(&raw)
    }

    /// One page of [`Scorer::score`].
    #[must_use]
    pub fn rank(&self, plan: &QueryPlan, limit: usize, offset: usize) -> Vec<SearchHit> {
        self.score(plan)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect()
    }

    #[must_use]
    pub fn score_raw(&self, raw: &[RawScores]) -> Vec<SearchHit> {
        let Some(max_frequency) = raw.iter().map(|scores| scores.frequency).max() else {
            return Vec::new();
        };
        let min_location = raw.iter().map(|scores| scores.location).min().unwrap_or(0);
        let min_distance = raw.iter().filter_map(|scores| scores.distance).min();

        let mut hits = raw
            .iter()
            .map(|scores| {
                let breakdown = ScoreBreakdown {
                    frequency: larger_is_better(scores.frequency, max_frequency),
                    location: smaller_is_better(scores.location, min_location),
                    distance: match (scores.distance, min_distance) {
                        (Some(distance), Some(best)) => smaller_is_better(distance, best),
                        _ => 1.0,
                    },
                };
                SearchHit {
                    document_id: scores.document_id,
                    score: self.combine(breakdown),
                    breakdown,
                }
            })
            .collect::<Vec<_>>();
        hits.sort_by(compare_hits);
        hits
    }

    fn combine(&self, breakdown: ScoreBreakdown) -> f64 {
        self.weights.frequency * breakdown.frequency
            + self.weights.location * breakdown.location
            + self.weights.distance * breakdown.distance
    }
}

fn compare_hits(left: &SearchHit, right: &SearchHit) -> Ordering {
    right
        .score
        .total_cmp(&left.score)
        .then_with(|| left.document_id.cmp(&right.document_id))
}

/// `value / max`, with the denominator floored at the epsilon.
#[must_use]
pub fn larger_is_better(value: u64, max: u64) -> f64 {
    value as f64 / (max as f64).max(NORMALIZATION_EPSILON)
}

/// `best / value`, both floored at the epsilon, so a best raw value of zero
/// still normalizes to `1.0`.
#[must_use]
pub fn smaller_is_better(value: u64, best: u64) -> f64 {
    (best as f64).max(NORMALIZATION_EPSILON) / (value as f64).max(NORMALIZATION_EPSILON)
}

/// Smallest `sum |x_i - x_{i-1}|` choosing one position from each list.
///
/// Lists must be ascending and non-empty.
#[must_use]
pub fn min_chain_distance(lists: &[Vec<u32>]) -> u64 {
    let Some((first, rest)) = lists.split_first() else {
        return 0;
    };
    let mut previous: &[u32] = first;
    let mut previous_cost = vec![0_i64; first.len()];
    for positions in rest {
        let mut cost = vec![i64::MAX; positions.len()];

        // Predecessors at or left of x: cost(y) - y + x.
        let mut next = 0;
        let mut best = i64::MAX;
        for (slot, &x) in positions.iter().enumerate() {
            while next < previous.len() && previous[next] <= x {
                best = best.min(previous_cost[next] - i64::from(previous[next]));
                next += 1;
            }
            if best != i64::MAX {
                cost[slot] = best + i64::from(x);
            }
        }

        // Predecessors at or right of x: cost(y) + y - x.
        let mut next = previous.len();
        let mut best = i64::MAX;
        for (slot, &x) in positions.iter().enumerate().rev() {
            while next > 0 && previous[next - 1] >= x {
                next -= 1;
                best = best.min(previous_cost[next] + i64::from(previous[next]));
            }
            if best != i64::MAX {
                cost[slot] = cost[slot].min(best - i64::from(x));
            }
        }

        previous = positions;
        previous_cost = cost;
    }
    previous_cost
        .into_iter()
        .min()
        .and_then(|cost| u64::try_from(cost).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::query::JoinRow;

    use super::*;

    fn candidate(id: i64, positions: &[&[u32]]) -> DocumentMatch {
        DocumentMatch {
            document_id: DocumentId(id),
            positions: positions.iter().map(|list| list.to_vec()).collect(),
        }
    }

    fn rows_of(candidate: &DocumentMatch) -> Vec<JoinRow> {
        let mut rows = vec![Vec::new()];
        for list in &candidate.positions {
            rows = rows
                .into_iter()
                .flat_map(|prefix: Vec<u32>| {
                    list.iter().map(move |&position| {
                        let mut row = prefix.clone();
                        row.push(position);
                        row
                    })
                })
                .collect();
        }
        rows.into_iter()
            .map(|positions| JoinRow {
                document_id: candidate.document_id,
                positions,
            })
            .collect()
    }

    /// Row-by-row aggregation with running minima seeded from large sentinels.
    fn brute_force(rows: &[JoinRow]) -> BTreeMap<DocumentId, RawScores> {
        let mut out = BTreeMap::<DocumentId, RawScores>::new();
        for row in rows {
            let entry = out.entry(row.document_id).or_insert(RawScores {
                document_id: row.document_id,
                frequency: 0,
                location: 100_000,
                distance: (row.positions.len() >= 2).then_some(1_000_000),
            });
            entry.frequency += 1;
            let location = row.positions.iter().copied().map(u64::from).sum::<u64>();
            entry.location = entry.location.min(location);
            if let Some(distance) = entry.distance.as_mut() {
                let row_distance = row
                    .positions
                    .windows(2)
                    .map(|pair| u64::from(pair[0].abs_diff(pair[1])))
                    .sum::<u64>();
                *distance = (*distance).min(row_distance);
            }
        }
        out
    }

    #[test]
    fn closed_form_matches_brute_force_over_rows() {
        let candidates = vec![
            candidate(1, &[&[3, 9, 40]]),
            candidate(2, &[&[0, 5, 17], &[2, 30], &[1, 12, 13, 29]]),
            candidate(3, &[&[8], &[8]]),
            candidate(4, &[&[4, 20], &[11], &[3, 25], &[19, 22]]),
            candidate(5, &[&[0, 2], &[0, 2]]),
        ];
        for candidate in &candidates {
            let rows = rows_of(candidate);
            let expected = brute_force(&rows);
            assert_eq!(
                RawScores::from_match(candidate),
                expected[&candidate.document_id],
                "document {}",
                candidate.document_id
            );
        }
    }

    #[test]
    fn chain_distance_follows_the_cheapest_path() {
        assert_eq!(min_chain_distance(&[vec![1, 10], vec![9], vec![2, 11]]), 3);
        assert_eq!(min_chain_distance(&[vec![5], vec![5]]), 0);
        assert_eq!(min_chain_distance(&[vec![0], vec![100], vec![0]]), 200);
        assert_eq!(min_chain_distance(&[vec![7]]), 0);
        assert_eq!(min_chain_distance(&[]), 0);
    }

    #[test]
    fn normalization_bounds_and_best_is_one() {
        let raw = vec![
            RawScores {
                document_id: DocumentId(1),
                frequency: 3,
                location: 0,
                distance: Some(0),
            },
            RawScores {
                document_id: DocumentId(2),
                frequency: 1,
                location: 12,
                distance: Some(7),
            },
            RawScores {
                document_id: DocumentId(3),
                frequency: 2,
                location: 4,
                distance: Some(2),
            },
        ];
        let hits = Scorer::default().score_raw(&raw);
        for hit in &hits {
            for value in [
                hit.breakdown.frequency,
                hit.breakdown.location,
                hit.breakdown.distance,
            ] {
                assert!(value > 0.0 && value <= 1.0, "{value} out of range");
            }
        }
        let best = |pick: fn(&ScoreBreakdown) -> f64| {
            hits.iter()
                .map(|hit| pick(&hit.breakdown))
                .fold(f64::MIN, f64::max)
        };
        assert_eq!(best(|b| b.frequency), 1.0);
        assert_eq!(best(|b| b.location), 1.0);
        assert_eq!(best(|b| b.distance), 1.0);
        assert_eq!(hits[0].document_id, DocumentId(1));
        assert_eq!(hits[0].score, 3.0);
    }

    #[test]
    fn single_term_distance_is_uniform() {
        let raw = vec![
            RawScores {
                document_id: DocumentId(1),
                frequency: 1,
                location: 2,
                distance: None,
            },
            RawScores {
                document_id: DocumentId(2),
                frequency: 2,
                location: 5,
                distance: None,
            },
        ];
        let hits = Scorer::default().score_raw(&raw);
        assert!(hits.iter().all(|hit| hit.breakdown.distance == 1.0));
    }

    #[test]
    fn single_candidate_scores_one_everywhere() {
        let hits = Scorer::default().score_raw(&[RawScores {
            document_id: DocumentId(4),
            frequency: 1,
            location: 9,
            distance: Some(3),
        }]);
        assert_eq!(
            hits[0].breakdown,
            ScoreBreakdown {
                frequency: 1.0,
                location: 1.0,
                distance: 1.0,
            }
        );
    }

    #[test]
    fn ties_rank_by_document_id_and_pages_apply_after_sorting() {
        let raw = [9, 2, 5]
            .into_iter()
            .map(|id| RawScores {
                document_id: DocumentId(id),
                frequency: 1,
                location: 1,
                distance: None,
            })
            .collect::<Vec<_>>();
        let ids = Scorer::default()
            .score_raw(&raw)
            .into_iter()
            .map(|hit| hit.document_id.0)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn weights_scale_each_component() {
        let raw = vec![
            RawScores {
                document_id: DocumentId(1),
                frequency: 4,
                location: 10,
                distance: None,
            },
            RawScores {
                document_id: DocumentId(2),
                frequency: 1,
                location: 0,
                distance: None,
            },
        ];
        let frequency_only = Scorer::new(ScoreWeights {
            frequency: 1.0,
            location: 0.0,
            distance: 0.0,
        });
        assert_eq!(frequency_only.score_raw(&raw)[0].document_id, DocumentId(1));
        let location_only = Scorer::new(ScoreWeights {
            frequency: 0.0,
            location: 1.0,
            distance: 0.0,
        });
        assert_eq!(location_only.score_raw(&raw)[0].document_id, DocumentId(2));
    }

    #[test]
    fn empty_input_scores_nothing() {
        assert!(Scorer::default().score_raw(&[]).is_empty());
        assert!(Scorer::default().score(&QueryPlan::default()).is_empty());
    }
}
