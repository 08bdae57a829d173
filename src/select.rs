//! Diversity-aware top-N selection.
//!
//! One streaming pass over candidates sorted by base score: each candidate
//! is penalized against the current working set only, which bounds the cost
//! at O(candidates * N) in exchange for giving up true maximal-marginal-
//! relevance over the whole pool.

use std::cmp::Ordering;
use std::collections::HashSet;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::Settings;
use crate::db::Database;
use crate::scoring::{quality_score, ScoreWeights};

const NORM_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct Candidate {
    pub photo_id: i64,
    pub base_score: f64,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedPhoto {
    pub photo_id: i64,
    pub rank: u32,
    pub final_score: f64,
}

#[derive(Debug)]
pub struct SelectionOutcome {
    pub run_id: i64,
    pub selected: Vec<RankedPhoto>,
    pub skipped: usize,
}

/// Cosine similarity with epsilon-guarded norms: a zero-norm vector yields a
/// similarity near 0 instead of dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    (dot / ((norm_a + NORM_EPSILON) * (norm_b + NORM_EPSILON))) as f64
}

/// Greedy online top-K with a similarity penalty. Returns at most `top_n`
/// photos with dense ranks 1..k, best first.
pub fn rank_candidates(
    mut candidates: Vec<Candidate>,
    top_n: usize,
    similarity_threshold: f64,
    lambda_penalty: f64,
) -> Vec<RankedPhoto> {
    if top_n == 0 {
        return Vec::new();
    }
    candidates.sort_by(|a, b| compare_scored(a.base_score, a.photo_id, b.base_score, b.photo_id));

    let mut selected: Vec<(i64, f64, Vec<f32>)> = Vec::with_capacity(top_n.min(candidates.len()));

    for candidate in candidates {
        let mut penalty = 0.0f64;
        for (_, _, embedding) in &selected {
            let sim = cosine_similarity(&candidate.embedding, embedding);
            if sim > similarity_threshold {
                penalty = penalty.max(lambda_penalty * sim);
            }
        }
        let final_score = candidate.base_score - penalty;

        if selected.len() < top_n {
            selected.push((candidate.photo_id, final_score, candidate.embedding));
            continue;
        }

        // Linear min-scan; the first minimum wins so eviction is
        // order-stable. Replacement requires strictly exceeding it.
        let mut lowest = 0;
        for (idx, entry) in selected.iter().enumerate().skip(1) {
            if entry.1 < selected[lowest].1 {
                lowest = idx;
            }
        }
        if final_score > selected[lowest].1 {
            selected[lowest] = (candidate.photo_id, final_score, candidate.embedding);
        }
    }

    selected.sort_by(|a, b| compare_scored(a.1, a.0, b.1, b.0));
    selected
        .into_iter()
        .enumerate()
        .map(|(idx, (photo_id, final_score, _))| RankedPhoto {
            photo_id,
            rank: (idx + 1) as u32,
            final_score,
        })
        .collect()
}

/// Run one selection pass over all eligible photos and persist the run.
pub fn select_top(db: &mut Database, settings: &Settings, top_n: usize) -> Result<SelectionOutcome> {
    // Start timestamp is captured before any scoring work.
    let started_at = Utc::now().to_rfc3339();

    let rows = db.fetch_selection_candidates(&settings.embedding_model_name)?;
    let excluded: HashSet<i64> = if settings.exclude_duplicates {
        db.duplicate_member_ids()?.into_iter().collect()
    } else {
        HashSet::new()
    };

    let weights = ScoreWeights {
        technical: settings.weights_technical,
        aesthetic: settings.weights_aesthetic,
    };

    let mut skipped = 0;
    let mut expected_dim: Option<usize> = None;
    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        if excluded.contains(&row.photo_id) {
            continue;
        }
        let dim = row.embedding.len();
        match expected_dim {
            None => expected_dim = Some(dim),
            Some(expected) if expected != dim => {
                warn!(
                    photo_id = row.photo_id,
                    dim, expected, "Embedding dimension mismatch, skipping"
                );
                skipped += 1;
                continue;
            }
            Some(_) => {}
        }
        candidates.push(Candidate {
            photo_id: row.photo_id,
            base_score: quality_score(&row.quality, &weights),
            embedding: row.embedding,
        });
    }

    let ranked = rank_candidates(
        candidates,
        top_n,
        settings.similarity_threshold,
        settings.lambda_penalty,
    );
    let run_id = db.record_selection_run(&started_at, &ranked)?;

    info!(
        run_id,
        selected = ranked.len(),
        skipped,
        "Selection complete"
    );
    Ok(SelectionOutcome {
        run_id,
        selected: ranked,
        skipped,
    })
}

/// Score descending, photo id ascending; the id key makes float ties
/// deterministic across platforms.
fn compare_scored(score_a: f64, id_a: i64, score_b: f64, id_b: i64) -> Ordering {
    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| id_a.cmp(&id_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(photo_id: i64, base_score: f64, embedding: Vec<f32>) -> Candidate {
        Candidate {
            photo_id,
            base_score,
            embedding,
        }
    }

    #[test]
    fn penalizes_then_evicts_redundant_pick() {
        // cos(v1, v2) = 0.95; v3 is dissimilar to both.
        let v1 = vec![1.0f32, 0.0];
        let v2 = vec![0.95f32, (1.0f32 - 0.95 * 0.95).sqrt()];
        let v3 = vec![0.0f32, 1.0];

        let candidates = vec![
            candidate(1, 0.9, v1),
            candidate(2, 0.85, v2),
            candidate(3, 0.80, v3),
        ];
        let ranked = rank_candidates(candidates, 2, 0.88, 0.15);

        // Photo 2's penalized score is 0.85 - 0.15 * 0.95 = 0.7075, so
        // photo 3 at 0.80 replaces it.
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].photo_id, 1);
        assert!((ranked[0].final_score - 0.9).abs() < 1e-9);
        assert_eq!(ranked[1].photo_id, 3);
        assert!((ranked[1].final_score - 0.80).abs() < 1e-9);
    }

    #[test]
    fn ranks_are_dense_and_bounded() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| candidate(i, 0.1 * i as f64, vec![i as f32, 1.0]))
            .collect();
        let ranked = rank_candidates(candidates, 4, 0.88, 0.15);

        assert_eq!(ranked.len(), 4);
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn returns_all_candidates_when_fewer_than_n() {
        let candidates = vec![
            candidate(1, 0.5, vec![1.0, 0.0]),
            candidate(2, 0.6, vec![0.0, 1.0]),
        ];
        let ranked = rank_candidates(candidates, 10, 0.88, 0.15);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].photo_id, 2);
    }

    #[test]
    fn empty_candidates_yield_empty_ranking() {
        let ranked = rank_candidates(Vec::new(), 5, 0.88, 0.15);
        assert!(ranked.is_empty());
    }

    #[test]
    fn zero_capacity_yields_empty_ranking() {
        let candidates = vec![candidate(1, 0.9, vec![1.0, 0.0])];
        let ranked = rank_candidates(candidates, 0, 0.88, 0.15);
        assert!(ranked.is_empty());
    }

    #[test]
    fn replacement_requires_strictly_higher_score() {
        // Two orthogonal picks fill the set; the third ties the minimum
        // exactly and must be discarded.
        let candidates = vec![
            candidate(1, 0.9, vec![1.0, 0.0, 0.0]),
            candidate(2, 0.8, vec![0.0, 1.0, 0.0]),
            candidate(3, 0.8, vec![0.0, 0.0, 1.0]),
        ];
        let ranked = rank_candidates(candidates, 2, 0.88, 0.15);
        let ids: Vec<i64> = ranked.iter().map(|r| r.photo_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn zero_norm_vectors_do_not_poison_scores() {
        let candidates = vec![
            candidate(1, 0.9, vec![0.0, 0.0]),
            candidate(2, 0.8, vec![0.0, 0.0]),
        ];
        let ranked = rank_candidates(candidates, 2, 0.88, 0.15);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|r| r.final_score.is_finite()));
        assert!((ranked[0].final_score - 0.9).abs() < 1e-9);
        assert!((ranked[1].final_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn base_score_ties_break_by_photo_id() {
        let candidates = vec![
            candidate(7, 0.5, vec![1.0, 0.0]),
            candidate(3, 0.5, vec![0.0, 1.0]),
        ];
        let ranked = rank_candidates(candidates, 2, 0.88, 0.15);
        assert_eq!(ranked[0].photo_id, 3);
        assert_eq!(ranked[1].photo_id, 7);
    }

    #[test]
    fn ranking_is_deterministic() {
        let build = || {
            (0..50)
                .map(|i| {
                    candidate(
                        i,
                        ((i * 37) % 11) as f64 / 11.0,
                        vec![(i % 5) as f32, ((i + 1) % 3) as f32, 1.0],
                    )
                })
                .collect::<Vec<_>>()
        };
        let first = rank_candidates(build(), 10, 0.88, 0.15);
        let second = rank_candidates(build(), 10, 0.88, 0.15);
        assert_eq!(first, second);
    }

    #[test]
    fn cosine_similarity_matches_hand_computed_values() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-4);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-4);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-4);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }
}
