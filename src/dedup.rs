//! Perceptual-duplicate clustering.
//!
//! Greedy sequential grouping: each photo joins the first existing group
//! whose representative hash is within the Hamming threshold, otherwise it
//! starts a new group. This is a bounded O(n*k) approximation, not a
//! transitive closure, and the result depends on input order; callers choose
//! the ordering policy explicitly via [`DedupOrder`].

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use img_hash::ImageHash;
use tracing::{info, warn};

use crate::config::{DedupOrder, Settings};
use crate::db::Database;
use crate::scoring::{quality_score, ScoreWeights};

/// Method tag persisted on cluster records.
pub const CLUSTER_METHOD: &str = "phash";

#[derive(Debug, Clone)]
pub struct HashedPhoto {
    pub photo_id: i64,
    pub hash: ImageHash<Box<[u8]>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub clusters: usize,
    pub members: usize,
    pub skipped: usize,
}

/// Group photos whose hashes are within `threshold` bits of a group
/// representative. Input order is significant: a photo joins the first
/// matching group even if a later group's representative is closer. Only
/// groups with more than one member are returned; member order is the
/// encounter order, not yet the ranked order.
pub fn cluster_by_hash(photos: &[HashedPhoto], threshold: u32) -> Vec<Vec<i64>> {
    let mut groups: Vec<(&ImageHash<Box<[u8]>>, Vec<i64>)> = Vec::new();

    for photo in photos {
        match groups
            .iter_mut()
            .find(|(representative, _)| representative.dist(&photo.hash) <= threshold)
        {
            Some((_, members)) => members.push(photo.photo_id),
            None => groups.push((&photo.hash, vec![photo.photo_id])),
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(_, members)| members)
        .collect()
}

/// Run one clustering pass over all photos and persist the surviving
/// clusters, replacing the previous pass's results atomically.
pub fn dedup(db: &mut Database, settings: &Settings, threshold: u32) -> Result<DedupStats> {
    let mut rows = db.fetch_dedup_rows()?;
    let weights = ScoreWeights {
        technical: settings.weights_technical,
        aesthetic: settings.weights_aesthetic,
    };

    let scores: HashMap<i64, f64> = rows
        .iter()
        .map(|row| (row.photo_id, quality_score(&row.quality, &weights)))
        .collect();

    // Rows arrive ordered by photo id; re-sort only for the other policy.
    if settings.dedup_order == DedupOrder::QualityDesc {
        rows.sort_by(|a, b| compare_by_score(&scores, a.photo_id, b.photo_id));
    }

    let mut stats = DedupStats::default();
    let mut hashed = Vec::with_capacity(rows.len());
    for row in &rows {
        let Some(encoded) = &row.perceptual_hash else {
            stats.skipped += 1;
            continue;
        };
        match ImageHash::from_base64(encoded) {
            Ok(hash) => hashed.push(HashedPhoto {
                photo_id: row.photo_id,
                hash,
            }),
            Err(e) => {
                warn!(photo_id = row.photo_id, "Invalid perceptual hash: {:?}", e);
                stats.skipped += 1;
            }
        }
    }

    let mut clusters = cluster_by_hash(&hashed, threshold);
    for members in &mut clusters {
        members.sort_by(|a, b| compare_by_score(&scores, *a, *b));
    }

    stats.clusters = clusters.len();
    stats.members = db.replace_clusters(CLUSTER_METHOD, &clusters)?;

    info!(
        clusters = stats.clusters,
        members = stats.members,
        skipped = stats.skipped,
        "Dedup complete"
    );
    Ok(stats)
}

/// Quality descending, photo id ascending. The id key makes float ties
/// deterministic across platforms.
fn compare_by_score(scores: &HashMap<i64, f64>, a: i64, b: i64) -> Ordering {
    let score_a = scores.get(&a).copied().unwrap_or(0.0);
    let score_b = scores.get(&b).copied().unwrap_or(0.0);
    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.cmp(&b))
}
