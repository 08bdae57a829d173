//! Deterministic fallback embeddings.
//!
//! Real model inference lives outside this crate; photos are embedded here
//! with a reproducible vector derived from the photo's SHA-256 digest so the
//! rest of the pipeline (similarity, diversity selection) can run end to end
//! on any machine. Same digest, same vector.

use anyhow::Result;
use indicatif::ProgressBar;
use tracing::info;

use crate::db::Database;

pub const EMBEDDING_DIM: usize = 512;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingStats {
    pub processed: usize,
}

/// Derive a `dim`-length vector from a SHA-256 hex digest: the nibble
/// sequence tiled to length, then standardized to zero mean and unit
/// variance (epsilon-guarded).
pub fn fallback_embedding(sha256_hex: &str, dim: usize) -> Vec<f32> {
    let nibbles: Vec<f32> = sha256_hex
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|v| v as f32)
        .collect();
    if nibbles.is_empty() {
        return vec![0.0; dim];
    }

    let mut vector: Vec<f32> = nibbles.iter().cycle().take(dim).copied().collect();

    let mean = vector.iter().sum::<f32>() / vector.len() as f32;
    let variance = vector.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / vector.len() as f32;
    let std = variance.sqrt();
    for value in &mut vector {
        *value = (*value - mean) / (std + 1e-6);
    }
    vector
}

/// Embed every photo missing a vector for `model_name` (or all of them with
/// `force`).
pub fn embed(db: &Database, model_name: &str, force: bool) -> Result<EmbeddingStats> {
    let pending = db.photos_missing_embedding(model_name, force)?;
    let progress = ProgressBar::new(pending.len() as u64);

    let mut stats = EmbeddingStats::default();
    for (photo_id, sha256) in pending {
        let vector = fallback_embedding(&sha256, EMBEDDING_DIM);
        db.upsert_embedding(photo_id, model_name, &vector)?;
        stats.processed += 1;
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!(
        processed = stats.processed,
        model = model_name,
        "Embedding complete"
    );
    Ok(stats)
}
