//! Heuristic aesthetic scoring derived from the technical metrics: rewards
//! sharp, contrasty images and penalizes blown highlights. Produces a score
//! in [0, 1] per photo.

use anyhow::Result;
use tracing::info;

use crate::db::Database;

#[derive(Debug, Clone, Copy, Default)]
pub struct AestheticStats {
    pub processed: usize,
}

pub fn heuristic_score(
    sharpness: Option<f64>,
    contrast: Option<f64>,
    clip_hi: Option<f64>,
) -> f64 {
    let sharp = (sharpness.unwrap_or(0.0) / 500.0).min(1.0);
    let contrast_score = (contrast.unwrap_or(0.0) * 2.0).min(1.0);
    let clip_penalty = (clip_hi.unwrap_or(0.0) * 5.0).min(1.0);
    ((sharp * 0.5 + contrast_score * 0.5) * (1.0 - clip_penalty)).clamp(0.0, 1.0)
}

pub fn score_aesthetic(db: &Database) -> Result<AestheticStats> {
    let rows = db.metric_rows()?;

    let mut stats = AestheticStats::default();
    for (photo_id, sharpness, contrast, clip_hi) in rows {
        let score = heuristic_score(sharpness, contrast, clip_hi);
        db.set_aesthetic_score(photo_id, score)?;
        stats.processed += 1;
    }

    info!(processed = stats.processed, "Aesthetic scoring complete");
    Ok(stats)
}
