//! Technical image metrics: sharpness, exposure clipping, contrast, noise.

use anyhow::Result;
use image::{DynamicImage, GrayImage};
use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::db::Database;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TechnicalMetrics {
    /// Variance of the 3x3 Laplacian response; higher is sharper.
    pub sharpness: f64,
    /// Fraction of pixels at or above 250 (blown highlights).
    pub exposure_clip_hi: f64,
    /// Fraction of pixels at or below 5 (crushed shadows).
    pub exposure_clip_lo: f64,
    /// Grayscale standard deviation, normalized to [0, 1].
    pub contrast: f64,
    /// Standard deviation of the 3x3 box-blur residual.
    pub noise_proxy: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TechnicalStats {
    pub processed: usize,
    pub skipped: usize,
}

/// Measure a single image. The image is downscaled so its longest side is at
/// most `max_size` before analysis.
pub fn measure(image: &DynamicImage, max_size: u32) -> TechnicalMetrics {
    let scaled;
    let image = if image.width().max(image.height()) > max_size {
        scaled = image.thumbnail(max_size, max_size);
        &scaled
    } else {
        image
    };
    let gray = image.to_luma8();

    let (_, stddev) = mean_stddev(gray.as_raw());
    let total = gray.as_raw().len() as f64;
    let clip_hi = gray.as_raw().iter().filter(|&&p| p >= 250).count() as f64 / total;
    let clip_lo = gray.as_raw().iter().filter(|&&p| p <= 5).count() as f64 / total;

    TechnicalMetrics {
        sharpness: laplacian_variance(&gray),
        exposure_clip_hi: clip_hi,
        exposure_clip_lo: clip_lo,
        contrast: stddev / 255.0,
        noise_proxy: box_blur_residual_stddev(&gray),
    }
}

/// Score all photos missing metrics (or all of them with `force`) and upsert
/// the results. Unreadable images are skipped, not fatal.
pub fn score_technical(db: &Database, max_size: u32, force: bool) -> Result<TechnicalStats> {
    let pending = db.photos_missing_metrics(force)?;
    let progress = ProgressBar::new(pending.len() as u64);

    // Measurement is embarrassingly parallel; DB writes stay sequential.
    let measured: Vec<(i64, Option<TechnicalMetrics>)> = pending
        .par_iter()
        .map(|(photo_id, path)| {
            let result = match image::open(path) {
                Ok(img) => Some(measure(&img, max_size)),
                Err(e) => {
                    warn!(path = %path, "Failed to load image for metrics: {e}");
                    None
                }
            };
            progress.inc(1);
            (*photo_id, result)
        })
        .collect();
    progress.finish_and_clear();

    let mut stats = TechnicalStats::default();
    for (photo_id, metrics) in measured {
        match metrics {
            Some(metrics) => {
                db.upsert_technical_metrics(photo_id, &metrics)?;
                stats.processed += 1;
            }
            None => stats.skipped += 1,
        }
    }

    info!(
        processed = stats.processed,
        skipped = stats.skipped,
        "Technical scoring complete"
    );
    Ok(stats)
}

/// Noise proxy: standard deviation of the residual between each interior
/// pixel and its 3x3 box-blurred neighborhood mean.
fn box_blur_residual_stddev(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut residuals = Vec::with_capacity(((width - 2) * (height - 2)) as usize);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut sum = 0.0;
            for dy in 0..3 {
                for dx in 0..3 {
                    sum += gray.get_pixel(x + dx - 1, y + dy - 1)[0] as f64;
                }
            }
            let neighborhood_mean = sum / 9.0;
            residuals.push(gray.get_pixel(x, y)[0] as f64 - neighborhood_mean);
        }
    }
    let (_, stddev) = mean_stddev_f64(&residuals);
    stddev
}

fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let count = ((width - 2) * (height - 2)) as f64;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray.get_pixel(x, y)[0] as f64;
            let up = gray.get_pixel(x, y - 1)[0] as f64;
            let down = gray.get_pixel(x, y + 1)[0] as f64;
            let left = gray.get_pixel(x - 1, y)[0] as f64;
            let right = gray.get_pixel(x + 1, y)[0] as f64;
            let response = 4.0 * center - up - down - left - right;
            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

fn mean_stddev(values: &[u8]) -> (f64, f64) {
    let floats: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    mean_stddev_f64(&floats)
}

fn mean_stddev_f64(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}
