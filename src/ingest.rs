//! Ingest pass: walk root directories, hash and thumbnail every image, and
//! upsert photo rows. Per-file failures are skipped, never fatal.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Settings;
use crate::db::{Database, NewPhoto};
use crate::scanner::{discovery, hashing, metadata, thumbnails};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub scanned: usize,
    pub inserted: usize,
    pub skipped: usize,
}

pub fn ingest(
    db: &Database,
    settings: &Settings,
    roots: &[PathBuf],
    extensions: &[String],
    dry_run: bool,
    force: bool,
) -> Result<IngestStats> {
    if roots.is_empty() {
        bail!("No roots provided. Pass --roots or set default_roots in the config.");
    }

    let files = discovery::discover_images(roots, extensions)?;
    let mut stats = IngestStats {
        scanned: files.len(),
        ..IngestStats::default()
    };

    // Skip-unchanged check runs first, sequentially against the DB; only
    // the survivors pay for hashing and decoding.
    let mut pending: Vec<(PathBuf, String, i64)> = Vec::new();
    for path in files {
        let file_meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), "Failed to stat file: {e}");
                stats.skipped += 1;
                continue;
            }
        };
        let mtime: DateTime<Utc> = match file_meta.modified() {
            Ok(t) => t.into(),
            Err(e) => {
                warn!(path = %path.display(), "Failed to read mtime: {e}");
                stats.skipped += 1;
                continue;
            }
        };
        let mtime = mtime.to_rfc3339();
        let size_bytes = file_meta.len() as i64;

        if !force && db.photo_unchanged(&path.to_string_lossy(), &mtime, size_bytes)? {
            stats.skipped += 1;
            continue;
        }
        pending.push((path, mtime, size_bytes));
    }

    // Hashing, decoding and thumbnailing are independent per file.
    let progress = ProgressBar::new(pending.len() as u64);
    let prepared: Vec<Option<NewPhoto>> = pending
        .par_iter()
        .map(|(path, mtime, size_bytes)| {
            let result = match prepare_photo(path, mtime, *size_bytes, settings, dry_run) {
                Ok(photo) => Some(photo),
                Err(e) => {
                    warn!(path = %path.display(), "Failed to ingest: {e}");
                    None
                }
            };
            progress.inc(1);
            result
        })
        .collect();
    progress.finish_and_clear();

    for photo in prepared {
        match photo {
            Some(photo) => {
                if !dry_run {
                    db.upsert_photo(&photo)?;
                }
                stats.inserted += 1;
            }
            None => stats.skipped += 1,
        }
    }

    info!(
        scanned = stats.scanned,
        inserted = stats.inserted,
        skipped = stats.skipped,
        dry_run,
        "Ingest complete"
    );
    Ok(stats)
}

fn prepare_photo(
    path: &Path,
    mtime: &str,
    size_bytes: i64,
    settings: &Settings,
    dry_run: bool,
) -> Result<NewPhoto> {
    let sha256 = hashing::sha256_file(path)?;
    let img = image::open(path)?;
    let meta = metadata::extract_metadata(path)?;

    // A photo whose hash cannot be produced still ingests; it just never
    // participates in duplicate clustering.
    let perceptual_hash = match hashing::perceptual_hash(&img) {
        Ok(hash) => Some(hash),
        Err(e) => {
            warn!(path = %path.display(), "Failed to compute perceptual hash: {e}");
            None
        }
    };

    if !dry_run {
        thumbnails::write_thumbnail(&img, &settings.thumbs_dir, &sha256, settings.thumbnail_size)?;
    }

    Ok(NewPhoto {
        path: path.to_string_lossy().into_owned(),
        sha256,
        mtime: mtime.to_string(),
        size_bytes,
        width: meta.width,
        height: meta.height,
        camera_make: meta.camera_make,
        camera_model: meta.camera_model,
        lens: meta.lens,
        focal_length: meta.focal_length,
        aperture: meta.aperture,
        shutter_speed: meta.shutter_speed,
        iso: meta.iso,
        taken_at: meta.taken_at,
        perceptual_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_settings(thumbs_dir: PathBuf) -> Settings {
        Settings {
            thumbs_dir,
            ..Settings::default()
        }
    }

    fn write_test_image(path: &Path, seed: u8) {
        let img = image::RgbImage::from_fn(40, 30, |x, y| {
            image::Rgb([
                ((x + seed as u32) % 256) as u8,
                ((y * 3) % 256) as u8,
                seed,
            ])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn ingests_new_photos_and_skips_unchanged_on_rerun() {
        let photos_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        write_test_image(&photos_dir.path().join("one.png"), 1);
        write_test_image(&photos_dir.path().join("two.png"), 2);

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let settings = test_settings(cache_dir.path().to_path_buf());

        let roots = vec![photos_dir.path().to_path_buf()];
        let extensions = vec!["png".to_string()];

        let stats = ingest(&db, &settings, &roots, &extensions, false, false).unwrap();
        assert_eq!(stats.scanned, 2);
        assert_eq!(stats.inserted, 2);
        assert_eq!(db.photo_count().unwrap(), 2);

        let rerun = ingest(&db, &settings, &roots, &extensions, false, false).unwrap();
        assert_eq!(rerun.inserted, 0);
        assert_eq!(rerun.skipped, 2);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let photos_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        write_test_image(&photos_dir.path().join("one.png"), 1);

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let settings = test_settings(cache_dir.path().to_path_buf());

        let stats = ingest(
            &db,
            &settings,
            &[photos_dir.path().to_path_buf()],
            &["png".to_string()],
            true,
            false,
        )
        .unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(db.photo_count().unwrap(), 0);
        assert!(std::fs::read_dir(cache_dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn unreadable_images_are_skipped_not_fatal() {
        let photos_dir = tempdir().unwrap();
        let cache_dir = tempdir().unwrap();
        write_test_image(&photos_dir.path().join("good.png"), 1);
        std::fs::write(photos_dir.path().join("bad.png"), b"not a png").unwrap();

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let settings = test_settings(cache_dir.path().to_path_buf());

        let stats = ingest(
            &db,
            &settings,
            &[photos_dir.path().to_path_buf()],
            &["png".to_string()],
            false,
            false,
        )
        .unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(db.photo_count().unwrap(), 1);
    }

    #[test]
    fn empty_roots_fail_fast() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let settings = test_settings(PathBuf::from("/tmp"));
        assert!(ingest(&db, &settings, &[], &["png".to_string()], false, false).is_err());
    }
}
