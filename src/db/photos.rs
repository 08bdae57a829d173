//! Photo row storage. Rows are keyed by path; re-ingesting an existing path
//! overwrites its metadata.

use anyhow::Result;
use rusqlite::params;

use super::Database;

#[derive(Debug, Clone, Default)]
pub struct NewPhoto {
    pub path: String,
    pub sha256: String,
    pub mtime: String,
    pub size_bytes: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub iso: Option<i64>,
    pub taken_at: Option<String>,
    pub perceptual_hash: Option<String>,
}

impl Database {
    /// True when a photo row already exists for this path with the same
    /// mtime and size, meaning ingest can skip the file.
    pub fn photo_unchanged(&self, path: &str, mtime: &str, size_bytes: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE path = ? AND mtime = ? AND size_bytes = ?",
            params![path, mtime, size_bytes],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn upsert_photo(&self, photo: &NewPhoto) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO photos (
                path, sha256, mtime, size_bytes, width, height,
                camera_make, camera_model, lens, focal_length, aperture,
                shutter_speed, iso, taken_at, perceptual_hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (path) DO UPDATE SET
                sha256 = excluded.sha256,
                mtime = excluded.mtime,
                size_bytes = excluded.size_bytes,
                width = excluded.width,
                height = excluded.height,
                camera_make = excluded.camera_make,
                camera_model = excluded.camera_model,
                lens = excluded.lens,
                focal_length = excluded.focal_length,
                aperture = excluded.aperture,
                shutter_speed = excluded.shutter_speed,
                iso = excluded.iso,
                taken_at = excluded.taken_at,
                perceptual_hash = excluded.perceptual_hash,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                photo.path,
                photo.sha256,
                photo.mtime,
                photo.size_bytes,
                photo.width,
                photo.height,
                photo.camera_make,
                photo.camera_model,
                photo.lens,
                photo.focal_length,
                photo.aperture,
                photo.shutter_speed,
                photo.iso,
                photo.taken_at,
                photo.perceptual_hash,
            ],
        )?;

        let id: i64 = self.conn.query_row(
            "SELECT id FROM photos WHERE path = ?",
            [&photo.path],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn photo_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn photo_path(&self, photo_id: i64) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT path FROM photos WHERE id = ?",
            [photo_id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(path) => Ok(Some(path)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
