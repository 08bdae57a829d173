//! Metric row storage with upsert semantics: technical and aesthetic writes
//! each overwrite their own columns without clobbering the other's.

use anyhow::Result;
use rusqlite::params;

use super::Database;
use crate::technical::TechnicalMetrics;

impl Database {
    pub fn upsert_technical_metrics(
        &self,
        photo_id: i64,
        metrics: &TechnicalMetrics,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO metrics (
                photo_id, sharpness, exposure_clip_hi, exposure_clip_lo, contrast, noise_proxy
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (photo_id) DO UPDATE SET
                sharpness = excluded.sharpness,
                exposure_clip_hi = excluded.exposure_clip_hi,
                exposure_clip_lo = excluded.exposure_clip_lo,
                contrast = excluded.contrast,
                noise_proxy = excluded.noise_proxy,
                created_at = CURRENT_TIMESTAMP
            "#,
            params![
                photo_id,
                metrics.sharpness,
                metrics.exposure_clip_hi,
                metrics.exposure_clip_lo,
                metrics.contrast,
                metrics.noise_proxy,
            ],
        )?;
        Ok(())
    }

    pub fn set_aesthetic_score(&self, photo_id: i64, score: f64) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO metrics (photo_id, aesthetic_score)
            VALUES (?, ?)
            ON CONFLICT (photo_id) DO UPDATE SET
                aesthetic_score = excluded.aesthetic_score
            "#,
            params![photo_id, score],
        )?;
        Ok(())
    }

    /// Photos needing a technical-metrics pass: all of them when `force`,
    /// otherwise only those without a metrics row.
    pub fn photos_missing_metrics(&self, force: bool) -> Result<Vec<(i64, String)>> {
        let sql = if force {
            "SELECT id, path FROM photos ORDER BY id"
        } else {
            "SELECT id, path FROM photos
             WHERE id NOT IN (SELECT photo_id FROM metrics WHERE sharpness IS NOT NULL)
             ORDER BY id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// (photo_id, sharpness, contrast, exposure_clip_hi) for every photo,
    /// consumed by the heuristic aesthetic scorer.
    #[allow(clippy::type_complexity)]
    pub fn metric_rows(&self) -> Result<Vec<(i64, Option<f64>, Option<f64>, Option<f64>)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, m.sharpness, m.contrast, m.exposure_clip_hi
            FROM photos p
            LEFT JOIN metrics m ON m.photo_id = p.id
            ORDER BY p.id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::photos::NewPhoto;

    fn insert_photo(db: &Database, path: &str) -> i64 {
        db.upsert_photo(&NewPhoto {
            path: path.to_string(),
            sha256: "abc".to_string(),
            mtime: "2026-01-01T00:00:00Z".to_string(),
            size_bytes: 1,
            ..NewPhoto::default()
        })
        .unwrap()
    }

    #[test]
    fn technical_upsert_preserves_aesthetic_score() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let id = insert_photo(&db, "/a.jpg");

        db.set_aesthetic_score(id, 0.7).unwrap();
        db.upsert_technical_metrics(
            id,
            &TechnicalMetrics {
                sharpness: 100.0,
                exposure_clip_hi: 0.01,
                exposure_clip_lo: 0.02,
                contrast: 0.3,
                noise_proxy: 1.5,
            },
        )
        .unwrap();

        let (aesthetic, sharpness): (Option<f64>, Option<f64>) = db
            .conn
            .query_row(
                "SELECT aesthetic_score, sharpness FROM metrics WHERE photo_id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(aesthetic, Some(0.7));
        assert_eq!(sharpness, Some(100.0));
    }

    #[test]
    fn missing_metrics_honors_force() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let a = insert_photo(&db, "/a.jpg");
        let b = insert_photo(&db, "/b.jpg");

        db.upsert_technical_metrics(a, &TechnicalMetrics::default())
            .unwrap();

        let pending = db.photos_missing_metrics(false).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, b);

        let all = db.photos_missing_metrics(true).unwrap();
        assert_eq!(all.len(), 2);
    }
}
