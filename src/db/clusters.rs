//! Cluster persistence. Each clustering pass recomputes clusters from
//! scratch; the previous pass's clusters for the same method are replaced in
//! the same transaction that writes the new ones.

use anyhow::Result;
use rusqlite::params;

use crate::scoring::QualityInputs;

use super::Database;

/// Input row for the clustering pass.
#[derive(Debug, Clone)]
pub struct DedupRow {
    pub photo_id: i64,
    pub perceptual_hash: Option<String>,
    pub quality: QualityInputs,
}

impl Database {
    /// Hash and quality inputs for every photo, ordered by photo id. The
    /// caller applies its own ordering policy on top.
    pub fn fetch_dedup_rows(&self) -> Result<Vec<DedupRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.perceptual_hash,
                   m.sharpness, m.contrast, m.exposure_clip_hi, m.aesthetic_score
            FROM photos p
            LEFT JOIN metrics m ON m.photo_id = p.id
            ORDER BY p.id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DedupRow {
                    photo_id: row.get(0)?,
                    perceptual_hash: row.get(1)?,
                    quality: QualityInputs {
                        sharpness: row.get(2)?,
                        contrast: row.get(3)?,
                        exposure_clip_hi: row.get(4)?,
                        aesthetic_score: row.get(5)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Atomically replace all clusters of `method` with the given ones.
    /// Each inner slice is a ranked member list, best first.
    pub fn replace_clusters(&mut self, method: &str, clusters: &[Vec<i64>]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut members_written = 0;

        tx.execute(
            "DELETE FROM cluster_members WHERE cluster_id IN
             (SELECT id FROM clusters WHERE method = ?)",
            [method],
        )?;
        tx.execute("DELETE FROM clusters WHERE method = ?", [method])?;

        for members in clusters {
            tx.execute("INSERT INTO clusters (method) VALUES (?)", [method])?;
            let cluster_id = tx.last_insert_rowid();
            for (position, photo_id) in members.iter().enumerate() {
                tx.execute(
                    "INSERT INTO cluster_members (cluster_id, photo_id, position) VALUES (?, ?, ?)",
                    params![cluster_id, photo_id, position as i64],
                )?;
                members_written += 1;
            }
        }

        tx.commit()?;
        Ok(members_written)
    }

    /// All clusters of a method with their ranked member lists.
    pub fn fetch_clusters(&self, method: &str) -> Result<Vec<(i64, Vec<i64>)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, cm.photo_id
            FROM clusters c
            JOIN cluster_members cm ON cm.cluster_id = c.id
            WHERE c.method = ?
            ORDER BY c.id, cm.position
            "#,
        )?;
        let rows = stmt
            .query_map([method], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<(i64, i64)>, _>>()?;

        let mut clusters: Vec<(i64, Vec<i64>)> = Vec::new();
        for (cluster_id, photo_id) in rows {
            match clusters.last_mut() {
                Some((id, members)) if *id == cluster_id => members.push(photo_id),
                _ => clusters.push((cluster_id, vec![photo_id])),
            }
        }
        Ok(clusters)
    }

    /// Photo ids that sit below the representative in some cluster
    /// (position > 0). Used to shrink the selection pool when
    /// `exclude_duplicates` is on.
    pub fn duplicate_member_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT photo_id FROM cluster_members WHERE position > 0")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::photos::NewPhoto;

    fn insert_photos(db: &Database, n: usize) -> Vec<i64> {
        (0..n)
            .map(|i| {
                db.upsert_photo(&NewPhoto {
                    path: format!("/p{i}.jpg"),
                    sha256: format!("hash{i}"),
                    mtime: "2026-01-01T00:00:00Z".to_string(),
                    size_bytes: 1,
                    ..NewPhoto::default()
                })
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn replace_clusters_discards_previous_pass() {
        let mut db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let ids = insert_photos(&db, 4);

        db.replace_clusters("phash", &[vec![ids[0], ids[1]]]).unwrap();
        db.replace_clusters("phash", &[vec![ids[2], ids[3], ids[0]]])
            .unwrap();

        let clusters = db.fetch_clusters("phash").unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].1, vec![ids[2], ids[3], ids[0]]);
    }

    #[test]
    fn member_order_is_persisted() {
        let mut db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let ids = insert_photos(&db, 3);

        // Insert in non-id order to confirm position drives the read order.
        db.replace_clusters("phash", &[vec![ids[2], ids[0], ids[1]]])
            .unwrap();
        let clusters = db.fetch_clusters("phash").unwrap();
        assert_eq!(clusters[0].1, vec![ids[2], ids[0], ids[1]]);

        let dupes = db.duplicate_member_ids().unwrap();
        assert_eq!(dupes.len(), 2);
        assert!(dupes.contains(&ids[0]));
        assert!(dupes.contains(&ids[1]));
        assert!(!dupes.contains(&ids[2]));
    }
}
