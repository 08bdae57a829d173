//! Embedding storage. Exactly one vector per (photo, model) pair;
//! re-embedding overwrites.

use anyhow::Result;
use rusqlite::params;

use super::Database;

/// Convert f32 slice to little-endian bytes for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert BLOB bytes back to f32 vector.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

impl Database {
    pub fn upsert_embedding(
        &self,
        photo_id: i64,
        model_name: &str,
        embedding: &[f32],
    ) -> Result<()> {
        let bytes = embedding_to_bytes(embedding);
        self.conn.execute(
            r#"
            INSERT INTO embeddings (photo_id, model_name, embedding, embedding_dim)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (photo_id, model_name) DO UPDATE SET
                embedding = excluded.embedding,
                embedding_dim = excluded.embedding_dim,
                created_at = CURRENT_TIMESTAMP
            "#,
            params![photo_id, model_name, bytes, embedding.len() as i64],
        )?;
        Ok(())
    }

    /// Photos needing an embedding for this model: all of them when `force`,
    /// otherwise only those without one. Returns (id, sha256).
    pub fn photos_missing_embedding(
        &self,
        model_name: &str,
        force: bool,
    ) -> Result<Vec<(i64, String)>> {
        let sql = if force {
            "SELECT id, sha256 FROM photos ORDER BY id"
        } else {
            "SELECT id, sha256 FROM photos
             WHERE id NOT IN (SELECT photo_id FROM embeddings WHERE model_name = ?)
             ORDER BY id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = if force {
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            stmt.query_map([model_name], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }

    pub fn embedding_count(&self, model_name: &str) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE model_name = ?",
            [model_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::photos::NewPhoto;

    #[test]
    fn bytes_round_trip() {
        let embedding = vec![0.5f32, -1.25, 3.75, 0.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes_to_embedding(&bytes), embedding);
    }

    #[test]
    fn one_embedding_per_photo_and_model() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let id = db
            .upsert_photo(&NewPhoto {
                path: "/a.jpg".to_string(),
                sha256: "abc".to_string(),
                mtime: "2026-01-01T00:00:00Z".to_string(),
                size_bytes: 1,
                ..NewPhoto::default()
            })
            .unwrap();

        db.upsert_embedding(id, "ViT-B-32", &[1.0, 0.0]).unwrap();
        db.upsert_embedding(id, "ViT-B-32", &[0.0, 1.0]).unwrap();
        db.upsert_embedding(id, "other", &[0.5, 0.5]).unwrap();

        assert_eq!(db.embedding_count("ViT-B-32").unwrap(), 1);
        assert_eq!(db.embedding_count("other").unwrap(), 1);

        let missing = db.photos_missing_embedding("ViT-B-32", false).unwrap();
        assert!(missing.is_empty());
        let forced = db.photos_missing_embedding("ViT-B-32", true).unwrap();
        assert_eq!(forced.len(), 1);
    }
}
