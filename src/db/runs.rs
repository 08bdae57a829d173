//! Selection run persistence. A run and its ranked members are committed in
//! one transaction so readers observe either no run or a complete one.

use anyhow::Result;
use chrono::Utc;
use rusqlite::params;

use crate::scoring::QualityInputs;
use crate::select::RankedPhoto;

use super::embeddings::bytes_to_embedding;
use super::Database;

/// Candidate row for the diversity selector: photos that have an embedding
/// for the requested model. Photos without one are not candidates at all.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub photo_id: i64,
    pub quality: QualityInputs,
    pub embedding: Vec<f32>,
}

/// Joined row for report export.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub rank: i64,
    pub photo_id: i64,
    pub path: String,
    pub sha256: String,
    pub final_score: f64,
}

impl Database {
    pub fn fetch_selection_candidates(&self, model_name: &str) -> Result<Vec<CandidateRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, m.sharpness, m.contrast, m.exposure_clip_hi, m.aesthetic_score,
                   e.embedding
            FROM photos p
            JOIN embeddings e ON e.photo_id = p.id AND e.model_name = ?
            LEFT JOIN metrics m ON m.photo_id = p.id
            ORDER BY p.id
            "#,
        )?;
        let rows = stmt
            .query_map([model_name], |row| {
                let bytes: Vec<u8> = row.get(5)?;
                Ok(CandidateRow {
                    photo_id: row.get(0)?,
                    quality: QualityInputs {
                        sharpness: row.get(1)?,
                        contrast: row.get(2)?,
                        exposure_clip_hi: row.get(3)?,
                        aesthetic_score: row.get(4)?,
                    },
                    embedding: bytes_to_embedding(&bytes),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Write a complete run: the run row with its start timestamp, every
    /// ranked member, and the finish timestamp, all inside one transaction.
    pub fn record_selection_run(
        &mut self,
        started_at: &str,
        ranked: &[RankedPhoto],
    ) -> Result<i64> {
        let tx = self.conn.transaction()?;

        tx.execute("INSERT INTO runs (started_at) VALUES (?)", [started_at])?;
        let run_id = tx.last_insert_rowid();

        for photo in ranked {
            tx.execute(
                "INSERT INTO selections (run_id, photo_id, rank, final_score) VALUES (?, ?, ?, ?)",
                params![run_id, photo.photo_id, photo.rank as i64, photo.final_score],
            )?;
        }

        tx.execute(
            "UPDATE runs SET finished_at = ? WHERE id = ?",
            params![Utc::now().to_rfc3339(), run_id],
        )?;

        tx.commit()?;
        Ok(run_id)
    }

    pub fn fetch_run_report(&self, run_id: i64) -> Result<Vec<ReportRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.rank, p.id, p.path, p.sha256, s.final_score
            FROM selections s
            JOIN photos p ON p.id = s.photo_id
            WHERE s.run_id = ?
            ORDER BY s.rank ASC
            "#,
        )?;
        let rows = stmt
            .query_map([run_id], |row| {
                Ok(ReportRow {
                    rank: row.get(0)?,
                    photo_id: row.get(1)?,
                    path: row.get(2)?,
                    sha256: row.get(3)?,
                    final_score: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn run_timestamps(&self, run_id: i64) -> Result<Option<(String, Option<String>)>> {
        let result = self.conn.query_row(
            "SELECT started_at, finished_at FROM runs WHERE id = ?",
            [run_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );
        match result {
            Ok(ts) => Ok(Some(ts)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
