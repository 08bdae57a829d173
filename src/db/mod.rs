mod schema;
pub mod clusters;
pub mod embeddings;
pub mod metrics;
pub mod photos;
pub mod runs;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub use clusters::DedupRow;
pub use embeddings::{bytes_to_embedding, embedding_to_bytes};
pub use photos::NewPhoto;
pub use runs::{CandidateRow, ReportRow};
pub use schema::SCHEMA;

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}
