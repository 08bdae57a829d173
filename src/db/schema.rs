pub const SCHEMA: &str = r#"
-- Photos table: core photo metadata
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    sha256 TEXT NOT NULL,
    mtime TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    scanned_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT,

    -- Image metadata
    width INTEGER,
    height INTEGER,

    -- EXIF data
    camera_make TEXT,
    camera_model TEXT,
    lens TEXT,
    focal_length TEXT,
    aperture TEXT,
    shutter_speed TEXT,
    iso INTEGER,
    taken_at TEXT,

    -- 64-bit perceptual hash of the thumbnail, base64-encoded.
    -- NULL when the hash could not be produced.
    perceptual_hash TEXT
);

CREATE INDEX IF NOT EXISTS idx_photos_sha256 ON photos(sha256);
CREATE INDEX IF NOT EXISTS idx_photos_perceptual ON photos(perceptual_hash);

-- Per-photo technical measurements plus the aesthetic score.
-- At most one live row per photo; later writes overwrite earlier ones.
CREATE TABLE IF NOT EXISTS metrics (
    photo_id INTEGER PRIMARY KEY,
    sharpness REAL,
    exposure_clip_hi REAL,
    exposure_clip_lo REAL,
    contrast REAL,
    noise_proxy REAL,
    aesthetic_score REAL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE
);

-- Embedding vectors, one per (photo, model) pair.
CREATE TABLE IF NOT EXISTS embeddings (
    photo_id INTEGER NOT NULL,
    model_name TEXT NOT NULL,
    embedding BLOB NOT NULL,  -- float32 array stored as little-endian bytes
    embedding_dim INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (photo_id, model_name),
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model_name);

-- Near-duplicate clusters, write-once per clustering pass.
CREATE TABLE IF NOT EXISTS clusters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    method TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Cluster membership, ordered by descending quality (position 0 = best).
CREATE TABLE IF NOT EXISTS cluster_members (
    cluster_id INTEGER NOT NULL,
    photo_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (cluster_id, photo_id),
    FOREIGN KEY (cluster_id) REFERENCES clusters(id) ON DELETE CASCADE,
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_cluster_members_photo ON cluster_members(photo_id);

-- Selection runs: one row per top-N execution.
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT
);

-- Ranked members of a run; ranks are dense 1..k.
CREATE TABLE IF NOT EXISTS selections (
    run_id INTEGER NOT NULL,
    photo_id INTEGER NOT NULL,
    rank INTEGER NOT NULL,
    final_score REAL NOT NULL,
    PRIMARY KEY (run_id, photo_id),
    FOREIGN KEY (run_id) REFERENCES runs(id) ON DELETE CASCADE,
    FOREIGN KEY (photo_id) REFERENCES photos(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_selections_run ON selections(run_id);
"#;
