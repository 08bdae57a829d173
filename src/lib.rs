pub mod aesthetics;
pub mod config;
pub mod db;
pub mod dedup;
pub mod embeddings;
pub mod ingest;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod scoring;
pub mod select;
pub mod technical;
