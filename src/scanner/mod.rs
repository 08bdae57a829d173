pub mod discovery;
pub mod hashing;
pub mod metadata;
pub mod thumbnails;
