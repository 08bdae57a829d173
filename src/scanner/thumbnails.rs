use anyhow::Result;
use image::DynamicImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Thumbnails are cached by content hash, so renamed or duplicate files
/// share one thumbnail.
pub fn thumbnail_path(thumbs_dir: &Path, sha256: &str) -> PathBuf {
    thumbs_dir.join(format!("{sha256}.jpg"))
}

/// Write a JPEG thumbnail for the image if one is not already cached.
/// Returns the cache path.
pub fn write_thumbnail(
    img: &DynamicImage,
    thumbs_dir: &Path,
    sha256: &str,
    size: u32,
) -> Result<PathBuf> {
    let path = thumbnail_path(thumbs_dir, sha256);
    if path.exists() {
        return Ok(path);
    }

    std::fs::create_dir_all(thumbs_dir)?;
    let thumb = img.thumbnail(size, size).to_rgb8();

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, 90);
    thumb.write_with_encoder(encoder)?;

    Ok(path)
}
