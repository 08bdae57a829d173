use anyhow::{anyhow, Result};
use image::DynamicImage;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Streaming SHA-256 of a file's contents, hex-encoded.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// 64-bit perceptual hash of an image, base64-encoded. The image is shrunk
/// to a small thumbnail first; the hash captures the visual gist, so
/// near-identical photos hash within a few bits of each other.
pub fn perceptual_hash(img: &DynamicImage) -> Result<String> {
    use img_hash::HasherConfig;

    let thumbnail = img.thumbnail(64, 64);

    // 8x8 hash = 64 bits
    let hasher = HasherConfig::new().hash_size(8, 8).to_hasher();

    // img_hash bundles its own `image` version; convert via raw RGBA bytes.
    let rgba = thumbnail.to_rgba8();
    let (width, height) = rgba.dimensions();
    let hash_input = img_hash::image::RgbaImage::from_raw(width, height, rgba.into_raw())
        .ok_or_else(|| anyhow!("Failed to create image for hashing"))?;

    let hash = hasher.hash_image(&img_hash::image::DynamicImage::ImageRgba8(hash_input));
    Ok(hash.to_base64())
}
