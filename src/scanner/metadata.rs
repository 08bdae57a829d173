use anyhow::Result;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIF and dimension metadata pulled from an image file. Every field is
/// best-effort; a photo with no EXIF block still ingests fine.
#[derive(Debug, Clone, Default)]
pub struct ImageMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub shutter_speed: Option<String>,
    pub iso: Option<i64>,
    pub taken_at: Option<String>,
}

pub fn extract_metadata(path: &Path) -> Result<ImageMetadata> {
    let mut metadata = ImageMetadata::default();

    if let Ok(reader) = image::ImageReader::open(path) {
        if let Ok(dims) = reader.into_dimensions() {
            metadata.width = Some(dims.0);
            metadata.height = Some(dims.1);
        }
    }

    if let Ok(file) = File::open(path) {
        let mut bufreader = BufReader::new(file);
        if let Ok(exif) = exif::Reader::new().read_from_container(&mut bufreader) {
            metadata.camera_make = string_field(&exif, exif::Tag::Make);
            metadata.camera_model = string_field(&exif, exif::Tag::Model);
            metadata.lens = string_field(&exif, exif::Tag::LensModel);
            metadata.focal_length = display_field(&exif, exif::Tag::FocalLength);
            metadata.aperture = display_field(&exif, exif::Tag::FNumber);
            metadata.shutter_speed = display_field(&exif, exif::Tag::ExposureTime);

            if let Some(field) = exif.get_field(exif::Tag::PhotographicSensitivity, exif::In::PRIMARY)
            {
                if let exif::Value::Short(ref v) = field.value {
                    metadata.iso = v.first().map(|&iso| iso as i64);
                }
            }

            metadata.taken_at = display_field(&exif, exif::Tag::DateTimeOriginal)
                .or_else(|| display_field(&exif, exif::Tag::DateTime));
        }
    }

    Ok(metadata)
}

fn string_field(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    exif.get_field(tag, exif::In::PRIMARY).map(|field| {
        field
            .display_value()
            .to_string()
            .trim_matches('"')
            .to_string()
    })
}

fn display_field(exif: &exif::Exif, tag: exif::Tag) -> Option<String> {
    exif.get_field(tag, exif::In::PRIMARY)
        .map(|field| field.display_value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plain_png_yields_dimensions_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.png");
        let img = image::GrayImage::from_pixel(20, 10, image::Luma([127]));
        img.save(&path).unwrap();

        let metadata = extract_metadata(&path).unwrap();
        assert_eq!(metadata.width, Some(20));
        assert_eq!(metadata.height, Some(10));
        assert!(metadata.camera_make.is_none());
        assert!(metadata.taken_at.is_none());
    }

    #[test]
    fn unreadable_file_still_returns_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not_an_image.jpg");
        std::fs::write(&path, b"garbage").unwrap();

        let metadata = extract_metadata(&path).unwrap();
        assert!(metadata.width.is_none());
    }
}
