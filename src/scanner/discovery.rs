use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively find image files under the given roots, filtered by
/// extension. The result is sorted by path so every pass over the same tree
/// sees the same order.
pub fn discover_images(roots: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for root in roots {
        collect_from(root, extensions, &mut images);
    }

    images.sort();
    images.dedup();
    Ok(images)
}

fn collect_from(root: &Path, extensions: &[String], images: &mut Vec<PathBuf>) {
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if extensions.iter().any(|e| e.to_lowercase() == ext_lower) {
                images.push(path.to_path_buf());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn finds_images_recursively_and_sorted() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("b.jpg")).unwrap();
        File::create(dir.path().join("a.png")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        File::create(dir.path().join("sub/c.jpeg")).unwrap();

        let extensions = vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()];
        let images = discover_images(&[dir.path().to_path_buf()], &extensions).unwrap();

        assert_eq!(images.len(), 3);
        let mut sorted = images.clone();
        sorted.sort();
        assert_eq!(images, sorted);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("photo.JPG")).unwrap();

        let extensions = vec!["jpg".to_string()];
        let images = discover_images(&[dir.path().to_path_buf()], &extensions).unwrap();
        assert_eq!(images.len(), 1);
    }
}
