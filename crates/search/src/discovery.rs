//! Finding items on disk.

use crate::types::Item;
use imgsearch_core::{AppError, AppResult};
use imgsearch_encoder::{ImageFormat, ImageInput};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect image files under `paths`, sorted by path.
///
/// Directories are walked recursively and filtered by extension; files named
/// explicitly are kept whatever their extension.
pub fn find_images(paths: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut found = Vec::new();

    for path in paths {
        if !path.exists() {
            return Err(AppError::Input(format!("Path does not exist: {:?}", path)));
        }

        if path.is_file() {
            found.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let entry_path = entry.path();
            if entry_path.is_file() && ImageFormat::from_extension(entry_path).is_some() {
                found.push(entry_path.to_path_buf());
            }
        }
    }

    found.sort();
    found.dedup();
    tracing::debug!("Discovered {} image files", found.len());
    Ok(found)
}

/// Read discovered images into items, numbering them from `start_id`.
///
/// Bytes are not validated here; a corrupt image surfaces as an input error
/// from the encoder.
pub fn load_images(paths: &[PathBuf], start_id: i64) -> AppResult<Vec<Item>> {
    find_images(paths)?
        .into_iter()
        .zip(start_id..)
        .map(|(path, id)| load_image(&path, id))
        .collect()
}

fn load_image(path: &Path, id: i64) -> AppResult<Item> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Item::image(id, ImageInput::new(bytes))
        .with_label(path.display().to_string())
        .with_metadata(serde_json::json!({
            "path": path.display().to_string(),
            "file_name": file_name,
        })))
}

/// Wrap texts as items numbered from `start_id`.
pub fn text_items<S: AsRef<str>>(texts: &[S], start_id: i64) -> Vec<Item> {
    texts
        .iter()
        .zip(start_id..)
        .map(|(text, id)| Item::text(id, text.as_ref()).with_label(text.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::png;
    use tempfile::TempDir;

    #[test]
    fn test_find_images_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.png"), png(1)).unwrap();
        std::fs::write(dir.path().join("a.JPG"), png(2)).unwrap();
        std::fs::write(dir.path().join("nested/c.webp"), png(3)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let found = find_images(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "nested/c.webp"]);
    }

    #[test]
    fn test_load_images_enumerates_from_start_id() {
        let dir = TempDir::new().unwrap();
        for i in 0..3 {
            std::fs::write(dir.path().join(format!("img{}.png", i)), png(i)).unwrap();
        }

        let items = load_images(&[dir.path().to_path_buf()], 10).unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![10, 11, 12]);
        assert_eq!(items[0].metadata["file_name"], "img0.png");
        assert!(items[2].label.as_deref().unwrap().ends_with("img2.png"));
    }

    #[test]
    fn test_missing_path_is_input_error() {
        let err = find_images(&[PathBuf::from("/definitely/not/here")]).unwrap_err();
        assert!(matches!(err, AppError::Input(_)));
    }

    #[test]
    fn test_text_items() {
        let items = text_items(&["a cat", "a dog"], 1);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, 2);
        assert_eq!(items[1].label.as_deref(), Some("a dog"));
    }
}
