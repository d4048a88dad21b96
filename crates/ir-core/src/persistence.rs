//! Library persistence using JSON file storage

use crate::model::LibraryFile;
use std::path::Path;
use tokio::fs;

/// Load the library file. `None` means no file exists yet; an unreadable
/// or unparsable file yields an empty library without touching the file.
pub async fn load_library(path: &Path) -> Option<LibraryFile> {
    match fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str::<LibraryFile>(&contents) {
            Ok(file) => {
                tracing::info!("Loaded {} devices from {:?}", file.devices.len(), path);
                Some(file)
            }
            Err(e) => {
                tracing::warn!("Failed to parse library file {:?}: {}", path, e);
                Some(LibraryFile::default())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No library file found at {:?}, starting fresh", path);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read library file {:?}: {}", path, e);
            Some(LibraryFile::default())
        }
    }
}

/// Save the library to a JSON file atomically
#[allow(clippy::missing_errors_doc)]
pub async fn save_library(path: &Path, file: &LibraryFile) -> Result<(), std::io::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(file)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    // Write atomically: write to temp file, then rename
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json).await?;
    fs::rename(&tmp_path, path).await?;

    tracing::debug!("Saved {} devices to {:?}", file.devices.len(), path);
    Ok(())
}
