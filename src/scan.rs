//! Source image discovery.
//!
//! Walks a source directory recursively and collects every file whose
//! extension has a decoder compiled in (see
//! [`supported_input_extensions`](crate::imaging::supported_input_extensions)).
//! Each hit carries its path relative to the root, which the batch processor
//! reuses to place the output under the output root:
//!
//! ```text
//! assets/app_images/                 assets/app_images_compressed/
//! ├── logo.png               →       ├── logo.png
//! └── animals/                       └── animals/
//!     ├── cat.JPG            →           ├── cat.JPG
//!     └── notes.txt                      (skipped)
//! ```
//!
//! Results are sorted by relative path so runs are reproducible.
//!
//! Only a missing or unreadable root is an error. Entries below it that
//! cannot be read (dangling symlinks, directories without permission) are
//! logged and skipped so the rest of the tree is still processed.

use crate::imaging::supported_input_extensions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source directory does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A discovered source image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceImage {
    /// Path relative to the scan root.
    pub relative: PathBuf,
    /// Full path on disk.
    pub path: PathBuf,
}

impl SourceImage {
    /// Lowercased file extension, empty when there is none.
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }
}

/// Find all supported images under `root`, sorted by relative path.
pub fn find_images(root: &Path) -> Result<Vec<SourceImage>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) if source.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: root.to_path_buf(),
                    source,
                });
            }
            Err(err) => {
                let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                warn!(%path, error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        images.push(SourceImage {
            relative,
            path: entry.into_path(),
        });
    }

    images.sort();
    Ok(images)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_image(path: &Path) -> bool {
    let ext = extension_of(path);
    supported_input_extensions().contains(&ext.as_str())
}
