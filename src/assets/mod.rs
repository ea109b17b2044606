//! Static assets - copies the site's `static_dir` into the public directory

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Copies static files (CSS, images, fonts) verbatim
pub struct StaticAssets {
    static_dir: PathBuf,
}

impl StaticAssets {
    pub fn new<P: AsRef<Path>>(static_dir: P) -> Self {
        Self {
            static_dir: static_dir.as_ref().to_path_buf(),
        }
    }

    /// Copy every file to `public_dir`, returning the number copied
    ///
    /// Entries under a directory or file starting with `_` or `.` are skipped.
    pub fn copy_to(&self, public_dir: &Path) -> Result<usize> {
        if !self.static_dir.exists() {
            tracing::debug!("No static directory at {:?}", self.static_dir);
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(&self.static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&self.static_dir)?;
            let hidden = relative.components().any(|c| {
                c.as_os_str()
                    .to_str()
                    .map(|s| s.starts_with('_') || s.starts_with('.'))
                    .unwrap_or(false)
            });
            if hidden {
                continue;
            }

            let dest = public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            tracing::debug!("Copied: {:?} -> {:?}", path, dest);
            copied += 1;
        }

        Ok(copied)
    }
}
