//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::cache::CacheDb;
use crate::Blog;

/// Clean the public directory and cache
pub fn run(blog: &Blog) -> Result<()> {
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)?;
        tracing::info!("Deleted: {:?}", blog.public_dir);
    }

    CacheDb::clear(&blog.base_dir)?;
    tracing::debug!("Cache cleared");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_clean_removes_public_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(dir.path(), SiteConfig::default());
        fs::create_dir_all(blog.public_dir.join("post/a")).unwrap();
        CacheDb::new().save(dir.path()).unwrap();

        run(&blog).unwrap();
        assert!(!blog.public_dir.exists());
        assert!(!dir.path().join(".spacetraveling-cache").exists());

        // Cleaning twice is fine
        run(&blog).unwrap();
    }
}
