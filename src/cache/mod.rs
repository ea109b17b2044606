//! Cache module for incremental generation
//!
//! Every article page is rendered from the projected article plus its
//! neighbor links. The cache keeps a hash of those inputs per uid so a
//! regeneration only rewrites pages whose inputs changed, and removes the
//! pages of articles that disappeared from the listing.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Cache directory, relative to the site directory
const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name
const CACHE_FILE: &str = ".spacetraveling-cache/db.json";

/// Represents a cached entry for a rendered article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of the inputs the page was rendered from
    pub content_hash: u64,
    /// Last publication date reported by the content API
    pub last_publication_date: Option<String>,
    /// Output path relative to public dir
    pub output_path: String,
}

/// Cache database for tracking rendered articles
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Hash of the site config and binary version (changes trigger full rebuild)
    pub config_hash: u64,
    /// Cached entries, keyed by uid
    pub posts: HashMap<String, CacheEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            if let Ok(cache) = serde_json::from_str::<CacheDb>(&content) {
                if cache.version == Self::VERSION {
                    return cache;
                }
                tracing::info!("Cache version mismatch, rebuilding cache");
            }
        }
        Self::new()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;

        let cache_path = base_dir.join(CACHE_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_path, content)?;
        Ok(())
    }

    /// Remove the cache directory
    pub fn clear(base_dir: &Path) -> Result<()> {
        let dir = base_dir.join(CACHE_DIR);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }
}

/// An article as seen by the current generation
#[derive(Debug, Clone)]
pub struct PostState {
    pub uid: String,
    pub content_hash: u64,
    pub last_publication_date: Option<String>,
    pub output_path: String,
}

/// Change detection result
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Articles that need rendering (uid)
    pub changed_posts: Vec<String>,
    /// Articles no longer listed (uid)
    pub deleted_posts: Vec<String>,
    /// Whether to regenerate everything (config or version changed)
    pub full_rebuild: bool,
}

impl ChangeSet {
    /// Check whether `uid` has to be rendered
    pub fn needs_render(&self, uid: &str) -> bool {
        self.full_rebuild || self.changed_posts.iter().any(|u| u == uid)
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        if self.full_rebuild {
            return "full rebuild required".to_string();
        }

        let mut parts = Vec::new();
        if !self.changed_posts.is_empty() {
            parts.push(format!("{} posts changed", self.changed_posts.len()));
        }
        if !self.deleted_posts.is_empty() {
            parts.push(format!("{} posts deleted", self.deleted_posts.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Calculate a hash for content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Hash of a serializable value, via its JSON form
pub fn hash_value<T: Serialize>(value: &T) -> Result<u64> {
    Ok(hash_content(&serde_json::to_string(value)?))
}

/// Calculate hash for site config, salted with the binary version
pub fn hash_config(base_dir: &Path) -> Result<u64> {
    let config_path = base_dir.join("_config.yml");
    let content = if config_path.exists() {
        fs::read_to_string(&config_path)?
    } else {
        String::new()
    };
    Ok(hash_content(&format!(
        "{}\n{}",
        env!("CARGO_PKG_VERSION"),
        content
    )))
}

/// Detect changes between current state and cached state
///
/// A page counts as changed when its input hash differs, when it is new, or
/// when its output file is missing from `public_dir`.
pub fn detect_changes(
    cache: &CacheDb,
    base_dir: &Path,
    public_dir: &Path,
    current_posts: &[PostState],
) -> Result<ChangeSet> {
    let config_hash = hash_config(base_dir)?;
    if config_hash != cache.config_hash {
        if cache.config_hash != 0 {
            tracing::info!("Config changed, full rebuild required");
        }
        return Ok(ChangeSet {
            full_rebuild: true,
            deleted_posts: deleted(cache, current_posts),
            ..Default::default()
        });
    }

    let mut changeset = ChangeSet::default();

    for post in current_posts {
        match cache.posts.get(&post.uid) {
            Some(cached) if cached.content_hash == post.content_hash => {
                if !public_dir.join(&cached.output_path).exists() {
                    tracing::debug!("Output missing: {}", post.uid);
                    changeset.changed_posts.push(post.uid.clone());
                }
            }
            Some(_) => {
                tracing::debug!("Post changed: {}", post.uid);
                changeset.changed_posts.push(post.uid.clone());
            }
            None => {
                tracing::debug!("New post: {}", post.uid);
                changeset.changed_posts.push(post.uid.clone());
            }
        }
    }

    changeset.deleted_posts = deleted(cache, current_posts);
    Ok(changeset)
}

fn deleted(cache: &CacheDb, current_posts: &[PostState]) -> Vec<String> {
    let current: HashSet<&str> = current_posts.iter().map(|p| p.uid.as_str()).collect();
    let mut deleted: Vec<String> = cache
        .posts
        .keys()
        .filter(|uid| !current.contains(uid.as_str()))
        .cloned()
        .collect();
    deleted.sort();
    for uid in &deleted {
        tracing::debug!("Deleted post: {}", uid);
    }
    deleted
}

/// Update cache with current state
pub fn update_cache(cache: &mut CacheDb, base_dir: &Path, posts: &[PostState]) -> Result<()> {
    cache.version = CacheDb::VERSION;
    cache.config_hash = hash_config(base_dir)?;

    cache.posts.clear();
    for post in posts {
        cache.posts.insert(
            post.uid.clone(),
            CacheEntry {
                content_hash: post.content_hash,
                last_publication_date: post.last_publication_date.clone(),
                output_path: post.output_path.clone(),
            },
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(uid: &str, hash: u64) -> PostState {
        PostState {
            uid: uid.to_string(),
            content_hash: hash,
            last_publication_date: None,
            output_path: format!("post/{}/index.html", uid),
        }
    }

    fn write_outputs(public: &Path, posts: &[PostState]) {
        for post in posts {
            let path = public.join(&post.output_path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "<html></html>").unwrap();
        }
    }

    #[test]
    fn test_empty_cache_is_full_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let changes =
            detect_changes(&CacheDb::load(dir.path()), dir.path(), dir.path(), &[state("a", 1)])
                .unwrap();
        assert!(changes.full_rebuild);
        assert!(changes.needs_render("a"));
    }

    #[test]
    fn test_detects_changed_new_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        let before = vec![state("a", 1), state("b", 2), state("c", 3)];
        write_outputs(&public, &before);

        let mut cache = CacheDb::new();
        update_cache(&mut cache, dir.path(), &before).unwrap();
        cache.save(dir.path()).unwrap();
        let cache = CacheDb::load(dir.path());

        let now = vec![state("a", 1), state("b", 20), state("d", 4)];
        let changes = detect_changes(&cache, dir.path(), &public, &now).unwrap();
        assert!(!changes.full_rebuild);
        assert_eq!(changes.changed_posts, vec!["b", "d"]);
        assert_eq!(changes.deleted_posts, vec!["c"]);
        assert!(!changes.needs_render("a"));
        assert_eq!(changes.summary(), "2 posts changed, 1 posts deleted");
    }

    #[test]
    fn test_missing_output_is_rerendered() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        let posts = vec![state("a", 1)];

        let mut cache = CacheDb::new();
        update_cache(&mut cache, dir.path(), &posts).unwrap();
        let changes = detect_changes(&cache, dir.path(), &public, &posts).unwrap();
        assert_eq!(changes.changed_posts, vec!["a"]);
    }

    #[test]
    fn test_config_change_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let posts = vec![state("a", 1)];
        write_outputs(dir.path(), &posts);

        let mut cache = CacheDb::new();
        update_cache(&mut cache, dir.path(), &posts).unwrap();
        let unchanged = detect_changes(&cache, dir.path(), dir.path(), &posts).unwrap();
        assert!(!unchanged.full_rebuild);
        assert!(unchanged.changed_posts.is_empty());
        assert!(unchanged.deleted_posts.is_empty());

        fs::write(dir.path().join("_config.yml"), "title: Changed\n").unwrap();
        let changes = detect_changes(&cache, dir.path(), dir.path(), &posts).unwrap();
        assert!(changes.full_rebuild);
        assert_eq!(changes.summary(), "full rebuild required");
    }

    #[test]
    fn test_clear_removes_cache() {
        let dir = tempfile::tempdir().unwrap();
        CacheDb::new().save(dir.path()).unwrap();
        assert!(dir.path().join(CACHE_FILE).exists());
        CacheDb::clear(dir.path()).unwrap();
        assert!(!dir.path().join(CACHE_DIR).exists());
    }
}
