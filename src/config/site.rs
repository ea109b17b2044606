//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable that overrides `source.access_token`
pub const ACCESS_TOKEN_ENV: &str = "SPACETRAVELING_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,
    pub languages_dir: String,

    // Content
    pub source: SourceConfig,

    // Comments
    pub comments: CommentsConfig,

    // Date / Time format (date-fns style tokens)
    pub date_format: String,
    pub post_date_format: String,
    pub edited_format: String,

    /// Seconds between background regenerations, 0 disables
    pub revalidate: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            languages_dir: "languages".to_string(),

            source: SourceConfig::default(),
            comments: CommentsConfig::default(),

            date_format: "dd MMM yyyy".to_string(),
            post_date_format: "d MMM y".to_string(),
            edited_format: "dd MMM yyyy, 'às' HH:mm".to_string(),

            revalidate: 60 * 60 * 24,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                self.source.access_token = Some(token);
            }
        }
    }

    /// Parsed timezone, UTC when unset or unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                if !self.timezone.is_empty() {
                    tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                }
                chrono_tz::UTC
            }
        }
    }
}

/// Where documents come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Prismic,
    Fixture,
}

/// Content API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Listing entries per page
    pub page_size: usize,
    /// JSON dump used when `kind: fixture`, relative to the site directory
    pub fixture: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Prismic,
            endpoint: "https://spacetraveling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            fixture: "fixture.json".to_string(),
        }
    }
}

/// Comment widget (utterances) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// `owner/name` of the repository holding comment issues; empty disables
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
    pub label: String,
    pub mount_id: String,
    pub script: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
            label: String::new(),
            mount_id: "comments".to_string(),
            script: "https://utteranc.es/client.js".to_string(),
        }
    }
}

impl CommentsConfig {
    pub fn enabled(&self) -> bool {
        !self.repo.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.source.kind, SourceKind::Prismic);
        assert_eq!(config.source.document_type, "posts");
        assert_eq!(config.revalidate, 86400);
        assert!(!config.comments.enabled());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
timezone: UTC
source:
  kind: fixture
  fixture: data/posts.json
  page_size: 5
comments:
  repo: me/blog-comments
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.source.kind, SourceKind::Fixture);
        assert_eq!(config.source.fixture, "data/posts.json");
        assert_eq!(config.source.page_size, 5);
        assert_eq!(config.source.document_type, "posts");
        assert!(config.comments.enabled());
        assert_eq!(config.comments.issue_term, "pathname");
        assert_eq!(config.tz(), chrono_tz::UTC);
    }

    #[test]
    fn test_unknown_timezone_is_utc() {
        let config = SiteConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tz(), chrono_tz::UTC);
        assert_eq!(SiteConfig::default().tz(), chrono_tz::America::Sao_Paulo);
    }
}
