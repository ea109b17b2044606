//! Initialize a new blog site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
language: pt-BR
timezone: America/Sao_Paulo

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public
static_dir: static
languages_dir: languages

# Content API
## kind: prismic reads from `endpoint`; kind: fixture reads `fixture` (JSON)
## The SPACETRAVELING_ACCESS_TOKEN environment variable overrides access_token.
source:
  kind: fixture
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  page_size: 1
  fixture: fixture.json

# Comments (utterances); leave repo empty to disable
comments:
  repo: ''
  issue_term: pathname
  theme: github-dark
  label: ''

# Date / Time format (date-fns tokens)
date_format: dd MMM yyyy
post_date_format: d MMM y
edited_format: "dd MMM yyyy, 'às' HH:mm"

# Seconds between background regenerations in `server`; 0 disables
revalidate: 86400
"#;

const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="240" height="26" viewBox="0 0 240 26"><text x="0" y="20" font-family="sans-serif" font-size="22" fill="#fff">spacetraveling<tspan fill="#ff57b2">.</tspan></text></svg>
"##;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        bail!("{:?} already exists, refusing to overwrite", config_path);
    }

    // Create directory structure
    fs::create_dir_all(target_dir.join("static/images"))?;
    fs::create_dir_all(target_dir.join("static/css"))?;
    fs::create_dir_all(target_dir.join("languages"))?;

    fs::write(&config_path, CONFIG)?;
    fs::write(target_dir.join("static/images/logo.svg"), LOGO)?;
    fs::write(target_dir.join("static/css/style.css"), "")?;

    // Create a sample post
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S+0000").to_string();
    let sample = serde_json::json!({
        "results": [{
            "id": "hello-world",
            "uid": "hello-world",
            "type": "posts",
            "first_publication_date": now,
            "last_publication_date": now,
            "data": {
                "title": "Hello World",
                "subtitle": "Your very first post",
                "author": "spacetraveling",
                "banner": { "url": null },
                "content": [{
                    "heading": "Quick Start",
                    "body": [
                        { "type": "paragraph", "text": "Run spacetraveling generate to build the site.", "spans": [] },
                        { "type": "paragraph", "text": "Run spacetraveling server to preview it locally.", "spans": [] }
                    ]
                }]
            }
        }],
        "previews": {}
    });
    fs::write(
        target_dir.join("fixture.json"),
        serde_json::to_string_pretty(&sample)?,
    )?;

    Ok(())
}
