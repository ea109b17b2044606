//! List site content

use anyhow::Result;

use crate::generator::{post_output_path, Generator};
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let generator = Generator::new(blog)?;
    let output = render(&generator, content_type).await?;
    print!("{}", output);
    Ok(())
}

async fn render(generator: &Generator, content_type: &str) -> Result<String> {
    let pages = generator.collect_listing().await?;
    let chunks = pages.len().max(1);
    let posts: Vec<_> = pages.into_iter().flatten().collect();
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            out.push_str(&format!("Posts ({}):\n", posts.len()));
            for post in &posts {
                out.push_str(&format!(
                    "  {} - {} [{}]\n",
                    post.first_publication_date
                        .as_deref()
                        .and_then(|d| d.get(..10))
                        .unwrap_or("unpublished"),
                    post.data.title.as_deref().unwrap_or("(untitled)"),
                    post.uid.as_deref().unwrap_or("-")
                ));
            }
        }
        "route" | "routes" => {
            let mut routes = vec!["index.html".to_string(), "404.html".to_string()];
            routes.extend((1..=chunks).map(|n| format!("api/posts/{}.json", n)));
            routes.extend(
                posts
                    .iter()
                    .filter_map(|p| p.uid.as_deref())
                    .filter_map(post_output_path),
            );
            out.push_str(&format!("Routes ({}):\n", routes.len()));
            for route in routes {
                out.push_str(&format!("  {}\n", route));
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, route", content_type);
        }
    }

    Ok(out)
}
