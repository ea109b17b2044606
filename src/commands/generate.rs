//! Generate static files

use anyhow::Result;
use std::time::Duration;

use crate::generator::{GenerateReport, Generator};
use crate::Blog;

/// Generate the static site (with incremental support)
pub async fn run(blog: &Blog, force: bool) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    if force {
        tracing::info!("Full generation (force=true)");
    }

    let generator = Generator::new(blog)?;
    let report = generator.generate(force).await?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}

/// Regenerate every `interval` until Ctrl+C
///
/// Content lives in the remote API so there are no files to watch; the
/// listing is polled instead and the cache keeps unchanged pages untouched.
pub async fn watch(blog: &Blog, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the site was just generated
    ticker.tick().await;

    tracing::info!(
        "Polling for content changes every {}s. Press Ctrl+C to stop.",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tracing::info!("Checking for content changes...");
                match run(blog, false).await {
                    Ok(report) if report.rendered > 0 || report.deleted > 0 => {
                        tracing::info!("Updated {} posts, removed {}", report.rendered, report.deleted);
                    }
                    Ok(_) => tracing::debug!("No post changes"),
                    Err(e) => tracing::error!("Generation failed: {:#}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watch");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FIXTURE: &str = r#"[
      {
        "id": "YE1",
        "uid": "hello-world",
        "type": "posts",
        "first_publication_date": "2021-03-25T19:25:28+0000",
        "last_publication_date": "2021-03-25T19:25:28+0000",
        "data": {
          "title": "Hello World",
          "subtitle": "First post",
          "author": "Danilo Vieira",
          "content": [
            {"heading": "Intro", "body": [{"type": "paragraph", "text": "Welcome", "spans": []}]}
          ]
        }
      }
    ]"#;

    #[tokio::test]
    async fn test_run_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            "source:\n  kind: fixture\n  fixture: posts.json\n",
        )
        .unwrap();
        fs::write(dir.path().join("posts.json"), FIXTURE).unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        let report = run(&blog, false).await.unwrap();
        assert_eq!(report.posts, 1);
        assert!(blog.public_dir.join("post/hello-world/index.html").exists());

        let again = run(&blog, false).await.unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(again.rendered, 0);
    }

    #[tokio::test]
    async fn test_run_fails_without_fixture() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("_config.yml"),
            "source:\n  kind: fixture\n  fixture: missing.json\n",
        )
        .unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        assert!(run(&blog, false).await.is_err());
    }
}
