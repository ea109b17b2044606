//! Generator module - fetches, projects and renders the blog into `public_dir`

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::assets::StaticAssets;
use crate::cache::{self, CacheDb, PostState};
use crate::content::{
    project_article, Article, ArticleListItem, LoadOutcome, NeighborResolver, Neighbors,
    PaginationState, Paginator,
};
use crate::helpers::{listing_chunk_url, Helpers};
use crate::i18n::I18n;
use crate::source::{self, ContentSource, Ordering, Predicate, Query, FIRST_PUBLICATION};
use crate::templates::{PostPage, TemplateRenderer};
use crate::Blog;

/// What a generation run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Listed articles with a page
    pub posts: usize,
    /// Article pages written this run
    pub rendered: usize,
    /// Article pages left untouched by the cache
    pub skipped: usize,
    /// Article pages removed
    pub deleted: usize,
    /// Listing chunks written
    pub chunks: usize,
    /// Static files copied
    pub assets: usize,
}

/// An article with everything its page needs
#[derive(Debug, Clone)]
pub struct LoadedArticle {
    pub article: Article,
    pub neighbors: Neighbors,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a generator using the configured content source
    pub fn new(blog: &Blog) -> Result<Self> {
        let source = source::from_config(&blog.config.source, &blog.base_dir)?;
        Self::with_source(blog, source)
    }

    /// Create a generator reading from `source`
    pub fn with_source(blog: &Blog, source: Arc<dyn ContentSource>) -> Result<Self> {
        let mut i18n = I18n::new(&blog.config.language);
        i18n.load_languages(blog.base_dir.join(&blog.config.languages_dir))?;
        let renderer = TemplateRenderer::new(Helpers::new(blog.config.clone(), i18n))?;

        Ok(Self {
            blog: blog.clone(),
            source,
            renderer,
        })
    }

    pub fn blog(&self) -> &Blog {
        &self.blog
    }

    pub fn source(&self) -> Arc<dyn ContentSource> {
        self.source.clone()
    }

    fn doc_type(&self) -> &str {
        &self.blog.config.source.document_type
    }

    /// The listing query: newest first, only the fields a list entry shows
    pub fn listing_query(&self, reference: Option<&str>) -> Query {
        let doc_type = self.doc_type();
        Query::new(vec![Predicate::document_type(doc_type)])
            .fetch(
                ["title", "subtitle", "author"]
                    .iter()
                    .map(|field| format!("{}.{}", doc_type, field)),
            )
            .page_size(self.blog.config.source.page_size)
            .order_by(Ordering::desc(FIRST_PUBLICATION))
            .order_by(Ordering::desc("document.id"))
            .reference(reference)
    }

    /// First listing page, its cursor rewritten to the local chunk files
    pub async fn first_page(&self, reference: Option<&str>) -> Result<PaginationState> {
        let response = self
            .source
            .query(&self.listing_query(reference))
            .await
            .context("Failed to fetch the post listing")?;
        let mut state = PaginationState::from_response(&response);
        if state.has_more() {
            state.next_page = Some(listing_chunk_url(&self.blog.config, 2));
        }
        Ok(state)
    }

    /// Walk the whole published listing, one entry list per page
    pub async fn collect_listing(&self) -> Result<Vec<Vec<ArticleListItem>>> {
        let response = self
            .source
            .query(&self.listing_query(None))
            .await
            .context("Failed to fetch the post listing")?;

        let mut sizes = vec![response.results.len()];
        let paginator = Paginator::new(self.source.clone(), PaginationState::from_response(&response));

        loop {
            match paginator.load_more().await {
                LoadOutcome::Appended(0) => {
                    tracing::warn!("Listing page was empty, stopping pagination");
                    break;
                }
                LoadOutcome::Appended(added) => sizes.push(added),
                LoadOutcome::Exhausted => break,
                LoadOutcome::Busy => bail!("Listing is already being loaded"),
                LoadOutcome::Failed(e) => {
                    return Err(e).context("Failed to fetch the next listing page");
                }
            }
        }

        let mut results = paginator.into_state().results.into_iter();
        Ok(sizes
            .into_iter()
            .map(|size| results.by_ref().take(size).collect())
            .collect())
    }

    /// Fetch one article and its neighbors, `None` when it does not exist
    pub async fn load_article(
        &self,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Option<LoadedArticle>> {
        let doc_type = self.doc_type();
        let record = self
            .source
            .get_by_uid(doc_type, uid, reference)
            .await
            .with_context(|| format!("Failed to fetch post {:?}", uid))?;
        let Some(record) = record else {
            return Ok(None);
        };

        let article = project_article(&record);
        let neighbors = NeighborResolver::new(&*self.source, doc_type)
            .with_reference(reference)
            .resolve(article.first_publication_date.as_deref())
            .await
            .with_context(|| format!("Failed to resolve neighbors of {:?}", uid))?;

        Ok(Some(LoadedArticle { article, neighbors }))
    }

    /// Render one article page, `None` when it does not exist
    pub async fn render_post(&self, uid: &str, reference: Option<&str>) -> Result<Option<String>> {
        match self.load_article(uid, reference).await? {
            Some(loaded) => Ok(Some(self.render_loaded(&loaded, reference.is_some())?)),
            None => Ok(None),
        }
    }

    /// Render the first listing page
    pub async fn render_index(&self, reference: Option<&str>) -> Result<String> {
        let state = self.first_page(reference).await?;
        self.renderer.render_index(&state, reference.is_some())
    }

    pub fn render_not_found(&self, preview: bool) -> Result<String> {
        self.renderer.render_not_found(preview)
    }

    fn render_loaded(&self, loaded: &LoadedArticle, preview: bool) -> Result<String> {
        let page = PostPage {
            article: &loaded.article,
            reading_time: loaded.article.reading_time(),
            neighbors: &loaded.neighbors,
        };
        self.renderer.render_post(&page, preview)
    }

    /// Generate the entire site
    pub async fn generate(&self, force: bool) -> Result<GenerateReport> {
        let public_dir = &self.blog.public_dir;
        let base_dir = &self.blog.base_dir;
        fs::create_dir_all(public_dir)
            .with_context(|| format!("Failed to create {:?}", public_dir))?;

        let mut report = GenerateReport {
            assets: StaticAssets::new(&self.blog.static_dir).copy_to(public_dir)?,
            ..Default::default()
        };

        let pages = self.collect_listing().await?;
        report.chunks = self.write_listing(&pages)?;
        write_file(
            &public_dir.join("404.html"),
            &self.renderer.render_not_found(false)?,
        )?;

        // Articles, in listing order
        let mut seen = HashSet::new();
        let mut loaded = Vec::new();
        for item in pages.iter().flatten() {
            let Some(uid) = item.uid.as_deref() else {
                tracing::warn!("Skipping listed document without uid");
                continue;
            };
            if !seen.insert(uid.to_string()) {
                continue;
            }
            let Some(output_path) = post_output_path(uid) else {
                tracing::warn!("Skipping post with unusable uid {:?}", uid);
                continue;
            };
            match self.load_article(uid, None).await? {
                Some(article) => {
                    let state = PostState {
                        uid: uid.to_string(),
                        content_hash: cache::hash_value(&(&article.article, &article.neighbors))?,
                        last_publication_date: article.article.last_publication_date.clone(),
                        output_path,
                    };
                    loaded.push((state, article));
                }
                None => tracing::warn!("Listed post {:?} not found, skipping", uid),
            }
        }

        let mut db = if force {
            CacheDb::new()
        } else {
            CacheDb::load(base_dir)
        };
        let states: Vec<PostState> = loaded.iter().map(|(s, _)| s.clone()).collect();
        let changes = cache::detect_changes(&db, base_dir, public_dir, &states)?;
        tracing::info!("Posts: {}", changes.summary());

        for (state, article) in &loaded {
            if !changes.needs_render(&state.uid) {
                report.skipped += 1;
                continue;
            }
            let html = self.render_loaded(article, false)?;
            write_file(&public_dir.join(&state.output_path), &html)?;
            tracing::debug!("Generated: {}", state.output_path);
            report.rendered += 1;
        }

        for uid in &changes.deleted_posts {
            if let Some(path) = post_output_path(uid) {
                let dir = public_dir.join(path);
                if let Some(dir) = dir.parent().filter(|d| d.exists()) {
                    fs::remove_dir_all(dir)
                        .with_context(|| format!("Failed to remove {:?}", dir))?;
                    tracing::debug!("Removed: {:?}", dir);
                }
            }
            report.deleted += 1;
        }

        cache::update_cache(&mut db, base_dir, &states)?;
        db.save(base_dir)?;

        report.posts = loaded.len();
        tracing::info!(
            "Generated {} posts ({} rendered, {} unchanged) and {} listing pages",
            report.posts,
            report.rendered,
            report.skipped,
            report.chunks
        );
        Ok(report)
    }

    /// Write `index.html` and the `api/posts/<n>.json` chunks
    fn write_listing(&self, pages: &[Vec<ArticleListItem>]) -> Result<usize> {
        let public_dir = &self.blog.public_dir;
        let chunks: Vec<PaginationState> = pages
            .iter()
            .enumerate()
            .map(|(i, results)| PaginationState {
                results: results.clone(),
                next_page: (i + 1 < pages.len())
                    .then(|| listing_chunk_url(&self.blog.config, i + 2)),
            })
            .collect();

        let first = chunks.first().cloned().unwrap_or_default();
        write_file(
            &public_dir.join("index.html"),
            &self.renderer.render_index(&first, false)?,
        )?;

        let chunk_dir = public_dir.join("api").join("posts");
        if chunk_dir.exists() {
            fs::remove_dir_all(&chunk_dir)?;
        }
        for (i, chunk) in chunks.iter().enumerate() {
            let path = chunk_dir.join(format!("{}.json", i + 1));
            write_file(&path, &serde_json::to_string(chunk)?)?;
        }

        Ok(chunks.len())
    }
}

/// Output path of an article page relative to `public_dir`
///
/// `None` for uids that cannot be used as a single directory name.
pub fn post_output_path(uid: &str) -> Option<String> {
    let usable = !uid.is_empty()
        && uid != "."
        && uid != ".."
        && !uid.contains(['/', '\\'])
        && !uid.chars().any(char::is_control);
    usable.then(|| format!("post/{}/index.html", uid))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::richtext::{RichTextNode, TextBlock};
    use crate::source::{ContentRecord, FixtureSource, PostFields, Section};

    fn post(uid: &str, date: &str) -> ContentRecord {
        ContentRecord {
            id: format!("id-{}", uid),
            uid: Some(uid.to_string()),
            doc_type: "posts".to_string(),
            first_publication_date: Some(date.to_string()),
            last_publication_date: Some(date.to_string()),
            data: PostFields {
                title: Some(format!("Title {}", uid)),
                subtitle: Some(format!("Subtitle {}", uid)),
                author: Some("Danilo Vieira".to_string()),
                banner: None,
                content: Some(vec![Section {
                    heading: Some("Heading".to_string()),
                    body: vec![RichTextNode::Paragraph(TextBlock::new(format!(
                        "Body of {}",
                        uid
                    )))],
                }]),
            },
        }
    }

    fn posts() -> Vec<ContentRecord> {
        vec![
            post("first", "2021-01-01T12:00:00+0000"),
            post("second", "2021-02-01T12:00:00+0000"),
            post("third", "2021-03-01T12:00:00+0000"),
        ]
    }

    fn generator(dir: &Path, records: Vec<ContentRecord>) -> Generator {
        generator_with(dir, FixtureSource::new(records))
    }

    fn generator_with(dir: &Path, source: FixtureSource) -> Generator {
        let blog = Blog::with_config(dir, SiteConfig::default());
        Generator::with_source(&blog, Arc::new(source)).unwrap()
    }

    fn read(dir: &Path, path: &str) -> String {
        fs::read_to_string(dir.join("public").join(path)).unwrap()
    }

    #[tokio::test]
    async fn test_collect_listing_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pages = generator(dir.path(), posts()).collect_listing().await.unwrap();
        let uids: Vec<Vec<&str>> = pages
            .iter()
            .map(|p| p.iter().filter_map(|i| i.uid.as_deref()).collect())
            .collect();
        assert_eq!(uids, vec![vec!["third"], vec!["second"], vec!["first"]]);
    }

    #[tokio::test]
    async fn test_generate_writes_site() {
        let dir = tempfile::tempdir().unwrap();
        let report = generator(dir.path(), posts()).generate(false).await.unwrap();

        assert_eq!(report.posts, 3);
        assert_eq!(report.rendered, 3);
        assert_eq!(report.chunks, 3);

        let index = read(dir.path(), "index.html");
        assert!(index.contains("Title third"));
        assert!(!index.contains("Title second"));
        assert!(index.contains(r#"data-next="/api/posts/2.json""#));

        let chunk: PaginationState =
            serde_json::from_str(&read(dir.path(), "api/posts/2.json")).unwrap();
        assert_eq!(chunk.results[0].uid.as_deref(), Some("second"));
        assert_eq!(chunk.next_page.as_deref(), Some("/api/posts/3.json"));
        let last: PaginationState =
            serde_json::from_str(&read(dir.path(), "api/posts/3.json")).unwrap();
        assert_eq!(last.next_page, None);

        let second = read(dir.path(), "post/second/index.html");
        assert!(second.contains("Body of second"));
        assert!(second.contains(r#"href="/post/first/""#));
        assert!(second.contains(r#"href="/post/third/""#));

        assert!(read(dir.path(), "404.html").contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_generate_is_incremental() {
        let dir = tempfile::tempdir().unwrap();
        generator(dir.path(), posts()).generate(false).await.unwrap();

        let report = generator(dir.path(), posts()).generate(false).await.unwrap();
        assert_eq!(report.rendered, 0);
        assert_eq!(report.skipped, 3);

        let forced = generator(dir.path(), posts()).generate(true).await.unwrap();
        assert_eq!(forced.rendered, 3);
    }

    #[tokio::test]
    async fn test_edit_rerenders_article_and_neighbors() {
        let dir = tempfile::tempdir().unwrap();
        generator(dir.path(), posts()).generate(false).await.unwrap();

        let mut edited = posts();
        edited[1].data.title = Some("Renamed".to_string());
        let report = generator(dir.path(), edited).generate(false).await.unwrap();

        // second changed; first and third link to it
        assert_eq!(report.rendered, 3);
        assert!(read(dir.path(), "post/first/index.html").contains("Renamed"));
    }

    #[tokio::test]
    async fn test_removed_article_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        generator(dir.path(), posts()).generate(false).await.unwrap();

        let remaining = posts().into_iter().filter(|p| p.id != "id-first").collect();
        let report = generator(dir.path(), remaining).generate(false).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert!(!dir.path().join("public/post/first").exists());
        assert!(!dir.path().join("public/api/posts/3.json").exists());
    }

    #[tokio::test]
    async fn test_render_post_not_found_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let mut draft = post("second", "2021-02-01T12:00:00+0000");
        draft.data.title = Some("Draft title".to_string());
        let source = FixtureSource::new(posts()).with_preview("preview-ref", vec![draft]);
        let generator = generator_with(dir.path(), source);

        assert!(generator.render_post("missing", None).await.unwrap().is_none());

        let published = generator.render_post("second", None).await.unwrap().unwrap();
        assert!(published.contains("Title second"));
        assert!(!published.contains("Sair do modo Preview"));

        let preview = generator
            .render_post("second", Some("preview-ref"))
            .await
            .unwrap()
            .unwrap();
        assert!(preview.contains("Draft title"));
        assert!(preview.contains("Sair do modo Preview"));
    }

    #[tokio::test]
    async fn test_render_index_preview() {
        let dir = tempfile::tempdir().unwrap();
        let html = generator(dir.path(), posts())
            .render_index(Some("any-ref"))
            .await
            .unwrap();
        assert!(html.contains("Title third"));
        assert!(html.contains("Sair do modo Preview"));
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let dir = tempfile::tempdir().unwrap();
        let report = generator(dir.path(), Vec::new()).generate(false).await.unwrap();
        assert_eq!(report.posts, 0);
        assert_eq!(report.chunks, 1);
        assert!(!read(dir.path(), "index.html").contains("load-more"));
    }

    #[test]
    fn test_post_output_path() {
        assert_eq!(
            post_output_path("como-usar-hooks").as_deref(),
            Some("post/como-usar-hooks/index.html")
        );
        assert_eq!(post_output_path("../etc"), None);
        assert_eq!(post_output_path(".."), None);
        assert_eq!(post_output_path(""), None);
    }
}
