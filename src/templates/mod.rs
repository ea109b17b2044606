//! Built-in spacetraveling templates using Tera template engine
//!
//! All templates are embedded directly in the binary. Template helpers
//! (`format_date`, `url_for`, `post_url`) are bound to the site's
//! configuration, language and timezone when the renderer is created.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::content::{Article, Neighbors, PaginationState, ReadingTime};
use crate::helpers::Helpers;

/// URL of the server route that leaves preview mode
pub const EXIT_PREVIEW_URL: &str = "/api/exit-preview";

/// Template renderer with the embedded templates
pub struct TemplateRenderer {
    tera: Tera,
    helpers: Helpers,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(helpers: Helpers) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("404.html", include_str!("spacetraveling/404.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("spacetraveling/partials/post_info.html"),
            ),
            (
                "partials/preview_button.html",
                include_str!("spacetraveling/partials/preview_button.html"),
            ),
        ])?;

        let h = helpers.clone();
        tera.register_filter(
            "format_date",
            move |value: &tera::Value, args: &HashMap<String, tera::Value>| {
                date_filter(&h, value, args)
            },
        );

        let h = helpers.clone();
        tera.register_function("url_for", move |args: &HashMap<String, tera::Value>| {
            let path = required_str("url_for", "path", args)?;
            Ok(tera::Value::String(h.url_for(&path)))
        });

        let h = helpers.clone();
        tera.register_function("post_url", move |args: &HashMap<String, tera::Value>| {
            let uid = required_str("post_url", "uid", args)?;
            Ok(tera::Value::String(h.post_url(&uid)))
        });

        Ok(Self { tera, helpers })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Render the listing page
    pub fn render_index(&self, listing: &PaginationState, preview: bool) -> Result<String> {
        let mut context = self.base_context(preview);
        context.insert("listing", listing);
        context.insert("load_more", &self.load_more_settings());
        self.render("index.html", &context)
    }

    /// Render an article page
    pub fn render_post(&self, page: &PostPage<'_>, preview: bool) -> Result<String> {
        let mut context = self.base_context(preview);
        let sections: Vec<SectionData> = page
            .article
            .sections()
            .iter()
            .map(|s| SectionData {
                heading: s.heading.clone(),
                html: s.body_html(),
            })
            .collect();

        context.insert("article", page.article);
        context.insert("sections", &sections);
        context.insert("reading_time", &page.reading_time.to_string());
        context.insert("neighbors", page.neighbors);
        context.insert("edited", &self.edited_note(page.article));
        context.insert("comments", &self.helpers.comments());
        self.render("post.html", &context)
    }

    /// Render the not-found page
    pub fn render_not_found(&self, preview: bool) -> Result<String> {
        self.render("404.html", &self.base_context(preview))
    }

    fn base_context(&self, preview: bool) -> Context {
        let config = self.helpers.config();
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: config.title.clone(),
                description: config.description.clone(),
                language: config.language.clone(),
                url: config.url.clone(),
                root: config.root.clone(),
                date_format: config.date_format.clone(),
                post_date_format: config.post_date_format.clone(),
            },
        );
        context.insert("t", &self.helpers.i18n().get_all_translations());
        context.insert("preview", &preview);
        context.insert("exit_preview_url", EXIT_PREVIEW_URL);
        context
    }

    fn load_more_settings(&self) -> LoadMoreSettings {
        let config = self.helpers.config();
        let i18n = self.helpers.i18n();
        LoadMoreSettings {
            post_root: self.helpers.url_for("post/"),
            date_format: config.date_format.clone(),
            timezone: config.tz().name().to_string(),
            months: (1..=12).map(|m| i18n.month_short(m)).collect(),
            months_long: (1..=12).map(|m| i18n.month_long(m)).collect(),
            loading: i18n.get("loading"),
            load_more: i18n.get("load_more"),
        }
    }

    /// "* editado em ..." when the article changed after it was published
    fn edited_note(&self, article: &Article) -> Option<String> {
        let first = article.first_publication_date.as_deref()?;
        let last = article.last_publication_date.as_deref()?;
        if first == last {
            return None;
        }
        let formatted = self
            .helpers
            .date(last, Some(&self.helpers.config().edited_format));
        Some(self.helpers.i18n().get("edited_at").replace("%s", &formatted))
    }
}

/// Everything an article page is rendered from
pub struct PostPage<'a> {
    pub article: &'a Article,
    pub reading_time: ReadingTime,
    pub neighbors: &'a Neighbors,
}

/// Tera filter: format a content timestamp
fn date_filter(
    helpers: &Helpers,
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    if value.is_null() {
        return Ok(tera::Value::String(String::new()));
    }
    let s = tera::try_get_value!("format_date", "value", String, value);
    let format = match args.get("format") {
        Some(val) => Some(tera::try_get_value!("format_date", "format", String, val)),
        None => None,
    };
    Ok(tera::Value::String(helpers.date(&s, format.as_deref())))
}

fn required_str(
    function: &str,
    arg: &str,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<String> {
    match args.get(arg).and_then(|v| v.as_str()) {
        Some(s) => Ok(s.to_string()),
        None => Err(tera::Error::msg(format!(
            "Function `{}` requires a string argument `{}`",
            function, arg
        ))),
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub date_format: String,
    pub post_date_format: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: Option<String>,
    pub html: String,
}

/// Settings read by the load-more script
#[derive(Debug, Clone, Serialize)]
pub struct LoadMoreSettings {
    pub post_root: String,
    pub date_format: String,
    pub timezone: String,
    pub months: Vec<String>,
    pub months_long: Vec<String>,
    pub loading: String,
    pub load_more: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommentsConfig, SiteConfig};
    use crate::content::richtext::{RichTextNode, TextBlock};
    use crate::content::{ArticleData, ArticleListItem, ArticleSection, ListItemData};
    use crate::content::NeighborReference;
    use crate::i18n::I18n;

    fn renderer(config: SiteConfig) -> TemplateRenderer {
        let i18n = I18n::new(&config.language);
        TemplateRenderer::new(Helpers::new(config, i18n)).unwrap()
    }

    fn article() -> Article {
        Article {
            uid: Some("como-utilizar-hooks".into()),
            first_publication_date: Some("2021-03-15T19:25:28+0000".into()),
            last_publication_date: Some("2021-03-19T18:49:00+0000".into()),
            data: ArticleData {
                title: Some("Como utilizar <Hooks>".into()),
                subtitle: Some("Pensando em sincronização".into()),
                author: Some("Joseph Oliveira".into()),
                banner: None,
                content: Some(vec![ArticleSection {
                    heading: Some("Proin et varius".into()),
                    body: vec![RichTextNode::Paragraph(TextBlock::new("Nullam dolor sapien"))],
                }]),
            },
        }
    }

    fn list_item(uid: &str) -> ArticleListItem {
        ArticleListItem {
            uid: Some(uid.into()),
            first_publication_date: Some("2021-03-25T19:25:28+0000".into()),
            data: ListItemData {
                title: Some(format!("Title {}", uid)),
                subtitle: None,
                author: Some("Danilo Vieira".into()),
            },
        }
    }

    #[test]
    fn test_render_index_with_more() {
        let r = renderer(SiteConfig::default());
        let listing = PaginationState {
            results: vec![list_item("a")],
            next_page: Some("/api/posts/2.json".into()),
        };
        let html = r.render_index(&listing, false).unwrap();
        assert!(html.contains(r#"href="/post/a/""#));
        assert!(html.contains("Title a"));
        assert!(html.contains("25 mar 2021"));
        assert!(html.contains(r#"data-next="/api/posts/2.json""#));
        assert!(html.contains("Carregar mais posts"));
        assert!(!html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_render_index_last_page_has_no_button() {
        let r = renderer(SiteConfig::default());
        let listing = PaginationState {
            results: vec![list_item("a")],
            next_page: None,
        };
        let html = r.render_index(&listing, true).unwrap();
        assert!(!html.contains("load-more"));
        assert!(html.contains("Sair do modo Preview"));
        assert!(html.contains(r#"href="/api/exit-preview""#));
    }

    #[test]
    fn test_render_post() {
        let r = renderer(SiteConfig::default());
        let article = article();
        let neighbors = Neighbors {
            previous: Some(NeighborReference {
                uid: "older".into(),
                title: Some("Older post".into()),
            }),
            next: None,
        };
        let page = PostPage {
            article: &article,
            reading_time: article.reading_time(),
            neighbors: &neighbors,
        };
        let html = r.render_post(&page, false).unwrap();

        assert!(html.contains("Como utilizar &lt;Hooks&gt;"));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains("1 min"));
        assert!(html.contains("<p>Nullam dolor sapien</p>"));
        assert!(html.contains("* editado em 19 mar 2021, às 15:49"));
        assert!(html.contains(r#"href="/post/older/""#));
        assert!(html.contains("Post anterior"));
        assert!(!html.contains("Próximo post"));
        assert!(!html.contains("utteranc.es"));
    }

    #[test]
    fn test_render_post_with_comments() {
        let config = SiteConfig {
            comments: CommentsConfig {
                repo: "me/comments".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let r = renderer(config);
        let mut article = article();
        article.last_publication_date = article.first_publication_date.clone();
        let neighbors = Neighbors::default();
        let page = PostPage {
            article: &article,
            reading_time: article.reading_time(),
            neighbors: &neighbors,
        };
        let html = r.render_post(&page, false).unwrap();
        assert!(html.contains(r#"<div id="comments"><script src="https://utteranc.es/client.js""#));
        assert!(!html.contains("editado em"));
        assert!(!html.contains("class=\"neighbors\""));
    }

    #[test]
    fn test_render_not_found() {
        let html = renderer(SiteConfig::default()).render_not_found(false).unwrap();
        assert!(html.contains("Post não encontrado"));
        assert!(html.contains("Voltar para a página inicial"));
    }
}
