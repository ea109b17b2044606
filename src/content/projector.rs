//! Projection of raw content API documents into view models
//!
//! This is the only place that reads [`ContentRecord`]. Every field the
//! templates need is copied explicitly; everything else is dropped.

use super::post::{Article, ArticleBanner, ArticleData, ArticleListItem, ArticleSection, ListItemData};
use crate::source::ContentRecord;

/// Project a document into an article page view model
pub fn project_article(record: &ContentRecord) -> Article {
    let data = &record.data;
    Article {
        uid: record.uid.clone(),
        first_publication_date: record.first_publication_date.clone(),
        last_publication_date: record.last_publication_date.clone(),
        data: ArticleData {
            title: data.title.clone(),
            subtitle: data.subtitle.clone(),
            author: data.author.clone(),
            banner: data.banner.as_ref().map(|b| ArticleBanner { url: b.url.clone() }),
            content: data.content.as_ref().map(|sections| {
                sections
                    .iter()
                    .map(|s| ArticleSection {
                        heading: s.heading.clone(),
                        body: s.body.clone(),
                    })
                    .collect()
            }),
        },
    }
}

/// Project a document into a listing entry (no body, no last publication date)
pub fn project_list_item(record: &ContentRecord) -> ArticleListItem {
    let data = &record.data;
    ArticleListItem {
        uid: record.uid.clone(),
        first_publication_date: record.first_publication_date.clone(),
        data: ListItemData {
            title: data.title.clone(),
            subtitle: data.subtitle.clone(),
            author: data.author.clone(),
        },
    }
}
