//! View models handed to the templates

use serde::{Deserialize, Serialize};

use super::reading_time::ReadingTime;
use super::richtext::{self, RichText};

/// An article page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub data: ArticleData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub banner: Option<ArticleBanner>,
    pub content: Option<Vec<ArticleSection>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleBanner {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSection {
    pub heading: Option<String>,
    pub body: RichText,
}

impl Article {
    /// Sections of the body, empty when the document has none
    pub fn sections(&self) -> &[ArticleSection] {
        self.data.content.as_deref().unwrap_or(&[])
    }

    pub fn reading_time(&self) -> ReadingTime {
        ReadingTime::estimate(self.sections())
    }
}

impl ArticleSection {
    pub fn body_html(&self) -> String {
        richtext::as_html(&self.body)
    }

    pub fn body_text(&self) -> String {
        richtext::as_text(&self.body)
    }
}

/// An entry of the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleListItem {
    pub uid: Option<String>,
    pub first_publication_date: Option<String>,
    pub data: ListItemData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItemData {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
}

/// A link to a chronologically adjacent article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborReference {
    pub uid: String,
    pub title: Option<String>,
}

/// Previous (earlier) and next (later) articles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighbors {
    pub previous: Option<NeighborReference>,
    pub next: Option<NeighborReference>,
}
