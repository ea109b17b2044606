//! Wire schema of content API documents

use serde::{Deserialize, Serialize};

use crate::content::richtext::RichText;

/// A document as returned by the content API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    #[serde(default)]
    pub data: PostFields,
}

/// The `data` bag of a `posts` document
///
/// Every field is optional: list queries restrict the returned fields, and
/// drafts may be incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Section>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// A section of an article: a heading followed by a rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub heading: Option<String>,

    #[serde(default)]
    pub body: RichText,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default)]
    pub total_pages: usize,

    #[serde(default)]
    pub results: Vec<ContentRecord>,

    #[serde(default)]
    pub next_page: Option<String>,
}

fn default_page() -> usize {
    1
}

/// Response of the API root endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    #[serde(rename = "ref")]
    pub reference: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "isMasterRef", default)]
    pub is_master: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master)
            .map(|r| r.reference.as_str())
    }
}
