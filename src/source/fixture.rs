//! In-memory content source backed by a JSON dump

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::document::{ContentRecord, QueryResponse};
use super::error::{Result, SourceError};
use super::query::{Predicate, Query, FIRST_PUBLICATION};
use super::ContentSource;
use crate::helpers::parse_timestamp;

const CURSOR_PREFIX: &str = "fixture://cursor/";

/// Serves documents from memory, evaluating the same predicates, orderings
/// and paging as the hosted API.
///
/// Draft revisions live under `previews`, keyed by revision ref. A query with
/// that ref sees the published documents with drafts overlaid by id.
///
/// Cursors carry the encoded follow-up query, so the source keeps no state
/// between pages.
pub struct FixtureSource {
    published: Vec<ContentRecord>,
    previews: HashMap<String, Vec<ContentRecord>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Records(Vec<ContentRecord>),
    Full {
        results: Vec<ContentRecord>,
        #[serde(default)]
        previews: HashMap<String, Vec<ContentRecord>>,
    },
}

impl FixtureSource {
    pub fn new(published: Vec<ContentRecord>) -> Self {
        Self {
            published,
            previews: HashMap::new(),
        }
    }

    /// Add a draft revision visible under `reference`
    pub fn with_preview(mut self, reference: &str, drafts: Vec<ContentRecord>) -> Self {
        self.previews.insert(reference.to_string(), drafts);
        self
    }

    /// Load a fixture file: either an array of documents or
    /// `{"results": [...], "previews": {"<ref>": [...]}}`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let source = match serde_json::from_str::<FixtureFile>(&content)? {
            FixtureFile::Records(records) => Self::new(records),
            FixtureFile::Full { results, previews } => Self {
                previews,
                ..Self::new(results)
            },
        };
        tracing::debug!(
            "Loaded {} fixture documents ({} preview refs)",
            source.published.len(),
            source.previews.len()
        );
        Ok(source)
    }

    fn visible(&self, reference: Option<&str>) -> Vec<ContentRecord> {
        let mut records = self.published.clone();
        if let Some(drafts) = reference.and_then(|r| self.previews.get(r)) {
            for draft in drafts {
                match records.iter_mut().find(|r| r.id == draft.id) {
                    Some(existing) => *existing = draft.clone(),
                    None => records.push(draft.clone()),
                }
            }
        }
        records
    }

    fn run(&self, query: &Query) -> Result<QueryResponse> {
        let mut matching: Vec<ContentRecord> = self
            .visible(query.reference.as_deref())
            .into_iter()
            .filter(|r| query.predicates.iter().all(|p| matches(r, p)))
            .collect();

        // Stable sort by the last key first so earlier keys take precedence
        for ordering in query.orderings.iter().rev() {
            matching.sort_by(|a, b| {
                let ord = compare_field(a, b, &ordering.field);
                if ordering.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let page_size = query.page_size.max(1);
        let page = query.page.max(1);
        let total_pages = matching.len().div_ceil(page_size);
        let results: Vec<ContentRecord> = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .map(|r| restrict_fields(r, &query.fetch))
            .collect();

        let next_page = if page < total_pages {
            Some(encode_cursor(&query.clone().page(page + 1))?)
        } else {
            None
        };

        Ok(QueryResponse {
            page,
            total_pages,
            results,
            next_page,
        })
    }
}

fn encode_cursor(query: &Query) -> Result<String> {
    let json = serde_json::to_string(query)?;
    Ok(format!(
        "{}{}",
        CURSOR_PREFIX,
        utf8_percent_encode(&json, NON_ALPHANUMERIC)
    ))
}

fn decode_cursor(cursor: &str) -> Option<Query> {
    let encoded = cursor.strip_prefix(CURSOR_PREFIX)?;
    let json = percent_decode_str(encoded).decode_utf8().ok()?;
    serde_json::from_str(&json).ok()
}

#[async_trait]
impl ContentSource for FixtureSource {
    async fn query(&self, query: &Query) -> Result<QueryResponse> {
        self.run(query)
    }

    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse> {
        let query =
            decode_cursor(cursor).ok_or_else(|| SourceError::UnknownCursor(cursor.to_string()))?;
        self.run(&query)
    }
}

fn matches(record: &ContentRecord, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::At(field, value) => field_value(record, field).as_deref() == Some(value.as_str()),
        Predicate::DateAfter(field, value) => {
            compare_date(field_value(record, field).as_deref(), value) == Some(CmpOrdering::Greater)
        }
        Predicate::DateBefore(field, value) => {
            compare_date(field_value(record, field).as_deref(), value) == Some(CmpOrdering::Less)
        }
    }
}

fn field_value(record: &ContentRecord, field: &str) -> Option<String> {
    match field {
        "document.id" => Some(record.id.clone()),
        "document.type" => Some(record.doc_type.clone()),
        FIRST_PUBLICATION => record.first_publication_date.clone(),
        "document.last_publication_date" => record.last_publication_date.clone(),
        f if f.starts_with("my.") && f.ends_with(".uid") => record.uid.clone(),
        f if f.starts_with("my.") && f.ends_with(".title") => record.data.title.clone(),
        _ => None,
    }
}

fn compare_date(left: Option<&str>, right: &str) -> Option<CmpOrdering> {
    let left = left?;
    match (parse_timestamp(left), parse_timestamp(right)) {
        (Some(l), Some(r)) => Some(l.cmp(&r)),
        _ => Some(left.cmp(right)),
    }
}

fn compare_field(a: &ContentRecord, b: &ContentRecord, field: &str) -> CmpOrdering {
    let (a, b) = (field_value(a, field), field_value(b, field));
    match (a.as_deref(), b.as_deref()) {
        (Some(x), Some(y)) => compare_date(Some(x), y).unwrap_or(CmpOrdering::Equal),
        (Some(_), None) => CmpOrdering::Greater,
        (None, Some(_)) => CmpOrdering::Less,
        (None, None) => CmpOrdering::Equal,
    }
}

/// Apply a `fetch` restriction such as `posts.title` to the data bag
fn restrict_fields(mut record: ContentRecord, fetch: &[String]) -> ContentRecord {
    if fetch.is_empty() {
        return record;
    }
    let keep = |name: &str| fetch.iter().any(|f| f.rsplit('.').next() == Some(name));
    let data = &mut record.data;
    if !keep("title") {
        data.title = None;
    }
    if !keep("subtitle") {
        data.subtitle = None;
    }
    if !keep("author") {
        data.author = None;
    }
    if !keep("banner") {
        data.banner = None;
    }
    if !keep("content") {
        data.content = None;
    }
    record
}
