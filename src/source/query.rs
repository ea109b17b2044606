//! Query building for the content API

use serde::{Deserialize, Serialize};
use std::fmt;

/// A document filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// `at(field, value)`: exact match
    At(String, String),
    /// `date.after(field, value)`: strictly later than value
    DateAfter(String, String),
    /// `date.before(field, value)`: strictly earlier than value
    DateBefore(String, String),
}

impl Predicate {
    pub fn document_type(doc_type: &str) -> Self {
        Predicate::At("document.type".to_string(), doc_type.to_string())
    }

    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Predicate::At(format!("my.{}.uid", doc_type), uid.to_string())
    }

    pub fn id(id: &str) -> Self {
        Predicate::At("document.id".to_string(), id.to_string())
    }

    pub fn published_after(timestamp: &str) -> Self {
        Predicate::DateAfter(FIRST_PUBLICATION.to_string(), timestamp.to_string())
    }

    pub fn published_before(timestamp: &str) -> Self {
        Predicate::DateBefore(FIRST_PUBLICATION.to_string(), timestamp.to_string())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, field, value) = match self {
            Predicate::At(field, value) => ("at", field, value),
            Predicate::DateAfter(field, value) => ("date.after", field, value),
            Predicate::DateBefore(field, value) => ("date.before", field, value),
        };
        write!(f, "[{}({},{})]", name, field, quote(value))
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub const FIRST_PUBLICATION: &str = "document.first_publication_date";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// A search request against the content API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    /// Restrict returned `data` fields, e.g. `posts.title`
    pub fetch: Vec<String>,
    pub page_size: usize,
    pub page: usize,
    pub orderings: Vec<Ordering>,
    /// Revision reference; `None` means the published (master) revision
    pub reference: Option<String>,
}

impl Query {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self {
            predicates,
            fetch: Vec::new(),
            page_size: 20,
            page: 1,
            orderings: Vec::new(),
            reference: None,
        }
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn reference(mut self, reference: Option<&str>) -> Self {
        self.reference = reference.map(str::to_string);
        self
    }

    /// Render the `q` parameter
    pub fn q(&self) -> String {
        let inner: String = self.predicates.iter().map(ToString::to_string).collect();
        format!("[{}]", inner)
    }

    /// Render the `orderings` parameter, if any
    pub fn orderings_param(&self) -> Option<String> {
        if self.orderings.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .orderings
            .iter()
            .map(|o| {
                if o.descending {
                    format!("{} desc", o.field)
                } else {
                    o.field.clone()
                }
            })
            .collect();
        Some(format!("[{}]", parts.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_syntax() {
        assert_eq!(
            Predicate::document_type("posts").to_string(),
            r#"[at(document.type,"posts")]"#
        );
        assert_eq!(
            Predicate::published_after("2021-03-25T19:25:28+0000").to_string(),
            r#"[date.after(document.first_publication_date,"2021-03-25T19:25:28+0000")]"#
        );
        assert_eq!(
            Predicate::uid("posts", "a\"b").to_string(),
            r#"[at(my.posts.uid,"a\"b")]"#
        );
    }

    #[test]
    fn test_query_params() {
        let query = Query::new(vec![
            Predicate::document_type("posts"),
            Predicate::published_before("2021-01-01"),
        ])
        .order_by(Ordering::desc(FIRST_PUBLICATION))
        .order_by(Ordering::desc("document.id"))
        .page_size(0);

        assert_eq!(
            query.q(),
            r#"[[at(document.type,"posts")][date.before(document.first_publication_date,"2021-01-01")]]"#
        );
        assert_eq!(
            query.orderings_param().as_deref(),
            Some("[document.first_publication_date desc,document.id desc]")
        );
        assert_eq!(query.page_size, 1);
        assert_eq!(Query::new(vec![]).orderings_param(), None);
    }
}
