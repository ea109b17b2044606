//! Previous/next article lookup

use super::post::{NeighborReference, Neighbors};
use crate::source::{ContentSource, Ordering, Predicate, Query, Result, FIRST_PUBLICATION};

/// Finds the published articles immediately before and after a timestamp
pub struct NeighborResolver<'a> {
    source: &'a dyn ContentSource,
    doc_type: &'a str,
    reference: Option<&'a str>,
}

impl<'a> NeighborResolver<'a> {
    pub fn new(source: &'a dyn ContentSource, doc_type: &'a str) -> Self {
        Self {
            source,
            doc_type,
            reference: None,
        }
    }

    /// Resolve against a preview revision instead of the published one
    pub fn with_reference(mut self, reference: Option<&'a str>) -> Self {
        self.reference = reference;
        self
    }

    /// Resolve the neighbors of an article first published at `timestamp`
    ///
    /// Both lookups run concurrently. An article without a publication date
    /// (an unpublished draft) has no neighbors.
    pub async fn resolve(&self, timestamp: Option<&str>) -> Result<Neighbors> {
        let Some(timestamp) = timestamp else {
            return Ok(Neighbors::default());
        };

        let next = self.query(Predicate::published_after(timestamp), false);
        let previous = self.query(Predicate::published_before(timestamp), true);

        let (next, previous) = tokio::join!(
            self.first(&next),
            self.first(&previous)
        );

        Ok(Neighbors {
            previous: previous?,
            next: next?,
        })
    }

    fn query(&self, bound: Predicate, descending: bool) -> Query {
        let order = |field: &str| {
            if descending {
                Ordering::desc(field)
            } else {
                Ordering::asc(field)
            }
        };

        Query::new(vec![Predicate::document_type(self.doc_type), bound])
            .fetch([format!("{}.title", self.doc_type)])
            .page_size(1)
            .order_by(order(FIRST_PUBLICATION))
            .order_by(order("document.id"))
            .reference(self.reference)
    }

    async fn first(&self, query: &Query) -> Result<Option<NeighborReference>> {
        let response = self.source.query(query).await?;
        Ok(response.results.into_iter().next().and_then(|record| {
            record.uid.map(|uid| NeighborReference {
                uid,
                title: record.data.title,
            })
        }))
    }
}
