//! Content source - the headless content API this blog is built from
//!
//! [`ContentSource`] is the seam between the generator and wherever documents
//! live. [`PrismicClient`] talks to the hosted REST API; [`FixtureSource`]
//! serves documents from a local JSON dump for offline builds.

mod document;
mod error;
mod fixture;
mod prismic;
mod query;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use document::{ApiInfo, ApiRef, Banner, ContentRecord, PostFields, QueryResponse, Section};
pub use error::{Result, SourceError};
pub use fixture::FixtureSource;
pub use prismic::PrismicClient;
pub use query::{Ordering, Predicate, Query, FIRST_PUBLICATION};

use crate::config::{SourceConfig, SourceKind};

/// Read access to published and draft documents
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a search query
    async fn query(&self, query: &Query) -> Result<QueryResponse>;

    /// Follow a `next_page` cursor from a previous response
    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse>;

    /// Fetch a single document by its uid, `None` if it does not exist
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Option<ContentRecord>> {
        let query = Query::new(vec![
            Predicate::document_type(doc_type),
            Predicate::uid(doc_type, uid),
        ])
        .page_size(1)
        .reference(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }

    /// Fetch a single document by its id, `None` if it does not exist
    async fn get_by_id(&self, id: &str, reference: Option<&str>) -> Result<Option<ContentRecord>> {
        let query = Query::new(vec![Predicate::id(id)])
            .page_size(1)
            .reference(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }
}

/// Build the configured content source
pub fn from_config(config: &SourceConfig, base_dir: &Path) -> AnyResult<Arc<dyn ContentSource>> {
    match config.kind {
        SourceKind::Prismic => {
            let client = PrismicClient::new(&config.endpoint, config.access_token.clone())
                .with_context(|| format!("Invalid content API endpoint: {}", config.endpoint))?;
            tracing::debug!("Using content API at {}", config.endpoint);
            Ok(Arc::new(client))
        }
        SourceKind::Fixture => {
            let path = base_dir.join(&config.fixture);
            let fixture = FixtureSource::load(&path)
                .with_context(|| format!("Failed to load fixture {:?}", path))?;
            tracing::debug!("Using fixture source {:?}", path);
            Ok(Arc::new(fixture))
        }
    }
}
