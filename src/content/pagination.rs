//! Listing pagination ("load more")

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::post::ArticleListItem;
use super::projector::project_list_item;
use crate::source::{ContentSource, QueryResponse, SourceError};

/// The listing entries loaded so far and where to get more
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    pub results: Vec<ArticleListItem>,
    pub next_page: Option<String>,
}

impl PaginationState {
    pub fn from_response(response: &QueryResponse) -> Self {
        let mut state = Self::default();
        state.append(response);
        state
    }

    /// Append a page of results and take its cursor; returns the number of
    /// entries added
    pub fn append(&mut self, response: &QueryResponse) -> usize {
        self.results
            .extend(response.results.iter().map(project_list_item));
        self.next_page = response.next_page.clone();
        response.results.len()
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// Result of a load-more request
#[derive(Debug)]
pub enum LoadOutcome {
    /// A page was fetched and this many entries were appended
    Appended(usize),
    /// There is no next page
    Exhausted,
    /// Another load is still in flight; nothing was fetched
    Busy,
    /// The fetch failed; the state is unchanged
    Failed(SourceError),
}

/// Owns a [`PaginationState`] and grows it one page at a time
///
/// At most one fetch is in flight: a `load_more` issued while another is
/// outstanding returns [`LoadOutcome::Busy`] without touching the source.
pub struct Paginator {
    source: Arc<dyn ContentSource>,
    state: Mutex<PaginationState>,
    loading: AtomicBool,
}

impl Paginator {
    pub fn new(source: Arc<dyn ContentSource>, initial: PaginationState) -> Self {
        Self {
            source,
            state: Mutex::new(initial),
            loading: AtomicBool::new(false),
        }
    }

    pub async fn load_more(&self) -> LoadOutcome {
        let Some(_guard) = LoadingGuard::acquire(&self.loading) else {
            tracing::debug!("Load more ignored, a page is already loading");
            return LoadOutcome::Busy;
        };

        let cursor = self.lock().next_page.clone();
        let Some(cursor) = cursor else {
            return LoadOutcome::Exhausted;
        };

        match self.source.fetch_page(&cursor).await {
            Ok(response) => {
                let added = self.lock().append(&response);
                tracing::debug!("Loaded {} more entries", added);
                LoadOutcome::Appended(added)
            }
            Err(e) => {
                tracing::warn!("Failed to load next page: {}", e);
                LoadOutcome::Failed(e)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> PaginationState {
        self.lock().clone()
    }

    pub fn into_state(self) -> PaginationState {
        self.state.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, PaginationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds the loading flag for the duration of one fetch
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
