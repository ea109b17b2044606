//! HTTP client for a Prismic-style REST API (v2)

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use url::Url;

use super::document::{ApiInfo, QueryResponse};
use super::error::{Result, SourceError};
use super::query::Query;
use super::ContentSource;

/// Content API client
///
/// The master ref is looked up from the API root on first use and reused for
/// every published-content query.
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    /// Create a client for an API root such as `https://repo.cdn.prismic.io/api/v2`
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: access_token.filter(|t| !t.is_empty()),
            master_ref: OnceCell::new(),
        })
    }

    /// The ref of the currently published revision
    pub async fn master_ref(&self) -> Result<&str> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async {
                let url = self.authorize(self.endpoint.clone());
                let info: ApiInfo = self.get_json(url).await?;
                let master = info
                    .master_ref()
                    .map(str::to_string)
                    .ok_or(SourceError::MissingMasterRef)?;
                tracing::debug!("Resolved master ref {}", master);
                Ok::<_, SourceError>(master)
            })
            .await?;
        Ok(reference.as_str())
    }

    /// Build the search URL for a query
    pub fn search_url(&self, query: &Query, reference: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/documents/search",
            self.endpoint.as_str().trim_end_matches('/')
        ))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", reference);
            pairs.append_pair("q", &query.q());
            if !query.fetch.is_empty() {
                pairs.append_pair("fetch", &query.fetch.join(","));
            }
            pairs.append_pair("pageSize", &query.page_size.to_string());
            pairs.append_pair("page", &query.page.to_string());
            if let Some(orderings) = query.orderings_param() {
                pairs.append_pair("orderings", &orderings);
            }
        }
        Ok(self.authorize(url))
    }

    fn authorize(&self, mut url: Url) -> Url {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}", url.path());
        let response = self.http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.path().to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(&self, query: &Query) -> Result<QueryResponse> {
        let reference = match &query.reference {
            Some(reference) => reference.clone(),
            None => self.master_ref().await?.to_string(),
        };
        let url = self.search_url(query, &reference)?;
        self.get_json(url).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse> {
        let url = Url::parse(cursor)?;
        if url.origin() != self.endpoint.origin() {
            return Err(SourceError::UnknownCursor(cursor.to_string()));
        }
        self.get_json(self.authorize(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Ordering, Predicate, FIRST_PUBLICATION};
    use axum::extract::{Query as QueryParams, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn api_root() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "refs": [{"id": "master", "ref": "master-ref", "label": "Master", "isMasterRef": true}]
        }))
    }

    async fn search(
        State(seen): State<Seen>,
        QueryParams(params): QueryParams<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        seen.lock().unwrap().push(params.clone());
        let results = if params.get("q").map(|q| q.contains("missing")).unwrap_or(false) {
            serde_json::json!([])
        } else {
            serde_json::json!([{
                "id": "X1", "uid": "hello", "type": "posts",
                "first_publication_date": "2021-03-25T19:25:28+0000",
                "data": {"title": "Hello"}
            }])
        };
        Json(serde_json::json!({
            "page": 1, "total_pages": 1, "next_page": null, "results": results
        }))
    }

    async fn mock_api() -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/api/v2", get(api_root))
            .route("/api/v2/documents/search", get(search))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/api/v2", addr), seen)
    }

    #[tokio::test]
    async fn test_query_uses_master_ref_and_params() {
        let (endpoint, seen) = mock_api().await;
        let client = PrismicClient::new(&endpoint, Some("secret".into())).unwrap();

        let query = Query::new(vec![Predicate::document_type("posts")])
            .fetch(["posts.title", "posts.author"])
            .page_size(2)
            .order_by(Ordering::desc(FIRST_PUBLICATION));
        let response = client.query(&query).await.unwrap();
        assert_eq!(response.results[0].uid.as_deref(), Some("hello"));

        let seen = seen.lock().unwrap();
        let params = &seen[0];
        assert_eq!(params["ref"], "master-ref");
        assert_eq!(params["q"], r#"[[at(document.type,"posts")]]"#);
        assert_eq!(params["fetch"], "posts.title,posts.author");
        assert_eq!(params["pageSize"], "2");
        assert_eq!(params["orderings"], "[document.first_publication_date desc]");
        assert_eq!(params["access_token"], "secret");
    }

    #[tokio::test]
    async fn test_preview_ref_overrides_master() {
        let (endpoint, seen) = mock_api().await;
        let client = PrismicClient::new(&endpoint, None).unwrap();

        let record = client
            .get_by_uid("posts", "hello", Some("preview-token"))
            .await
            .unwrap();
        assert!(record.is_some());

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0]["ref"], "preview-token");
        assert!(!seen[0].contains_key("access_token"));
    }

    #[tokio::test]
    async fn test_get_by_uid_not_found() {
        let (endpoint, _) = mock_api().await;
        let client = PrismicClient::new(&endpoint, None).unwrap();
        let record = client.get_by_uid("posts", "missing", None).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_foreign_cursor() {
        let (endpoint, _) = mock_api().await;
        let client = PrismicClient::new(&endpoint, None).unwrap();
        let err = client
            .fetch_page("https://elsewhere.example/api/v2/documents/search?page=2")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::UnknownCursor(_)));
    }

    #[tokio::test]
    async fn test_status_error() {
        let (endpoint, _) = mock_api().await;
        let client = PrismicClient::new(&format!("{}/nope", endpoint), None).unwrap();
        let err = client.master_ref().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }
}
