//! Development server with preview mode and on-demand rendering

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, Request, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::generator::{post_output_path, Generator};
use crate::helpers::post_url;
use crate::Blog;

/// Cookie holding the preview revision ref
pub const PREVIEW_COOKIE: &str = "io.prismic.preview";

/// Preview sessions last 30 minutes
const PREVIEW_MAX_AGE: u64 = 30 * 60;

/// Server state
pub struct ServerState {
    blog: Blog,
    generator: RwLock<Arc<Generator>>,
}

impl ServerState {
    pub fn new(blog: Blog, generator: Generator) -> Self {
        Self {
            blog,
            generator: RwLock::new(Arc::new(generator)),
        }
    }

    fn generator(&self) -> Arc<Generator> {
        self.generator
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn replace_generator(&self, generator: Generator) {
        *self.generator.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(generator);
    }
}

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/post/:uid", get(post_handler))
        .route("/post/:uid/", get(post_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the development server
pub async fn start(
    blog: &Blog,
    ip: &str,
    port: u16,
    open: bool,
    revalidate: Option<u64>,
) -> Result<()> {
    let state = Arc::new(ServerState::new(blog.clone(), Generator::new(blog)?));
    let app = router(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);

    let revalidate = revalidate.unwrap_or(blog.config.revalidate);
    if revalidate > 0 {
        println!("Revalidating every {}s", revalidate);
        tokio::spawn(revalidate_loop(state, Duration::from_secs(revalidate)));
    }
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Regenerate the site on an interval with a fresh generator
async fn revalidate_loop(state: Arc<ServerState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        tracing::info!("Revalidating...");
        let generator = match Generator::new(&state.blog) {
            Ok(generator) => generator,
            Err(e) => {
                tracing::error!("Revalidation failed: {:#}", e);
                continue;
            }
        };
        match generator.generate(false).await {
            Ok(report) => {
                tracing::info!(
                    "Revalidated: {} rendered, {} removed",
                    report.rendered,
                    report.deleted
                );
                state.replace_generator(generator);
            }
            Err(e) => tracing::error!("Revalidation failed: {:#}", e),
        }
    }
}

/// Error response for failed renders
struct AppError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Listing page; rendered live while previewing
async fn index_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let reference = preview_ref(&headers);
    let index = state.blog.public_dir.join("index.html");

    if reference.is_none() {
        if let Ok(content) = tokio::fs::read_to_string(&index).await {
            return Ok(Html(content).into_response());
        }
    }

    let html = state.generator().render_index(reference.as_deref()).await?;
    Ok(Html(html).into_response())
}

/// Article page: served from disk, or rendered on demand when missing or
/// previewing. Pages rendered on demand outside preview are written out.
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let reference = preview_ref(&headers);
    let output = post_output_path(&uid).map(|p| state.blog.public_dir.join(p));

    if reference.is_none() {
        if let Some(path) = &output {
            if let Ok(content) = tokio::fs::read_to_string(path).await {
                return Ok(Html(content).into_response());
            }
        }
    }

    let generator = state.generator();
    match generator.render_post(&uid, reference.as_deref()).await? {
        Some(html) => {
            if let (None, Some(path)) = (&reference, &output) {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, &html).await?;
                tracing::info!("Rendered on demand: {}", uid);
            }
            Ok(Html(html).into_response())
        }
        None => not_found(&state, reference.is_some()).await,
    }
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Enter preview mode: store the ref and go to the previewed document
async fn preview_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<PreviewParams>,
) -> Result<Response, AppError> {
    let Some(token) = params.token.filter(|t| !t.is_empty()) else {
        return Ok((StatusCode::BAD_REQUEST, "Missing preview token").into_response());
    };

    let mut location = "/".to_string();
    if let Some(id) = params.document_id.as_deref() {
        match state.generator().source().get_by_id(id, Some(&token)).await {
            Ok(Some(record)) => {
                if let Some(uid) = record.uid.as_deref() {
                    location = post_url(&state.blog.config, uid);
                }
            }
            Ok(None) => tracing::warn!("Previewed document {:?} not found", id),
            Err(e) => tracing::warn!("Failed to resolve previewed document {:?}: {}", id, e),
        }
    }

    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        PREVIEW_COOKIE,
        utf8_percent_encode(&token, NON_ALPHANUMERIC),
        PREVIEW_MAX_AGE
    );
    tracing::info!("Entering preview mode, redirecting to {}", location);
    Ok(([(SET_COOKIE, cookie)], Redirect::temporary(&location)).into_response())
}

/// Leave preview mode
async fn exit_preview_handler() -> Response {
    let cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", PREVIEW_COOKIE);
    ([(SET_COOKIE, cookie)], Redirect::temporary("/")).into_response()
}

/// Static files from `public_dir`, the 404 page otherwise
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Result<Response, AppError> {
    let preview = preview_ref(request.headers()).is_some();
    let mut service =
        ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => {
            not_found(&state, preview).await
        }
        Ok(response) => Ok(response.into_response()),
        Err(e) => Err(AppError(anyhow::anyhow!("Failed to serve file: {}", e))),
    }
}

async fn not_found(state: &ServerState, preview: bool) -> Result<Response, AppError> {
    let page = state.blog.public_dir.join("404.html");
    let html = match tokio::fs::read_to_string(&page).await {
        Ok(content) if !preview => content,
        _ => state.generator().render_not_found(preview)?,
    };
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}

/// The preview ref from the request cookies
fn preview_ref(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .map(|(_, value)| percent_decode_str(value).decode_utf8_lossy().into_owned())
        .filter(|value| !value.is_empty())
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
