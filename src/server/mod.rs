//! Preview server with periodic regeneration
//!
//! Serves the public directory. Post pages that were not generated ahead of
//! time are rendered on their first request and kept until the next
//! regeneration, which also drops pages whose post no longer exists.

use anyhow::Result;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::cms::ContentStore;
use crate::generator::{DetailOutcome, Generator};
use crate::helpers::{is_valid_slug, post_output, slug_from_path};
use crate::Blog;

/// Server state
pub struct ServerState {
    generator: Generator,
    store: Arc<dyn ContentStore>,
    public_dir: PathBuf,
    /// Serializes every write to the public directory
    render_lock: tokio::sync::Mutex<()>,
    /// Slugs rendered on request, refreshed by regeneration
    on_demand: std::sync::Mutex<BTreeSet<String>>,
}

impl ServerState {
    pub fn new(blog: &Blog, store: Arc<dyn ContentStore>) -> Result<Self> {
        Ok(Self {
            generator: Generator::new(blog)?,
            store,
            public_dir: blog.public_dir.clone(),
            render_lock: tokio::sync::Mutex::new(()),
            on_demand: std::sync::Mutex::new(BTreeSet::new()),
        })
    }

    fn on_demand(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.on_demand
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Generate the site, then serve it until interrupted
pub async fn start(blog: &Blog, ip: &str, port: u16, revalidate: bool) -> Result<()> {
    let store = blog.content_store()?;
    let state = Arc::new(ServerState::new(blog, store)?);

    tracing::info!("Generating static files...");
    regenerate(&state).await?;

    if revalidate && blog.config.revalidate > 0 {
        spawn_revalidation(
            Arc::clone(&state),
            Duration::from_secs(blog.config.revalidate),
        );
    }

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if revalidate && blog.config.revalidate > 0 {
        println!("Regenerating every {}s.", blog.config.revalidate);
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    let not_found = ServeFile::new(state.public_dir.join("404.html"));
    let files = ServeDir::new(&state.public_dir)
        .append_index_html_on_directories(true)
        .not_found_service(not_found);

    Router::new()
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Regenerate on a fixed period; the first run happens one period from now
pub fn spawn_revalidation(state: Arc<ServerState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            interval.tick().await;
            tracing::info!("Regenerating...");
            if let Err(e) = regenerate(&state).await {
                tracing::error!("Regeneration failed: {:#}", e);
            }
        }
    })
}

/// Re-render the listing, the first page of posts and every other post page
/// already present in the public directory
pub async fn regenerate(state: &ServerState) -> Result<()> {
    let _guard = state.render_lock.lock().await;

    let rendered = state.generator.generate(&state.store, false).await?;

    let mut known = published_slugs(&state.public_dir);
    known.extend(state.on_demand().iter().cloned());
    let pending: Vec<String> = known
        .into_iter()
        .filter(|slug| !rendered.contains(slug))
        .collect();

    for slug in pending {
        match state
            .generator
            .generate_detail(state.store.as_ref(), &slug)
            .await
        {
            Ok(DetailOutcome::Generated) => {}
            Ok(DetailOutcome::NotFound) => {
                tracing::info!("Post {} no longer exists", slug);
                state.on_demand().remove(&slug);
            }
            Err(e) => tracing::warn!("Failed to refresh {}: {:#}", slug, e),
        }
    }

    state.generator.save_cache()
}

/// Slugs with a rendered page under `public/post`
fn published_slugs(public_dir: &std::path::Path) -> BTreeSet<String> {
    let Ok(entries) = std::fs::read_dir(public_dir.join("post")) else {
        return BTreeSet::new();
    };

    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().join("index.html").is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|slug| is_valid_slug(slug))
        .collect()
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    uri: Uri,
) -> Response {
    let Some(slug) = slug_from_path(uri.path()).map(str::to_string) else {
        return not_found(&state).await;
    };

    let output = state.public_dir.join(post_output(&slug));
    if !output.exists() {
        let _guard = state.render_lock.lock().await;

        // Another request may have rendered it while we waited
        if !output.exists() {
            match state
                .generator
                .generate_detail(state.store.as_ref(), &slug)
                .await
            {
                Ok(DetailOutcome::Generated) => {
                    tracing::info!("Generated on demand: {}", slug);
                    state.on_demand().insert(slug.clone());
                    if let Err(e) = state.generator.save_cache() {
                        tracing::warn!("Failed to save cache: {:#}", e);
                    }
                }
                Ok(DetailOutcome::NotFound) => return not_found(&state).await,
                Err(e) => {
                    tracing::error!("Failed to generate {}: {:#}", slug, e);
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response();
                }
            }
        }
    }

    match tokio::fs::read_to_string(&output).await {
        Ok(content) => Html(content).into_response(),
        Err(_) => not_found(&state).await,
    }
}

async fn not_found(state: &ServerState) -> Response {
    let body = tokio::fs::read_to_string(state.public_dir.join("404.html"))
        .await
        .unwrap_or_else(|_| "Not found".to_string());
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fixtures::{post_document, MemoryStore};
    use crate::config::SiteConfig;

    async fn setup(dir: &std::path::Path) -> (Arc<ServerState>, Arc<MemoryStore>, String) {
        let mut config = SiteConfig::default();
        config.cms.page_size = 2;
        let blog = Blog::with_config(dir, config);

        let store = Arc::new(MemoryStore::new(
            vec![
                post_document("a", "Como utilizar Hooks", "Pensando em sincronização"),
                post_document("b", "Criando um app CRA do zero", "Tudo sobre como criar"),
                post_document("c", "Terceiro post", "Mais texto"),
            ],
            2,
        ));
        let state = Arc::new(ServerState::new(&blog, store.clone()).unwrap());
        regenerate(&state).await.unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (state, store, format!("http://{}", addr))
    }

    #[tokio::test]
    async fn test_serves_generated_pages() {
        let dir = tempfile::tempdir().unwrap();
        let (_state, _store, base) = setup(dir.path()).await;

        let index = reqwest::get(format!("{}/", base)).await.unwrap();
        assert_eq!(index.status(), 200);
        assert!(index.text().await.unwrap().contains("Como utilizar Hooks"));

        let post = reqwest::get(format!("{}/post/a/", base)).await.unwrap();
        assert_eq!(post.status(), 200);
        assert!(post.text().await.unwrap().contains("<h1>Como utilizar Hooks</h1>"));

        let css = reqwest::get(format!("{}/styles.css", base)).await.unwrap();
        assert_eq!(css.status(), 200);
    }

    #[tokio::test]
    async fn test_generates_unknown_post_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _store, base) = setup(dir.path()).await;
        let output = dir.path().join("public/post/c/index.html");
        assert!(!output.exists());

        let (first, second) = tokio::join!(
            reqwest::get(format!("{}/post/c/", base)),
            reqwest::get(format!("{}/post/c", base)),
        );
        assert_eq!(first.unwrap().status(), 200);
        assert_eq!(second.unwrap().status(), 200);
        assert!(output.exists());
        assert!(state.on_demand().contains("c"));
    }

    #[tokio::test]
    async fn test_missing_post_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (_state, _store, base) = setup(dir.path()).await;

        let response = reqwest::get(format!("{}/post/does-not-exist/", base))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert!(response.text().await.unwrap().contains("Post não encontrado"));

        let response = reqwest::get(format!("{}/nothing-here", base)).await.unwrap();
        assert_eq!(response.status(), 404);

        let response = reqwest::get(format!("{}/post/a%2Fb/", base)).await.unwrap();
        assert_eq!(response.status(), 404);
        assert!(!dir.path().join("public/post/a%2Fb").exists());
    }

    #[tokio::test]
    async fn test_regenerate_drops_deleted_posts() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store, base) = setup(dir.path()).await;

        let response = reqwest::get(format!("{}/post/c/", base)).await.unwrap();
        assert_eq!(response.status(), 200);

        store.remove("c");
        regenerate(&state).await.unwrap();
        assert!(!dir.path().join("public/post/c/index.html").exists());
        assert!(state.on_demand().is_empty());

        let response = reqwest::get(format!("{}/post/c/", base)).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_regenerate_refreshes_pages_from_earlier_runs() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store, _base) = setup(dir.path()).await;

        // Left behind by `generate --all`
        std::fs::create_dir_all(dir.path().join("public/post/c")).unwrap();
        std::fs::write(dir.path().join("public/post/c/index.html"), "stale").unwrap();
        assert!(published_slugs(&dir.path().join("public")).contains("c"));

        regenerate(&state).await.unwrap();
        let html = std::fs::read_to_string(dir.path().join("public/post/c/index.html")).unwrap();
        assert!(html.contains("<h1>Terceiro post</h1>"));

        store.remove("c");
        regenerate(&state).await.unwrap();
        assert!(!dir.path().join("public/post/c").exists());
    }
}
