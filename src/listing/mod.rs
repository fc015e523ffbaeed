//! Paginated post listing
//!
//! A [`PaginatedListing`] starts from the first page rendered at build time
//! and grows by following the `next_page` cursor. Posts are only ever
//! appended, in fetch order. At most one fetch is in flight per listing: a
//! `load_more` issued while another one is running returns
//! [`LoadMore::Busy`] without touching the store. A failed or cancelled fetch
//! leaves posts and cursor exactly as they were.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::cms::ContentStore;
use crate::content::{normalize_page, Post, PostPage};

/// Where further pages come from
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch and normalize the page addressed by `cursor`
    async fn load_page(&self, cursor: &str) -> anyhow::Result<PostPage>;
}

#[async_trait]
impl<T: ContentStore + ?Sized> PageSource for Arc<T> {
    async fn load_page(&self, cursor: &str) -> anyhow::Result<PostPage> {
        let raw = self.fetch_page(cursor).await?;
        Ok(normalize_page(&raw)?)
    }
}

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("listing has not been initialized")]
    NotInitialized,

    #[error("listing was already initialized with a different page")]
    AlreadyInitialized,

    #[error("failed to load the next page: {0:#}")]
    Fetch(#[source] anyhow::Error),
}

/// Result of a successful `load_more`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was fetched; this many posts were appended
    Appended(usize),
    /// There is no next page; nothing was fetched
    Exhausted,
    /// Another fetch is in flight; nothing was fetched
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingOptions {
    /// Skip posts whose uid is already listed
    pub dedupe_by_uid: bool,
}

#[derive(Debug)]
struct State {
    posts: Vec<Post>,
    cursor: Option<String>,
    phase: Phase,
    /// Cursor and uids of the page passed to `initialize`
    origin: Option<(Option<String>, Vec<String>)>,
}

/// Client-visible listing state, owned by a single view
pub struct PaginatedListing<S> {
    source: S,
    options: ListingOptions,
    state: Mutex<State>,
}

impl<S: PageSource> PaginatedListing<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, ListingOptions::default())
    }

    pub fn with_options(source: S, options: ListingOptions) -> Self {
        Self {
            source,
            options,
            state: Mutex::new(State {
                posts: Vec::new(),
                cursor: None,
                phase: Phase::Idle,
                origin: None,
            }),
        }
    }

    /// Seed the listing with the first page
    ///
    /// Calling it again with the same page is a no-op; with a different page
    /// it fails and leaves the accumulated posts alone.
    pub fn initialize(&self, page: PostPage) -> Result<(), ListingError> {
        let mut state = lock(&self.state);
        let identity = (
            page.next_page.clone(),
            page.results.iter().map(|p| p.uid.clone()).collect::<Vec<_>>(),
        );

        if let Some(origin) = &state.origin {
            if *origin == identity {
                tracing::debug!("Listing already initialized with this page");
                return Ok(());
            }
            return Err(ListingError::AlreadyInitialized);
        }

        state.origin = Some(identity);
        state.cursor = page.next_page.filter(|c| !c.trim().is_empty());
        state.posts = Vec::with_capacity(page.results.len());
        append(&mut state.posts, page.results, self.options);
        Ok(())
    }

    /// Fetch the next page and append its posts
    pub async fn load_more(&self) -> Result<LoadMore, ListingError> {
        let cursor = {
            let mut state = lock(&self.state);
            if state.origin.is_none() {
                return Err(ListingError::NotInitialized);
            }
            if state.phase == Phase::Fetching {
                tracing::debug!("load_more ignored: a fetch is already in flight");
                return Ok(LoadMore::Busy);
            }
            let Some(cursor) = state.cursor.clone() else {
                return Ok(LoadMore::Exhausted);
            };
            state.phase = Phase::Fetching;
            cursor
        };

        // Back to Idle on every exit path, including a dropped future
        let _idle = IdleOnDrop(&self.state);

        let page = self.source.load_page(&cursor).await.map_err(|e| {
            tracing::warn!("Failed to load page {}: {:#}", cursor, e);
            ListingError::Fetch(e)
        })?;

        let mut state = lock(&self.state);
        let appended = append(&mut state.posts, page.results, self.options);
        state.cursor = page.next_page.filter(|c| !c.trim().is_empty());
        tracing::debug!(
            appended,
            total = state.posts.len(),
            has_more = state.cursor.is_some(),
            "Loaded next page"
        );
        drop(state);

        Ok(LoadMore::Appended(appended))
    }

    /// Follow the cursor until the last page; returns the number of posts appended
    pub async fn load_all(&self) -> Result<usize, ListingError> {
        let mut total = 0;
        loop {
            match self.load_more().await? {
                LoadMore::Appended(n) => total += n,
                LoadMore::Exhausted | LoadMore::Busy => return Ok(total),
            }
        }
    }

    /// Snapshot of the accumulated posts
    pub fn posts(&self) -> Vec<Post> {
        lock(&self.state).posts.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> Option<String> {
        lock(&self.state).cursor.clone()
    }

    /// Whether the "load more" control should be offered
    pub fn has_more(&self) -> bool {
        let state = lock(&self.state);
        state.cursor.is_some() && state.phase == Phase::Idle
    }

    pub fn phase(&self) -> Phase {
        lock(&self.state).phase
    }

    pub fn is_fetching(&self) -> bool {
        self.phase() == Phase::Fetching
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .posts
    }
}

struct IdleOnDrop<'a>(&'a Mutex<State>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        lock(self.0).phase = Phase::Idle;
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn append(posts: &mut Vec<Post>, incoming: Vec<Post>, options: ListingOptions) -> usize {
    if !options.dedupe_by_uid {
        let n = incoming.len();
        posts.extend(incoming);
        return n;
    }

    let mut seen: HashSet<String> = posts.iter().map(|p| p.uid.clone()).collect();
    let before = posts.len();
    for post in incoming {
        if seen.insert(post.uid.clone()) {
            posts.push(post);
        } else {
            tracing::debug!("Skipping duplicate post {}", post.uid);
        }
    }
    posts.len() - before
}
