//! Content client adapter - queries the headless CMS
//!
//! The rest of the crate only talks to [`ContentStore`]. [`PrismicClient`]
//! is the HTTP implementation used at runtime.

mod predicate;
mod prismic;
mod raw;

#[cfg(test)]
pub(crate) mod fixtures;

use async_trait::async_trait;
use thiserror::Error;

pub use predicate::{to_query, Predicate};
pub use prismic::PrismicClient;
pub use raw::{RawDocument, RawPage};

/// Errors raised while talking to the CMS
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("CMS endpoint is not configured (set cms.endpoint or PRISMIC_API_ENDPOINT)")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CMS responded with status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode CMS response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No master ref advertised by {0}")]
    NoMasterRef(String),
}

/// Paging and ordering for a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub page_size: Option<u32>,
    pub page: Option<u32>,
    /// e.g. `[document.first_publication_date desc]`
    pub orderings: Option<String>,
}

impl QueryOptions {
    pub fn page_size(page_size: u32) -> Self {
        Self {
            page_size: Some(page_size),
            ..Default::default()
        }
    }
}

/// Read-only access to a document store
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// One page of documents matching every predicate
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<RawPage, CmsError>;

    /// Look a document up by its uid; `Ok(None)` when there is no such document
    async fn get_by_uid(&self, doc_type: &str, uid: &str)
        -> Result<Option<RawDocument>, CmsError>;

    /// Follow a `next_page` cursor returned by an earlier query
    async fn fetch_page(&self, cursor: &str) -> Result<RawPage, CmsError>;
}
