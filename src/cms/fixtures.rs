//! In-memory document store for tests

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{CmsError, ContentStore, Predicate, QueryOptions, RawDocument, RawPage};

const CURSOR_PREFIX: &str = "memory://posts?page=";

/// Serves `documents` in pages of `page_size`
pub struct MemoryStore {
    documents: Mutex<Vec<RawDocument>>,
    page_size: usize,
    fail_fetches: AtomicBool,
    pub fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new(documents: Vec<RawDocument>, page_size: usize) -> Self {
        Self {
            documents: Mutex::new(documents),
            page_size,
            fail_fetches: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_fetches.store(failing, Ordering::SeqCst);
    }

    pub fn remove(&self, uid: &str) {
        let mut documents = self.documents.lock().unwrap();
        documents.retain(|d| d.uid.as_deref() != Some(uid));
    }

    fn page(&self, number: usize) -> RawPage {
        let documents = self.documents.lock().unwrap();
        let start = (number - 1) * self.page_size;
        let results: Vec<_> = documents
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        let next_page = if start + self.page_size < documents.len() {
            Some(format!("{}{}", CURSOR_PREFIX, number + 1))
        } else {
            None
        };
        RawPage {
            page: number as u32,
            results_per_page: self.page_size as u32,
            total_results_size: documents.len() as u32,
            total_pages: documents.len().div_ceil(self.page_size) as u32,
            next_page,
            prev_page: None,
            results,
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn query(
        &self,
        _predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<RawPage, CmsError> {
        Ok(self.page(options.page.unwrap_or(1) as usize))
    }

    async fn get_by_uid(
        &self,
        _doc_type: &str,
        uid: &str,
    ) -> Result<Option<RawDocument>, CmsError> {
        let documents = self.documents.lock().unwrap();
        Ok(documents
            .iter()
            .find(|d| d.uid.as_deref() == Some(uid))
            .cloned())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<RawPage, CmsError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(CmsError::Status {
                status: 503,
                url: cursor.to_string(),
            });
        }
        let number = cursor
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        Ok(self.page(number))
    }
}

/// A complete post document with one heading and one paragraph
pub fn post_document(uid: &str, title: &str, body: &str) -> RawDocument {
    serde_json::from_value(json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "posts",
        "href": "https://example.cdn.prismic.io/api/v2/documents/search",
        "tags": [],
        "first_publication_date": "2021-03-15T19:25:28+0000",
        "last_publication_date": "2021-03-25T19:27:35+0000",
        "data": {
            "title": title,
            "subtitle": format!("Subtitle of {}", title),
            "author": "Joseph Oliveira",
            "banner": { "url": format!("https://images.example.com/{}.png", uid), "alt": null },
            "content": [{
                "heading": "Introduction",
                "body": [{ "type": "paragraph", "text": body, "spans": [] }]
            }]
        }
    }))
    .expect("fixture document is valid")
}
