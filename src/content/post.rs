//! Post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::richtext::RichText;

/// A post as shown in the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique within a listing, stable across fetches
    pub uid: String,

    pub first_publication_date: Option<DateTime<Utc>>,

    pub title: String,

    pub subtitle: String,

    pub author: String,
}

/// A full post as shown on its own page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,

    pub first_publication_date: Option<DateTime<Utc>>,

    pub last_publication_date: Option<DateTime<Utc>>,

    pub title: String,

    pub subtitle: String,

    pub author: String,

    pub banner: Banner,

    /// Sections in document order
    pub content: Vec<ContentBlock>,
}

/// Banner image reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
}

/// A titled section of a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// May be empty
    pub heading: String,
    pub body: RichText,
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Cursor of the following page; `None` on the last page
    pub next_page: Option<String>,
    pub results: Vec<T>,
}

/// A page of post summaries
pub type PostPage = Page<Post>;

impl<T> Page<T> {
    pub fn new(next_page: Option<String>, results: Vec<T>) -> Self {
        Self {
            next_page: next_page.filter(|c| !c.trim().is_empty()),
            results,
        }
    }

    /// Whether a further page can be requested
    pub fn has_next(&self) -> bool {
        self.next_page.is_some()
    }
}
