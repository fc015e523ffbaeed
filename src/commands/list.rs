//! List posts

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::cms::{ContentStore, Predicate, QueryOptions};
use crate::content::{normalize_page, Post};
use crate::helpers::format_date;
use crate::listing::{ListingOptions, PaginatedListing};
use crate::Blog;

/// Print every post, following the listing cursor to the last page
pub async fn run(blog: &Blog) -> Result<()> {
    let store = blog.content_store()?;
    let posts = load_posts(blog, store).await?;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", format_line(blog, post));
    }

    Ok(())
}

/// Drain the listing
///
/// A failed page fetch ends the walk early; the posts gathered so far are
/// still returned.
pub async fn load_posts(blog: &Blog, store: Arc<dyn ContentStore>) -> Result<Vec<Post>> {
    let cms = &blog.config.cms;
    let raw = store
        .query(
            &[Predicate::document_type(&cms.document_type)],
            &QueryOptions::page_size(cms.page_size),
        )
        .await
        .context("Failed to query posts")?;
    let first = normalize_page(&raw)?;

    let options = ListingOptions {
        dedupe_by_uid: blog.config.dedupe_by_uid,
    };
    let listing = PaginatedListing::with_options(store, options);
    listing.initialize(first)?;

    if let Err(e) = listing.load_all().await {
        tracing::warn!("Stopped after {} posts: {}", listing.len(), e);
    }

    Ok(listing.into_posts())
}

fn format_line(blog: &Blog, post: &Post) -> String {
    let date = post
        .first_publication_date
        .map(|d| format_date(&d, &blog.config.date_format, &blog.config.language))
        .unwrap_or_else(|| "-".to_string());
    format!("{} - {} [{}] by {}", date, post.title, post.uid, post.author)
}
