//! URL helper functions

use std::path::{Path, PathBuf};

/// Site path of a post page
///
/// # Examples
/// ```ignore
/// post_path("como-utilizar-hooks") // -> "/post/como-utilizar-hooks/"
/// ```
pub fn post_path(uid: &str) -> String {
    format!("/post/{}/", uid.trim_matches('/'))
}

/// Output file of a post page, relative to the public directory
pub fn post_output(uid: &str) -> PathBuf {
    Path::new("post").join(uid.trim_matches('/')).join("index.html")
}

/// Extract the slug from a request path like `/post/<slug>` or `/post/<slug>/`
pub fn slug_from_path(path: &str) -> Option<&str> {
    let slug = path.strip_prefix("/post/")?.trim_end_matches('/');
    if is_valid_slug(slug) {
        Some(slug)
    } else {
        None
    }
}

/// Slugs are single path segments without traversal
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
        && !slug.chars().any(char::is_control)
}
