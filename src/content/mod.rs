//! Content module - post models, normalization and derived values

pub mod normalize;
mod post;
pub mod reading_time;
pub mod richtext;

pub use normalize::{normalize_detail, normalize_page, normalize_post, NormalizeError};
pub use post::{Banner, ContentBlock, Page, Post, PostDetail, PostPage};
pub use reading_time::reading_time;
pub use richtext::{as_html, as_plain_text, RichText, RichTextNode};
