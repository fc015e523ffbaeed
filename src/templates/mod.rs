//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary. HTML templates autoescape; rich
//! text is rendered ahead of time and marked `safe` in the template.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers::post_path;

/// Stylesheet written to `public/styles.css`
pub const STYLESHEET: &str = include_str!("site/styles.css");

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("404.html", include_str!("site/404.html")),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("post_path", post_path_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Truncate to `length` characters, appending `omission` when cut
pub fn truncate_chars(s: &str, length: usize, omission: &str) -> String {
    if length == 0 || s.chars().count() <= length {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(length).collect();
        format!("{}{}", truncated.trim_end(), omission)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 0,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    Ok(tera::Value::String(truncate_chars(&s, length, &omission)))
}

/// Tera filter: link to a post page by uid
///
/// The result is attribute-escaped already, so templates pipe it through
/// `safe` to keep the slashes readable.
fn post_path_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let uid = tera::try_get_value!("post_path", "value", String, value);
    let path = post_path(&uid);
    Ok(tera::Value::String(
        html_escape::encode_double_quoted_attribute(&path).into_owned(),
    ))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub date_format: String,
    pub subtitle_length: usize,
}

/// A post entry on the listing page
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Display date, empty when unpublished
    pub date: String,
    /// ISO 8601 for the `datetime` attribute
    pub datetime: String,
}

/// A full post page
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: String,
    pub title: String,
    pub author: String,
    pub banner: String,
    pub date: String,
    pub datetime: String,
    pub reading_time: String,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Pre-rendered HTML
    pub html: String,
}
