//! Normalization of raw CMS documents into [`Post`] and [`PostDetail`]
//!
//! Only the fields of the internal schema survive; ids, hrefs, tags, slugs,
//! alternate languages and any other CMS metadata are dropped. Text fields
//! may arrive either as plain strings or as rich-text arrays (title-type
//! fields), both are flattened to a string.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use super::post::{Banner, ContentBlock, Page, Post, PostDetail, PostPage};
use super::richtext::{as_plain_text, RichText};
use crate::cms::{RawDocument, RawPage};

/// A raw document that cannot be mapped onto the internal schema
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("document {id:?} has no uid")]
    MissingUid { id: String },

    #[error("document {uid:?}: invalid timestamp in {field}: {value:?}")]
    InvalidTimestamp {
        uid: String,
        field: &'static str,
        value: String,
    },

    #[error("document {uid:?}: malformed field {field}: {reason}")]
    InvalidField {
        uid: String,
        field: String,
        reason: String,
    },
}

/// Map a raw document onto a listing entry
pub fn normalize_post(doc: &RawDocument) -> Result<Post, NormalizeError> {
    let uid = require_uid(doc)?;
    Ok(Post {
        first_publication_date: timestamp(
            &uid,
            "first_publication_date",
            doc.first_publication_date.as_deref(),
        )?,
        title: text_field(&doc.data, "title"),
        subtitle: text_field(&doc.data, "subtitle"),
        author: text_field(&doc.data, "author"),
        uid,
    })
}

/// Map a raw document onto a full post
pub fn normalize_detail(doc: &RawDocument) -> Result<PostDetail, NormalizeError> {
    let uid = require_uid(doc)?;
    Ok(PostDetail {
        first_publication_date: timestamp(
            &uid,
            "first_publication_date",
            doc.first_publication_date.as_deref(),
        )?,
        last_publication_date: timestamp(
            &uid,
            "last_publication_date",
            doc.last_publication_date.as_deref(),
        )?,
        title: text_field(&doc.data, "title"),
        subtitle: text_field(&doc.data, "subtitle"),
        author: text_field(&doc.data, "author"),
        banner: banner(&doc.data),
        content: content_blocks(&uid, &doc.data)?,
        uid,
    })
}

/// Map a raw search page onto a page of listing entries, keeping order
pub fn normalize_page(page: &RawPage) -> Result<PostPage, NormalizeError> {
    let results = page
        .results
        .iter()
        .map(normalize_post)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page::new(page.next_page.clone(), results))
}

fn require_uid(doc: &RawDocument) -> Result<String, NormalizeError> {
    match doc.uid.as_deref().map(str::trim) {
        Some(uid) if !uid.is_empty() => Ok(uid.to_string()),
        _ => Err(NormalizeError::MissingUid { id: doc.id.clone() }),
    }
}

/// Parse an RFC 3339 timestamp or the CMS variant with a `+0000` offset
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn timestamp(
    uid: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, NormalizeError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| NormalizeError::InvalidTimestamp {
                uid: uid.to_string(),
                field,
                value: raw.to_string(),
            }),
    }
}

/// Read a text field that may be a string or a rich-text array
fn text_field(data: &Value, key: &str) -> String {
    value_as_text(data.get(key))
}

fn value_as_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(value @ Value::Array(_)) => serde_json::from_value::<RichText>(value.clone())
            .map(|rt| as_plain_text(&rt))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn banner(data: &Value) -> Banner {
    let url = match data.get("banner") {
        Some(Value::String(url)) => url.clone(),
        Some(Value::Object(image)) => image
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };
    Banner { url }
}

fn content_blocks(uid: &str, data: &Value) -> Result<Vec<ContentBlock>, NormalizeError> {
    let blocks = match data.get("content") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(blocks)) => blocks,
        Some(_) => {
            return Err(NormalizeError::InvalidField {
                uid: uid.to_string(),
                field: "content".to_string(),
                reason: "expected a list of sections".to_string(),
            })
        }
    };

    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            let body = match block.get("body") {
                None | Some(Value::Null) => RichText::default(),
                Some(body) => serde_json::from_value(body.clone()).map_err(|e| {
                    NormalizeError::InvalidField {
                        uid: uid.to_string(),
                        field: format!("content[{}].body", i),
                        reason: e.to_string(),
                    }
                })?,
            };
            Ok(ContentBlock {
                heading: value_as_text(block.get("heading")),
                body,
            })
        })
        .collect()
}
