//! Structured rich text as delivered by the CMS
//!
//! A rich-text field is a list of block nodes (paragraphs, headings, list
//! items, images, embeds). Inline formatting is carried by spans whose
//! offsets count UTF-16 code units into the node text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An ordered list of rich-text nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<RichTextNode>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Image alt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Oembed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Preformatted,
    ListItem,
    OListItem,
    Image,
    Embed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Oembed {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
}

impl RichText {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn nodes(&self) -> &[RichTextNode] {
        &self.0
    }
}

impl RichTextNode {
    /// A plain paragraph
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Paragraph,
            text: text.into(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }
}

/// Concatenate the text of every node, separated by a single space
pub fn as_plain_text(rich_text: &RichText) -> String {
    rich_text
        .0
        .iter()
        .filter(|node| !node.text.is_empty())
        .map(|node| node.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render rich text as HTML
///
/// Consecutive list items are grouped into a single `<ul>`/`<ol>`.
pub fn as_html(rich_text: &RichText) -> String {
    let mut out = String::new();
    let mut open_list: Option<NodeKind> = None;

    for node in &rich_text.0 {
        let list = match node.kind {
            NodeKind::ListItem | NodeKind::OListItem => Some(node.kind),
            _ => None,
        };
        if open_list != list {
            if let Some(kind) = open_list {
                out.push_str(list_tag(kind, true));
            }
            if let Some(kind) = list {
                out.push_str(list_tag(kind, false));
            }
            open_list = list;
        }

        render_node(node, &mut out);
    }

    if let Some(kind) = open_list {
        out.push_str(list_tag(kind, true));
    }

    out
}

fn list_tag(kind: NodeKind, closing: bool) -> &'static str {
    match (kind, closing) {
        (NodeKind::OListItem, false) => "<ol>",
        (NodeKind::OListItem, true) => "</ol>",
        (_, false) => "<ul>",
        (_, true) => "</ul>",
    }
}

fn render_node(node: &RichTextNode, out: &mut String) {
    let tag = match node.kind {
        NodeKind::Paragraph => "p",
        NodeKind::Heading1 => "h1",
        NodeKind::Heading2 => "h2",
        NodeKind::Heading3 => "h3",
        NodeKind::Heading4 => "h4",
        NodeKind::Heading5 => "h5",
        NodeKind::Heading6 => "h6",
        NodeKind::Preformatted => "pre",
        NodeKind::ListItem | NodeKind::OListItem => "li",
        NodeKind::Image => {
            let src = node.url.as_deref().unwrap_or_default();
            let alt = node.alt.as_deref().unwrap_or_default();
            out.push_str(&format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape::encode_double_quoted_attribute(src),
                html_escape::encode_double_quoted_attribute(alt)
            ));
            return;
        }
        NodeKind::Embed => {
            if let Some(oembed) = &node.oembed {
                let url = oembed.embed_url.as_deref().unwrap_or_default();
                out.push_str(&format!(
                    r#"<div data-oembed="{}">{}</div>"#,
                    html_escape::encode_double_quoted_attribute(url),
                    oembed.html.as_deref().unwrap_or_default()
                ));
            }
            return;
        }
        NodeKind::Unknown => return,
    };

    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&render_spans(&node.text, &node.spans));
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Render text with inline spans applied
///
/// Overlapping spans are closed and reopened so the output stays well nested.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut sorted: Vec<&Span> = spans.iter().filter(|s| s.end > s.start).collect();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut pos = 0;

    for ch in text.chars() {
        close_spans_at(pos, &mut open, &mut out);
        while next < sorted.len() && sorted[next].start <= pos {
            out.push_str(&open_tag(sorted[next]));
            open.push(sorted[next]);
            next += 1;
        }

        if ch == '\n' {
            out.push_str("<br />");
        } else {
            let mut buf = [0u8; 4];
            html_escape::encode_text_to_string(ch.encode_utf8(&mut buf), &mut out);
        }
        pos += ch.len_utf16();
    }

    while let Some(span) = open.pop() {
        out.push_str(close_tag(span));
    }

    out
}

fn close_spans_at<'a>(pos: usize, open: &mut Vec<&'a Span>, out: &mut String) {
    let mut reopen = Vec::new();
    while open.iter().any(|s| s.end <= pos) {
        let Some(span) = open.pop() else { break };
        out.push_str(close_tag(span));
        if span.end > pos {
            reopen.push(span);
        }
    }
    for span in reopen.into_iter().rev() {
        out.push_str(&open_tag(span));
        open.push(span);
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => {
            let data = span.data.as_ref();
            let url = data
                .and_then(|d| d.get("url"))
                .and_then(Value::as_str)
                .unwrap_or("#");
            let blank = data
                .and_then(|d| d.get("target"))
                .and_then(Value::as_str)
                == Some("_blank");
            let target = if blank {
                r#" target="_blank" rel="noopener noreferrer""#
            } else {
                ""
            };
            format!(
                r#"<a href="{}"{}>"#,
                html_escape::encode_double_quoted_attribute(url),
                target
            )
        }
        SpanKind::Label => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!(
                r#"<span class="{}">"#,
                html_escape::encode_double_quoted_attribute(label)
            )
        }
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label | SpanKind::Unknown => "</span>",
    }
}
