//! Wire shapes returned by the CMS search API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document exactly as the CMS returns it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    /// Custom type fields (title, subtitle, content, ...)
    #[serde(default)]
    pub data: Value,

    /// Everything else: href, tags, slugs, lang, alternate_languages, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of a search response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub page: u32,

    #[serde(default)]
    pub results_per_page: u32,

    #[serde(default)]
    pub total_results_size: u32,

    #[serde(default)]
    pub total_pages: u32,

    /// Absolute URL of the next page, `null` on the last page
    #[serde(default)]
    pub next_page: Option<String>,

    #[serde(default)]
    pub prev_page: Option<String>,

    #[serde(default)]
    pub results: Vec<RawDocument>,
}

/// API entry point document (`GET /api/v2`)
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRef {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "page": 1,
            "results_per_page": 1,
            "results_size": 1,
            "total_results_size": 3,
            "total_pages": 3,
            "next_page": "https://blog.cdn.prismic.io/api/v2/documents/search?page=2",
            "prev_page": null,
            "results": [{
                "id": "YBNq1BAAACMAM3Oc",
                "uid": "como-utilizar-hooks",
                "type": "posts",
                "href": "https://blog.cdn.prismic.io/api/v2/documents/search?ref=x",
                "tags": [],
                "slugs": ["como-utilizar-hooks"],
                "lang": "pt-br",
                "alternate_languages": [],
                "first_publication_date": "2021-03-15T19:25:28+0000",
                "last_publication_date": "2021-03-15T19:25:28+0000",
                "data": { "title": "Como utilizar Hooks" }
            }],
            "version": "d5a7e2a",
            "license": "All Rights Reserved"
        }"#;

        let page: RawPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages, 3);
        assert!(page.next_page.is_some());
        assert_eq!(page.results.len(), 1);

        let doc = &page.results[0];
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(doc.doc_type, "posts");
        assert!(doc.extra.contains_key("slugs"));
        assert_eq!(doc.data["title"], "Como utilizar Hooks");
    }

    #[test]
    fn test_master_ref() {
        let json = r#"{"refs": [
            {"id": "preview", "ref": "P1", "label": "Preview"},
            {"id": "master", "ref": "M1", "label": "Master", "isMasterRef": true}
        ]}"#;
        let info: ApiInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.master_ref(), Some("M1"));

        let empty: ApiInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.master_ref(), None);
    }
}
