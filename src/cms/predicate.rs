//! Query predicates in the CMS search syntax
//!
//! ```ignore
//! Predicate::at("document.type", "posts").to_string() // -> [at(document.type, "posts")]
//! ```

use std::fmt;

/// A single search predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Field equals value
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Documents of the given custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// The document of `doc_type` whose uid is `uid`
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::At { path, value } => write!(f, "[at({}, {})]", path, quote(value)),
        }
    }
}

/// Render a list of predicates as the `q` query parameter
pub fn to_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(|p| p.to_string()).collect();
    format!("[{}]", inner)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
