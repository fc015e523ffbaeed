//! Prismic REST API client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::raw::ApiInfo;
use super::{to_query, CmsError, ContentStore, Predicate, QueryOptions, RawDocument, RawPage};
use crate::config::CmsConfig;

/// HTTP client for a Prismic repository
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    /// Master ref, resolved once per client
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    /// Build a client from the `cms` config section
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let endpoint = config.endpoint.trim();
        if endpoint.is_empty() {
            return Err(CmsError::NotConfigured);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            master_ref: OnceCell::new(),
        })
    }

    /// Resolve (and remember) the master ref from the API entry point
    async fn master_ref(&self) -> Result<&str, CmsError> {
        let reference = self
            .master_ref
            .get_or_try_init(|| async {
                let info: ApiInfo = self.get_json(&self.endpoint, &[]).await?;
                let reference = info
                    .master_ref()
                    .map(str::to_string)
                    .ok_or_else(|| CmsError::NoMasterRef(self.endpoint.clone()))?;
                tracing::debug!("Resolved master ref {}", reference);
                Ok::<_, CmsError>(reference)
            })
            .await?;
        Ok(reference.as_str())
    }

    async fn search(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<RawPage, CmsError> {
        let reference = self.master_ref().await?.to_string();
        let q = to_query(predicates);
        tracing::debug!(q = %q, "Querying CMS");

        let mut params = vec![("ref", reference), ("q", q)];
        if let Some(page_size) = options.page_size {
            params.push(("pageSize", page_size.to_string()));
        }
        if let Some(page) = options.page {
            params.push(("page", page.to_string()));
        }
        if let Some(orderings) = &options.orderings {
            params.push(("orderings", orderings.clone()));
        }

        let url = format!("{}/documents/search", self.endpoint);
        self.get_json(&url, &params).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, CmsError> {
        let mut request = self.http.get(url).query(params);
        if let Some(token) = &self.access_token {
            // Cursors handed out by the API already carry the token
            if !url.contains("access_token=") {
                request = request.query(&[("access_token", token)]);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentStore for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<RawPage, CmsError> {
        self.search(predicates, options).await
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
    ) -> Result<Option<RawDocument>, CmsError> {
        let page = self
            .search(&[Predicate::uid(doc_type, uid)], &QueryOptions::page_size(1))
            .await?;
        Ok(page.results.into_iter().next())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<RawPage, CmsError> {
        tracing::debug!("Fetching next page {}", cursor);
        self.get_json(cursor, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn doc(uid: &str) -> serde_json::Value {
        json!({
            "id": format!("id-{}", uid),
            "uid": uid,
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-15T19:25:28+0000",
            "data": { "title": uid, "subtitle": "", "author": "Joseph" }
        })
    }

    async fn api_info() -> Json<serde_json::Value> {
        Json(json!({ "refs": [{ "id": "master", "ref": "M1", "isMasterRef": true }] }))
    }

    async fn search(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        if params.get("ref").map(String::as_str) != Some("M1") {
            return StatusCode::BAD_REQUEST.into_response();
        }
        let q = params.get("q").cloned().unwrap_or_default();

        if q.contains("my.posts.uid") {
            let results = if q.contains("\"hello\"") {
                vec![doc("hello")]
            } else {
                vec![]
            };
            return Json(json!({ "page": 1, "next_page": null, "results": results }))
                .into_response();
        }

        if params.get("page").map(String::as_str) == Some("2") {
            return Json(json!({ "page": 2, "next_page": null, "results": [doc("c")] }))
                .into_response();
        }

        let host = headers
            .get("host")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        let next = format!("http://{}/api/v2/documents/search?ref=M1&page=2", host);
        Json(json!({
            "page": 1,
            "page_size": params.get("pageSize"),
            "next_page": next,
            "results": [doc("a"), doc("b")]
        }))
        .into_response()
    }

    async fn private_info(Query(params): Query<HashMap<String, String>>) -> Response {
        if params.get("access_token").map(String::as_str) == Some("secret") {
            api_info().await.into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    }

    async fn spawn_fixture() -> String {
        let app = Router::new()
            .route("/api/v2", get(api_info))
            .route("/api/v2/documents/search", get(search))
            .route("/private/api/v2", get(private_info))
            .route(
                "/broken/api/v2",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: &str, path: &str, token: Option<&str>) -> PrismicClient {
        let config = CmsConfig {
            endpoint: format!("{}{}", base, path),
            access_token: token.map(str::to_string),
            ..Default::default()
        };
        PrismicClient::new(&config).unwrap()
    }

    #[test]
    fn test_requires_endpoint() {
        let result = PrismicClient::new(&CmsConfig::default());
        assert!(matches!(result, Err(CmsError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_query_and_follow_cursor() {
        let base = spawn_fixture().await;
        let client = client(&base, "/api/v2/", None);

        let first = client
            .query(
                &[Predicate::document_type("posts")],
                &QueryOptions::page_size(2),
            )
            .await
            .unwrap();
        let uids: Vec<_> = first.results.iter().filter_map(|d| d.uid.clone()).collect();
        assert_eq!(uids, ["a", "b"]);

        let cursor = first.next_page.expect("first page has a cursor");
        let second = client.fetch_page(&cursor).await.unwrap();
        assert_eq!(second.results[0].uid.as_deref(), Some("c"));
        assert!(second.next_page.is_none());
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let base = spawn_fixture().await;
        let client = client(&base, "/api/v2", None);

        let found = client.get_by_uid("posts", "hello").await.unwrap();
        assert_eq!(found.and_then(|d| d.uid).as_deref(), Some("hello"));

        let missing = client.get_by_uid("posts", "missing").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_error_status() {
        let base = spawn_fixture().await;
        let client = client(&base, "/broken/api/v2", None);

        let err = client
            .query(&[Predicate::document_type("posts")], &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_access_token_is_forwarded() {
        let base = spawn_fixture().await;

        let anonymous = client(&base, "/private/api/v2", None);
        assert!(matches!(
            anonymous.master_ref().await,
            Err(CmsError::Status { status: 401, .. })
        ));

        let authorized = client(&base, "/private/api/v2", Some("secret"));
        assert_eq!(authorized.master_ref().await.unwrap(), "M1");
    }
}
