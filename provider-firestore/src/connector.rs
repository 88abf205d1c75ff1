//! Firestore REST connector
//!
//! Implements the `RemoteCatalog` trait for the Firestore v1 REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogDocument, RemoteCatalog};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use tracing::{debug, info, instrument, warn};

use crate::error::FirestoreError;
use crate::types::{FirestoreDocument, ListDocumentsResponse};

/// Firestore REST API base URL
const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Maximum documents per page
const DEFAULT_PAGE_SIZE: u32 = 300;

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Connection settings for one Firestore database
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database_id: String,
    /// Web API key appended as `key=`; public rules need none
    pub api_key: Option<String>,
    pub page_size: u32,
    pub max_retries: u32,
    /// First backoff delay; doubled on each retry
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    pub base_url: String,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: "(default)".to_string(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
            request_timeout: Duration::from_secs(30),
            base_url: FIRESTORE_API_BASE.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_database(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = database_id.into();
        self
    }

    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_base_delay = base_delay;
        self
    }

    /// Point at another endpoint, e.g. the local emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url,
            urlencoding::encode(&self.project_id),
            urlencoding::encode(&self.database_id)
        )
    }
}

/// Firestore catalog connector
///
/// # Example
///
/// ```ignore
/// use provider_firestore::{FirestoreCatalog, FirestoreConfig};
/// use bridge_traits::catalog::RemoteCatalog;
///
/// let catalog = FirestoreCatalog::new(FirestoreConfig::new("stems-prod"), http_client);
/// let songs = catalog.list_documents("songs").await?;
/// ```
pub struct FirestoreCatalog {
    config: FirestoreConfig,
    http_client: Arc<dyn HttpClient>,
}

impl FirestoreCatalog {
    pub fn new(config: FirestoreConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn list_url(&self, collection: &str, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/{}?pageSize={}",
            self.config.documents_root(),
            urlencoding::encode(collection),
            self.config.page_size
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }
        self.with_key(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        let url = format!(
            "{}/{}/{}",
            self.config.documents_root(),
            urlencoding::encode(collection),
            urlencoding::encode(id)
        );
        self.with_key(url)
    }

    fn with_key(&self, mut url: String) -> String {
        if let Some(key) = &self.config.api_key {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&format!("key={}", urlencoding::encode(key)));
        }
        url
    }

    /// Execute API request with retry logic
    ///
    /// Retries 429 and 5xx responses and transport errors with exponential
    /// backoff. A 404 is returned to the caller as-is.
    #[instrument(skip(self, url))]
    async fn execute_with_retry(&self, url: &str) -> Result<HttpResponse> {
        let max_retries = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            let request = HttpRequest::new(HttpMethod::Get, url)
                .header("Accept", "application/json")
                .timeout(self.config.request_timeout);

            let retry_reason = match self.http_client.execute(request).await {
                Ok(response) if response.is_success() || response.status == 404 => {
                    debug!(status = response.status, "API request finished");
                    return Ok(response);
                }
                Ok(response) if response.status == 429 || response.is_server_error() => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!(
                            "API request failed after {} attempts: status={}",
                            max_retries, response.status
                        );
                        return Err(FirestoreError::ApiError {
                            status_code: response.status,
                            message: format!("Request failed after {} retries", max_retries),
                        }
                        .into());
                    }
                    format!("status={}", response.status)
                }
                Ok(response) => {
                    warn!("API request failed: status={}", response.status);
                    return Err(FirestoreError::ApiError {
                        status_code: response.status,
                        message: String::from_utf8_lossy(&response.body).to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!("API request failed after {} attempts: {}", max_retries, e);
                        return Err(e);
                    }
                    e.to_string()
                }
            };

            let backoff = backoff_delay(self.config.retry_base_delay, attempt);
            warn!(
                "API request failed (attempt {}/{}): {}, retrying in {}ms",
                attempt,
                max_retries,
                retry_reason,
                backoff.as_millis()
            );
            tokio::time::sleep(backoff).await;
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(response: &HttpResponse, what: &str) -> Result<T> {
        serde_json::from_slice(&response.body).map_err(|e| {
            FirestoreError::ParseError(format!("Failed to parse {}: {}", what, e)).into()
        })
    }
}

/// `base * 2^(attempt - 1)`, capped at [`MAX_BACKOFF`]
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.checked_mul(factor)
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

#[async_trait]
impl RemoteCatalog for FirestoreCatalog {
    #[instrument(skip(self))]
    async fn list_documents(&self, collection: &str) -> Result<Vec<CatalogDocument>> {
        info!("Listing documents from Firestore");

        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        loop {
            let url = self.list_url(collection, page_token.as_deref());
            let response = self.execute_with_retry(&url).await?;
            if response.status == 404 {
                debug!("Collection not found, treating as empty");
                break;
            }

            let page: ListDocumentsResponse = Self::parse(&response, "documents list")?;
            pages += 1;

            for doc in page.documents {
                let name = doc.name.clone();
                match doc.into_catalog_document() {
                    Ok(doc) => documents.push(doc),
                    Err(e) => warn!(document = %name, error = %e, "Skipping undecodable document"),
                }
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("Listed {} documents in {} pages", documents.len(), pages);
        Ok(documents)
    }

    #[instrument(skip(self))]
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<CatalogDocument>> {
        let response = self.execute_with_retry(&self.document_url(collection, id)).await?;
        if response.status == 404 {
            return Ok(None);
        }

        let doc: FirestoreDocument = Self::parse(&response, "document")?;
        Ok(Some(doc.into_catalog_document()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mockall::mock;
    use serde_json::json;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn config() -> FirestoreConfig {
        FirestoreConfig::new("stems-test").with_retry(3, Duration::from_millis(1))
    }

    fn song(id: &str, name: &str) -> serde_json::Value {
        json!({
            "name": format!("projects/stems-test/databases/(default)/documents/songs/{}", id),
            "fields": { "name": { "stringValue": name } }
        })
    }

    #[test]
    fn test_urls() {
        let catalog = FirestoreCatalog::new(
            config().with_api_key("k/1"),
            Arc::new(MockHttpClient::new()),
        );

        assert_eq!(
            catalog.list_url("songs", Some("tok=")),
            "https://firestore.googleapis.com/v1/projects/stems-test/databases/%28default%29/documents/songs?pageSize=300&pageToken=tok%3D&key=k%2F1"
        );
        assert_eq!(
            catalog.document_url("setlists", "abc"),
            "https://firestore.googleapis.com/v1/projects/stems-test/databases/%28default%29/documents/setlists/abc?key=k%2F1"
        );
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let base = Duration::from_millis(200);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(base, 4), Duration::from_millis(1_600));
        assert_eq!(backoff_delay(base, 33), MAX_BACKOFF);
        assert_eq!(backoff_delay(base, u32::MAX), MAX_BACKOFF);
        assert_eq!(backoff_delay(Duration::MAX, 2), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn test_list_documents_follows_pages() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(!req.url.contains("pageToken"));
                assert_eq!(req.headers.get("Accept").map(String::as_str), Some("application/json"));
                Ok(response(
                    200,
                    json!({ "documents": [song("a", "One"), song("b", "Two")], "nextPageToken": "p2" }),
                ))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.contains("pageToken=p2"));
                Ok(response(200, json!({ "documents": [song("c", "Three")] })))
            });

        let catalog = FirestoreCatalog::new(config(), Arc::new(mock_http));
        let docs = catalog.list_documents("songs").await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(docs[2].str_field("name"), Some("Three"));
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, json!({}))));

        let catalog = FirestoreCatalog::new(config(), Arc::new(mock_http));
        assert!(catalog.list_documents("setlists").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_document_is_skipped() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                200,
                json!({ "documents": [
                    song("ok", "Fine"),
                    {
                        "name": "projects/stems-test/databases/(default)/documents/songs/bad",
                        "fields": { "tempo": { "integerValue": "fast" } }
                    }
                ] }),
            ))
        });

        let catalog = FirestoreCatalog::new(config(), Arc::new(mock_http));
        let docs = catalog.list_documents("songs").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "ok");
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(503, json!({}))));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, json!({ "documents": [song("a", "One")] }))));

        let catalog = FirestoreCatalog::new(config(), Arc::new(mock_http));
        assert_eq!(catalog.list_documents("songs").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(3)
            .returning(|_| Ok(response(429, json!({}))));

        let catalog = FirestoreCatalog::new(config(), Arc::new(mock_http));
        let err = catalog.list_documents("songs").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                403,
                json!({ "error": { "message": "Missing or insufficient permissions." } }),
            ))
        });

        let catalog = FirestoreCatalog::new(config(), Arc::new(mock_http));
        let err = catalog.list_documents("songs").await.unwrap_err();
        assert!(err.to_string().contains("insufficient permissions"));
    }

    #[tokio::test]
    async fn test_get_document() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.ends_with("/documents/songs/a"));
                Ok(response(200, song("a", "One")))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(404, json!({ "error": { "code": 404 } }))));

        let catalog = FirestoreCatalog::new(config(), Arc::new(mock_http));

        let doc = catalog.get_document("songs", "a").await.unwrap().unwrap();
        assert_eq!(doc.str_field("name"), Some("One"));
        assert!(catalog.get_document("songs", "zzz").await.unwrap().is_none());
    }
}
