use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

use crate::config::FetchConfig;

// ── Documents ──

/// One entry of `<item>/discussions.json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Discussion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub resolvable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resolved: bool,
}

/// `<item>/diffs_metadata.json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiffsMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub diff_files: Vec<DiffFileMeta>,
    #[serde(default)]
    pub project_path: Option<String>,
}

/// Per-file line counts as reported by the diff metadata endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiffFileMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub new_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub added_lines: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub removed_lines: u64,
}

/// GitLab sends `null` for fields it has no value for
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// State of a merge request as shown by its status icon's `aria-label`
#[derive(Debug, Clone, PartialEq)]
pub enum MergeRequestState {
    Opened,
    Merged,
    Closed,
    Other(String),
}

impl MergeRequestState {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "opened" => MergeRequestState::Opened,
            "merged" => MergeRequestState::Merged,
            "closed" => MergeRequestState::Closed,
            other => MergeRequestState::Other(other.to_string()),
        }
    }
}

// ── Sub-resource URLs ──

pub fn discussions_url(item_url: &str) -> String {
    format!("{}/discussions.json", item_url.trim_end_matches('/'))
}

pub fn diffs_metadata_url(item_url: &str) -> String {
    format!("{}/diffs_metadata.json", item_url.trim_end_matches('/'))
}

// ── Fetching ──

/// Why a metadata request produced no document
#[derive(Debug)]
pub enum FetchError {
    /// Connection, DNS, TLS or body read failure
    Transport(String),
    /// Non-success HTTP status
    Status { code: u16, reason: String },
    /// Body was not valid JSON
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status { code, reason } => write!(f, "HTTP {code} {reason}"),
            FetchError::Decode(msg) => write!(f, "invalid JSON: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Source of remote JSON documents. Never fails loudly: an unavailable
/// document is `None`.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch_json(&self, url: &str) -> Option<Value>;
}

/// Fetches metadata from the GitLab instance over HTTP
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client carrying the configured extra headers (e.g. a session cookie).
    /// No request timeout is set.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header '{name}'"))?;
            headers.insert(name, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn try_fetch_json(&self, url: &str) -> std::result::Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Decode(e.to_string())
            } else {
                FetchError::Transport(e.to_string())
            }
        })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        match self.try_fetch_json(url).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to fetch GitLab data");
                None
            }
        }
    }
}

/// Fetch and parse an item's discussion list
pub async fn fetch_discussions<F: Fetch>(fetcher: &F, item_url: &str) -> Option<Vec<Discussion>> {
    let url = discussions_url(item_url);
    let value = fetcher.fetch_json(&url).await?;
    match serde_json::from_value(value) {
        Ok(discussions) => Some(discussions),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Unexpected discussions document");
            None
        }
    }
}

/// Fetch and parse an item's diff metadata
pub async fn fetch_diffs_metadata<F: Fetch>(fetcher: &F, item_url: &str) -> Option<DiffsMetadata> {
    let url = diffs_metadata_url(item_url);
    let value = fetcher.fetch_json(&url).await?;
    match serde_json::from_value(value) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Unexpected diff metadata document");
            None
        }
    }
}

/// Canned documents keyed by URL; records every request
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StaticFetcher {
    documents: std::collections::HashMap<String, Value>,
    requests: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl StaticFetcher {
    pub(crate) fn with(mut self, url: &str, document: Value) -> Self {
        self.documents.insert(url.to_string(), document);
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[cfg(test)]
impl Fetch for StaticFetcher {
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        self.requests.borrow_mut().push(url.to_string());
        self.documents.get(url).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchConfig::default()).unwrap()
    }

    // ── Document parsing ──

    #[test]
    fn discussions_tolerate_missing_and_null_fields() {
        let value = json!([
            {"resolvable": true, "resolved": null},
            {"id": "abc"},
            {"resolvable": false, "resolved": true}
        ]);
        let parsed: Vec<Discussion> = serde_json::from_value(value).unwrap();
        assert_eq!(
            parsed,
            vec![
                Discussion { resolvable: true, resolved: false },
                Discussion { resolvable: false, resolved: false },
                Discussion { resolvable: false, resolved: true },
            ]
        );
    }

    #[test]
    fn diffs_metadata_defaults_missing_fields() {
        let meta: DiffsMetadata = serde_json::from_value(json!({
            "diff_files": [{"new_path": "a.ts", "added_lines": 3}],
            "real_size": "1"
        }))
        .unwrap();
        assert_eq!(meta.project_path, None);
        assert_eq!(meta.diff_files[0].removed_lines, 0);

        let empty: DiffsMetadata = serde_json::from_value(json!({"diff_files": null})).unwrap();
        assert!(empty.diff_files.is_empty());
    }

    #[test]
    fn merge_request_state_from_label() {
        assert_eq!(MergeRequestState::from_label("opened"), MergeRequestState::Opened);
        assert_eq!(MergeRequestState::from_label(" merged "), MergeRequestState::Merged);
        assert_eq!(MergeRequestState::from_label("closed"), MergeRequestState::Closed);
        assert_eq!(
            MergeRequestState::from_label("locked"),
            MergeRequestState::Other("locked".into())
        );
    }

    #[test]
    fn sub_resource_urls_trim_trailing_slash() {
        assert_eq!(
            discussions_url("https://h/g/p/-/merge_requests/4/"),
            "https://h/g/p/-/merge_requests/4/discussions.json"
        );
        assert_eq!(
            diffs_metadata_url("https://h/g/p/-/merge_requests/4"),
            "https://h/g/p/-/merge_requests/4/diffs_metadata.json"
        );
    }

    #[test]
    fn new_rejects_invalid_header_name() {
        let mut config = FetchConfig::default();
        config.headers.insert("bad header".into(), "x".into());
        let err = HttpFetcher::new(&config).err().unwrap();
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn fetch_error_display() {
        let e = FetchError::Status { code: 404, reason: "Not Found".into() };
        assert_eq!(e.to_string(), "HTTP 404 Not Found");
        assert_eq!(FetchError::Decode("eof".into()).to_string(), "invalid JSON: eof");
    }

    // ── HTTP ──

    #[tokio::test]
    async fn fetch_json_sends_json_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/g/p/-/merge_requests/1/discussions.json")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"resolvable": true, "resolved": true}]"#)
            .create_async()
            .await;

        let url = format!("{}/g/p/-/merge_requests/1/discussions.json", server.url());
        let value = fetcher().fetch_json(&url).await;
        assert_eq!(value, Some(json!([{"resolvable": true, "resolved": true}])));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_classified_and_soft_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing/diffs_metadata.json")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing/diffs_metadata.json", server.url());
        let f = fetcher();
        match f.try_fetch_json(&url).await {
            Err(FetchError::Status { code, reason }) => {
                assert_eq!(code, 404);
                assert_eq!(reason, "Not Found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert_eq!(f.fetch_json(&url).await, None);
    }

    #[tokio::test]
    async fn invalid_json_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("<html>sign in</html>")
            .create_async()
            .await;

        let url = format!("{}/page", server.url());
        assert!(matches!(
            fetcher().try_fetch_json(&url).await,
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        // Port 9 (discard) is not served locally
        let result = fetcher().try_fetch_json("http://127.0.0.1:9/x.json").await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn configured_headers_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/mr/diffs_metadata.json")
            .match_header("cookie", "_gitlab_session=abc")
            .with_status(200)
            .with_body(r#"{"diff_files": [], "project_path": "g/p"}"#)
            .create_async()
            .await;

        let mut config = FetchConfig::default();
        config.headers.insert("Cookie".into(), "_gitlab_session=abc".into());
        let f = HttpFetcher::new(&config).unwrap();

        let meta = fetch_diffs_metadata(&f, &format!("{}/mr", server.url())).await.unwrap();
        assert_eq!(meta.project_path.as_deref(), Some("g/p"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn supplied_client_is_used() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/mr/discussions.json")
            .match_header("user-agent", "issue-booster-test")
            .with_status(200)
            .with_body(r#"[{"resolvable": true}]"#)
            .create_async()
            .await;

        let client = reqwest::Client::builder()
            .user_agent("issue-booster-test")
            .build()
            .unwrap();
        let f = HttpFetcher::with_client(client);
        let discussions = fetch_discussions(&f, &format!("{}/mr", server.url())).await.unwrap();
        assert_eq!(discussions, vec![Discussion { resolvable: true, resolved: false }]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn wrong_document_shape_is_unavailable() {
        let fetcher = StaticFetcher::default()
            .with("https://h/mr/discussions.json", json!({"message": "401 Unauthorized"}));
        assert_eq!(fetch_discussions(&fetcher, "https://h/mr").await, None);
        assert_eq!(fetcher.requests(), vec!["https://h/mr/discussions.json".to_string()]);
    }
}
