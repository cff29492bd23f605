use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod excerpt;
pub mod languages;
pub mod outline;
pub mod sanitize;
pub mod segment;

pub use excerpt::{to_excerpt, ExcerptLimits};
pub use sanitize::{sanitize, sanitize_snippet};
pub use segment::{select_content_line, FALLBACK_MESSAGE};

/// Raw API text (snippet HTML or plain extract) to a display excerpt.
///
/// `sanitize` -> `select_content_line` -> `to_excerpt`. Total: empty or
/// unusable input yields [`FALLBACK_MESSAGE`].
pub fn excerpt_for(raw: &str, query_term: &str, limits: &ExcerptLimits) -> String {
    let clean = sanitize(raw);
    let line = select_content_line(&clean, query_term);
    to_excerpt(&line, limits)
}

/// [`excerpt_for`] for search snippets, which are escaped HTML even without tags.
pub fn snippet_excerpt_for(raw: &str, query_term: &str, limits: &ExcerptLimits) -> String {
    let clean = sanitize_snippet(raw);
    let line = select_content_line(&clean, query_term);
    to_excerpt(&line, limits)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("extract failed: {0}")]
    Extract(String),
    #[error("webhook failed: {0}")]
    Webhook(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl Error {
    /// Stable machine-readable code for JSON envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidUrl(_) => "invalid_url",
            Error::Search(_) => "search_failed",
            Error::Extract(_) => "extract_failed",
            Error::Webhook(_) => "webhook_failed",
            Error::Store(_) => "store_failed",
            Error::NotConfigured(_) => "not_configured",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
    pub timeout_ms: Option<u64>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            timeout_ms: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub pageid: u64,
    /// Raw snippet HTML as returned by the search API.
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub provider: String,
    pub timings_ms: BTreeMap<String, u128>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum ExtractTarget {
    PageId(u64),
    Title(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    pub target: ExtractTarget,
    /// Only the lead section (`exintro=1`).
    pub intro_only: bool,
    pub timeout_ms: Option<u64>,
}

impl ExtractRequest {
    pub fn page_id(pageid: u64) -> Self {
        Self {
            target: ExtractTarget::PageId(pageid),
            intro_only: false,
            timeout_ms: None,
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            target: ExtractTarget::Title(title.into()),
            intro_only: false,
            timeout_ms: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageExtract {
    pub pageid: Option<u64>,
    pub title: Option<String>,
    /// Plain-text extract (`explaintext=1`), trimmed. May be empty.
    pub extract: String,
}

/// A wiki that can answer "search" and "give me the text of this page".
#[async_trait::async_trait]
pub trait DefinitionSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse>;
    /// `Ok(None)` means the page does not exist.
    async fn extract(&self, req: &ExtractRequest) -> Result<Option<PageExtract>>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefinitionRequest {
    pub term: String,
    pub page_url: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestReceipt {
    pub message: Option<String>,
    /// Spreadsheet row, when the backend reports one.
    pub row: Option<u64>,
}

#[async_trait::async_trait]
pub trait RequestSink: Send + Sync {
    async fn submit(&self, req: &DefinitionRequest) -> Result<RequestReceipt>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(Error::NotConfigured("x".into()).code(), "not_configured");
        assert_eq!(Error::Search("x".into()).code(), "search_failed");
        assert_eq!(Error::Webhook("x".into()).code(), "webhook_failed");
    }

    #[test]
    fn pipeline_picks_answer_after_heading_and_trims_it() {
        let raw = "Reviewed by: Editorial team\nWhat is Bail?\nBail is the conditional release of an accused person pending trial, usually against a bond or surety. It may be granted by a police officer or a court. Conditions can apply.\nSee also";
        let out = excerpt_for(raw, "Bail", &ExcerptLimits::default());
        assert_eq!(
            out,
            "Bail is the conditional release of an accused person pending trial, usually against a bond or surety."
        );
    }

    #[test]
    fn pipeline_on_empty_input_is_the_fallback_message() {
        assert_eq!(excerpt_for("", "x", &ExcerptLimits::default()), FALLBACK_MESSAGE);
    }

    #[test]
    fn snippet_pipeline_decodes_entities_without_tags() {
        let raw = "A &quot;bail bond&quot; is an undertaking &amp; surety";
        let want = "A \"bail bond\" is an undertaking & surety";
        assert_eq!(snippet_excerpt_for(raw, "bail bond", &ExcerptLimits::default()), want);
        assert_eq!(excerpt_for(raw, "bail bond", &ExcerptLimits::default()), want);
    }

    #[test]
    fn extract_target_serializes_tagged() {
        let v = serde_json::to_value(ExtractTarget::PageId(42)).unwrap();
        assert_eq!(v, serde_json::json!({"by": "page_id", "value": 42}));
        let v = serde_json::to_value(ExtractTarget::Title("Bail".into())).unwrap();
        assert_eq!(v, serde_json::json!({"by": "title", "value": "Bail"}));
    }
}
