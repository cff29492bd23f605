//! MediaWiki Action API client (`list=search` and `prop=extracts`).

use crate::config::Settings;
use jdp_core::{
    DefinitionSource, Error, ExtractRequest, ExtractTarget, PageExtract, Result, SearchHit,
    SearchQuery, SearchResponse,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_RESULTS: usize = 5;
pub const MAX_RESULTS_CAP: usize = 20;

fn clamp_timeout_ms(timeout_ms: Option<u64>, default_ms: u64) -> u64 {
    timeout_ms.unwrap_or(default_ms).clamp(1_000, 60_000)
}

/// Keep ASCII letters and spaces, collapse space runs, trim.
///
/// `"Bail (law)!"` -> `"Bail law"`.
pub fn clean_query(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical page URL: spaces become underscores, the title is one path segment.
pub fn page_url(wiki_base_url: &str, title: &str) -> Result<String> {
    let mut u = url::Url::parse(wiki_base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    {
        let mut segs = u
            .path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("not a base url: {wiki_base_url}")))?;
        segs.pop_if_empty().push(&title.replace(' ', "_"));
    }
    Ok(u.to_string())
}

/// The API endpoint must be an absolute http(s) URL.
pub fn validate_api_url(api_url: &str) -> Result<()> {
    let u = url::Url::parse(api_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    if !matches!(u.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme for api url: {}",
            u.scheme()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MediaWikiClient {
    client: reqwest::Client,
    api_url: String,
    default_timeout_ms: u64,
}

impl MediaWikiClient {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into();
        validate_api_url(&api_url)?;
        Ok(Self {
            client,
            api_url,
            default_timeout_ms: crate::config::DEFAULT_API_TIMEOUT_MS,
        })
    }

    pub fn from_settings(client: reqwest::Client, settings: &Settings) -> Result<Self> {
        let mut c = Self::new(client, settings.api_url.clone())?;
        c.default_timeout_ms = settings.api_timeout_ms;
        Ok(c)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, String)],
        timeout_ms: u64,
        map_err: fn(String) -> Error,
    ) -> Result<T> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(params)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| map_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(map_err(format!("wiki api HTTP {status}")));
        }
        let bytes = crate::read_body_capped(resp, crate::MAX_RESPONSE_BYTES, map_err).await?;
        serde_json::from_slice(&bytes).map_err(|e| map_err(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    info: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        format!(
            "wiki api error {}: {}",
            self.code.as_deref().unwrap_or("unknown"),
            self.info.as_deref().unwrap_or("")
        )
    }
}

#[derive(Debug, Deserialize)]
struct SearchApiResponse {
    query: Option<SearchApiQuery>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SearchApiQuery {
    #[serde(default)]
    search: Vec<SearchApiHit>,
}

#[derive(Debug, Deserialize)]
struct SearchApiHit {
    title: String,
    pageid: u64,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct ExtractApiResponse {
    query: Option<ExtractApiQuery>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ExtractApiQuery {
    /// Keyed by page id as a string; `"-1"` for a missing title.
    #[serde(default)]
    pages: BTreeMap<String, ExtractApiPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractApiPage {
    pageid: Option<u64>,
    title: Option<String>,
    extract: Option<String>,
    /// Present (as `""`) when the page does not exist.
    missing: Option<serde_json::Value>,
    invalid: Option<serde_json::Value>,
}

fn pick_page(q: ExtractApiQuery, target: &ExtractTarget) -> Option<ExtractApiPage> {
    let mut pages = q.pages;
    let page = match target {
        ExtractTarget::PageId(id) => pages.remove(&id.to_string()),
        ExtractTarget::Title(_) => None,
    };
    let page = page.or_else(|| pages.into_values().next())?;
    if page.missing.is_some() || page.invalid.is_some() {
        return None;
    }
    Some(page)
}

#[async_trait::async_trait]
impl DefinitionSource for MediaWikiClient {
    fn name(&self) -> &'static str {
        "mediawiki"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let max_results = q
            .max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_CAP);
        let params = [
            ("action", "query".to_string()),
            ("list", "search".to_string()),
            ("srprop", "snippet".to_string()),
            ("format", "json".to_string()),
            ("origin", "*".to_string()),
            ("srsearch", q.query.clone()),
        ];
        let timeout_ms = clamp_timeout_ms(q.timeout_ms, self.default_timeout_ms);
        let parsed: SearchApiResponse = self.get_json(&params, timeout_ms, Error::Search).await?;
        if let Some(err) = parsed.error {
            return Err(Error::Search(err.describe()));
        }

        let hits = parsed
            .query
            .map(|q| q.search)
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .map(|h| SearchHit {
                title: h.title,
                pageid: h.pageid,
                snippet: h.snippet,
            })
            .collect();

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());
        Ok(SearchResponse {
            hits,
            provider: self.name().to_string(),
            timings_ms,
        })
    }

    async fn extract(&self, req: &ExtractRequest) -> Result<Option<PageExtract>> {
        let mut params = vec![
            ("action", "query".to_string()),
            ("prop", "extracts".to_string()),
            ("explaintext", "1".to_string()),
            ("exsectionformat", "plain".to_string()),
            ("format", "json".to_string()),
            ("origin", "*".to_string()),
        ];
        match &req.target {
            ExtractTarget::PageId(id) => params.push(("pageids", id.to_string())),
            ExtractTarget::Title(t) => params.push(("titles", t.clone())),
        }
        if req.intro_only {
            params.push(("exintro", "1".to_string()));
        }
        let timeout_ms = clamp_timeout_ms(req.timeout_ms, self.default_timeout_ms);
        let parsed: ExtractApiResponse = self.get_json(&params, timeout_ms, Error::Extract).await?;
        if let Some(err) = parsed.error {
            return Err(Error::Extract(err.describe()));
        }
        let Some(q) = parsed.query else {
            return Ok(None);
        };
        Ok(pick_page(q, &req.target).map(|p| PageExtract {
            pageid: p.pageid,
            title: p.title,
            extract: p.extract.unwrap_or_default().trim().to_string(),
        }))
    }
}
