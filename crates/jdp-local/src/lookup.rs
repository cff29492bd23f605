//! Term lookup: search, fetch the page text, reduce it to a display excerpt.

use crate::cache::{TermCache, MIN_CACHEABLE_CHARS};
use crate::wiki::{clean_query, page_url};
use jdp_core::{
    excerpt_for, snippet_excerpt_for, DefinitionSource, Error, ExcerptLimits, ExtractRequest,
    Result, SearchHit, SearchQuery,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Plain-text page extract.
    Extract,
    /// Search snippet HTML (extract failed or was empty).
    Snippet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub query: String,
    pub title: String,
    pub pageid: u64,
    pub url: String,
    pub excerpt: String,
    pub source: ContentSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found(Definition),
    NotFound { query: String },
}

pub struct Definer {
    source: Arc<dyn DefinitionSource>,
    cache: Arc<TermCache>,
    limits: ExcerptLimits,
    wiki_base_url: String,
    timeout_ms: Option<u64>,
}

impl Definer {
    pub fn new(
        source: Arc<dyn DefinitionSource>,
        cache: Arc<TermCache>,
        limits: ExcerptLimits,
        wiki_base_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            cache,
            limits: limits.normalized(),
            wiki_base_url: wiki_base_url.into(),
            timeout_ms: None,
        }
    }

    /// Per-request timeout passed down to the source.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn cache(&self) -> &TermCache {
        &self.cache
    }

    pub fn limits(&self) -> &ExcerptLimits {
        &self.limits
    }

    /// Best single definition for `term`.
    pub async fn define(&self, term: &str) -> Result<LookupOutcome> {
        let query = clean_query(term);
        if query.is_empty() {
            tracing::debug!(term, "query is empty after cleaning");
            return Ok(LookupOutcome::NotFound { query });
        }

        let mut q = SearchQuery::new(query.clone());
        q.max_results = Some(1);
        q.timeout_ms = self.timeout_ms;
        let resp = self.source.search(&q).await?;
        let Some(hit) = resp.hits.into_iter().next() else {
            tracing::debug!(%query, "no search results");
            return Ok(LookupOutcome::NotFound { query });
        };
        tracing::debug!(%query, title = %hit.title, pageid = hit.pageid, "search hit");

        let def = self.definition_for(&query, hit, false).await?;
        Ok(LookupOutcome::Found(def))
    }

    /// Up to `max` results, each with an intro excerpt.
    pub async fn search(&self, term: &str, max: usize) -> Result<Vec<Definition>> {
        let query = clean_query(term);
        if query.is_empty() || max == 0 {
            return Ok(Vec::new());
        }
        let mut q = SearchQuery::new(query.clone());
        q.max_results = Some(max);
        q.timeout_ms = self.timeout_ms;
        let resp = self.source.search(&q).await?;

        let jobs = resp
            .hits
            .into_iter()
            .take(max)
            .map(|hit| self.definition_for(&query, hit, true));
        futures_util::future::join_all(jobs)
            .await
            .into_iter()
            .collect()
    }

    /// Full page text for "read more", served from the cache when fresh.
    pub async fn full_text(&self, title: &str) -> Result<String> {
        if let Some(hit) = self.cache.get(title) {
            tracing::debug!(title, "full text cache hit");
            return Ok(hit);
        }
        let mut req = ExtractRequest::title(title);
        req.timeout_ms = self.timeout_ms;
        let page = self
            .source
            .extract(&req)
            .await?
            .ok_or_else(|| Error::Extract(format!("page not found: {title}")))?;
        if page.extract.chars().count() <= MIN_CACHEABLE_CHARS {
            return Err(Error::Extract(format!(
                "content too short or empty for: {title}"
            )));
        }
        self.cache.insert(title, &page.extract);
        Ok(page.extract)
    }

    async fn definition_for(
        &self,
        query: &str,
        hit: SearchHit,
        intro_only: bool,
    ) -> Result<Definition> {
        let mut req = ExtractRequest::page_id(hit.pageid);
        req.intro_only = intro_only;
        req.timeout_ms = self.timeout_ms;

        let extract = match self.source.extract(&req).await {
            Ok(Some(page)) if !page.extract.is_empty() => Some(page.extract),
            Ok(_) => {
                tracing::debug!(pageid = hit.pageid, "empty extract, using snippet");
                None
            }
            Err(e) => {
                tracing::warn!(pageid = hit.pageid, error = %e, "extract failed, using snippet");
                None
            }
        };

        let (excerpt, source) = match extract {
            Some(text) => {
                // Intro-only text is not the full page; keep it out of the full-text cache.
                if !intro_only {
                    self.cache.insert(&hit.title, &text);
                }
                (excerpt_for(&text, query, &self.limits), ContentSource::Extract)
            }
            None => (
                snippet_excerpt_for(&hit.snippet, query, &self.limits),
                ContentSource::Snippet,
            ),
        };

        Ok(Definition {
            query: query.to_string(),
            url: page_url(&self.wiki_base_url, &hit.title)?,
            excerpt,
            title: hit.title,
            pageid: hit.pageid,
            source,
        })
    }
}
