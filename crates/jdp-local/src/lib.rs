use jdp_core::{Error, Result};
use std::time::Duration;

pub mod cache;
pub mod config;
pub mod lookup;
pub mod pending;
pub mod webhook;
pub mod wiki;

pub use cache::TermCache;
pub use config::Settings;
pub use lookup::{Definer, Definition, LookupOutcome};
pub use pending::PendingStore;
pub use webhook::WebhookSink;
pub use wiki::MediaWikiClient;

/// Cap on any single API response body.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Shared HTTP client for the wiki API and the webhook.
///
/// `timeout` is the overall default; per-request timeouts override it.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("jdp/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Search(e.to_string()))
}

/// Stream a response body into memory, failing past `max_bytes`.
pub(crate) async fn read_body_capped(
    resp: reqwest::Response,
    max_bytes: usize,
    map_err: fn(String) -> Error,
) -> Result<Vec<u8>> {
    use futures_util::StreamExt;
    let mut bytes = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| map_err(e.to_string()))?;
        if bytes.len().saturating_add(chunk.len()) > max_bytes {
            return Err(map_err(format!("response exceeds {max_bytes} bytes")));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
