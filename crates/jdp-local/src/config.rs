use jdp_core::ExcerptLimits;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://jdc-definitions.wikibase.wiki/w/api.php";
pub const DEFAULT_WIKI_BASE_URL: &str = "https://jdc-definitions.wikibase.wiki/wiki/";
pub const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CACHE_TTL_S: u64 = 300;
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Runtime settings, read once from `JDP_*` environment variables.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub api_url: String,
    pub wiki_base_url: String,
    pub api_timeout_ms: u64,
    pub webhook_url: Option<String>,
    pub webhook_enabled: bool,
    /// Never serialized; `doctor` reports only whether it is set.
    #[serde(skip)]
    pub webhook_access_key: Option<String>,
    pub webhook_timeout_ms: u64,
    pub limits: ExcerptLimits,
    pub cache_ttl_s: u64,
    pub cache_capacity: usize,
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            wiki_base_url: DEFAULT_WIKI_BASE_URL.to_string(),
            api_timeout_ms: DEFAULT_API_TIMEOUT_MS,
            webhook_url: None,
            webhook_enabled: true,
            webhook_access_key: None,
            webhook_timeout_ms: DEFAULT_WEBHOOK_TIMEOUT_MS,
            limits: ExcerptLimits::default(),
            cache_ttl_s: DEFAULT_CACHE_TTL_S,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            data_dir: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let d = Self::default();
        let api_url = env_string("JDP_API_URL").unwrap_or(d.api_url);
        let wiki_base_url = env_string("JDP_WIKI_BASE_URL")
            .or_else(|| wiki_base_from_api(&api_url))
            .unwrap_or(d.wiki_base_url);
        let limits = ExcerptLimits {
            max: env_usize("JDP_MAX_CHARS").unwrap_or(d.limits.max),
            extended: env_usize("JDP_EXTENDED_CHARS").unwrap_or(d.limits.extended),
            max_extended: env_usize("JDP_MAX_EXTENDED_CHARS").unwrap_or(d.limits.max_extended),
            min_words: env_usize("JDP_MIN_WORD_COUNT").unwrap_or(d.limits.min_words),
        }
        .normalized();
        Self {
            api_url,
            wiki_base_url,
            api_timeout_ms: env_u64("JDP_API_TIMEOUT_MS").unwrap_or(d.api_timeout_ms),
            webhook_url: env_string("JDP_WEBHOOK_URL"),
            webhook_enabled: env_bool("JDP_WEBHOOK_ENABLED").unwrap_or(d.webhook_enabled),
            webhook_access_key: env_string("JDP_WEBHOOK_ACCESS_KEY"),
            webhook_timeout_ms: env_u64("JDP_WEBHOOK_TIMEOUT_MS").unwrap_or(d.webhook_timeout_ms),
            limits,
            cache_ttl_s: env_u64("JDP_CACHE_TTL_S").unwrap_or(d.cache_ttl_s),
            cache_capacity: env_usize("JDP_CACHE_CAPACITY").unwrap_or(d.cache_capacity),
            data_dir: env_string("JDP_DATA_DIR").map(PathBuf::from),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_s)
    }

    /// The webhook is usable only when enabled and an endpoint is set.
    pub fn webhook_configured(&self) -> bool {
        self.webhook_enabled && self.webhook_url.is_some()
    }
}

/// `https://host/w/api.php` -> `https://host/wiki/`.
pub fn wiki_base_from_api(api_url: &str) -> Option<String> {
    let u = url::Url::parse(api_url).ok()?;
    if !matches!(u.scheme(), "http" | "https") {
        return None;
    }
    Some(format!("{}/wiki/", u.origin().ascii_serialization()))
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key).and_then(|s| s.parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_string(key).and_then(|s| s.parse::<usize>().ok())
}

/// Unrecognized values count as unset.
fn env_bool(key: &str) -> Option<bool> {
    match env_string(key)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
