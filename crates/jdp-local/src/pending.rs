//! Local queue of definition requests that could not be delivered.
//!
//! One JSON file (`pending.json`) under the data dir; newest first, capped at
//! [`MAX_PENDING`]. Writes go to a temp file and are renamed into place.

use jdp_core::{DefinitionRequest, Error, RequestSink, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_PENDING: usize = 50;
pub const FILE_NAME: &str = "pending.json";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: String,
    /// RFC 3339, UTC.
    pub stored_at: String,
    pub request: DefinitionRequest,
    #[serde(default)]
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingFile {
    schema_version: u32,
    #[serde(default)]
    requests: Vec<PendingRequest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub submitted: usize,
    pub failed: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone)]
pub struct PendingStore {
    path: PathBuf,
}

impl PendingStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stable id: same term, page and timestamp hash the same.
    pub fn request_id(req: &DefinitionRequest) -> String {
        let mut h = Sha256::new();
        h.update(b"term:");
        h.update(req.term.as_bytes());
        h.update(b"\npage_url:");
        h.update(req.page_url.as_bytes());
        h.update(b"\ntimestamp:");
        h.update(req.timestamp.as_bytes());
        let mut id = hex::encode(h.finalize());
        id.truncate(16);
        id
    }

    /// Newest first. A missing file is an empty queue.
    pub fn list(&self) -> Result<Vec<PendingRequest>> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Store(e.to_string())),
        };
        let file: PendingFile =
            serde_json::from_slice(&bytes).map_err(|e| Error::Store(e.to_string()))?;
        Ok(file.requests)
    }

    /// Add (or refresh) a request at the front; the oldest beyond the cap are dropped.
    pub fn push(&self, req: DefinitionRequest, last_error: Option<String>) -> Result<PendingRequest> {
        let entry = PendingRequest {
            id: Self::request_id(&req),
            stored_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            request: req,
            last_error,
        };
        let mut requests = self.list()?;
        requests.retain(|r| r.id != entry.id);
        requests.insert(0, entry.clone());
        requests.truncate(MAX_PENDING);
        self.save(&requests)?;
        Ok(entry)
    }

    /// Returns how many entries were removed.
    pub fn clear(&self) -> Result<usize> {
        let n = self.list()?.len();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(Error::Store(e.to_string())),
        }
    }

    /// Resubmit everything; delivered entries are removed, failures stay with their error.
    pub async fn flush(&self, sink: &dyn RequestSink) -> Result<FlushReport> {
        let requests = self.list()?;
        let mut report = FlushReport::default();
        let mut kept = Vec::new();
        for mut entry in requests {
            match sink.submit(&entry.request).await {
                Ok(_) => {
                    report.submitted += 1;
                    tracing::info!(term = %entry.request.term, id = %entry.id, "pending request delivered");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(term = %entry.request.term, id = %entry.id, error = %e, "pending request still failing");
                    entry.last_error = Some(e.to_string());
                    kept.push(entry);
                }
            }
        }
        report.remaining = kept.len();
        if kept.is_empty() {
            self.clear()?;
        } else {
            self.save(&kept)?;
        }
        Ok(report)
    }

    fn save(&self, requests: &[PendingRequest]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Store(e.to_string()))?;
        }
        let file = PendingFile {
            schema_version: SCHEMA_VERSION,
            requests: requests.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|e| Error::Store(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| Error::Store(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }
}
