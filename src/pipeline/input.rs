//! Input resolution: Google Docs bodies and featured images.
//!
//! ## Why a scratch directory?
//!
//! The media endpoint takes a multipart file upload and the re-encoder works on
//! files, so the featured image has to exist on disk. Downloading into a
//! [`WorkDir`] backed by a `TempDir` gives a path both can use and removes the
//! file when the publish task finishes, even if it fails half way. A
//! configured scratch directory is used as is and left in place.
//!
//! The image field may also hold a local path. That skips Drive entirely and
//! is what dry runs and tests use.

use crate::config::PublisherConfig;
use crate::document::{document_id_from_url, Document};
use crate::error::PublishError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

const DOCS_BASE: &str = "https://docs.googleapis.com/v1/documents/";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3/files/";

/// Read access to Google Docs and Drive.
#[async_trait]
pub trait GoogleApi: Send + Sync {
    /// The document with ID `document_id`.
    async fn fetch_document(&self, document_id: &str) -> Result<Document, PublishError>;

    /// Download the Drive file `file_id` into `dir`, returning its path.
    async fn download_file(&self, file_id: &str, dir: &Path) -> Result<PathBuf, PublishError>;
}

/// `reqwest`-backed [`GoogleApi`] using a bearer token.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    token: Option<String>,
    timeout_secs: u64,
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct DriveMetadata {
    name: String,
}

impl GoogleClient {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PublishError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            token: config.google_access_token.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.get(url);
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, endpoint: &str, url: &str) -> Result<reqwest::Response, PublishError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| PublishError::from_reqwest(endpoint, e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PublishError::RemoteError {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
                detail: detail.trim().to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GoogleApi for GoogleClient {
    async fn fetch_document(&self, document_id: &str) -> Result<Document, PublishError> {
        info!("Fetching Google Doc {}", document_id);
        let url = format!("{DOCS_BASE}{document_id}");
        self.send("documents", &url)
            .await?
            .json()
            .await
            .map_err(|e| PublishError::from_reqwest("documents", e, self.timeout_secs))
    }

    async fn download_file(&self, file_id: &str, dir: &Path) -> Result<PathBuf, PublishError> {
        let meta_url = format!("{DRIVE_BASE}{file_id}?fields=name");
        let meta: DriveMetadata = self
            .send("drive", &meta_url)
            .await?
            .json()
            .await
            .map_err(|e| PublishError::from_reqwest("drive", e, self.timeout_secs))?;

        info!("Downloading '{}' from Drive", meta.name);
        let bytes = self
            .send("drive", &format!("{DRIVE_BASE}{file_id}?alt=media"))
            .await?
            .bytes()
            .await
            .map_err(|e| PublishError::from_reqwest("drive", e, self.timeout_secs))?;

        let file_path = dir.join(safe_file_name(&meta.name, file_id));
        tokio::fs::write(&file_path, &bytes)
            .await
            .map_err(|e| PublishError::CacheIo {
                path: file_path.clone(),
                detail: e.to_string(),
            })?;

        debug!("Downloaded {} bytes to {}", bytes.len(), file_path.display());
        Ok(file_path)
    }
}

/// Directory that holds downloaded and re-encoded images for one publish.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    /// Kept alive so the directory is removed on drop.
    _temp_dir: Option<TempDir>,
}

impl WorkDir {
    /// Use `scratch` when given, otherwise a fresh temporary directory.
    pub fn new(scratch: Option<&Path>) -> Result<Self, PublishError> {
        match scratch {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| PublishError::CacheIo {
                    path: dir.to_path_buf(),
                    detail: e.to_string(),
                })?;
                Ok(Self {
                    path: dir.to_path_buf(),
                    _temp_dir: None,
                })
            }
            None => {
                let temp_dir = TempDir::new().map_err(|e| PublishError::Internal(e.to_string()))?;
                Ok(Self {
                    path: temp_dir.path().to_path_buf(),
                    _temp_dir: Some(temp_dir),
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// The Drive file ID in a share URL: the second-to-last path segment of
/// `https://drive.google.com/file/d/<id>/view`.
pub fn drive_file_id(url: &str) -> Result<&str, PublishError> {
    let malformed = || PublishError::MalformedData {
        field: "image URL",
        detail: format!("no Drive file ID in '{url}'"),
    };
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut segments = path.rsplit('/');
    segments.next().ok_or_else(malformed)?;
    match segments.next() {
        Some(id) if !id.is_empty() && !id.contains(':') => Ok(id),
        _ => Err(malformed()),
    }
}

/// Fetch the doc behind a share URL.
pub async fn fetch_document(google: &dyn GoogleApi, url: &str) -> Result<Document, PublishError> {
    let id = document_id_from_url(url).ok_or_else(|| PublishError::MalformedData {
        field: "document URL",
        detail: format!("no document ID in '{url}'"),
    })?;
    google.fetch_document(id).await
}

/// Resolve the image field to a local file: download a Drive URL into `dir`,
/// or validate a local path.
pub async fn fetch_image(
    google: &dyn GoogleApi,
    source: &str,
    dir: &Path,
) -> Result<PathBuf, PublishError> {
    if is_url(source) {
        google.download_file(drive_file_id(source)?, dir).await
    } else {
        resolve_local(source)
    }
}

fn resolve_local(path_str: &str) -> Result<PathBuf, PublishError> {
    let path = PathBuf::from(path_str);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => {
            debug!("Resolved local image: {}", path.display());
            Ok(path)
        }
        Ok(_) => Err(PublishError::MalformedData {
            field: "image URL",
            detail: format!("'{}' is not a file", path.display()),
        }),
        Err(e) => Err(PublishError::CacheIo {
            path,
            detail: e.to_string(),
        }),
    }
}

/// Strip path separators from a Drive file name.
fn safe_file_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        format!("{fallback}.jpg")
    } else {
        cleaned.to_string()
    }
}
