//! The WordPress REST seam.
//!
//! Everything the publisher needs from the site goes through the [`CmsApi`]
//! trait: user search/creation, category search/lookup, media upload and post
//! creation. [`WordPressClient`] is the production implementation over
//! `reqwest`; tests supply an in-memory implementation instead, the same way
//! callers can inject their own `Arc<dyn CmsApi>`.
//!
//! Every request carries HTTP basic auth, the configured extra headers and the
//! configured timeout. Nothing is retried.

use crate::catalog::{Author, Category};
use crate::config::PublisherConfig;
use crate::error::PublishError;
use crate::post::PostPayload;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Maximum page size the WordPress REST API accepts.
const PER_PAGE: usize = 100;
const PER_PAGE_STR: &str = "100";

/// Fields sent when auto-creating an author.
#[derive(Debug, Clone, Serialize)]
pub struct NewAuthor {
    pub username: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub nickname: String,
    pub password: String,
}

/// An image ready to be uploaded to the media library.
#[derive(Debug, Clone)]
pub struct MediaUpload<'a> {
    pub path: &'a Path,
    pub caption: Option<&'a str>,
}

/// Operations the publisher performs against the CMS.
#[async_trait]
pub trait CmsApi: Send + Sync {
    /// Users whose name resembles `query`.
    async fn search_users(&self, query: &str) -> Result<Vec<Author>, PublishError>;

    /// Create a user and return its ID.
    async fn create_user(&self, author: &NewAuthor) -> Result<u64, PublishError>;

    /// Categories whose name resembles `query`.
    async fn search_categories(&self, query: &str) -> Result<Vec<Category>, PublishError>;

    /// A single category by ID.
    async fn get_category(&self, id: u64) -> Result<Category, PublishError>;

    /// Every category on the site.
    async fn list_categories(&self) -> Result<Vec<Category>, PublishError>;

    /// Upload an image to the media library and return the media ID.
    async fn upload_media(&self, media: MediaUpload<'_>) -> Result<u64, PublishError>;

    /// Create a post and return its ID.
    async fn create_post(&self, post: &PostPayload) -> Result<u64, PublishError>;
}

#[derive(Debug, Deserialize)]
struct Created {
    id: u64,
}

/// `reqwest`-backed [`CmsApi`] for a WordPress site.
#[derive(Debug, Clone)]
pub struct WordPressClient {
    http: reqwest::Client,
    config: PublisherConfig,
}

impl WordPressClient {
    pub fn new(config: &PublisherConfig) -> Result<Self, PublishError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.request_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PublishError::InvalidConfig(format!("header '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| PublishError::InvalidConfig(format!("header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| PublishError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.config.endpoint(endpoint))
            .basic_auth(&self.config.username, Some(&self.config.password))
    }

    /// Send `req`, map transport and status failures, and decode the JSON body.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<T, PublishError> {
        let secs = self.config.timeout_secs;
        let response = req
            .send()
            .await
            .map_err(|e| PublishError::from_reqwest(endpoint, e, secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::RemoteError {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
                detail: wordpress_message(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PublishError::from_reqwest(endpoint, e, secs))
    }
}

/// Pull `message` out of a WordPress error body, falling back to the raw text.
fn wordpress_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CmsApi for WordPressClient {
    async fn search_users(&self, query: &str) -> Result<Vec<Author>, PublishError> {
        debug!("Searching users for {:?}", query);
        let req = self
            .request(reqwest::Method::GET, "users")
            .query(&[("search", query), ("per_page", PER_PAGE_STR)]);
        self.send("users", req).await
    }

    async fn create_user(&self, author: &NewAuthor) -> Result<u64, PublishError> {
        info!("Creating user '{}'", author.username);
        let req = self.request(reqwest::Method::POST, "users").form(author);
        let created: Created = self.send("users", req).await?;
        Ok(created.id)
    }

    async fn search_categories(&self, query: &str) -> Result<Vec<Category>, PublishError> {
        debug!("Searching categories for {:?}", query);
        let req = self
            .request(reqwest::Method::GET, "categories")
            .query(&[("search", query), ("per_page", PER_PAGE_STR)]);
        self.send("categories", req).await
    }

    async fn get_category(&self, id: u64) -> Result<Category, PublishError> {
        let req = self.request(reqwest::Method::GET, &format!("categories/{id}"));
        self.send("categories", req).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, PublishError> {
        let mut all = Vec::new();
        for page in 1.. {
            let req = self.request(reqwest::Method::GET, "categories").query(&[
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let batch: Vec<Category> = self.send("categories", req).await?;
            let done = batch.len() < PER_PAGE;
            all.extend(batch);
            if done {
                break;
            }
        }
        info!("Listed {} categories from {}", all.len(), self.config.domain);
        Ok(all)
    }

    async fn upload_media(&self, media: MediaUpload<'_>) -> Result<u64, PublishError> {
        let bytes = tokio::fs::read(media.path)
            .await
            .map_err(|e| PublishError::CacheIo {
                path: media.path.to_path_buf(),
                detail: e.to_string(),
            })?;
        let file_name = media
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.jpg".to_string());
        let mime = crate::pipeline::media::mime_for(media.path);

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime)
            .map_err(|e| PublishError::Internal(format!("multipart: {e}")))?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(caption) = media.caption {
            form = form.text("caption", caption.to_string());
        }

        info!("Uploading media '{}'", file_name);
        let req = self.request(reqwest::Method::POST, "media").multipart(form);
        let created: Created = self.send("media", req).await?;
        Ok(created.id)
    }

    async fn create_post(&self, post: &PostPayload) -> Result<u64, PublishError> {
        info!("Creating post '{}'", post.title);
        let req = self.request(reqwest::Method::POST, "posts").form(post);
        let created: Created = self.send("posts", req).await?;
        Ok(created.id)
    }
}
