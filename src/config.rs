//! Configuration for talking to WordPress and Google.
//!
//! All publishing behaviour is controlled through [`PublisherConfig`], built
//! via its [`PublisherConfigBuilder`]. Clients clone what they need from it
//! at construction; the background publish task only takes the scratch
//! directory.

use crate::error::PublishError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for a publishing session.
///
/// Built via [`PublisherConfig::builder()`], [`PublisherConfig::from_env()`]
/// or using [`PublisherConfig::default()`].
///
/// # Example
/// ```rust
/// use gdoc2wp::PublisherConfig;
///
/// let config = PublisherConfig::builder()
///     .domain("news.example.edu")
///     .credentials("editor", "app-password")
///     .timeout_secs(20)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_base(), "https://news.example.edu/wp-json/wp/v2/");
/// ```
#[derive(Clone)]
pub struct PublisherConfig {
    /// WordPress site domain, without scheme (e.g. `news.example.edu`).
    pub domain: String,

    /// Overrides the `https://<domain>/wp-json/wp/v2/` base when set.
    /// Used for staging sites behind a different path and for tests.
    pub api_base_override: Option<String>,

    /// WordPress user name for HTTP basic auth.
    pub username: String,

    /// WordPress application password for HTTP basic auth.
    pub password: String,

    /// Extra headers sent with every WordPress request (e.g. a `User-Agent`
    /// the site's firewall accepts).
    pub request_headers: Vec<(String, String)>,

    /// Uniform per-request timeout in seconds. Default: 30.
    pub timeout_secs: u64,

    /// OAuth access token for the Docs and Drive APIs.
    pub google_access_token: Option<String>,

    /// Local author cache (`[{"ID": "12", "display_name": "..."}]`).
    /// Consulted before the remote catalog; new authors are appended.
    pub authors_cache: Option<PathBuf>,

    /// Local category snapshot in WordPress shape. When `None` the category
    /// catalog is listed from the remote site once per session.
    pub categories_snapshot: Option<PathBuf>,

    /// Domain used for the placeholder email of auto-created authors.
    /// Default: `nogood.net`.
    pub author_email_domain: String,

    /// Post status sent with every new post. Default: [`PostStatus::Future`].
    pub post_status: PostStatus,

    /// Weekday the post is scheduled for. Default: Thursday.
    pub schedule_weekday: chrono::Weekday,

    /// Local hour of day the post is scheduled for. Default: 6.
    pub schedule_hour: u32,

    /// Scratch directory for downloaded images. `None` uses a fresh
    /// temporary directory per publish.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            api_base_override: None,
            username: String::new(),
            password: String::new(),
            request_headers: Vec::new(),
            timeout_secs: 30,
            google_access_token: None,
            authors_cache: None,
            categories_snapshot: None,
            author_email_domain: "nogood.net".to_string(),
            post_status: PostStatus::default(),
            schedule_weekday: chrono::Weekday::Thu,
            schedule_hour: 6,
            scratch_dir: None,
        }
    }
}

impl fmt::Debug for PublisherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherConfig")
            .field("domain", &self.domain)
            .field("api_base_override", &self.api_base_override)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field(
                "request_headers",
                &self.request_headers.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "google_access_token",
                &self.google_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("authors_cache", &self.authors_cache)
            .field("categories_snapshot", &self.categories_snapshot)
            .field("author_email_domain", &self.author_email_domain)
            .field("post_status", &self.post_status)
            .field("schedule_weekday", &self.schedule_weekday)
            .field("schedule_hour", &self.schedule_hour)
            .finish()
    }
}

impl PublisherConfig {
    /// Create a new builder for `PublisherConfig`.
    pub fn builder() -> PublisherConfigBuilder {
        PublisherConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `WP_DOMAIN`, `WP_USERNAME`, `WP_PASSWORD`,
    /// `GOOGLE_ACCESS_TOKEN`, `GDOC2WP_AUTHORS_CACHE` and
    /// `GDOC2WP_CATEGORIES`.
    pub fn from_env() -> Result<Self, PublishError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let mut builder = Self::builder();
        if let Some(domain) = var("WP_DOMAIN") {
            builder = builder.domain(domain);
        }
        if let (Some(user), Some(pass)) = (var("WP_USERNAME"), var("WP_PASSWORD")) {
            builder = builder.credentials(user, pass);
        }
        if let Some(token) = var("GOOGLE_ACCESS_TOKEN") {
            builder = builder.google_access_token(token);
        }
        if let Some(path) = var("GDOC2WP_AUTHORS_CACHE") {
            builder = builder.authors_cache(path);
        }
        if let Some(path) = var("GDOC2WP_CATEGORIES") {
            builder = builder.categories_snapshot(path);
        }

        builder.build()
    }

    /// Base URL of the WordPress REST API, always ending in `/`.
    pub fn api_base(&self) -> String {
        match &self.api_base_override {
            Some(base) if base.ends_with('/') => base.clone(),
            Some(base) => format!("{base}/"),
            None => format!("https://{}/wp-json/wp/v2/", self.domain),
        }
    }

    /// Full URL for a named endpoint (`posts`, `media`, `users`, `categories`).
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}{}/", self.api_base(), name)
    }
}

/// Builder for [`PublisherConfig`].
#[derive(Debug)]
pub struct PublisherConfigBuilder {
    config: PublisherConfig,
}

impl PublisherConfigBuilder {
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        let domain: String = domain.into();
        self.config.domain = domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base_override = Some(base.into());
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.request_headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn google_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.google_access_token = Some(token.into());
        self
    }

    pub fn authors_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.authors_cache = Some(path.into());
        self
    }

    pub fn categories_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.categories_snapshot = Some(path.into());
        self
    }

    pub fn author_email_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.author_email_domain = domain.into();
        self
    }

    pub fn post_status(mut self, status: PostStatus) -> Self {
        self.config.post_status = status;
        self
    }

    pub fn schedule(mut self, weekday: chrono::Weekday, hour: u32) -> Self {
        self.config.schedule_weekday = weekday;
        self.config.schedule_hour = hour;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PublisherConfig, PublishError> {
        let c = &self.config;
        if c.domain.is_empty() && c.api_base_override.is_none() {
            return Err(PublishError::InvalidConfig(
                "a WordPress domain is required".into(),
            ));
        }
        if c.schedule_hour > 23 {
            return Err(PublishError::InvalidConfig(format!(
                "schedule hour must be 0–23, got {}",
                c.schedule_hour
            )));
        }
        Ok(self.config)
    }
}

/// Post status values accepted by the WordPress posts endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    /// Scheduled for the configured weekday and hour. (default)
    #[default]
    Future,
    Draft,
    Pending,
    Private,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Future => "future",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
        }
    }
}
