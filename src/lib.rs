//! # gdoc2wp
//!
//! Assemble news articles from a planning sheet and Google Docs, and publish
//! them to a WordPress site over its REST API.
//!
//! ## Why this crate?
//!
//! Student newsrooms write in Google Docs and plan in a spreadsheet, but the
//! site runs WordPress. Copy-pasting loses formatting, picks the wrong author
//! account, and forgets parent categories. This crate reads the doc's
//! structure directly, keeps bold/italic/links, maps typed names onto the
//! site's real user and category IDs, and schedules the post.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ArticleDraft (row or form)
//!  │
//!  ├─ 1. Body      Google Doc JSON → <p> HTML   (or typed text via CommonMark)
//!  ├─ 2. Resolve   "Sports; Football" → 2,3     (ancestors added)
//!  │               "Jane Doe; New Person" → 7,41 (missing authors created)
//!  ├─ 3. Snapshot  PublishRequest, immutable
//!  └─ 4. Submit    background task: image → media library → post
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gdoc2wp::{
//!     publish_draft, ArticleDraft, BodySource, GoogleClient, NameResolver, PublisherConfig,
//!     WordPressClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // WP_DOMAIN, WP_USERNAME, WP_PASSWORD, GOOGLE_ACCESS_TOKEN
//!     let config = PublisherConfig::from_env()?;
//!     let api = Arc::new(WordPressClient::new(&config)?);
//!     let google = Arc::new(GoogleClient::new(&config)?);
//!     let mut resolver = NameResolver::from_config(&config, api.clone())?;
//!
//!     let draft = ArticleDraft {
//!         headline: "Council passes budget".into(),
//!         authors: "Jane Doe".into(),
//!         image_url: String::new(),
//!         cutline: String::new(),
//!         categories: "News; City".into(),
//!         body: BodySource::GoogleDoc("https://docs.google.com/document/d/abc/edit".into()),
//!     };
//!     let outcome = publish_draft(&draft, &mut resolver, api, google, &config).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gdoc2wp` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! gdoc2wp = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod post;
pub mod publish;
pub mod resolve;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{Author, AuthorCache, Category, CategoryCatalog, Lookup};
pub use client::{CmsApi, WordPressClient};
pub use config::{PostStatus, PublisherConfig, PublisherConfigBuilder};
pub use document::{convert, document_id_from_url, Document, DocumentBody};
pub use error::{CatalogKind, PublishError};
pub use memory::MemoryCms;
pub use pipeline::input::{GoogleApi, GoogleClient};
pub use post::{ArticleDraft, BodySource, PostPayload, PublishRequest};
pub use publish::{prepare, publish_draft, submit, PublishHandle, PublishOutcome, PublishStage};
pub use resolve::NameResolver;
pub use session::{ArticleRow, Session};
