//! Publishing: draft → request → background upload and post creation.
//!
//! ## Two phases
//!
//! [`prepare`] runs on the caller's task. It renders the body, resolves
//! categories (read-only) and then authors (which may create users), and
//! freezes everything into a [`PublishRequest`]. Any input or resolution error
//! surfaces here, before anything is uploaded.
//!
//! [`submit`] hands that snapshot to one spawned tokio task which downloads
//! and uploads the featured image, then creates the post. The task cannot be
//! cancelled and reports exactly one [`PublishOutcome`] over a oneshot
//! channel. A media item uploaded before a failed post creation stays in the
//! media library; nothing is rolled back.

use crate::client::{CmsApi, MediaUpload};
use crate::config::PublisherConfig;
use crate::error::PublishError;
use crate::pipeline::body::format_body;
use crate::pipeline::input::{fetch_document, fetch_image, GoogleApi, WorkDir};
use crate::pipeline::media::normalise_image;
use crate::post::{ArticleDraft, BodySource, ImageSource, PublishRequest};
use crate::resolve::NameResolver;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// How far the background task got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    /// Fetching the featured image or re-encoding it.
    Image,
    /// Uploading the featured image to the media library.
    Media,
    /// Creating the post.
    Post,
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PublishStage::Image => "preparing image",
            PublishStage::Media => "uploading media",
            PublishStage::Post => "creating post",
        })
    }
}

/// The single terminal result of a background publish.
#[derive(Debug)]
pub enum PublishOutcome {
    Published {
        post_id: u64,
        media_id: Option<u64>,
    },
    Failed {
        stage: PublishStage,
        /// Set when the image was uploaded before the failure.
        media_id: Option<u64>,
        error: PublishError,
    },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

/// Receiver side of a [`submit`].
#[derive(Debug)]
pub struct PublishHandle {
    rx: oneshot::Receiver<PublishOutcome>,
}

impl PublishHandle {
    /// Wait for the background task to finish.
    ///
    /// Errors only if the task died without reporting (it panicked).
    pub async fn wait(self) -> Result<PublishOutcome, PublishError> {
        self.rx
            .await
            .map_err(|_| PublishError::Internal("publish task ended without reporting".into()))
    }
}

// ── Prepare ──────────────────────────────────────────────────────────────

/// Render a body source to HTML.
pub async fn render_body(body: &BodySource, google: &dyn GoogleApi) -> Result<String, PublishError> {
    match body {
        BodySource::GoogleDoc(url) => {
            let doc = fetch_document(google, url).await?;
            debug!("Converting document '{}'", doc.title);
            Ok(doc.to_html())
        }
        BodySource::Text(text) => Ok(format_body(text)),
        BodySource::Html(html) => Ok(html.trim().to_string()),
    }
}

/// Validate and resolve a draft into an immutable [`PublishRequest`].
///
/// Categories are resolved before authors so that a bad category never
/// leaves a freshly created author behind.
pub async fn prepare(
    draft: &ArticleDraft,
    resolver: &mut NameResolver,
    google: &dyn GoogleApi,
    config: &PublisherConfig,
) -> Result<PublishRequest, PublishError> {
    if draft.headline.trim().is_empty() {
        return Err(PublishError::MissingInput { field: "headline" });
    }

    let content = render_body(&draft.body, google).await?;
    if content.is_empty() {
        return Err(PublishError::MissingInput { field: "body" });
    }

    let categories = resolver.resolve_categories(&draft.categories).await?;
    let author = resolver.resolve_authors(&draft.authors).await?;
    info!(
        "Resolved '{}': authors [{}], categories [{}]",
        draft.headline.trim(),
        author,
        categories
    );

    let today = chrono::Local::now().date_naive();
    PublishRequest::assemble(draft, content, author, categories, config, today)
}

// ── Submit ───────────────────────────────────────────────────────────────

/// Start the background publish of `request` and return its handle.
///
/// Must be called from within a tokio runtime.
pub fn submit(
    api: Arc<dyn CmsApi>,
    google: Arc<dyn GoogleApi>,
    config: &PublisherConfig,
    request: PublishRequest,
) -> PublishHandle {
    let (tx, rx) = oneshot::channel();
    let scratch = config.scratch_dir.clone();

    tokio::spawn(async move {
        let outcome = run(api.as_ref(), google.as_ref(), scratch, request).await;
        match outcome {
            PublishOutcome::Published { post_id, .. } => info!("Published post {}", post_id),
            PublishOutcome::Failed {
                stage, ref error, ..
            } => error!("Publish failed while {}: {}", stage, error),
        }
        // The caller may have dropped the handle; the outcome is logged above.
        let _ = tx.send(outcome);
    });

    PublishHandle { rx }
}

/// Prepare, submit and wait in one call.
pub async fn publish_draft(
    draft: &ArticleDraft,
    resolver: &mut NameResolver,
    api: Arc<dyn CmsApi>,
    google: Arc<dyn GoogleApi>,
    config: &PublisherConfig,
) -> Result<PublishOutcome, PublishError> {
    let request = prepare(draft, resolver, google.as_ref(), config).await?;
    submit(api, google, config, request).wait().await
}

async fn run(
    api: &dyn CmsApi,
    google: &dyn GoogleApi,
    scratch: Option<PathBuf>,
    request: PublishRequest,
) -> PublishOutcome {
    let media_id = match request.image {
        Some(ref image) => match upload_image(api, google, scratch, image).await {
            Ok(id) => Some(id),
            Err((stage, error)) => {
                return PublishOutcome::Failed {
                    stage,
                    media_id: None,
                    error,
                }
            }
        },
        None => None,
    };

    let post = request.post.with_featured_media(media_id);
    match api.create_post(&post).await {
        Ok(post_id) => PublishOutcome::Published { post_id, media_id },
        Err(error) => PublishOutcome::Failed {
            stage: PublishStage::Post,
            media_id,
            error,
        },
    }
}

async fn upload_image(
    api: &dyn CmsApi,
    google: &dyn GoogleApi,
    scratch: Option<PathBuf>,
    image: &ImageSource,
) -> Result<u64, (PublishStage, PublishError)> {
    let at_image = |e| (PublishStage::Image, e);

    // Dropped at the end of this function, removing any temp files.
    let work = WorkDir::new(scratch.as_deref()).map_err(at_image)?;
    let fetched = fetch_image(google, &image.url, work.path())
        .await
        .map_err(at_image)?;

    let out_dir = work.path().to_path_buf();
    let path = tokio::task::spawn_blocking(move || normalise_image(&fetched, &out_dir))
        .await
        .map_err(|e| at_image(PublishError::Internal(format!("image task: {e}"))))?
        .map_err(at_image)?;

    api.upload_media(MediaUpload {
        path: &path,
        caption: image.caption.as_deref(),
    })
    .await
    .map_err(|e| (PublishStage::Media, e))
}
