//! Publishing against an in-memory site.
//!
//! No network: WordPress is [`MemoryCms`] and Google is a fake that serves one
//! canned document. Featured images are local files, which `fetch_image`
//! accepts without touching Drive.

use async_trait::async_trait;
use gdoc2wp::document::{Paragraph, TextRun};
use gdoc2wp::{
    prepare, publish_draft, submit, ArticleDraft, Author, AuthorCache, BodySource, CatalogKind,
    Category, CmsApi, Document, DocumentBody, GoogleApi, MemoryCms, NameResolver, PostStatus,
    PublishError, PublishOutcome, PublishStage, PublisherConfig, Session,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeGoogle {
    requested: Mutex<Vec<String>>,
}

#[async_trait]
impl GoogleApi for FakeGoogle {
    async fn fetch_document(&self, document_id: &str) -> Result<Document, PublishError> {
        self.requested.lock().unwrap().push(document_id.to_string());
        Ok(Document {
            document_id: document_id.to_string(),
            title: "Budget".into(),
            body: DocumentBody::from_paragraphs(vec![
                Paragraph::from_runs(vec![TextRun::plain("Hello"), TextRun::bold("world\n")]),
                Paragraph::from_runs(vec![]),
            ]),
        })
    }

    async fn download_file(&self, file_id: &str, _dir: &Path) -> Result<PathBuf, PublishError> {
        Err(PublishError::RemoteError {
            endpoint: "drive".into(),
            status: Some(404),
            detail: format!("no file {file_id}"),
        })
    }
}

fn category(id: u64, name: &str, parent: u64) -> Category {
    Category {
        id,
        name: name.into(),
        parent,
    }
}

fn site() -> MemoryCms {
    MemoryCms::new(
        vec![Author {
            id: 7,
            display_name: "Jane Doe".into(),
        }],
        vec![
            category(1, "News", 0),
            category(2, "Sports", 0),
            category(3, "Football", 2),
        ],
    )
}

fn config(scratch: &Path) -> PublisherConfig {
    PublisherConfig::builder()
        .domain("news.example.edu")
        .scratch_dir(scratch)
        .build()
        .unwrap()
}

fn draft() -> ArticleDraft {
    ArticleDraft {
        headline: "Budget passes".into(),
        authors: "Jane Doe; Alex Kim".into(),
        image_url: String::new(),
        cutline: String::new(),
        categories: "Football".into(),
        body: BodySource::GoogleDoc("https://docs.google.com/document/d/doc-1/edit".into()),
    }
}

fn write_image(dir: &Path, name: &str, format: ImageFormat) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])))
        .save_with_format(&path, format)
        .unwrap();
    path
}

// ── Prepare ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn prepare_renders_doc_and_resolves_names() {
    let tmp = TempDir::new().unwrap();
    let api = Arc::new(site());
    let google = FakeGoogle::default();
    let mut resolver = NameResolver::new(api.clone(), AuthorCache::default(), None, "nogood.net");

    let request = prepare(&draft(), &mut resolver, &google, &config(tmp.path()))
        .await
        .unwrap();

    assert_eq!(*google.requested.lock().unwrap(), vec!["doc-1".to_string()]);
    assert_eq!(request.post.content, "<p>Hello <strong>world</strong></p>");
    assert_eq!(request.post.categories, "2,3");
    assert!(request.post.author.starts_with("7,"));
    assert_eq!(request.post.status, PostStatus::Future);
    assert!(request.image.is_none());
    assert_eq!(api.created_users().len(), 1);
    assert!(api.posts().is_empty());
}

#[tokio::test]
async fn bad_category_fails_before_any_author_is_created() {
    let tmp = TempDir::new().unwrap();
    let api = Arc::new(site());
    let mut resolver = NameResolver::new(api.clone(), AuthorCache::default(), None, "x");
    let mut d = draft();
    d.categories = "Opinion".into();

    let err = prepare(&d, &mut resolver, &FakeGoogle::default(), &config(tmp.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::NoMatch { kind: CatalogKind::Category, .. }));
    assert!(api.created_users().is_empty());
}

#[tokio::test]
async fn empty_fields_are_missing_input() {
    let tmp = TempDir::new().unwrap();
    let mut resolver = NameResolver::new(Arc::new(site()), AuthorCache::default(), None, "x");
    let google = FakeGoogle::default();

    let mut d = draft();
    d.categories = " ".into();
    let err = prepare(&d, &mut resolver, &google, &config(tmp.path())).await.unwrap_err();
    assert!(matches!(err, PublishError::MissingInput { field: "categories" }));

    let mut d = draft();
    d.authors.clear();
    let err = prepare(&d, &mut resolver, &google, &config(tmp.path())).await.unwrap_err();
    assert!(matches!(err, PublishError::MissingInput { field: "authors" }));

    let mut d = draft();
    d.body = BodySource::Text("\n  \n".into());
    let err = prepare(&d, &mut resolver, &google, &config(tmp.path())).await.unwrap_err();
    assert!(matches!(err, PublishError::MissingInput { field: "body" }));
}

// ── Submit ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_uploads_converted_image_then_creates_post() {
    let tmp = TempDir::new().unwrap();
    let images = TempDir::new().unwrap();
    let api = Arc::new(site());
    let google: Arc<dyn GoogleApi> = Arc::new(FakeGoogle::default());
    let cfg = config(tmp.path());
    let mut resolver = NameResolver::new(api.clone(), AuthorCache::default(), None, "x");

    let mut d = draft();
    d.image_url = write_image(images.path(), "team.bmp", ImageFormat::Bmp)
        .to_string_lossy()
        .to_string();
    d.cutline = "The team.".into();

    let outcome = publish_draft(&d, &mut resolver, api.clone(), google, &cfg)
        .await
        .unwrap();

    let (post_id, media_id) = match outcome {
        PublishOutcome::Published { post_id, media_id } => (post_id, media_id),
        other => panic!("expected Published, got {other:?}"),
    };
    let media = api.media();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].file_name, "team.jpg");
    assert_eq!(media[0].caption.as_deref(), Some("The team."));
    assert_eq!(media_id, Some(media[0].id));

    let posts = api.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, post_id);
    assert_eq!(posts[0].1.featured_media, media_id);
}

#[tokio::test]
async fn media_stays_uploaded_when_post_creation_fails() {
    let tmp = TempDir::new().unwrap();
    let images = TempDir::new().unwrap();
    let api = Arc::new(site().failing_posts());
    let google: Arc<dyn GoogleApi> = Arc::new(FakeGoogle::default());
    let cfg = config(tmp.path());
    let mut resolver = NameResolver::new(api.clone(), AuthorCache::default(), None, "x");

    let mut d = draft();
    d.image_url = write_image(images.path(), "photo.png", ImageFormat::Png)
        .to_string_lossy()
        .to_string();

    let request = prepare(&d, &mut resolver, google.as_ref(), &cfg).await.unwrap();
    let api_dyn: Arc<dyn CmsApi> = api.clone();
    let outcome = submit(api_dyn, google, &cfg, request).wait().await.unwrap();

    match outcome {
        PublishOutcome::Failed {
            stage,
            media_id,
            error,
        } => {
            assert_eq!(stage, PublishStage::Post);
            assert!(media_id.is_some());
            assert!(matches!(error, PublishError::RemoteError { status: Some(500), .. }));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(api.media().len(), 1);
    assert_eq!(api.media()[0].file_name, "photo.png");
    assert!(api.posts().is_empty());
}

#[tokio::test]
async fn drive_failure_stops_at_image_stage() {
    let tmp = TempDir::new().unwrap();
    let api = Arc::new(site());
    let google: Arc<dyn GoogleApi> = Arc::new(FakeGoogle::default());
    let cfg = config(tmp.path());
    let mut resolver = NameResolver::new(api.clone(), AuthorCache::default(), None, "x");

    let mut d = draft();
    d.image_url = "https://drive.google.com/file/d/missing/view".into();

    let outcome = publish_draft(&d, &mut resolver, api.clone(), google, &cfg)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        PublishOutcome::Failed {
            stage: PublishStage::Image,
            media_id: None,
            ..
        }
    ));
    assert!(api.media().is_empty());
    assert!(api.posts().is_empty());
}

// ── Session to post ──────────────────────────────────────────────────────────

#[tokio::test]
async fn session_row_publishes_typed_body() {
    let tmp = TempDir::new().unwrap();
    let rows = tmp.path().join("rows.json");
    std::fs::write(
        &rows,
        r#"[{"headline": "First"},
            {"headline": "Second", "authors": "Jane Doe", "categories": "News",
             "content": "Line one.\n\nLine two."}]"#,
    )
    .unwrap();

    let mut session = Session::load(&rows).unwrap();
    let row = session.next().unwrap().clone();
    let d = row.to_draft().unwrap();

    let api = Arc::new(site());
    let google: Arc<dyn GoogleApi> = Arc::new(FakeGoogle::default());
    let cfg = config(tmp.path());
    let mut resolver = NameResolver::new(api.clone(), AuthorCache::default(), None, "x");
    let outcome = publish_draft(&d, &mut resolver, api.clone(), google, &cfg)
        .await
        .unwrap();

    assert!(outcome.is_published());
    let posts = api.posts();
    let (_, post) = &posts[0];
    assert_eq!(post.title, "Second");
    assert_eq!(post.content, "<p>Line one.</p>\n<p>Line two.</p>");
    assert_eq!(post.author, "7");
    assert_eq!(post.categories, "1");
    assert_eq!(post.featured_media, None);
}

#[tokio::test]
async fn created_author_is_persisted_to_cache_file() {
    let tmp = TempDir::new().unwrap();
    let cache_path = tmp.path().join("authors.json");
    let cfg = PublisherConfig::builder()
        .domain("news.example.edu")
        .authors_cache(&cache_path)
        .build()
        .unwrap();
    let api = Arc::new(site());

    let mut resolver = NameResolver::from_config(&cfg, api.clone()).unwrap();
    let id = resolver.resolve_authors("Alex Kim").await.unwrap();

    // A fresh resolver reads it back without asking the site to create again.
    let mut again = NameResolver::from_config(&cfg, api.clone()).unwrap();
    assert_eq!(again.resolve_authors("alex kim").await.unwrap(), id);
    assert_eq!(api.created_users().len(), 1);

    let raw = std::fs::read_to_string(&cache_path).unwrap();
    assert!(raw.contains(&format!("\"ID\": \"{id}\"")));
}

#[tokio::test]
async fn in_memory_resolver_leaves_cache_file_untouched() {
    let tmp = TempDir::new().unwrap();
    let cache_path = tmp.path().join("authors.json");
    let snapshot_path = tmp.path().join("categories.json");
    std::fs::write(&cache_path, r#"[{"ID":"7","display_name":"Jane Doe"}]"#).unwrap();
    std::fs::write(&snapshot_path, r#"[{"id":40,"name":"News","parent":0}]"#).unwrap();
    let before = std::fs::read(&cache_path).unwrap();

    let cfg = PublisherConfig::builder()
        .domain("news.example.edu")
        .authors_cache(&cache_path)
        .categories_snapshot(&snapshot_path)
        .build()
        .unwrap();
    let seeded = AuthorCache::load(&cache_path).unwrap().authors().to_vec();
    let api = Arc::new(MemoryCms::new(seeded, vec![category(40, "News", 0)]));

    let mut resolver = NameResolver::from_config_in_memory(&cfg, api.clone()).unwrap();
    let id = resolver.resolve_authors("Alex Kim").await.unwrap();
    assert_eq!(resolver.resolve_authors("alex kim").await.unwrap(), id);
    assert_eq!(api.created_users().len(), 1);

    assert_eq!(std::fs::read(&cache_path).unwrap(), before);
}
