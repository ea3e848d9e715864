//! CLI binary for gdoc2wp.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PublisherConfig`, runs one command and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use gdoc2wp::pipeline::input::fetch_document;
use gdoc2wp::{
    prepare, submit, ArticleDraft, AuthorCache, BodySource, CategoryCatalog, CmsApi, GoogleApi,
    GoogleClient, MemoryCms, NameResolver, PostStatus, PublishOutcome, PublisherConfig, Session,
    WordPressClient,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  gdoc2wp convert https://docs.google.com/document/d/1AbC/edit
  gdoc2wp resolve-categories "Sports; Football"
  gdoc2wp rows planning.json
  gdoc2wp publish --session planning.json --row 3
  gdoc2wp publish --categories-snapshot categories.json --headline "Budget passes" --authors "Jane Doe" \
      --categories News --doc-url https://docs.google.com/document/d/1AbC/edit --dry-run

ENVIRONMENT:
  WP_DOMAIN, WP_USERNAME, WP_PASSWORD   WordPress site and application password
  GOOGLE_ACCESS_TOKEN                   OAuth token for the Docs and Drive APIs
  RUST_LOG                              Overrides --verbose/--quiet log filtering
"#;

/// Publish news articles from Google Docs to WordPress.
#[derive(Parser, Debug)]
#[command(
    name = "gdoc2wp",
    version,
    about = "Publish news articles from Google Docs to WordPress",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    site: SiteArgs,

    /// Output structured JSON instead of text.
    #[arg(long, global = true, env = "GDOC2WP_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "GDOC2WP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "GDOC2WP_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct SiteArgs {
    /// WordPress site domain (e.g. news.example.edu).
    #[arg(long, global = true, env = "WP_DOMAIN")]
    domain: Option<String>,

    /// WordPress user name.
    #[arg(long, global = true, env = "WP_USERNAME")]
    username: Option<String>,

    /// WordPress application password.
    #[arg(long, global = true, env = "WP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Google OAuth access token for Docs and Drive.
    #[arg(long, global = true, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    google_token: Option<String>,

    /// Extra request header for WordPress, as `Name: value`. Repeatable.
    #[arg(long = "header", global = true)]
    headers: Vec<String>,

    /// Local author cache (JSON array of {"ID", "display_name"}).
    #[arg(long, global = true, env = "GDOC2WP_AUTHORS_CACHE")]
    authors_cache: Option<PathBuf>,

    /// Local category snapshot in WordPress shape.
    #[arg(long, global = true, env = "GDOC2WP_CATEGORIES")]
    categories_snapshot: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "GDOC2WP_TIMEOUT", default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a Google Doc to HTML and print it.
    Convert {
        /// Google Doc share URL.
        doc_url: String,
    },

    /// Resolve author names to IDs, creating missing authors.
    ResolveAuthors {
        /// Semicolon-separated display names.
        names: String,
    },

    /// Resolve category names to IDs, including ancestors.
    ResolveCategories {
        /// Semicolon-separated category names.
        names: String,
    },

    /// List the rows of a planning sheet export.
    Rows {
        /// JSON array of rows.
        path: PathBuf,
    },

    /// Publish one article.
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Planning sheet export to take the article from.
    #[arg(long, requires = "row")]
    session: Option<PathBuf>,

    /// One-based row number within --session.
    #[arg(long)]
    row: Option<usize>,

    #[arg(long, conflicts_with = "session")]
    headline: Option<String>,

    /// Semicolon-separated author names.
    #[arg(long, conflicts_with = "session")]
    authors: Option<String>,

    /// Semicolon-separated category names.
    #[arg(long, conflicts_with = "session")]
    categories: Option<String>,

    /// Drive share URL or local path of the featured image.
    #[arg(long, conflicts_with = "session")]
    image_url: Option<String>,

    /// Featured image caption.
    #[arg(long, conflicts_with = "session")]
    cutline: Option<String>,

    /// Google Doc holding the body.
    #[arg(long, conflicts_with_all = ["session", "text"])]
    doc_url: Option<String>,

    /// Typed body text; blank lines are dropped.
    #[arg(long, conflicts_with = "session")]
    text: Option<String>,

    /// Post status.
    #[arg(long, value_enum, default_value = "future")]
    status: StatusArg,

    /// Weekday the post is scheduled for (mon..sun).
    #[arg(long, default_value = "thu")]
    weekday: chrono::Weekday,

    /// Hour of day the post is scheduled for.
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=23))]
    hour: u32,

    /// Resolve against the local cache and snapshot only and print the request.
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Publish,
    Future,
    Draft,
    Pending,
    Private,
}

impl From<StatusArg> for PostStatus {
    fn from(v: StatusArg) -> Self {
        match v {
            StatusArg::Publish => PostStatus::Publish,
            StatusArg::Future => PostStatus::Future,
            StatusArg::Draft => PostStatus::Draft,
            StatusArg::Pending => PostStatus::Pending,
            StatusArg::Private => PostStatus::Private,
        }
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Convert { ref doc_url } => run_convert(&cli, doc_url).await,
        Command::ResolveAuthors { ref names } => run_resolve(&cli, names, true).await,
        Command::ResolveCategories { ref names } => run_resolve(&cli, names, false).await,
        Command::Rows { ref path } => run_rows(&cli, path),
        Command::Publish(ref args) => run_publish(&cli, args).await,
    }
}

// ── Config ───────────────────────────────────────────────────────────────────

fn build_config(cli: &Cli, publish: Option<&PublishArgs>) -> Result<PublisherConfig> {
    let site = &cli.site;
    let mut builder = PublisherConfig::builder().timeout_secs(site.timeout);

    if let Some(ref domain) = site.domain {
        builder = builder.domain(domain);
    }
    if let (Some(user), Some(pass)) = (&site.username, &site.password) {
        builder = builder.credentials(user, pass);
    }
    if let Some(ref token) = site.google_token {
        builder = builder.google_access_token(token);
    }
    for header in &site.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Header '{header}' is not in 'Name: value' form"))?;
        builder = builder.header(name.trim(), value.trim());
    }
    if let Some(ref path) = site.authors_cache {
        builder = builder.authors_cache(path);
    }
    if let Some(ref path) = site.categories_snapshot {
        builder = builder.categories_snapshot(path);
    }
    if let Some(args) = publish {
        builder = builder
            .post_status(args.status.into())
            .schedule(args.weekday, args.hour);
    }

    builder.build().context("Invalid configuration")
}

/// Google access only needs the token, not a WordPress site.
fn google_client(cli: &Cli) -> Result<Arc<GoogleClient>> {
    let config = PublisherConfig {
        google_access_token: cli.site.google_token.clone(),
        timeout_secs: cli.site.timeout.max(1),
        ..PublisherConfig::default()
    };
    Ok(Arc::new(
        GoogleClient::new(&config).context("Failed to build Google client")?,
    ))
}

/// An in-memory site seeded from the local cache and snapshot files.
fn dry_run_site(config: &PublisherConfig) -> Result<Arc<dyn CmsApi>> {
    let authors = match config.authors_cache {
        Some(ref path) => AuthorCache::load(path)?.authors().to_vec(),
        None => Vec::new(),
    };
    let categories = match config.categories_snapshot {
        Some(ref path) => CategoryCatalog::load(path)?.categories().to_vec(),
        None => bail!("--dry-run needs --categories-snapshot <categories.json>"),
    };
    Ok(Arc::new(MemoryCms::new(authors, categories)))
}

// ── Commands ─────────────────────────────────────────────────────────────────

async fn run_convert(cli: &Cli, doc_url: &str) -> Result<()> {
    let google = google_client(cli)?;
    let doc = fetch_document(google.as_ref(), doc_url)
        .await
        .context("Failed to fetch document")?;
    let html = doc.to_html();

    if cli.json {
        let out = serde_json::json!({
            "document_id": doc.document_id,
            "title": doc.title,
            "html": html,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{html}");
    }
    Ok(())
}

async fn run_resolve(cli: &Cli, names: &str, authors: bool) -> Result<()> {
    let config = build_config(cli, None)?;
    let api: Arc<dyn CmsApi> = Arc::new(WordPressClient::new(&config)?);
    let mut resolver = NameResolver::from_config(&config, api)?;

    let ids = if authors {
        resolver.resolve_authors(names).await
    } else {
        resolver.resolve_categories(names).await
    };
    let ids = ids.map_err(|e| anyhow::anyhow!("{}: {}", e.title(), e))?;

    if cli.json {
        let list: Vec<u64> = ids.split(',').filter_map(|s| s.parse().ok()).collect();
        println!("{}", serde_json::to_string(&list)?);
    } else {
        println!("{ids}");
    }
    Ok(())
}

fn run_rows(cli: &Cli, path: &Path) -> Result<()> {
    let session = Session::load(path).context("Failed to load rows")?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(session.rows())?);
        return Ok(());
    }
    for (i, row) in session.rows().iter().enumerate() {
        let body = if !row.document_url.trim().is_empty() {
            "doc"
        } else if !row.content.trim().is_empty() {
            "text"
        } else {
            "none"
        };
        println!(
            "{:>3}  {}  {}",
            i + 1,
            bold(row.headline.trim()),
            dim(&format!("[{}] {} / {}", body, row.authors, row.categories)),
        );
    }
    Ok(())
}

fn draft_from_args(args: &PublishArgs) -> Result<ArticleDraft> {
    if let Some(ref path) = args.session {
        let mut session = Session::load(path).context("Failed to load rows")?;
        let row = args.row.unwrap_or(1);
        if row == 0 || row > session.len() {
            bail!("Row {row} is out of range (1–{})", session.len());
        }
        let selected = session.goto(row - 1).context("Session has no rows")?;
        return Ok(selected.to_draft()?);
    }

    let body = match (&args.doc_url, &args.text) {
        (Some(url), _) => BodySource::GoogleDoc(url.clone()),
        (None, Some(text)) => BodySource::Text(text.clone()),
        (None, None) => bail!("Provide --doc-url, --text or --session"),
    };
    Ok(ArticleDraft {
        headline: args.headline.clone().unwrap_or_default(),
        authors: args.authors.clone().unwrap_or_default(),
        image_url: args.image_url.clone().unwrap_or_default(),
        cutline: args.cutline.clone().unwrap_or_default(),
        categories: args.categories.clone().unwrap_or_default(),
        body,
    })
}

async fn run_publish(cli: &Cli, args: &PublishArgs) -> Result<()> {
    let config = build_config(cli, Some(args))?;
    let draft = draft_from_args(args)?;
    let google = google_client(cli)?;

    let api: Arc<dyn CmsApi> = if args.dry_run {
        dry_run_site(&config)?
    } else {
        Arc::new(WordPressClient::new(&config)?)
    };
    let mut resolver = if args.dry_run {
        NameResolver::from_config_in_memory(&config, api.clone())?
    } else {
        NameResolver::from_config(&config, api.clone())?
    };

    let request = prepare(&draft, &mut resolver, google.as_ref(), &config)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", e.title(), e))?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let spinner = (!cli.quiet && !cli.json).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Publishing");
        bar.set_message(request.post.title.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let google: Arc<dyn GoogleApi> = google;
    let outcome = submit(api, google, &config, request)
        .wait()
        .await
        .context("Publish task failed")?;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    match outcome {
        PublishOutcome::Published { post_id, media_id } => {
            if cli.json {
                let out = serde_json::json!({ "post_id": post_id, "media_id": media_id });
                println!("{out}");
            } else if !cli.quiet {
                eprintln!(
                    "{}  post {}{}",
                    green("✔"),
                    bold(&post_id.to_string()),
                    media_id
                        .map(|m| dim(&format!("  (featured media {m})")))
                        .unwrap_or_default(),
                );
            }
            Ok(())
        }
        PublishOutcome::Failed {
            stage,
            media_id,
            error,
        } => {
            eprintln!("{}  {}: {}", red("✘"), error.title(), error);
            if let Some(m) = media_id {
                eprintln!("   {}", dim(&format!("media {m} was uploaded and is left in place")));
            }
            bail!("Publishing stopped while {stage}")
        }
    }
}
