//! Free-text author and category names → WordPress IDs.
//!
//! Editors type names the way they appear on the site, separated by
//! semicolons: `"Jane Doe; John Smith"`, `"Sports; Football"`. Each segment is
//! trimmed and matched case-insensitively against a catalog.
//!
//! * **Categories** must already exist. A match adds the category and every
//!   ancestor up to the root, so a post filed under *Football* is also filed
//!   under *Sports*. The result is a deduplicated ID set.
//! * **Authors** are looked up in the local cache first, then on the site.
//!   An author found nowhere is created on the site with a derived username
//!   and a random throwaway password, and remembered in the cache so the same
//!   name resolves to the same ID for the rest of the run. Author IDs keep
//!   their input order and are not deduplicated.
//!
//! A name that resembles catalog entries without matching one exactly fails
//! with [`PublishError::AmbiguousMatch`] for both kinds. Authors are only
//! created when nothing resembles the name.

use crate::catalog::{self, Author, AuthorCache, Category, CategoryCatalog, Lookup};
use crate::client::{CmsApi, NewAuthor};
use crate::config::PublisherConfig;
use crate::error::{CatalogKind, PublishError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Random bytes in an auto-created author's password.
const SECRET_BYTES: usize = 24;

/// Resolves author and category names for one session.
///
/// Owns the author cache; `&mut self` on the resolve methods makes this the
/// cache's only writer.
pub struct NameResolver {
    api: Arc<dyn CmsApi>,
    authors: AuthorCache,
    categories: Option<CategoryCatalog>,
    /// The category catalog came from a local file and may be stale.
    categories_from_snapshot: bool,
    email_domain: String,
}

impl NameResolver {
    pub fn new(
        api: Arc<dyn CmsApi>,
        authors: AuthorCache,
        categories: Option<CategoryCatalog>,
        email_domain: impl Into<String>,
    ) -> Self {
        let categories_from_snapshot = categories.is_some();
        Self {
            api,
            authors,
            categories,
            categories_from_snapshot,
            email_domain: email_domain.into(),
        }
    }

    /// Build a resolver from the configured cache and snapshot files.
    pub fn from_config(config: &PublisherConfig, api: Arc<dyn CmsApi>) -> Result<Self, PublishError> {
        let authors = match config.authors_cache {
            Some(ref path) => AuthorCache::load(path)?,
            None => AuthorCache::default(),
        };
        let categories = match config.categories_snapshot {
            Some(ref path) => Some(CategoryCatalog::load(path)?),
            None => None,
        };
        Ok(Self::new(api, authors, categories, &config.author_email_domain))
    }

    /// Like [`NameResolver::from_config`], but authors created during the
    /// session are kept in memory and never written back to the cache file.
    ///
    /// Used for dry runs, where "created" authors carry IDs the site never
    /// issued.
    pub fn from_config_in_memory(
        config: &PublisherConfig,
        api: Arc<dyn CmsApi>,
    ) -> Result<Self, PublishError> {
        let mut resolver = Self::from_config(config, api)?;
        resolver.authors = resolver.authors.detached();
        Ok(resolver)
    }

    pub fn author_cache(&self) -> &AuthorCache {
        &self.authors
    }

    // ── Categories ───────────────────────────────────────────────────────

    /// Resolve `"A; B"` to a comma-joined, deduplicated list of category IDs
    /// including every ancestor of each match.
    pub async fn resolve_categories(&mut self, raw: &str) -> Result<String, PublishError> {
        let ids = self.resolve_category_ids(raw).await?;
        Ok(join_ids(ids))
    }

    /// As [`Self::resolve_categories`], returning the IDs in ascending order.
    pub async fn resolve_category_ids(&mut self, raw: &str) -> Result<BTreeSet<u64>, PublishError> {
        let names = split_names(raw, "categories")?;
        self.ensure_categories().await?;

        let mut ids = BTreeSet::new();
        for name in names {
            let category = self.find_category(name).await?;
            debug!("Category {:?} → {}", name, category.id);
            ids.insert(category.id);
            self.collect_ancestors(&category, &mut ids).await?;
        }
        Ok(ids)
    }

    /// List the site's categories once if no snapshot was supplied.
    async fn ensure_categories(&mut self) -> Result<(), PublishError> {
        if self.categories.is_none() {
            let listed = self.api.list_categories().await?;
            self.categories = Some(CategoryCatalog::new(listed));
        }
        Ok(())
    }

    fn catalog_mut(&mut self) -> &mut CategoryCatalog {
        self.categories.get_or_insert_with(CategoryCatalog::default)
    }

    async fn find_category(&mut self, name: &str) -> Result<Category, PublishError> {
        let local = self.catalog_mut().lookup(name);
        let near = match local {
            Lookup::Found(category) => return Ok(category),
            Lookup::NearMiss(near) => near,
            Lookup::NotFound => Vec::new(),
        };

        // A snapshot may predate categories created since; ask the site
        // before giving up.
        let remote = if self.categories_from_snapshot {
            let results = self.api.search_categories(name).await?;
            catalog::lookup(&results, name)
        } else {
            Lookup::NotFound
        };

        match remote {
            Lookup::Found(category) => {
                self.catalog_mut().insert(category.clone());
                Ok(category)
            }
            Lookup::NearMiss(more) => Err(ambiguous(CatalogKind::Category, name, near, more)),
            Lookup::NotFound if !near.is_empty() => {
                Err(ambiguous(CatalogKind::Category, name, near, Vec::new()))
            }
            Lookup::NotFound => Err(PublishError::NoMatch {
                kind: CatalogKind::Category,
                name: name.to_string(),
            }),
        }
    }

    /// Walk `parent` links to the root, fetching parents the catalog lacks.
    async fn collect_ancestors(
        &mut self,
        category: &Category,
        ids: &mut BTreeSet<u64>,
    ) -> Result<(), PublishError> {
        let mut visited = HashSet::from([category.id]);
        let mut parent_id = category.parent_id();

        while let Some(id) = parent_id {
            if !visited.insert(id) {
                warn!("Category hierarchy loops back to {}; stopping", id);
                break;
            }
            let cached = self.catalog_mut().get(id).cloned();
            let parent = match cached {
                Some(parent) => parent,
                None => {
                    debug!("Parent category {} not in catalog; fetching", id);
                    let fetched = self.api.get_category(id).await?;
                    self.catalog_mut().insert(fetched.clone());
                    fetched
                }
            };
            ids.insert(parent.id);
            parent_id = parent.parent_id();
        }
        Ok(())
    }

    // ── Authors ──────────────────────────────────────────────────────────

    /// Resolve `"A; B"` to comma-joined author IDs, creating unknown authors.
    pub async fn resolve_authors(&mut self, raw: &str) -> Result<String, PublishError> {
        let ids = self.resolve_author_ids(raw).await?;
        Ok(join_ids(ids))
    }

    /// As [`Self::resolve_authors`], returning one ID per input segment.
    pub async fn resolve_author_ids(&mut self, raw: &str) -> Result<Vec<u64>, PublishError> {
        let names = split_names(raw, "authors")?;
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = self.resolve_author(name).await?;
            debug!("Author {:?} → {}", name, id);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn resolve_author(&mut self, name: &str) -> Result<u64, PublishError> {
        let near = match self.authors.lookup(name) {
            Lookup::Found(author) => return Ok(author.id),
            Lookup::NearMiss(near) => near,
            Lookup::NotFound => Vec::new(),
        };

        let results = self.api.search_users(name).await?;
        match catalog::lookup(&results, name) {
            Lookup::Found(author) => {
                self.authors.append(author.clone())?;
                Ok(author.id)
            }
            Lookup::NearMiss(more) => Err(ambiguous(CatalogKind::Author, name, near, more)),
            Lookup::NotFound if !near.is_empty() => {
                Err(ambiguous(CatalogKind::Author, name, near, Vec::new()))
            }
            Lookup::NotFound => self.create_author(name).await,
        }
    }

    async fn create_author(&mut self, name: &str) -> Result<u64, PublishError> {
        let new_author = new_author(name, &self.email_domain)?;
        info!(
            "Author {:?} not found; creating user '{}'",
            name, new_author.username
        );

        let id = self.api.create_user(&new_author).await?;
        self.authors.append(Author {
            id,
            display_name: name.to_string(),
        })?;
        Ok(id)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Split on `;`, trim, drop empty segments. Fails when nothing is left.
pub fn split_names<'a>(raw: &'a str, field: &'static str) -> Result<Vec<&'a str>, PublishError> {
    let names: Vec<&str> = raw
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Err(PublishError::MissingInput { field });
    }
    Ok(names)
}

fn join_ids(ids: impl IntoIterator<Item = u64>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn ambiguous(kind: CatalogKind, name: &str, mut near: Vec<String>, more: Vec<String>) -> PublishError {
    for candidate in more {
        if !near.contains(&candidate) {
            near.push(candidate);
        }
    }
    PublishError::AmbiguousMatch {
        kind,
        name: name.to_string(),
        candidates: near,
    }
}

/// Split a display name into (given, family). The family name is the last
/// whitespace-separated token; a single-token name is used for both.
pub fn split_display_name(name: &str) -> (String, String) {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.split_last() {
        Some((last, [])) => (last.to_string(), last.to_string()),
        Some((last, given)) => (given.join(" "), last.to_string()),
        None => (String::new(), String::new()),
    }
}

/// First letter of the given name plus the family name, lowercased.
pub fn username_for(name: &str) -> Option<String> {
    let (given, family) = split_display_name(name);
    let initial = given.chars().next()?;
    Some(initial.to_lowercase().chain(family.to_lowercase().chars()).collect())
}

/// A URL-safe random password. Never logged.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn new_author(name: &str, email_domain: &str) -> Result<NewAuthor, PublishError> {
    let username = username_for(name).ok_or(PublishError::MissingInput { field: "authors" })?;
    let (first_name, last_name) = split_display_name(name);
    Ok(NewAuthor {
        email: format!("{username}@{email_domain}"),
        nickname: username.clone(),
        username,
        name: name.to_string(),
        first_name,
        last_name,
        password: generate_secret(),
    })
}
