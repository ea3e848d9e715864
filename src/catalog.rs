//! Catalog entries and the in-memory catalogs names are resolved against.
//!
//! Two catalogs exist per session:
//!
//! * [`AuthorCache`]: the local author list. It is loaded from an
//!   append-only JSON file (when configured), consulted before the remote
//!   `users` endpoint, and grows by one entry every time an author is
//!   auto-created.
//! * [`CategoryCatalog`]: a snapshot of the site's categories, either read
//!   from a local JSON export or listed from the remote site once.
//!
//! Lookups return a [`Lookup`] rather than an error so callers decide what a
//! miss means: categories fail, authors get created.

use crate::error::PublishError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ── Entries ──────────────────────────────────────────────────────────────

/// A WordPress user, as stored in the local author cache.
///
/// The cache file keys the ID as `"ID"` and stores it as a string; both a
/// string and a bare number are accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(
        rename = "ID",
        alias = "id",
        serialize_with = "id_as_string",
        deserialize_with = "id_from_string_or_number"
    )]
    pub id: u64,
    #[serde(alias = "name")]
    pub display_name: String,
}

/// A WordPress category. `parent == 0` marks a root category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub parent: u64,
}

impl Category {
    /// The parent ID, or `None` for a root category.
    pub fn parent_id(&self) -> Option<u64> {
        (self.parent != 0).then_some(self.parent)
    }
}

/// Anything that can be matched by display name.
pub trait Named {
    fn display_name(&self) -> &str;
}

impl Named for Author {
    fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl Named for Category {
    fn display_name(&self) -> &str {
        &self.name
    }
}

fn id_as_string<S: Serializer>(id: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&id.to_string())
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(d)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ── Lookup ───────────────────────────────────────────────────────────────

/// Result of looking a name up in a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// Exactly one entry's name equals the query, ignoring case.
    Found(T),
    /// Entries resemble the query (their name contains it, ignoring case)
    /// but none equals it.
    NearMiss(Vec<String>),
    /// Nothing resembles the query.
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Case-insensitive exact match over `entries`, falling back to a
/// containment search for near misses.
///
/// The first exact match wins when the catalog holds duplicate names.
pub fn lookup<'a, T: Named + Clone + 'a>(
    entries: impl IntoIterator<Item = &'a T>,
    name: &str,
) -> Lookup<T> {
    let wanted = name.trim().to_lowercase();
    let mut near = Vec::new();

    for entry in entries {
        let candidate = entry.display_name().to_lowercase();
        if candidate == wanted {
            return Lookup::Found(entry.clone());
        }
        if !wanted.is_empty() && candidate.contains(&wanted) {
            near.push(entry.display_name().to_string());
        }
    }

    if near.is_empty() {
        Lookup::NotFound
    } else {
        Lookup::NearMiss(near)
    }
}

// ── Author cache ─────────────────────────────────────────────────────────

/// The local author catalog.
///
/// Owned by a single [`crate::resolve::NameResolver`]; mutation goes through
/// `&mut self`, so only one writer ever appends.
#[derive(Debug, Default)]
pub struct AuthorCache {
    authors: Vec<Author>,
    path: Option<PathBuf>,
}

impl AuthorCache {
    /// A cache that lives only in memory and is never persisted.
    pub fn in_memory(authors: Vec<Author>) -> Self {
        Self {
            authors,
            path: None,
        }
    }

    /// Drop the backing file; later appends stay in memory.
    pub fn detached(self) -> Self {
        Self::in_memory(self.authors)
    }

    /// Load the cache from `path`. A missing file yields an empty cache that
    /// will be created on the first append.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PublishError> {
        let path = path.as_ref().to_path_buf();
        let authors = if path.exists() {
            read_json(&path)?
        } else {
            debug!("Author cache {} not found, starting empty", path.display());
            Vec::new()
        };
        info!("Loaded {} cached authors", authors.len());
        Ok(Self {
            authors,
            path: Some(path),
        })
    }

    pub fn lookup(&self, name: &str) -> Lookup<Author> {
        lookup(&self.authors, name)
    }

    /// Append a newly created author and persist the cache if it is file-backed.
    pub fn append(&mut self, author: Author) -> Result<(), PublishError> {
        self.authors.push(author);
        if let Some(ref path) = self.path {
            write_json(path, &self.authors)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }
}

// ── Category catalog ─────────────────────────────────────────────────────

/// Immutable-per-session snapshot of the site's categories, indexed by ID.
#[derive(Debug, Default, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
    by_id: HashMap<u64, usize>,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        let by_id = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        Self { categories, by_id }
    }

    /// Load a WordPress-shaped category export.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PublishError> {
        let categories: Vec<Category> = read_json(path.as_ref())?;
        info!("Loaded {} categories from snapshot", categories.len());
        Ok(Self::new(categories))
    }

    pub fn lookup(&self, name: &str) -> Lookup<Category> {
        lookup(&self.categories, name)
    }

    pub fn get(&self, id: u64) -> Option<&Category> {
        self.by_id.get(&id).map(|&i| &self.categories[i])
    }

    /// Remember a category fetched by ID while walking ancestry.
    pub fn insert(&mut self, category: Category) {
        if self.by_id.contains_key(&category.id) {
            return;
        }
        self.by_id.insert(category.id, self.categories.len());
        self.categories.push(category);
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// ── JSON file helpers ────────────────────────────────────────────────────

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PublishError> {
    let raw = std::fs::read_to_string(path).map_err(|e| PublishError::CacheIo {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| PublishError::CacheIo {
        path: path.to_path_buf(),
        detail: format!("invalid JSON: {e}"),
    })
}

/// Write via a sibling temp file and rename so a crash never truncates the cache.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PublishError> {
    let io_err = |e: std::io::Error| PublishError::CacheIo {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let json = serde_json::to_string_pretty(value).map_err(|e| PublishError::CacheIo {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json).map_err(io_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authors() -> Vec<Author> {
        vec![
            Author {
                id: 7,
                display_name: "Jane Doe".into(),
            },
            Author {
                id: 9,
                display_name: "John Smith".into(),
            },
        ]
    }

    #[test]
    fn author_reads_string_and_numeric_ids() {
        let json = r#"[{"ID": "12", "display_name": "A B"}, {"id": 13, "name": "C D"}]"#;
        let parsed: Vec<Author> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].id, 12);
        assert_eq!(parsed[1].id, 13);
        assert_eq!(parsed[1].display_name, "C D");
    }

    #[test]
    fn author_writes_id_as_string() {
        let json = serde_json::to_string(&authors()[0]).unwrap();
        assert_eq!(json, r#"{"ID":"7","display_name":"Jane Doe"}"#);
    }

    #[test]
    fn lookup_is_case_insensitive_and_trims() {
        assert_eq!(
            lookup(&authors(), "  jane DOE "),
            Lookup::Found(authors()[0].clone())
        );
    }

    #[test]
    fn lookup_distinguishes_near_miss_from_not_found() {
        assert_eq!(
            lookup(&authors(), "Jane"),
            Lookup::NearMiss(vec!["Jane Doe".into()])
        );
        assert_eq!(lookup(&authors(), "Alex Kim"), Lookup::NotFound);
    }

    #[test]
    fn longer_name_is_not_a_near_miss() {
        assert_eq!(lookup(&authors(), "Jane Doerr"), Lookup::NotFound);
        let categories = vec![Category {
            id: 1,
            name: "News".into(),
            parent: 0,
        }];
        assert_eq!(lookup(&categories, "Campus News"), Lookup::NotFound);
    }

    #[test]
    fn category_parent_zero_is_root() {
        let root = Category {
            id: 1,
            name: "News".into(),
            parent: 0,
        };
        assert_eq!(root.parent_id(), None);
        let child = Category {
            id: 2,
            name: "Local".into(),
            parent: 1,
        };
        assert_eq!(child.parent_id(), Some(1));
    }

    #[test]
    fn category_catalog_insert_is_idempotent() {
        let mut catalog = CategoryCatalog::new(vec![]);
        let c = Category {
            id: 4,
            name: "Sports".into(),
            parent: 0,
        };
        catalog.insert(c.clone());
        catalog.insert(c);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(4).map(|c| c.name.as_str()), Some("Sports"));
    }

    #[test]
    fn author_cache_appends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authors.json");

        let mut cache = AuthorCache::load(&path).unwrap();
        assert!(cache.is_empty());
        cache
            .append(Author {
                id: 42,
                display_name: "New Writer".into(),
            })
            .unwrap();

        let reloaded = AuthorCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.lookup("new writer").is_found());
    }

    #[test]
    fn detached_cache_never_touches_its_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authors.json");
        write_json(&path, &authors()).unwrap();
        let before = std::fs::read(&path).unwrap();

        let mut cache = AuthorCache::load(&path).unwrap().detached();
        cache
            .append(Author {
                id: 41,
                display_name: "Alex Kim".into(),
            })
            .unwrap();

        assert!(cache.lookup("alex kim").is_found());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn author_cache_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("authors.json");
        std::fs::write(&path, "not json").unwrap();
        let err = AuthorCache::load(&path).unwrap_err();
        assert!(matches!(err, PublishError::CacheIo { .. }));
    }
}
