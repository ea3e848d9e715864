//! In-memory [`CmsApi`] for dry runs and tests.
//!
//! Behaves like a small WordPress site: search is a case-insensitive
//! substring match, created objects get increasing IDs, and every write is
//! recorded so callers can inspect what would have been sent. Individual
//! endpoints can be told to fail to exercise error paths.

use crate::catalog::{Author, Category};
use crate::client::{CmsApi, MediaUpload, NewAuthor};
use crate::error::PublishError;
use crate::post::PostPayload;
use async_trait::async_trait;
use std::sync::Mutex;

/// An uploaded media item as recorded by [`MemoryCms`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub id: u64,
    pub file_name: String,
    pub caption: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    users: Vec<Author>,
    created_users: Vec<NewAuthor>,
    categories: Vec<Category>,
    category_reads: usize,
    media: Vec<StoredMedia>,
    posts: Vec<(u64, PostPayload)>,
}

/// In-memory CMS. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryCms {
    inner: Mutex<Inner>,
    fail_users: bool,
    fail_media: bool,
    fail_posts: bool,
}

impl MemoryCms {
    pub fn new(users: Vec<Author>, categories: Vec<Category>) -> Self {
        let next_id = users
            .iter()
            .map(|u| u.id)
            .chain(categories.iter().map(|c| c.id))
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            inner: Mutex::new(Inner {
                next_id,
                users,
                categories,
                ..Inner::default()
            }),
            ..Self::default()
        }
    }

    /// Reject every `create_user` call with HTTP 400.
    pub fn failing_users(mut self) -> Self {
        self.fail_users = true;
        self
    }

    /// Reject every `upload_media` call with HTTP 500.
    pub fn failing_media(mut self) -> Self {
        self.fail_media = true;
        self
    }

    /// Reject every `create_post` call with HTTP 500.
    pub fn failing_posts(mut self) -> Self {
        self.fail_posts = true;
        self
    }

    pub fn created_users(&self) -> Vec<NewAuthor> {
        self.lock().created_users.clone()
    }

    pub fn media(&self) -> Vec<StoredMedia> {
        self.lock().media.clone()
    }

    pub fn posts(&self) -> Vec<(u64, PostPayload)> {
        self.lock().posts.clone()
    }

    /// Number of `get_category` calls served.
    pub fn category_reads(&self) -> usize {
        self.lock().category_reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; the data is
        // still usable for inspection.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn rejected(endpoint: &str, status: u16) -> PublishError {
        PublishError::RemoteError {
            endpoint: endpoint.to_string(),
            status: Some(status),
            detail: "rejected by in-memory CMS".to_string(),
        }
    }
}

impl Inner {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }
}

fn resembles(name: &str, query: &str) -> bool {
    name.to_lowercase().contains(&query.trim().to_lowercase())
}

#[async_trait]
impl CmsApi for MemoryCms {
    async fn search_users(&self, query: &str) -> Result<Vec<Author>, PublishError> {
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|u| resembles(&u.display_name, query))
            .cloned()
            .collect())
    }

    async fn create_user(&self, author: &NewAuthor) -> Result<u64, PublishError> {
        if self.fail_users {
            return Err(Self::rejected("users", 400));
        }
        let mut inner = self.lock();
        let id = inner.allocate_id();
        inner.users.push(Author {
            id,
            display_name: author.name.clone(),
        });
        inner.created_users.push(author.clone());
        Ok(id)
    }

    async fn search_categories(&self, query: &str) -> Result<Vec<Category>, PublishError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| resembles(&c.name, query))
            .cloned()
            .collect())
    }

    async fn get_category(&self, id: u64) -> Result<Category, PublishError> {
        let mut inner = self.lock();
        inner.category_reads += 1;
        inner
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| Self::rejected("categories", 404))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, PublishError> {
        Ok(self.lock().categories.clone())
    }

    async fn upload_media(&self, media: MediaUpload<'_>) -> Result<u64, PublishError> {
        if self.fail_media {
            return Err(Self::rejected("media", 500));
        }
        let mut inner = self.lock();
        let id = inner.allocate_id();
        inner.media.push(StoredMedia {
            id,
            file_name: media
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            caption: media.caption.map(str::to_string),
        });
        Ok(id)
    }

    async fn create_post(&self, post: &PostPayload) -> Result<u64, PublishError> {
        if self.fail_posts {
            return Err(Self::rejected("posts", 500));
        }
        let mut inner = self.lock();
        let id = inner.allocate_id();
        inner.posts.push((id, post.clone()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ids_continue_after_seeded_entries() {
        let cms = MemoryCms::new(
            vec![Author {
                id: 10,
                display_name: "Jane Doe".into(),
            }],
            vec![Category {
                id: 3,
                name: "News".into(),
                parent: 0,
            }],
        );
        let new_author = NewAuthor {
            username: "jroe".into(),
            name: "Jane Roe".into(),
            first_name: "Jane".into(),
            last_name: "Roe".into(),
            email: "jroe@nogood.net".into(),
            nickname: "jroe".into(),
            password: "x".into(),
        };
        assert_eq!(cms.create_user(&new_author).await.unwrap(), 11);
        assert_eq!(cms.search_users("jane").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_endpoints_report_remote_errors() {
        let cms = MemoryCms::default().failing_posts();
        let err = cms.get_category(1).await.unwrap_err();
        assert!(matches!(err, PublishError::RemoteError { status: Some(404), .. }));
        assert_eq!(cms.category_reads(), 1);
    }
}
