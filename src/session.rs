//! Spreadsheet rows and the editor's position in them.
//!
//! Rows come from a JSON export of the planning sheet: an array of objects
//! with the column names below. A [`Session`] owns the rows and an explicit
//! cursor; front ends pass it around instead of keeping a global "current
//! row". Moving past either end clamps.

use crate::catalog::read_json;
use crate::error::PublishError;
use crate::post::{ArticleDraft, BodySource};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One row of the planning sheet. Missing columns default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleRow {
    pub headline: String,
    pub authors: String,
    pub image_url: String,
    pub cutline: String,
    pub categories: String,
    /// Google Doc share URL. Takes precedence over `content`.
    #[serde(alias = "document")]
    pub document_url: String,
    /// Typed body text, used when there is no document.
    #[serde(alias = "body")]
    pub content: String,
}

impl ArticleRow {
    /// The row as form fields. Fails when there is neither a document URL nor
    /// typed content.
    pub fn to_draft(&self) -> Result<ArticleDraft, PublishError> {
        let document_url = self.document_url.trim();
        let body = if !document_url.is_empty() {
            BodySource::GoogleDoc(document_url.to_string())
        } else if !self.content.trim().is_empty() {
            BodySource::Text(self.content.clone())
        } else {
            return Err(PublishError::MissingInput { field: "body" });
        };

        Ok(ArticleDraft {
            headline: self.headline.clone(),
            authors: self.authors.clone(),
            image_url: self.image_url.clone(),
            cutline: self.cutline.clone(),
            categories: self.categories.clone(),
            body,
        })
    }
}

/// Loaded rows plus the index of the row being edited.
#[derive(Debug, Clone, Default)]
pub struct Session {
    rows: Vec<ArticleRow>,
    cursor: usize,
}

impl Session {
    pub fn new(rows: Vec<ArticleRow>) -> Self {
        Self { rows, cursor: 0 }
    }

    /// Load rows from a JSON array file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PublishError> {
        let rows: Vec<ArticleRow> = read_json(path.as_ref())?;
        debug!("Loaded {} rows from {}", rows.len(), path.as_ref().display());
        Ok(Self::new(rows))
    }

    pub fn rows(&self) -> &[ArticleRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zero-based index of the current row.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// The row under the cursor, or `None` for an empty session.
    pub fn current(&self) -> Option<&ArticleRow> {
        self.rows.get(self.cursor)
    }

    /// Advance one row, staying on the last row at the end.
    pub fn next(&mut self) -> Option<&ArticleRow> {
        self.goto(self.cursor.saturating_add(1))
    }

    /// Go back one row, staying on the first row at the start.
    pub fn prev(&mut self) -> Option<&ArticleRow> {
        self.goto(self.cursor.saturating_sub(1))
    }

    /// Jump to `index`, clamped to the last row.
    pub fn goto(&mut self, index: usize) -> Option<&ArticleRow> {
        self.cursor = index.min(self.rows.len().saturating_sub(1));
        self.current()
    }
}
