//! Error types for the gdoc2wp library.
//!
//! A single fatal error type, [`PublishError`], covers every way an article
//! can fail to reach WordPress. The variants fall into four groups that the
//! front end surfaces differently:
//!
//! * **Input**: a required field is empty or malformed. The editor fixes the
//!   row and tries again.
//! * **Resolution**: a free-text author or category name could not be mapped
//!   to a catalog ID. [`PublishError::NoMatch`] means nothing like the name
//!   exists; [`PublishError::AmbiguousMatch`] means something close exists,
//!   which is almost always a typo.
//! * **Remote**: the WordPress or Google endpoint rejected the request or
//!   timed out.
//! * **Local**: cache files, image re-encoding, configuration.
//!
//! Nothing is retried automatically. Resolution errors are raised before any
//! media upload or post creation happens.

use std::path::PathBuf;
use thiserror::Error;

/// The catalog a name was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CatalogKind {
    Author,
    Category,
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogKind::Author => f.write_str("author"),
            CatalogKind::Category => f.write_str("category"),
        }
    }
}

/// All fatal errors returned by the gdoc2wp library.
#[derive(Debug, Error)]
pub enum PublishError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required field was empty or whitespace only.
    #[error("No {field} provided.")]
    MissingInput { field: &'static str },

    /// A field was present but could not be interpreted.
    #[error("Malformed {field}: {detail}")]
    MalformedData { field: &'static str, detail: String },

    // ── Resolution errors ─────────────────────────────────────────────────
    /// The name matched nothing in the catalog.
    #[error("No {kind} matching \"{name}\"")]
    NoMatch { kind: CatalogKind, name: String },

    /// The name is close to one or more catalog entries but matches none exactly.
    #[error("No {kind} exactly matching \"{name}\"; did you mean one of: {}?", .candidates.join(", "))]
    AmbiguousMatch {
        kind: CatalogKind,
        name: String,
        candidates: Vec<String>,
    },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The endpoint answered with a non-success status or could not be reached.
    #[error("Request to '{endpoint}' failed{}: {detail}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteError {
        endpoint: String,
        status: Option<u16>,
        detail: String,
    },

    /// The endpoint did not answer within the configured timeout.
    #[error("Request to '{endpoint}' timed out after {secs}s\nIncrease --timeout.")]
    RemoteTimeout { endpoint: String, secs: u64 },

    // ── Local errors ──────────────────────────────────────────────────────
    /// A local JSON file (author cache, category snapshot, session rows) could
    /// not be read or written.
    #[error("Failed to access '{path}': {detail}")]
    CacheIo { path: PathBuf, detail: String },

    /// The downloaded image could not be decoded or re-encoded.
    #[error("Image conversion failed for '{path}': {detail}")]
    ImageConversion { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PublishError {
    /// Short heading for the notification shown to the editor.
    pub fn title(&self) -> &'static str {
        match self {
            PublishError::MissingInput { .. } | PublishError::MalformedData { .. } => {
                "Malformed or Missing Data"
            }
            PublishError::NoMatch { .. } | PublishError::AmbiguousMatch { .. } => "Unknown Name",
            PublishError::RemoteError { .. } | PublishError::RemoteTimeout { .. } => "HTTP Error",
            _ => "General Error",
        }
    }

    /// Build a [`PublishError::RemoteError`] from a reqwest failure,
    /// mapping timeouts to [`PublishError::RemoteTimeout`].
    pub(crate) fn from_reqwest(endpoint: &str, err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            PublishError::RemoteTimeout {
                endpoint: endpoint.to_string(),
                secs: timeout_secs,
            }
        } else {
            PublishError::RemoteError {
                endpoint: endpoint.to_string(),
                status: err.status().map(|s| s.as_u16()),
                detail: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_display() {
        let e = PublishError::MissingInput { field: "categories" };
        assert_eq!(e.to_string(), "No categories provided.");
        assert_eq!(e.title(), "Malformed or Missing Data");
    }

    #[test]
    fn no_match_display() {
        let e = PublishError::NoMatch {
            kind: CatalogKind::Category,
            name: "Sprots".into(),
        };
        assert_eq!(e.to_string(), "No category matching \"Sprots\"");
    }

    #[test]
    fn ambiguous_match_lists_candidates() {
        let e = PublishError::AmbiguousMatch {
            kind: CatalogKind::Author,
            name: "Jane".into(),
            candidates: vec!["Jane Doe".into(), "Jane Roe".into()],
        };
        let msg = e.to_string();
        assert!(msg.contains("author"), "got: {msg}");
        assert!(msg.contains("Jane Doe, Jane Roe"), "got: {msg}");
    }

    #[test]
    fn remote_error_display_with_status() {
        let e = PublishError::RemoteError {
            endpoint: "users".into(),
            status: Some(400),
            detail: "existing_user_login".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 400"), "got: {msg}");
        assert!(msg.contains("existing_user_login"));
        assert_eq!(e.title(), "HTTP Error");
    }

    #[test]
    fn remote_error_display_without_status() {
        let e = PublishError::RemoteError {
            endpoint: "posts".into(),
            status: None,
            detail: "connection refused".into(),
        };
        assert!(!e.to_string().contains("HTTP"));
    }
}
