//! Article drafts and the payload sent to the posts endpoint.
//!
//! An [`ArticleDraft`] holds the raw strings an editor typed or a spreadsheet
//! row supplied. [`crate::publish::prepare`] turns it into a
//! [`PublishRequest`]: an immutable snapshot with the body rendered to HTML
//! and every name resolved to IDs. The background task only ever sees that
//! snapshot.

use crate::config::{PostStatus, PublisherConfig};
use crate::error::PublishError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Where the article body comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BodySource {
    /// A Google Doc share URL; fetched and converted to HTML.
    GoogleDoc(String),
    /// Hand-typed text; blank lines dropped, lines become paragraphs.
    Text(String),
    /// Already-rendered HTML, sent as is.
    Html(String),
}

/// Raw form fields for one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub headline: String,
    /// Semicolon-separated author display names.
    pub authors: String,
    /// Google Drive share URL of the featured image, or empty.
    #[serde(default)]
    pub image_url: String,
    /// Caption for the featured image.
    #[serde(default)]
    pub cutline: String,
    /// Semicolon-separated category names.
    pub categories: String,
    pub body: BodySource,
}

/// The featured image to transfer from Drive to the media library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub url: String,
    pub caption: Option<String>,
}

/// Form body for `POST posts`.
///
/// `author` and `categories` are comma-joined ID lists, the format the
/// downstream endpoint accepts for list fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    pub author: String,
    pub categories: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    pub status: PostStatus,
    #[serde(with = "wp_date")]
    pub date: NaiveDateTime,
}

impl PostPayload {
    /// A copy of this payload pointing at an uploaded featured image.
    pub fn with_featured_media(&self, media_id: Option<u64>) -> Self {
        Self {
            featured_media: media_id,
            ..self.clone()
        }
    }
}

/// Everything the background publish task needs, captured at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub post: PostPayload,
    pub image: Option<ImageSource>,
}

impl PublishRequest {
    /// Assemble the snapshot from rendered/resolved parts, rejecting an empty
    /// title or body.
    pub fn assemble(
        draft: &ArticleDraft,
        content: String,
        author: String,
        categories: String,
        config: &PublisherConfig,
        today: NaiveDate,
    ) -> Result<Self, PublishError> {
        let title = draft.headline.trim().to_string();
        if title.is_empty() {
            return Err(PublishError::MissingInput { field: "headline" });
        }
        if content.trim().is_empty() {
            return Err(PublishError::MissingInput { field: "body" });
        }

        let image_url = draft.image_url.trim();
        let image = (!image_url.is_empty()).then(|| ImageSource {
            url: image_url.to_string(),
            caption: Some(draft.cutline.trim().to_string()).filter(|c| !c.is_empty()),
        });

        Ok(Self {
            post: PostPayload {
                title,
                content,
                author,
                categories,
                featured_media: None,
                status: config.post_status,
                date: schedule_date(today, config.schedule_weekday, config.schedule_hour),
            },
            image,
        })
    }
}

/// The next `weekday` on or after `today`, at `hour`:00 local time.
pub fn schedule_date(today: NaiveDate, weekday: Weekday, hour: u32) -> NaiveDateTime {
    let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    let day = today + Duration::days(i64::from(ahead));
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or_default();
    day.and_time(time)
}

/// WordPress wants `YYYY-MM-DDTHH:MM:SS` in the site's local time.
mod wp_date {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
