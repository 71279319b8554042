//! One unit of archival work and its accumulated result.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::Media;
use super::value::PropertyValue;

/// Property key holding the item URL.
pub const URL_KEY: &str = "url";
/// Property key preserving the pre-sanitization URL for audit.
pub const ORIGINAL_URL_KEY: &str = "original_url";
/// Property key holding the item title.
pub const TITLE_KEY: &str = "title";
/// Property key holding the item's source timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Property key holding extracted text content.
pub const CONTENT_KEY: &str = "content";
/// Property key accumulating non-fatal stage errors.
pub const ERRORS_KEY: &str = "errors";
/// Property key for the feeder-specified destination folder.
pub const FOLDER_KEY: &str = "folder";
/// Reserved property key for the formatter's canonical artifact.
pub const FINAL_MEDIA_KEY: &str = "final_media";

/// Terminal status for items where no stage produced anything.
pub const STATUS_NOTHING_ARCHIVED: &str = "nothing archived";
/// Terminal status for items abandoned by a stop request.
pub const STATUS_ABORTED: &str = "aborted";

/// One unit of archival work.
///
/// Created by a feeder with at least a URL, mutated by every stage, and
/// discarded after the databases are notified of the final outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Free-text outcome; also encodes structured sub-states such as
    /// success (contains `"success"`) and deferred retries (see
    /// [`crate::retry`]).
    #[serde(default)]
    pub status: String,

    /// Extensible property bag shared by all stages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, PropertyValue>,

    /// Media owned by this item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    media: Vec<Media>,
}

impl Metadata {
    /// Creates an empty item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an item seeded with a URL, the way feeders do.
    pub fn with_url(url: impl Into<String>) -> Self {
        let mut item = Self::new();
        item.set_url(url);
        item
    }

    /// The item URL.
    ///
    /// # Panics
    ///
    /// Every stage after the feed is entitled to a non-empty URL, so this
    /// asserts one is present. Use [`Metadata::url_opt`] at the feed
    /// boundary.
    pub fn url(&self) -> &str {
        let url = self.url_opt();
        assert!(
            url.is_some_and(|u| !u.is_empty()),
            "metadata has no URL; feeders must seed one before the pipeline runs"
        );
        url.unwrap_or_default()
    }

    /// The item URL, if the feeder set one.
    pub fn url_opt(&self) -> Option<&str> {
        self.get(URL_KEY)
            .and_then(PropertyValue::as_str)
            .filter(|u| !u.is_empty())
    }

    /// Sets the item URL.
    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.set(URL_KEY, url.into())
    }

    /// The pre-sanitization URL, when sanitization rewrote it.
    pub fn original_url(&self) -> Option<&str> {
        self.get(ORIGINAL_URL_KEY).and_then(PropertyValue::as_str)
    }

    /// The item title, if any stage recorded one.
    pub fn title(&self) -> Option<&str> {
        self.get(TITLE_KEY).and_then(PropertyValue::as_str)
    }

    /// Records the item title.
    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.set(TITLE_KEY, title.into())
    }

    /// The item's source timestamp, if recorded.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.get(TIMESTAMP_KEY).and_then(PropertyValue::as_timestamp)
    }

    /// Records the item's source timestamp.
    pub fn set_timestamp(&mut self, ts: DateTime<Utc>) -> &mut Self {
        self.set(TIMESTAMP_KEY, ts)
    }

    /// Records extracted text content.
    pub fn set_content(&mut self, content: impl Into<String>) -> &mut Self {
        self.set(CONTENT_KEY, content.into())
    }

    /// Appends a non-fatal error to the error-list property.
    pub fn append_error(&mut self, error: impl Into<String>) -> &mut Self {
        let entry = PropertyValue::from(error.into());
        match self.properties.get_mut(ERRORS_KEY) {
            Some(PropertyValue::List(errors)) => errors.push(entry),
            _ => {
                self.properties
                    .insert(ERRORS_KEY.to_string(), PropertyValue::List(vec![entry]));
            }
        }
        self
    }

    /// Errors accumulated so far.
    pub fn errors(&self) -> &[PropertyValue] {
        self.get(ERRORS_KEY)
            .and_then(PropertyValue::as_list)
            .unwrap_or_default()
    }

    /// The feeder-specified destination folder, if any.
    pub fn folder(&self) -> Option<&str> {
        self.get(FOLDER_KEY).and_then(PropertyValue::as_str)
    }

    /// The formatter's canonical artifact, if one was produced.
    pub fn final_media(&self) -> Option<&Media> {
        self.get(FINAL_MEDIA_KEY).and_then(PropertyValue::as_media)
    }

    /// Reads a property.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Writes a property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The full property bag.
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// Sets the outcome status.
    pub fn set_status(&mut self, status: impl Into<String>) -> &mut Self {
        self.status = status.into();
        self
    }

    /// Whether the item reached a successful outcome.
    ///
    /// The status string is the wire format, so the sub-state test is
    /// textual: any status containing `"success"` counts.
    pub fn is_success(&self) -> bool {
        self.status.contains("success")
    }

    /// Whether nothing was archived: no media and no successful status.
    pub fn is_empty(&self) -> bool {
        self.media.is_empty() && !self.is_success()
    }

    /// Media owned by this item.
    pub fn media(&self) -> &[Media] {
        &self.media
    }

    /// Mutable access to the owned media list.
    pub fn media_mut(&mut self) -> &mut Vec<Media> {
        &mut self.media
    }

    /// Appends a media artifact.
    pub fn add_media(&mut self, media: Media) -> &mut Self {
        self.media.push(media);
        self
    }

    /// Merges `incoming` into `self` for the same conceptual item.
    ///
    /// Nothing is silently dropped: scalar properties are overwritten by
    /// the incoming (winning) side, maps are unioned, lists are
    /// concatenated, and media lists are concatenated. The incoming status
    /// wins when non-empty.
    pub fn merge(&mut self, incoming: Metadata) {
        if !incoming.status.is_empty() {
            self.status = incoming.status;
        }
        for (key, value) in incoming.properties {
            match self.properties.get_mut(&key) {
                Some(current) => current.merge(value),
                None => {
                    self.properties.insert(key, value);
                }
            }
        }
        self.media.extend(incoming.media);
    }
}
