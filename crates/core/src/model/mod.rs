//! The result model shared by every pipeline stage.
//!
//! A [`Metadata`] is one unit of archival work: the URL being archived plus
//! everything the stages accumulated about it. A [`Media`] is one concrete
//! artifact (a local file) with its own property bag. [`PropertyValue`] is
//! the heterogeneous value type both bags hold.

mod media;
mod metadata;
mod value;

pub use media::{Media, HASH_KEY};
pub use metadata::{
    Metadata, CONTENT_KEY, ERRORS_KEY, FINAL_MEDIA_KEY, FOLDER_KEY, ORIGINAL_URL_KEY,
    STATUS_ABORTED, STATUS_NOTHING_ARCHIVED, TIMESTAMP_KEY, TITLE_KEY, URL_KEY,
};
pub use value::PropertyValue;
