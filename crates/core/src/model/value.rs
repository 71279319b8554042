//! Heterogeneous values stored in metadata and media property bags.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::Media;

/// A value in a property bag.
///
/// Stages read and write properties through named accessors on
/// [`Metadata`](super::Metadata) and [`Media`], so plugin-defined keys
/// coexist with core-known keys without the core enumerating them.
///
/// Untagged variant order matters for deserialization: timestamps are tried
/// before plain strings, and media before plain maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Plain text.
    Str(String),
    /// Ordered list of values.
    List(Vec<PropertyValue>),
    /// Nested media artifact (e.g. a thumbnail or preview).
    Media(Box<Media>),
    /// Nested key/value mapping.
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Returns the string contents if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list contents if this is a `List`.
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map contents if this is a `Map`.
    pub fn as_map(&self) -> Option<&BTreeMap<String, PropertyValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the nested media if this is a `Media`.
    pub fn as_media(&self) -> Option<&Media> {
        match self {
            Self::Media(media) => Some(media),
            _ => None,
        }
    }

    /// Returns the timestamp if this is a `Timestamp`.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Merges `incoming` into `self`.
    ///
    /// Lists concatenate, maps union (recursively, incoming wins on
    /// conflicting leaves), everything else is overwritten by `incoming`.
    /// These rules keep repeated merges associative: the same scalars win
    /// and the same members end up in lists and maps regardless of
    /// grouping.
    pub fn merge(&mut self, incoming: PropertyValue) {
        match (self, incoming) {
            (Self::List(existing), Self::List(mut items)) => {
                existing.append(&mut items);
            }
            (Self::Map(existing), Self::Map(entries)) => {
                for (key, value) in entries {
                    match existing.get_mut(&key) {
                        Some(current) => current.merge(value),
                        None => {
                            existing.insert(key, value);
                        }
                    }
                }
            }
            (slot, incoming) => *slot = incoming,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        Self::List(value)
    }
}

impl From<Media> for PropertyValue {
    fn from(value: Media) -> Self {
        Self::Media(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_scalars() {
        let mut value = PropertyValue::from("old");
        value.merge(PropertyValue::from("new"));
        assert_eq!(value.as_str(), Some("new"));

        let mut value = PropertyValue::from(1i64);
        value.merge(PropertyValue::from(2i64));
        assert_eq!(value, PropertyValue::Int(2));
    }

    #[test]
    fn test_merge_concatenates_lists() {
        let mut value = PropertyValue::List(vec!["a".into(), "b".into()]);
        value.merge(PropertyValue::List(vec!["c".into()]));
        assert_eq!(value.as_list().unwrap().len(), 3);
    }

    #[test]
    fn test_merge_unions_maps() {
        let mut left = BTreeMap::new();
        left.insert("kept".to_string(), PropertyValue::from("x"));
        left.insert("clash".to_string(), PropertyValue::from("left"));
        let mut right = BTreeMap::new();
        right.insert("clash".to_string(), PropertyValue::from("right"));
        right.insert("added".to_string(), PropertyValue::from("y"));

        let mut value = PropertyValue::Map(left);
        value.merge(PropertyValue::Map(right));

        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["kept"].as_str(), Some("x"));
        assert_eq!(map["clash"].as_str(), Some("right"));
        assert_eq!(map["added"].as_str(), Some("y"));
    }

    #[test]
    fn test_merge_replaces_mismatched_shapes() {
        let mut value = PropertyValue::from("scalar");
        value.merge(PropertyValue::List(vec!["a".into()]));
        assert!(value.as_list().is_some());
    }

    #[test]
    fn test_serialization_is_untagged() {
        let value = PropertyValue::List(vec!["a".into(), PropertyValue::Int(3)]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"["a",3]"#);
    }
}
