//! Feeder producing items from a configured URL list.

use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::model::{Metadata, FOLDER_KEY};
use crate::registry::StepConfig;
use crate::stage::{Feeder, Step};

use super::{config_str, config_str_list};

/// Yields one item per configured URL, in order, with an optional shared
/// destination folder.
pub struct UrlFeeder {
    queue: Mutex<VecDeque<Metadata>>,
}

impl UrlFeeder {
    /// Builds the feeder from its module config (`urls`, optional
    /// `folder`).
    pub fn from_config(config: &StepConfig) -> Result<Self> {
        let urls = config_str_list(config, "urls");
        let folder = config_str(config, "folder");

        let queue = urls
            .into_iter()
            .map(|url| {
                let mut item = Metadata::with_url(url);
                if let Some(folder) = &folder {
                    item.set(FOLDER_KEY, folder.as_str());
                }
                item
            })
            .collect();
        Ok(Self {
            queue: Mutex::new(queue),
        })
    }

    /// A feeder over pre-built items, for wiring outside the registry.
    pub fn from_items(items: impl IntoIterator<Item = Metadata>) -> Self {
        Self {
            queue: Mutex::new(items.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Step for UrlFeeder {
    fn name(&self) -> &str {
        "url_feeder"
    }
}

#[async_trait]
impl Feeder for UrlFeeder {
    async fn next_item(&self) -> Result<Option<Metadata>> {
        let next = self.queue.lock().await.pop_front();
        if let Some(item) = &next {
            debug!(url = item.url_opt().unwrap_or_default(), "feeding item");
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feeds_urls_in_order_then_exhausts() {
        let mut config = StepConfig::new();
        config.insert(
            "urls".to_string(),
            toml::Value::Array(vec![
                toml::Value::String("https://example.com/1".to_string()),
                toml::Value::String("https://example.com/2".to_string()),
            ]),
        );
        let feeder = UrlFeeder::from_config(&config).unwrap();

        let first = feeder.next_item().await.unwrap().unwrap();
        assert_eq!(first.url(), "https://example.com/1");
        let second = feeder.next_item().await.unwrap().unwrap();
        assert_eq!(second.url(), "https://example.com/2");
        assert!(feeder.next_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_folder_is_attached_per_item() {
        let mut config = StepConfig::new();
        config.insert(
            "urls".to_string(),
            toml::Value::Array(vec![toml::Value::String("https://example.com".to_string())]),
        );
        config.insert(
            "folder".to_string(),
            toml::Value::String("investigations/42".to_string()),
        );
        let feeder = UrlFeeder::from_config(&config).unwrap();

        let item = feeder.next_item().await.unwrap().unwrap();
        assert_eq!(item.folder(), Some("investigations/42"));
    }

    #[tokio::test]
    async fn test_empty_config_is_an_empty_feed() {
        let feeder = UrlFeeder::from_config(&StepConfig::new()).unwrap();
        assert!(feeder.next_item().await.unwrap().is_none());
    }
}
