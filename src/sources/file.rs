use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;

use crate::errors::SourceError;
use crate::sources::{RawItem, RawReply, SourceConnector};

/// An item of the dump, with its replies inline
#[derive(Debug, Clone, Deserialize)]
struct FileItem {
    #[serde(flatten)]
    item: RawItem,
    #[serde(default)]
    replies: Vec<RawReply>,
}

/// Connector over a JSON dump: `{"source": [item, ...], ...}`
///
/// Used for offline re-runs of captured data. `list_sources` is sorted by
/// name; collection order comes from the configured source list.
pub struct FileConnector {
    sources: BTreeMap<String, Vec<FileItem>>,
}

impl FileConnector {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let connector = Self::from_json(&content)?;
        info!("Loaded {} sources from {:?}", connector.sources.len(), path);
        Ok(connector)
    }

    pub fn from_json(content: &str) -> Result<Self, SourceError> {
        let sources: BTreeMap<String, Vec<FileItem>> = serde_json::from_str(content)
            .map_err(|e| SourceError::ParseError(e.to_string()))?;
        Ok(Self { sources })
    }

    fn source(&self, source: &str) -> Result<&Vec<FileItem>, SourceError> {
        self.sources
            .get(source)
            .ok_or_else(|| SourceError::NotFound(source.to_string()))
    }
}

#[async_trait]
impl SourceConnector for FileConnector {
    fn name(&self) -> &str {
        "file"
    }

    fn list_sources(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    async fn fetch_items(&self, source: &str, _page_size: usize) -> Result<Vec<RawItem>, SourceError> {
        let items: Vec<RawItem> = self.source(source)?.iter().map(|f| f.item.clone()).collect();
        debug!("File source '{}' has {} items", source, items.len());
        Ok(items)
    }

    async fn fetch_replies(&self, source: &str, item_id: &str, limit: usize) -> Result<Vec<RawReply>, SourceError> {
        let item = self
            .source(source)?
            .iter()
            .find(|f| f.item.id == item_id)
            .ok_or_else(|| SourceError::NotFound(format!("{}/{}", source, item_id)))?;

        Ok(item
            .replies
            .iter()
            .take(limit)
            .map(|reply| RawReply {
                item_id: item_id.to_string(),
                ..reply.clone()
            })
            .collect())
    }
}
