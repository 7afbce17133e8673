/*!
 * Content source connectors.
 *
 * A connector knows how to list its sources and fetch their items (and,
 * optionally, the replies under an item). Authentication, pagination and
 * transport errors stay inside the connector; the collector only sees
 * [`RawItem`]s or a [`SourceError`].
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app_config::{Config, ConnectorKind};
use crate::errors::SourceError;

pub mod file;
pub mod reddit;

pub use file::FileConnector;
pub use reddit::RedditConnector;

/// Author value used when the source reports a deleted account
pub const DELETED_AUTHOR: &str = "[deleted]";

/// An item as reported by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Source-assigned identifier (natural key)
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// `None` or [`DELETED_AUTHOR`] for deleted accounts
    #[serde(default)]
    pub author: Option<String>,
    /// Creation time, epoch seconds
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub permalink: String,
    /// Language declared by the source, if any
    #[serde(default)]
    pub lang_hint: Option<String>,
}

impl RawItem {
    /// Title and body joined the way keyword matching sees them
    pub fn full_text(&self) -> String {
        match (self.title.trim().is_empty(), self.body.trim().is_empty()) {
            (false, false) => format!("{} {}", self.title.trim(), self.body.trim()),
            (false, true) => self.title.trim().to_string(),
            (true, false) => self.body.trim().to_string(),
            (true, true) => String::new(),
        }
    }
}

/// A reply under an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReply {
    /// Source-assigned identifier (natural key)
    pub id: String,
    /// Natural key of the owning item
    #[serde(default)]
    pub item_id: String,
    /// Raw parent reference as reported (item or another reply)
    #[serde(default)]
    pub parent_ref: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub score: i64,
}

/// Normalize author handles, mapping missing accounts to the sentinel
pub fn normalize_author(author: Option<&str>) -> String {
    match author.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DELETED_AUTHOR.to_string(),
    }
}

/// A paginated content feed
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Connector identifier, for logs and reports
    fn name(&self) -> &str;

    /// Sources this connector can serve, in its preferred order
    fn list_sources(&self) -> Vec<String>;

    /// Fetch the items of a source in native feed order
    ///
    /// `page_size` bounds each underlying request; the connector stops at
    /// its own item cap or when the feed is exhausted.
    async fn fetch_items(&self, source: &str, page_size: usize) -> Result<Vec<RawItem>, SourceError>;

    /// Fetch replies under an item; connectors without replies return none
    async fn fetch_replies(
        &self,
        _source: &str,
        _item_id: &str,
        _limit: usize,
    ) -> Result<Vec<RawReply>, SourceError> {
        Ok(Vec::new())
    }
}

/// Build the configured connector
pub fn build_connector(config: &Config) -> Result<Box<dyn SourceConnector>, SourceError> {
    match config.connector.kind {
        ConnectorKind::Reddit => Ok(Box::new(RedditConnector::from_config(config)?)),
        ConnectorKind::File => {
            let path = config.connector.file_path.as_deref().ok_or_else(|| {
                SourceError::NotFound("connector.file_path is not set".to_string())
            })?;
            Ok(Box::new(FileConnector::open(path)?))
        }
    }
}
