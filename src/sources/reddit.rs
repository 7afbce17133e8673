/*!
 * Reddit listing connector.
 *
 * Pages through a subreddit's newest posts with the public JSON API and
 * flattens comment trees into replies.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::app_config::Config;
use crate::errors::SourceError;
use crate::sources::{RawItem, RawReply, SourceConnector};

/// Reddit caps listings at 100 items per request
const MAX_PAGE_SIZE: usize = 100;

/// Client for Reddit's public JSON listings
pub struct RedditConnector {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. `https://www.reddit.com`
    endpoint: String,
    /// Configured sources (subreddit names)
    sources: Vec<String>,
    /// Stop paginating after this many items
    max_items: usize,
}

/// Listing envelope
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
    #[serde(default)]
    after: Option<String>,
}

/// A typed child (`t3` post, `t1` comment, `more` placeholder)
#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    body: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    parent_id: Option<String>,
    /// Either an empty string or a nested listing
    #[serde(default)]
    replies: Value,
}

impl RedditConnector {
    /// Create a new connector
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: &str,
        timeout_secs: u64,
        sources: Vec<String>,
        max_items: usize,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SourceError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            sources,
            max_items,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::new(
            config.connector.endpoint.clone(),
            &config.connector.user_agent,
            config.connector.timeout_secs,
            config.sources.clone(),
            config.collection.fetch_limit(),
        )
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, SourceError> {
        let base = format!("{}{}", self.endpoint.trim_end_matches('/'), path);
        Url::parse_with_params(&base, params)
            .map_err(|e| SourceError::RequestFailed(format!("Invalid URL {}: {}", base, e)))
    }

    async fn get_json(&self, source: &str, url: Url) -> Result<Value, SourceError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status.as_u16() == 404 || status.as_u16() == 403 {
            return Err(SourceError::NotFound(source.to_string()));
        }
        if !status.is_success() {
            error!("Source '{}' responded with {}", source, status);
            return Err(SourceError::Status {
                source_id: source.to_string(),
                status_code: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| SourceError::ParseError(e.to_string()))
    }

    fn parse_post(thing: Thing) -> Option<RawItem> {
        if thing.kind != "t3" {
            return None;
        }
        match serde_json::from_value::<PostData>(thing.data) {
            Ok(post) => Some(RawItem {
                id: post.id,
                title: post.title,
                body: post.selftext,
                author: post.author,
                created_at: post.created_utc as i64,
                score: post.score,
                reply_count: post.num_comments,
                permalink: post.permalink,
                lang_hint: None,
            }),
            Err(e) => {
                warn!("Skipping malformed post: {}", e);
                None
            }
        }
    }

    /// Flatten a comment tree in depth-first (display) order
    fn collect_comments(children: Vec<Thing>, item_id: &str, out: &mut Vec<RawReply>) {
        for thing in children {
            if thing.kind != "t1" {
                continue;
            }
            let comment = match serde_json::from_value::<CommentData>(thing.data) {
                Ok(comment) => comment,
                Err(e) => {
                    warn!("Skipping malformed comment: {}", e);
                    continue;
                }
            };

            let nested = match comment.replies {
                Value::Object(_) => serde_json::from_value::<Listing>(comment.replies)
                    .map(|listing| listing.data.children)
                    .unwrap_or_default(),
                _ => Vec::new(),
            };

            out.push(RawReply {
                id: comment.id,
                item_id: item_id.to_string(),
                parent_ref: comment.parent_id,
                author: comment.author,
                body: comment.body,
                created_at: comment.created_utc as i64,
                score: comment.score,
            });

            Self::collect_comments(nested, item_id, out);
        }
    }
}

#[async_trait]
impl SourceConnector for RedditConnector {
    fn name(&self) -> &str {
        "reddit"
    }

    fn list_sources(&self) -> Vec<String> {
        self.sources.clone()
    }

    async fn fetch_items(&self, source: &str, page_size: usize) -> Result<Vec<RawItem>, SourceError> {
        let limit = page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut params = vec![("limit", limit.as_str()), ("raw_json", "1")];
            if let Some(cursor) = after.as_deref() {
                params.push(("after", cursor));
            }

            let url = self.url(&format!("/r/{}/new.json", source), &params)?;
            let payload = self.get_json(source, url).await?;
            let listing: Listing = serde_json::from_value(payload)
                .map_err(|e| SourceError::ParseError(e.to_string()))?;

            let page_len = listing.data.children.len();
            items.extend(listing.data.children.into_iter().filter_map(Self::parse_post));
            pages += 1;
            debug!("Source '{}': {} items after {} pages", source, items.len(), pages);

            after = listing.data.after;
            if page_len == 0 || after.is_none() || items.len() >= self.max_items {
                break;
            }
        }

        items.truncate(self.max_items);
        Ok(items)
    }

    async fn fetch_replies(&self, source: &str, item_id: &str, limit: usize) -> Result<Vec<RawReply>, SourceError> {
        let limit_param = limit.max(1).to_string();
        let url = self.url(
            &format!("/r/{}/comments/{}.json", source, item_id),
            &[("limit", limit_param.as_str()), ("raw_json", "1")],
        )?;
        let payload = self.get_json(source, url).await?;

        // [post listing, comment listing]
        let comments = payload
            .get(1)
            .cloned()
            .ok_or_else(|| SourceError::ParseError("missing comment listing".to_string()))?;
        let listing: Listing = serde_json::from_value(comments)
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        let mut replies = Vec::new();
        Self::collect_comments(listing.data.children, item_id, &mut replies);
        replies.truncate(limit);
        Ok(replies)
    }
}
