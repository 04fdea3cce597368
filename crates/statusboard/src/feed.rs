// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Feed sources
//!
//! A feed source turns a [`FeedConfig`] into raw records. Every failure is a
//! [`FeedError`]; callers degrade it to an empty table.

use crate::config::FeedConfig;
use crate::error::{Error, FeedError, Result};
use crate::normalize::RawRecord;
use async_trait::async_trait;
use diagnostics::*;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch every record of one feed
    async fn fetch(&self, feed: &FeedConfig) -> std::result::Result<Vec<RawRecord>, FeedError>;
}

/// Parse a feed body. `null` means no data; anything other than an array
/// of objects is malformed.
pub fn parse_records(url: &str, body: &str) -> std::result::Result<Vec<RawRecord>, FeedError> {
    let records: Option<Vec<RawRecord>> =
        serde_json::from_str(body).map_err(|source| FeedError::Malformed {
            url: url.to_string(),
            source,
        })?;
    Ok(records.unwrap_or_default())
}

/// Plain GET against each feed's URL
pub struct HttpFeedSource {
    http_client: reqwest::Client,
}

impl HttpFeedSource {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { http_client })
    }

    fn classify(url: &str, error: reqwest::Error) -> FeedError {
        if error.is_timeout() {
            FeedError::Timeout {
                url: url.to_string(),
            }
        } else {
            FeedError::Transport(error)
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, feed: &FeedConfig) -> std::result::Result<Vec<RawRecord>, FeedError> {
        let url = feed.url.as_str();
        debug!("Fetching {url}", url: url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let records = parse_records(url, &body)?;
        let count = records.len();
        debug!("Received {count} records from {url}", count: count, url: url);
        Ok(records)
    }
}

#[derive(Debug, Clone)]
enum MemoryFeed {
    Records(Vec<RawRecord>),
    Status(u16),
}

/// In-memory feeds keyed by feed id. Feeds can be replaced between render
/// cycles to simulate reloads.
#[derive(Debug, Default)]
pub struct MemoryFeedSource {
    feeds: RwLock<HashMap<String, MemoryFeed>>,
}

impl MemoryFeedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for `feed`. `records` must be a JSON array of objects.
    pub fn with_json(self, feed: &str, records: Value) -> std::result::Result<Self, FeedError> {
        self.set_json(feed, records)?;
        Ok(self)
    }

    /// Answer `feed` with an HTTP error status
    #[must_use]
    pub fn with_status(self, feed: &str, status: u16) -> Self {
        self.set(feed, MemoryFeed::Status(status));
        self
    }

    pub fn set_json(&self, feed: &str, records: Value) -> std::result::Result<(), FeedError> {
        let records: Vec<RawRecord> =
            serde_json::from_value(records).map_err(|source| FeedError::Malformed {
                url: format!("memory:{feed}"),
                source,
            })?;
        self.set(feed, MemoryFeed::Records(records));
        Ok(())
    }

    pub fn set_status(&self, feed: &str, status: u16) {
        self.set(feed, MemoryFeed::Status(status));
    }

    fn set(&self, feed: &str, data: MemoryFeed) {
        let mut feeds = self.feeds.write().unwrap_or_else(PoisonError::into_inner);
        _ = feeds.insert(feed.to_string(), data);
    }
}

#[async_trait]
impl FeedSource for MemoryFeedSource {
    async fn fetch(&self, feed: &FeedConfig) -> std::result::Result<Vec<RawRecord>, FeedError> {
        let feeds = self.feeds.read().unwrap_or_else(PoisonError::into_inner);
        match feeds.get(&feed.id) {
            Some(MemoryFeed::Records(records)) => Ok(records.clone()),
            Some(MemoryFeed::Status(status)) => Err(FeedError::Status {
                status: *status,
                url: feed.url.clone(),
            }),
            None => Err(FeedError::Missing(feed.id.clone())),
        }
    }
}
