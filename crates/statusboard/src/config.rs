// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Declarative board configuration
//!
//! Every feed is described once: where to fetch it, how raw field names map
//! onto canonical column names, which columns the canonical table carries,
//! which of those are displayed, which column the date-range filter reads
//! and which field transforms run on it.
//!
//! ```yaml
//! feeds:
//!   - id: incidents
//!     title: Incidents - Ongoing Incidents
//!     url: https://gateway/api/incidents
//!     rename:
//!       EmsCreationDate: Creation Date
//!     columns: [App Name, Id, Creation Date]
//!     date_column: Creation Date
//! ```

use crate::error::{Error, Result};
use crate::table::TableSchema;
use diagnostics::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

const STANDARD_CONFIG: &str = include_str!("../config/board.yaml");

fn default_timeout_secs() -> u64 {
    30
}

fn default_app_column() -> String {
    crate::APP_NAME_COLUMN.to_string()
}

/// Top-level board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    /// Upper bound on each feed request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Choices offered by the application selector, after "All".
    /// When empty the choices are derived from the fetched data.
    #[serde(default)]
    pub app_names: Vec<String>,

    pub chart: ChartConfig,

    pub impact: ImpactConfig,

    /// Feeds in display order
    pub feeds: Vec<FeedConfig>,
}

/// Per-application count aggregate shown above the tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartConfig {
    /// Feed whose filtered rows are counted
    pub source: String,
    pub title: String,
    #[serde(default = "default_app_column")]
    pub column: String,
}

/// Business-impact substring toggle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImpactConfig {
    pub table: String,
    pub column: String,
    pub needle: String,
    pub label: String,
}

/// A column-scoped transform applied after normalization
///
/// ```yaml
/// - type: first-of-list
///   column: Impacted Core Business 0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum TransformRule {
    #[serde(rename = "linkify")]
    Linkify { column: String },

    #[serde(rename = "first-of-list")]
    FirstOfList { column: String },
}

impl TransformRule {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            TransformRule::Linkify { column } | TransformRule::FirstOfList { column } => column,
        }
    }
}

/// One source feed and the canonical table it produces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub id: String,
    pub title: String,
    pub url: String,

    /// Raw field name -> canonical column name. Unmapped fields keep their name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,

    /// Target schema, in order
    pub columns: Vec<String>,

    /// Target columns holding sequences rather than scalars
    #[serde(default)]
    pub list_columns: Vec<String>,

    /// Display schema, in order. Defaults to `columns`.
    #[serde(default)]
    pub display: Vec<String>,

    /// Column read by the date-range filter
    #[serde(default)]
    pub date_column: Option<String>,

    #[serde(default)]
    pub transforms: Vec<TransformRule>,
}

impl FeedConfig {
    /// Canonical schema produced by the normalizer for this feed
    #[must_use]
    pub fn schema(&self) -> TableSchema {
        TableSchema::new(self.columns.clone()).with_list_columns(self.list_columns.clone())
    }

    #[must_use]
    pub fn display_columns(&self) -> &[String] {
        if self.display.is_empty() {
            &self.columns
        } else {
            &self.display
        }
    }

    fn validate(&self) -> Result<()> {
        let id = &self.id;
        if id.is_empty() {
            return Err(Error::Config("feed id cannot be empty".to_string()));
        }
        if self.url.is_empty() {
            return Err(Error::Config(format!("feed '{id}' has no url")));
        }
        if self.columns.is_empty() {
            return Err(Error::Config(format!("feed '{id}' declares no columns")));
        }

        let declared: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        if declared.len() != self.columns.len() {
            return Err(Error::Config(format!("feed '{id}' declares a column twice")));
        }

        let check = |what: &str, column: &str| -> Result<()> {
            if declared.contains(column) {
                Ok(())
            } else {
                Err(Error::Config(format!(
                    "feed '{id}': {what} column '{column}' is not in the target schema"
                )))
            }
        };

        for column in &self.list_columns {
            check("list", column)?;
        }
        for column in &self.display {
            check("display", column)?;
        }
        if let Some(column) = &self.date_column {
            check("date", column)?;
        }
        for rule in &self.transforms {
            check("transform", rule.column())?;
        }
        Ok(())
    }
}

impl BoardConfig {
    /// The built-in four-feed layout
    pub fn standard() -> Result<Self> {
        Self::from_yaml_str(STANDARD_CONFIG)
    }

    /// Parse and validate a YAML configuration
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: BoardConfig = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn feed(&self, id: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|feed| feed.id == id)
    }

    /// Feed identifiers, in display order
    pub fn table_ids(&self) -> impl Iterator<Item = &str> {
        self.feeds.iter().map(|feed| feed.id.as_str())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Point a feed at a different URL
    pub fn set_feed_url(&mut self, id: &str, url: impl Into<String>) -> Result<()> {
        let feed = self
            .feeds
            .iter_mut()
            .find(|feed| feed.id == id)
            .ok_or_else(|| Error::Config(format!("unknown feed '{id}'")))?;
        feed.url = url.into();
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".to_string()));
        }
        if self.feeds.is_empty() {
            return Err(Error::Config("at least one feed must be configured".to_string()));
        }

        let mut seen = BTreeSet::new();
        for feed in &self.feeds {
            feed.validate()?;
            if !seen.insert(feed.id.as_str()) {
                return Err(Error::Config(format!("duplicate feed id '{}'", feed.id)));
            }
        }

        if self.feed(&self.chart.source).is_none() {
            return Err(Error::Config(format!(
                "chart source '{}' is not a configured feed",
                self.chart.source
            )));
        }

        let impact = &self.impact;
        let impact_feed = self.feed(&impact.table).ok_or_else(|| {
            Error::Config(format!("impact table '{}' is not a configured feed", impact.table))
        })?;
        if !impact_feed.columns.contains(&impact.column) {
            return Err(Error::Config(format!(
                "impact column '{}' is not in the '{}' schema",
                impact.column, impact.table
            )));
        }
        if impact.needle.is_empty() {
            return Err(Error::Config("impact needle cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BoardConfig> {
    let path = path.as_ref();
    let display = path.display().to_string();
    debug!("Loading board configuration from {display}", display: display);

    let content = std::fs::read_to_string(path)?;
    let config = BoardConfig::from_yaml_str(&content)?;

    let feed_count = config.feeds.len();
    info!(
        "Loaded board configuration with {feed_count} feeds from {display}",
        feed_count: feed_count,
        display: display
    );
    Ok(config)
}
