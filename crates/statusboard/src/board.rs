// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Render-cycle orchestration
//!
//! One call to [`Board::render`] is one render cycle:
//! 1. apply the pending user action to the session's focus state
//! 2. fetch every feed concurrently, each bounded by the configured timeout
//! 3. normalize and transform; failed feeds become empty tables
//! 4. filter with the criteria supplied by the presentation layer
//! 5. count rows per application for the chart
//! 6. project to the display schemas
//!
//! The whole pipeline runs regardless of focus, so leaving full screen shows
//! a consistent board without another fetch.

use crate::APP_NAME_COLUMN;
use crate::config::{BoardConfig, FeedConfig};
use crate::error::{FeedError, FocusError, Result};
use crate::feed::{FeedSource, HttpFeedSource};
use crate::filter::{ALL_APPS, FilterCriteria, FilterEngine, TableSet};
use crate::focus::{FocusController, FocusState, UserAction};
use crate::normalize::{RawRecord, normalize};
use crate::table::{CanonicalTable, TableSchema};
use crate::transform::apply_transforms;
use diagnostics::*;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Name of the chart aggregate table
pub const CHART_TABLE: &str = "app-counts";

/// Per-user state that survives across render cycles
#[derive(Debug, Clone)]
pub struct Session {
    focus: FocusController,
}

impl Session {
    /// A fresh session starts unfocused
    #[must_use]
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            focus: FocusController::new(config.table_ids()),
        }
    }

    #[must_use]
    pub fn focus_state(&self) -> &FocusState {
        self.focus.state()
    }

    #[must_use]
    pub fn available_actions(&self) -> Vec<UserAction> {
        self.focus.available_actions()
    }

    pub fn apply(&mut self, action: &UserAction) -> std::result::Result<(), FocusError> {
        self.focus.apply(action)
    }

    /// The session as it would be after `action`, leaving `self` untouched
    pub fn transition(&self, action: Option<&UserAction>) -> std::result::Result<Self, FocusError> {
        let mut next = self.clone();
        if let Some(action) = action {
            next.apply(action)?;
        }
        Ok(next)
    }
}

/// A feed that fell back to an empty table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedWarning {
    pub feed: String,
    pub url: String,
    pub message: String,
}

impl fmt::Display for FeedWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error fetching data from {}: {}", self.url, self.message)
    }
}

/// One table ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub id: String,
    pub title: String,
    pub table: CanonicalTable,
}

/// Per-application counts for the chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub title: String,
    pub counts: CanonicalTable,
}

/// Everything the presentation layer needs for one render
#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    /// Every table, in display order, whatever the focus
    pub tables: Vec<TableView>,
    pub chart: ChartView,
    pub focus: FocusState,
    pub warnings: Vec<FeedWarning>,
    /// Application selector choices, "All" first
    pub app_choices: Vec<String>,
    pub impact_label: String,
    /// Criteria this view was filtered with
    pub criteria: FilterCriteria,
}

impl BoardView {
    #[must_use]
    pub fn table(&self, id: &str) -> Option<&TableView> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Tables to draw: all of them, or only the focused one
    #[must_use]
    pub fn visible_tables(&self) -> Vec<&TableView> {
        match self.focus.focused_table() {
            None => self.tables.iter().collect(),
            Some(id) => self.tables.iter().filter(|t| t.id == id).collect(),
        }
    }

    /// Sidebar filter controls are only shown on the full board
    #[must_use]
    pub fn filters_visible(&self) -> bool {
        !self.focus.is_focused()
    }

    #[must_use]
    pub fn chart_visible(&self) -> bool {
        !self.focus.is_focused()
    }

    /// A focused table takes the whole layout width
    #[must_use]
    pub fn full_width(&self) -> bool {
        self.focus.is_focused()
    }
}

/// The aggregation pipeline over a fixed configuration
pub struct Board {
    config: BoardConfig,
    source: Arc<dyn FeedSource>,
    engine: FilterEngine,
}

impl Board {
    #[must_use]
    pub fn new(config: BoardConfig, source: Arc<dyn FeedSource>) -> Self {
        let engine = FilterEngine::from_config(&config);
        Self {
            config,
            source,
            engine,
        }
    }

    /// Fetch feeds over HTTP using the configured timeout
    pub fn with_http(config: BoardConfig) -> Result<Self> {
        let source = HttpFeedSource::new(config.timeout())?;
        Ok(Self::new(config, Arc::new(source)))
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    #[must_use]
    pub fn new_session(&self) -> Session {
        Session::new(&self.config)
    }

    async fn fetch(&self, feed: &FeedConfig) -> std::result::Result<Vec<RawRecord>, FeedError> {
        match tokio::time::timeout(self.config.timeout(), self.source.fetch(feed)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout {
                url: feed.url.clone(),
            }),
        }
    }

    /// Fetch, normalize and transform every feed. Never fails because of a
    /// feed: unavailable feeds become empty tables plus a warning.
    pub async fn load_tables(&self) -> Result<(TableSet, Vec<FeedWarning>)> {
        let fetched = join_all(self.config.feeds.iter().map(|feed| self.fetch(feed))).await;

        let mut tables = TableSet::new();
        let mut warnings = Vec::new();
        for (feed, result) in self.config.feeds.iter().zip(fetched) {
            let id = feed.id.as_str();
            let records = match result {
                Ok(records) => Some(records),
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        "Feed {id} unavailable, showing empty table: {message}",
                        id: id,
                        message: message
                    );
                    warnings.push(FeedWarning {
                        feed: feed.id.clone(),
                        url: feed.url.clone(),
                        message,
                    });
                    None
                }
            };

            let table = prepare_table(feed, records.as_deref())?;
            _ = tables.insert(feed.id.clone(), table);
        }
        Ok((tables, warnings))
    }

    /// Run one render cycle.
    ///
    /// `action` is committed to `session` only when the whole cycle succeeds;
    /// a rejected action or a failed cycle leaves the focus state as it was.
    pub async fn render(
        &self,
        session: &mut Session,
        criteria: &FilterCriteria,
        action: Option<&UserAction>,
    ) -> Result<BoardView> {
        let next = session.transition(action)?;

        let (tables, warnings) = self.load_tables().await?;
        let app_choices = self.app_choices(&tables)?;
        let filtered = self.engine.apply(tables, criteria)?;

        let chart = self.chart(&filtered)?;

        let mut views = Vec::with_capacity(self.config.feeds.len());
        for feed in &self.config.feeds {
            let table = match filtered.get(&feed.id) {
                Some(table) => table.project(feed.display_columns())?,
                None => CanonicalTable::empty(&feed.id, &feed.schema())
                    .project(feed.display_columns())?,
            };
            views.push(TableView {
                id: feed.id.clone(),
                title: feed.title.clone(),
                table,
            });
        }

        let focus = next.focus_state().clone();
        let (table_count, warning_count) = (views.len(), warnings.len());
        let focus_text = focus.to_string();
        info!(
            "Render cycle complete: {table_count} tables, {warning_count} warnings, {focus_text}",
            table_count: table_count,
            warning_count: warning_count,
            focus_text: focus_text
        );

        *session = next;
        Ok(BoardView {
            tables: views,
            chart,
            focus,
            warnings,
            app_choices,
            impact_label: self.config.impact.label.clone(),
            criteria: criteria.clone(),
        })
    }

    fn chart(&self, tables: &TableSet) -> Result<ChartView> {
        let chart = &self.config.chart;
        let counts = match tables.get(&chart.source) {
            Some(table) => table.value_counts(&chart.column, CHART_TABLE)?,
            None => CanonicalTable::empty(&chart.source, &TableSchema::default())
                .value_counts(&chart.column, CHART_TABLE)?,
        };
        Ok(ChartView {
            title: chart.title.clone(),
            counts,
        })
    }

    /// "All" followed by the configured names, or by every application seen
    /// in the unfiltered tables when none are configured.
    fn app_choices(&self, tables: &TableSet) -> Result<Vec<String>> {
        let mut choices = vec![ALL_APPS.to_string()];
        if !self.config.app_names.is_empty() {
            choices.extend(self.config.app_names.iter().cloned());
            return Ok(choices);
        }

        let mut seen = BTreeSet::new();
        for table in tables.values() {
            if let Some(values) = table.cell_texts(APP_NAME_COLUMN)? {
                seen.extend(values.into_iter().flatten());
            }
        }
        choices.extend(seen.into_iter().filter(|name| name != ALL_APPS));
        Ok(choices)
    }
}

/// Normalize and transform one feed's records. A table that cannot be
/// assembled degrades to the empty table of the feed's schema.
fn prepare_table(feed: &FeedConfig, records: Option<&[RawRecord]>) -> Result<CanonicalTable> {
    let schema = feed.schema();
    let prepared = normalize(&feed.id, records, &feed.rename, &schema)
        .and_then(|table| apply_transforms(table, &feed.transforms));

    match prepared {
        Ok(table) => Ok(table),
        Err(e) => {
            let (id, message) = (feed.id.as_str(), e.to_string());
            warn!(
                "Could not assemble {id}, showing empty table: {message}",
                id: id,
                message: message
            );
            apply_transforms(CanonicalTable::empty(&feed.id, &schema), &feed.transforms)
        }
    }
}
