// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Status board aggregation pipeline
//!
//! Fetches alert, incident and change feeds, normalizes them into canonical
//! Arrow tables, filters them consistently and hands ready-to-render tables
//! to a presentation layer together with the session's full-screen state.

pub mod board;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod focus;
pub mod normalize;
pub mod table;
pub mod transform;

/// Column holding the application name in every table that has one
pub const APP_NAME_COLUMN: &str = "App Name";

pub use board::{Board, BoardView, ChartView, FeedWarning, Session, TableView};
pub use config::{BoardConfig, FeedConfig, TransformRule, load_config};
pub use error::{Error, FeedError, FocusError, Result};
pub use feed::{FeedSource, HttpFeedSource, MemoryFeedSource};
pub use filter::{ALL_APPS, DateRange, FilterCriteria, FilterEngine, TableSet};
pub use focus::{FocusController, FocusState, UserAction};
pub use normalize::{RawRecord, normalize};
pub use table::{CanonicalTable, TableSchema};
pub use transform::{first_of_list, linkify};
