// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use arrow::error::ArrowError;

/// Errors raised by the status board library.
///
/// Feed failures are not listed here: they never abort a render cycle
/// and are reported as [`FeedError`] warnings instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid board configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error while assembling a table
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(reqwest::Error),

    /// Rejected focus transition
    #[error("Focus error: {0}")]
    Focus(#[from] FocusError),
}

/// Result type for status board operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a feed produced no records.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} error from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse JSON response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No data registered for feed '{0}'")]
    Missing(String),
}

/// Invalid focus-view transitions. The focus state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FocusError {
    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Cannot focus '{requested}' while '{current}' is in full screen")]
    AlreadyFocused { current: String, requested: String },

    #[error("No table is in full screen")]
    NotFocused,
}
