// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Diagnostics for the status board crates
//!
//! Logs go to stderr through emit. The level comes from STATUSBOARD_LOG:
//! - STATUSBOARD_LOG=off (default) - no logs
//! - STATUSBOARD_LOG=error | warn - problems only, e.g. unavailable feeds
//! - STATUSBOARD_LOG=info - render cycles and configuration loading
//! - STATUSBOARD_LOG=debug - individual requests and record counts

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;
pub use emit::Level;

/// Environment variable selecting the log level
pub const LOG_ENV: &str = "STATUSBOARD_LOG";

static INIT: Once = Once::new();

/// Parse a level name. `Ok(None)` means logging is off.
pub fn parse_level(value: &str) -> Result<Option<Level>, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => Ok(None),
        "debug" => Ok(Some(Level::Debug)),
        "info" => Ok(Some(Level::Info)),
        "warn" => Ok(Some(Level::Warn)),
        "error" => Ok(Some(Level::Error)),
        _ => Err(value.to_string()),
    }
}

/// Initialize diagnostics from STATUSBOARD_LOG.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_diagnostics() {
    let value = std::env::var(LOG_ENV).unwrap_or_default();
    match parse_level(&value) {
        Ok(level) => init_with_level(level),
        Err(unknown) => {
            init_with_level(Some(Level::Info));
            emit::warn!("Unknown {LOG_ENV} value '{unknown}', using info");
        }
    }
}

/// Initialize diagnostics at an explicit minimum level, ignoring the
/// environment. `None` leaves logging off.
pub fn init_with_level(level: Option<Level>) {
    INIT.call_once(|| {
        let Some(level) = level else {
            return;
        };
        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The terminal emitter lives for the whole process
        std::mem::forget(rt);
    });
}

/// Per-cycle and per-request detail
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Normal operation: configuration loaded, render cycle finished
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Recoverable problems, e.g. a feed shown as an empty table
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Failures the user has to act on
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}
