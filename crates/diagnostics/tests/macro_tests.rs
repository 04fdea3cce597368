// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use diagnostics::*;

/// Locals reach the template through named properties
#[test]
fn test_log_locals_from_another_crate() {
    init_with_level(Some(Level::Debug));

    let feed = String::from("incidents");
    let rows = 6_usize;
    let column = "Creation Date";

    debug!("Normalized {rows} records for {feed}", rows: rows, feed: feed);
    info!("Loaded {feed}", feed: feed);
    warn!("Column {column} absent from {feed}", column: column, feed: feed);
    error!("Rejected {feed} after {rows} rows", feed: feed, rows: rows);

    assert_eq!(parse_level("debug"), Ok(Some(Level::Debug)));
}
