// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Plain-text presentation of a board view

use anyhow::{Result, anyhow};
use arrow::util::display::FormatOptions;
use arrow::util::pretty::pretty_format_batches_with_options;
use statusboard::{BoardView, CanonicalTable, FilterCriteria};
use std::io::Write;

pub const NO_ROWS: &str = "No Rows to Show";

/// Format one table. An empty table keeps its header row, followed by the
/// placeholder.
pub fn format_table(table: &CanonicalTable) -> Result<String> {
    let options = FormatOptions::default().with_null("");
    let formatted = pretty_format_batches_with_options(std::slice::from_ref(table.batch()), &options)
        .map_err(|e| anyhow!("Failed to format table {}: {}", table.name(), e))?
        .to_string();

    if table.is_empty() {
        Ok(format!("{}\n{NO_ROWS}", formatted.trim_end()))
    } else {
        Ok(formatted)
    }
}

fn describe_filters(criteria: &FilterCriteria, impact_label: &str) -> String {
    let dates = match criteria.date_range() {
        Some(range) => format!("{} to {}", range.start, range.end),
        None => "any".to_string(),
    };
    let impact = if criteria.business_impact { "on" } else { "off" };
    format!(
        "Board Filters: app={} | dates={} | {}: {}",
        criteria.app_name, dates, impact_label, impact
    )
}

/// Write a complete render cycle
pub fn write_view<W: Write>(out: &mut W, view: &BoardView) -> Result<()> {
    if view.filters_visible() {
        writeln!(out, "{}", describe_filters(&view.criteria, &view.impact_label))?;
        writeln!(out, "Applications: {}", view.app_choices.join(", "))?;
    }

    for warning in &view.warnings {
        writeln!(out, "Warning: {warning}")?;
    }

    if view.chart_visible() {
        writeln!(out)?;
        writeln!(out, "== {} ==", view.chart.title)?;
        writeln!(out, "{}", format_table(&view.chart.counts)?)?;
    }

    for table in view.visible_tables() {
        let hint = if view.full_width() {
            "[exit: Exit Full Screen]".to_string()
        } else {
            format!("[focus {}: Full Screen]", table.id)
        };
        writeln!(out)?;
        writeln!(out, "== {} == {hint}", table.title)?;
        writeln!(out, "{}", format_table(&table.table)?)?;
    }
    Ok(())
}
