// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Column transforms applied between normalization and filtering

use crate::config::TransformRule;
use crate::error::Result;
use crate::table::CanonicalTable;
use arrow::array::{Array, ArrayRef, ListArray, StringBuilder};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use diagnostics::*;
use std::sync::Arc;

/// Render a value as a link to itself. Missing values become "".
#[must_use]
pub fn linkify_value(value: Option<&str>) -> String {
    match value {
        Some(v) => {
            let href = html_escape::encode_double_quoted_attribute(v);
            let text = html_escape::encode_text(v);
            format!(r#"<a href="{href}" target="_blank">{text}</a>"#)
        }
        None => String::new(),
    }
}

/// Link-ify every cell of a column. The result has no nulls.
pub fn linkify(array: &ArrayRef) -> Result<ArrayRef> {
    let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
    let mut builder = StringBuilder::with_capacity(array.len(), 0);
    for i in 0..array.len() {
        if array.is_null(i) {
            builder.append_value(linkify_value(None));
        } else {
            let text = formatter.value(i).to_string();
            builder.append_value(linkify_value(Some(&text)));
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Reduce a list column to its first elements.
///
/// Non-list columns come back unchanged, so applying this twice is the
/// same as applying it once. Null and empty lists become null.
pub fn first_of_list(array: &ArrayRef) -> Result<ArrayRef> {
    let Some(list) = array.as_any().downcast_ref::<ListArray>() else {
        return Ok(array.clone());
    };

    let values = list.values();
    let formatter = ArrayFormatter::try_new(values.as_ref(), &FormatOptions::default())?;
    let offsets = list.value_offsets();

    let mut builder = StringBuilder::with_capacity(list.len(), 0);
    for i in 0..list.len() {
        let start = offsets[i] as usize;
        let end = offsets[i + 1] as usize;
        if list.is_null(i) || start == end || values.is_null(start) {
            builder.append_null();
        } else {
            builder.append_value(formatter.value(start).to_string());
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Apply a feed's transform rules in order. Rules naming a column the
/// table lacks are skipped.
pub fn apply_transforms(table: CanonicalTable, rules: &[TransformRule]) -> Result<CanonicalTable> {
    let mut table = table;
    for rule in rules {
        let column = rule.column();
        let Some(array) = table.column(column).cloned() else {
            let name = table.name().to_string();
            debug!(
                "Skipping transform on missing column {column} in {name}",
                column: column,
                name: name
            );
            continue;
        };
        let transformed = match rule {
            TransformRule::Linkify { .. } => linkify(&array)?,
            TransformRule::FirstOfList { .. } => first_of_list(&array)?,
        };
        table = table.replace_column(column, transformed)?;
    }
    Ok(table)
}
