// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Schema normalizer
//!
//! Raw feed records are loosely-typed JSON objects whose keys vary per
//! source and sometimes per row. Normalization renames keys, then projects
//! onto the feed's target schema. Nothing loosely typed survives past this
//! module.

use crate::error::Result;
use crate::table::{CanonicalTable, TableSchema};
use arrow::array::{ArrayRef, ListBuilder, StringArray, StringBuilder};
use arrow::record_batch::RecordBatch;
use diagnostics::*;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One record as delivered by a feed
pub type RawRecord = serde_json::Map<String, Value>;

/// Build the canonical table for one feed.
///
/// Absent or empty input gives an empty table with exactly `schema`.
/// Keys missing from a row become null cells; target columns missing from
/// every row become all-null columns. Keys outside the schema are dropped.
pub fn normalize(
    name: &str,
    records: Option<&[RawRecord]>,
    rename: &BTreeMap<String, String>,
    schema: &TableSchema,
) -> Result<CanonicalTable> {
    let records = match records {
        Some(records) if !records.is_empty() => records,
        _ => {
            debug!("No records for {name}, using empty table", name: name);
            return Ok(CanonicalTable::empty(name, schema));
        }
    };

    let rows: Vec<HashMap<&str, &Value>> = records
        .iter()
        .map(|record| rename_record(record, rename))
        .collect();

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.columns().len());
    for column in schema.columns() {
        let cells = rows.iter().map(|row| row.get(column.as_str()).copied());
        if !rows.iter().any(|row| row.contains_key(column.as_str())) {
            debug!(
                "Column {column} absent from every {name} record",
                column: column,
                name: name
            );
        }
        let array = if schema.is_list(column) {
            list_array(cells)
        } else {
            text_array(cells)
        };
        arrays.push(array);
    }

    let batch = RecordBatch::try_new(schema.to_arrow(), arrays)?;
    let rows = batch.num_rows();
    debug!("Normalized {rows} records for {name}", rows: rows, name: name);
    Ok(CanonicalTable::new(name, batch))
}

/// Apply the rename map to one record. An explicitly renamed key wins over
/// a raw key that already carries the canonical name.
fn rename_record<'a>(
    record: &'a RawRecord,
    rename: &'a BTreeMap<String, String>,
) -> HashMap<&'a str, &'a Value> {
    let mut row = HashMap::with_capacity(record.len());
    for (key, value) in record {
        match rename.get(key) {
            Some(canonical) => {
                _ = row.insert(canonical.as_str(), value);
            }
            None => {
                _ = row.entry(key.as_str()).or_insert(value);
            }
        }
    }
    row
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_array<'a>(cells: impl Iterator<Item = Option<&'a Value>>) -> ArrayRef {
    let array: StringArray = cells.map(|cell| cell.and_then(cell_text)).collect();
    Arc::new(array)
}

fn list_array<'a>(cells: impl Iterator<Item = Option<&'a Value>>) -> ArrayRef {
    let mut builder = ListBuilder::new(StringBuilder::new());
    for cell in cells {
        match cell {
            None | Some(Value::Null) => builder.append_null(),
            Some(Value::Array(items)) => {
                for item in items {
                    builder.values().append_option(cell_text(item));
                }
                builder.append(true);
            }
            Some(scalar) => {
                builder.values().append_option(cell_text(scalar));
                builder.append(true);
            }
        }
    }
    Arc::new(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::text_list_type;
    use serde_json::json;

    fn records(value: Value) -> Vec<RawRecord> {
        serde_json::from_value(value).unwrap()
    }

    fn rename(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn texts(table: &CanonicalTable, column: &str) -> Vec<Option<String>> {
        table.cell_texts(column).unwrap().unwrap()
    }

    #[test]
    fn test_absent_records_give_empty_table() {
        let schema = TableSchema::new(["App Name", "Id"]);
        let table = normalize("incidents", None, &BTreeMap::new(), &schema).unwrap();

        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["App Name", "Id"]);
    }

    #[test]
    fn test_empty_records_give_empty_table() {
        let schema = TableSchema::new(["A"]);
        let table = normalize("t", Some(&[]), &BTreeMap::new(), &schema).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["A"]);
    }

    #[test]
    fn test_rename_and_project() {
        let raw = records(json!([
            {"app_name": "PaymentsGW", "EmsCreationDate": "2024-05-01", "Id": 17, "Extra": "x"},
        ]));
        let map = rename(&[("app_name", "App Name"), ("EmsCreationDate", "Creation Date")]);
        let schema = TableSchema::new(["Id", "App Name", "Creation Date"]);

        let table = normalize("incidents", Some(&raw), &map, &schema).unwrap();

        assert_eq!(table.column_names(), vec!["Id", "App Name", "Creation Date"]);
        assert_eq!(texts(&table, "Id"), vec![Some("17".to_string())]);
        assert_eq!(texts(&table, "App Name"), vec![Some("PaymentsGW".to_string())]);
        assert!(!table.has_column("Extra"));
    }

    #[test]
    fn test_inconsistent_rows_coalesce() {
        let raw = records(json!([
            {"a": "1", "b": "2"},
            {"b": "3"},
            {"a": "4", "c": true},
        ]));
        let schema = TableSchema::new(["a", "b", "c"]);

        let table = normalize("t", Some(&raw), &BTreeMap::new(), &schema).unwrap();

        assert_eq!(table.num_rows(), 3);
        assert_eq!(
            texts(&table, "a"),
            vec![Some("1".to_string()), None, Some("4".to_string())]
        );
        assert_eq!(texts(&table, "c"), vec![None, None, Some("true".to_string())]);
    }

    #[test]
    fn test_missing_column_is_blank_not_error() {
        let raw = records(json!([{"a": "1"}, {"a": "2"}]));
        let schema = TableSchema::new(["a", "Date Occurred"]);

        let table = normalize("t", Some(&raw), &BTreeMap::new(), &schema).unwrap();

        assert_eq!(table.column_names(), vec!["a", "Date Occurred"]);
        assert_eq!(texts(&table, "Date Occurred"), vec![None, None]);
    }

    #[test]
    fn test_renamed_key_wins_over_passthrough() {
        let raw = records(json!([{"App Name": "stale", "app_name": "fresh"}]));
        let map = rename(&[("app_name", "App Name")]);
        let schema = TableSchema::new(["App Name"]);

        let table = normalize("t", Some(&raw), &map, &schema).unwrap();
        assert_eq!(texts(&table, "App Name"), vec![Some("fresh".to_string())]);
    }

    #[test]
    fn test_list_column() {
        let raw = records(json!([
            {"ImpactedCoreBusiness": ["GCOO/DDS", "Other"]},
            {"ImpactedCoreBusiness": "Retail"},
            {"ImpactedCoreBusiness": null},
            {"ImpactedCoreBusiness": []},
            {},
        ]));
        let map = rename(&[("ImpactedCoreBusiness", "Impacted Core Business 0")]);
        let schema = TableSchema::new(["Impacted Core Business 0"])
            .with_list_columns(["Impacted Core Business 0"]);

        let table = normalize("changes", Some(&raw), &map, &schema).unwrap();
        let column = table.column("Impacted Core Business 0").unwrap();

        assert_eq!(column.data_type(), &text_list_type());
        assert_eq!(
            texts(&table, "Impacted Core Business 0"),
            vec![
                Some("[GCOO/DDS, Other]".to_string()),
                Some("[Retail]".to_string()),
                None,
                Some("[]".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_nested_values_render_as_json() {
        let raw = records(json!([{"a": {"k": 1}, "b": [1, 2]}]));
        let schema = TableSchema::new(["a", "b"]);

        let table = normalize("t", Some(&raw), &BTreeMap::new(), &schema).unwrap();
        assert_eq!(texts(&table, "a"), vec![Some(r#"{"k":1}"#.to_string())]);
        assert_eq!(texts(&table, "b"), vec![Some("[1,2]".to_string())]);
    }
}
