// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Filter engine
//!
//! Three independent row filters applied across every table of a render
//! cycle:
//! - application name equality (skipped for the "All" sentinel)
//! - inclusive calendar date range (skipped unless exactly two dates)
//! - case-sensitive substring match on the business-impact column
//!
//! A table lacking the targeted column, or already empty, passes through
//! unchanged. Each filter only removes rows, so their composition is the
//! intersection of their predicates and the order does not matter.

use crate::config::BoardConfig;
use crate::error::Result;
use crate::table::CanonicalTable;
use arrow::array::BooleanArray;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use diagnostics::*;
use std::collections::BTreeMap;

/// Application filter value meaning "no filter"
pub const ALL_APPS: &str = "All";

/// Tables of one render cycle, keyed by feed id
pub type TableSet = BTreeMap<String, CanonicalTable>;

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range from a date picker selection. Anything other than two
    /// ordered dates is not a range.
    #[must_use]
    pub fn from_selection(dates: &[NaiveDate]) -> Option<Self> {
        match dates {
            [start, end] if start <= end => Some(Self {
                start: *start,
                end: *end,
            }),
            [start, end] => {
                let (start, end) = (start.to_string(), end.to_string());
                warn!("Ignoring reversed date range {start}..{end}", start: start, end: end);
                None
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// User-selected filter values, read fresh every render cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Application name, or [`ALL_APPS`]
    pub app_name: String,
    /// Date picker selection: zero, one or two dates
    pub dates: Vec<NaiveDate>,
    /// Keep only business-impacting changes
    pub business_impact: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            app_name: ALL_APPS.to_string(),
            dates: Vec::new(),
            business_impact: false,
        }
    }
}

impl FilterCriteria {
    /// The application to keep, unless the sentinel is selected
    #[must_use]
    pub fn app_filter(&self) -> Option<&str> {
        if self.app_name == ALL_APPS {
            None
        } else {
            Some(&self.app_name)
        }
    }

    #[must_use]
    pub fn date_range(&self) -> Option<DateRange> {
        DateRange::from_selection(&self.dates)
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Epoch values above this are milliseconds
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Calendar date of a cell value. Time of day is dropped; zoned values keep
/// the date of their own offset.
#[must_use]
pub fn parse_cell_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.bytes().all(|b| b.is_ascii_digit()) {
        let epoch: i64 = text.parse().ok()?;
        let datetime = if epoch > EPOCH_MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return datetime.map(|dt| dt.date_naive());
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }
    for format in OFFSET_FORMATS {
        if let Ok(datetime) = DateTime::parse_from_str(text, format) {
            return Some(datetime.date_naive());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    None
}

/// Keep rows whose `column` passes `keep`. Null cells never pass.
fn retain_rows<F>(table: &CanonicalTable, column: &str, keep: F) -> Result<CanonicalTable>
where
    F: Fn(&str) -> bool,
{
    let Some(texts) = table.cell_texts(column)? else {
        return Ok(table.clone());
    };
    if texts.is_empty() {
        return Ok(table.clone());
    }

    let predicate: BooleanArray = texts
        .iter()
        .map(|cell| Some(cell.as_deref().is_some_and(&keep)))
        .collect();
    let filtered = table.filter(&predicate)?;

    let name = table.name().to_string();
    let (before, after) = (table.num_rows(), filtered.num_rows());
    debug!(
        "Filter on {column} kept {after} of {before} rows in {name}",
        column: column,
        after: after,
        before: before,
        name: name
    );
    Ok(filtered)
}

/// Keep rows whose `column` equals `app`
pub fn filter_app_name(table: &CanonicalTable, column: &str, app: &str) -> Result<CanonicalTable> {
    retain_rows(table, column, |value| value == app)
}

/// Keep rows whose `column` parses to a date inside `range`
pub fn filter_date_range(
    table: &CanonicalTable,
    column: &str,
    range: &DateRange,
) -> Result<CanonicalTable> {
    retain_rows(table, column, |value| {
        parse_cell_date(value).is_some_and(|date| range.contains(date))
    })
}

/// Keep rows whose `column` contains `needle`, case-sensitive
pub fn filter_contains(
    table: &CanonicalTable,
    column: &str,
    needle: &str,
) -> Result<CanonicalTable> {
    retain_rows(table, column, |value| value.contains(needle))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImpactTarget {
    table: String,
    column: String,
    needle: String,
}

/// Per-table filter wiring, fixed at setup time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEngine {
    app_column: String,
    date_columns: BTreeMap<String, String>,
    impact: Option<ImpactTarget>,
}

impl FilterEngine {
    #[must_use]
    pub fn new(app_column: impl Into<String>) -> Self {
        Self {
            app_column: app_column.into(),
            date_columns: BTreeMap::new(),
            impact: None,
        }
    }

    /// Filter `table` by date on `column`
    #[must_use]
    pub fn with_date_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        _ = self.date_columns.insert(table.into(), column.into());
        self
    }

    /// Apply the business-impact toggle to `table`
    #[must_use]
    pub fn with_impact(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        needle: impl Into<String>,
    ) -> Self {
        self.impact = Some(ImpactTarget {
            table: table.into(),
            column: column.into(),
            needle: needle.into(),
        });
        self
    }

    #[must_use]
    pub fn from_config(config: &BoardConfig) -> Self {
        let mut engine = Self::new(crate::APP_NAME_COLUMN).with_impact(
            &config.impact.table,
            &config.impact.column,
            &config.impact.needle,
        );
        for feed in &config.feeds {
            if let Some(column) = &feed.date_column {
                engine = engine.with_date_column(&feed.id, column);
            }
        }
        engine
    }

    /// Apply every active filter to one table
    pub fn apply_to(
        &self,
        table: &CanonicalTable,
        criteria: &FilterCriteria,
    ) -> Result<CanonicalTable> {
        let mut table = table.clone();

        if let Some(app) = criteria.app_filter() {
            table = filter_app_name(&table, &self.app_column, app)?;
        }

        if let (Some(range), Some(column)) =
            (criteria.date_range(), self.date_columns.get(table.name()))
        {
            table = filter_date_range(&table, column, &range)?;
        }

        if criteria.business_impact
            && let Some(impact) = &self.impact
            && impact.table == table.name()
        {
            table = filter_contains(&table, &impact.column, &impact.needle)?;
        }

        Ok(table)
    }

    /// Apply every active filter to every table
    pub fn apply(&self, tables: TableSet, criteria: &FilterCriteria) -> Result<TableSet> {
        tables
            .into_iter()
            .map(|(id, table)| Ok((id, self.apply_to(&table, criteria)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableSchema;
    use arrow::array::{ArrayRef, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table(name: &str, columns: &[(&str, Vec<Option<&str>>)]) -> CanonicalTable {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(n, _)| Field::new(*n, DataType::Utf8, true))
            .collect();
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|(_, v)| Arc::new(StringArray::from(v.clone())) as ArrayRef)
            .collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap();
        CanonicalTable::new(name, batch)
    }

    fn alerts() -> CanonicalTable {
        table(
            "alerts",
            &[
                (
                    "App Name",
                    vec![Some("PaymentsGW"), Some("Ledger"), Some("PaymentsGW"), None],
                ),
                (
                    "Ems Creation Date",
                    vec![
                        Some("2024-05-01T23:59:00Z"),
                        Some("2024-05-02 08:00:00"),
                        Some("2024-05-04"),
                        Some("1714608000000"),
                    ],
                ),
            ],
        )
    }

    fn engine() -> FilterEngine {
        FilterEngine::new("App Name")
            .with_date_column("alerts", "Ems Creation Date")
            .with_impact("changes", "Impact", "GCOO/DDS")
    }

    fn apps(table: &CanonicalTable) -> Vec<Option<String>> {
        table.cell_texts("App Name").unwrap().unwrap()
    }

    #[test]
    fn test_parse_cell_date_formats() {
        assert_eq!(parse_cell_date("2024-05-01T10:00:00Z"), Some(date("2024-05-01")));
        assert_eq!(parse_cell_date("2024-05-01T10:00:00.123+02:00"), Some(date("2024-05-01")));
        assert_eq!(parse_cell_date("2024-05-01T23:30:00.000+0000"), Some(date("2024-05-01")));
        assert_eq!(parse_cell_date("2024-05-01 10:00:00"), Some(date("2024-05-01")));
        assert_eq!(parse_cell_date("2024-05-01T10:00:00"), Some(date("2024-05-01")));
        assert_eq!(parse_cell_date("2024-05-01"), Some(date("2024-05-01")));
        assert_eq!(parse_cell_date("05/01/2024 10:00:00"), Some(date("2024-05-01")));
        assert_eq!(parse_cell_date(" 05/01/2024 "), Some(date("2024-05-01")));
        // 2024-05-02T00:00:00Z
        assert_eq!(parse_cell_date("1714608000000"), Some(date("2024-05-02")));
        assert_eq!(parse_cell_date("1714608000"), Some(date("2024-05-02")));
        assert_eq!(parse_cell_date("yesterday"), None);
        assert_eq!(parse_cell_date(""), None);
    }

    #[test]
    fn test_date_range_selection() {
        assert!(DateRange::from_selection(&[]).is_none());
        assert!(DateRange::from_selection(&[date("2024-05-01")]).is_none());
        assert!(DateRange::from_selection(&[date("2024-05-02"), date("2024-05-01")]).is_none());

        let range = DateRange::from_selection(&[date("2024-05-01"), date("2024-05-02")]).unwrap();
        assert!(range.contains(date("2024-05-01")));
        assert!(range.contains(date("2024-05-02")));
        assert!(!range.contains(date("2024-05-03")));
    }

    #[test]
    fn test_all_sentinel_is_noop() {
        let criteria = FilterCriteria::default();
        let out = engine().apply_to(&alerts(), &criteria).unwrap();
        assert_eq!(out, alerts());
    }

    #[test]
    fn test_only_all_disables_app_filter() {
        let criteria = FilterCriteria {
            app_name: String::new(),
            ..Default::default()
        };
        assert_eq!(criteria.app_filter(), Some(""));
        let out = engine().apply_to(&alerts(), &criteria).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_app_name_filter() {
        let criteria = FilterCriteria {
            app_name: "PaymentsGW".to_string(),
            ..Default::default()
        };
        let out = engine().apply_to(&alerts(), &criteria).unwrap();
        assert_eq!(
            apps(&out),
            vec![Some("PaymentsGW".to_string()), Some("PaymentsGW".to_string())]
        );
    }

    #[test]
    fn test_app_name_filter_passes_tables_without_column() {
        let changes = table("changes", &[("Impact", vec![Some("x")])]);
        let out = filter_app_name(&changes, "App Name", "PaymentsGW").unwrap();
        assert_eq!(out, changes);
    }

    #[test]
    fn test_date_filter_needs_two_dates() {
        for dates in [vec![], vec![date("2024-05-01")]] {
            let criteria = FilterCriteria {
                dates,
                ..Default::default()
            };
            let out = engine().apply_to(&alerts(), &criteria).unwrap();
            assert_eq!(out.num_rows(), 4);
        }
    }

    #[test]
    fn test_date_filter_is_inclusive_on_calendar_dates() {
        let criteria = FilterCriteria {
            dates: vec![date("2024-05-01"), date("2024-05-02")],
            ..Default::default()
        };
        let out = engine().apply_to(&alerts(), &criteria).unwrap();

        let range = criteria.date_range().unwrap();
        let kept = out.cell_texts("Ems Creation Date").unwrap().unwrap();
        assert_eq!(kept.len(), 3);
        for value in kept {
            let parsed = parse_cell_date(&value.unwrap()).unwrap();
            assert!(range.contains(parsed));
        }
    }

    #[test]
    fn test_date_filter_drops_unparseable_and_null() {
        let t = table(
            "alerts",
            &[("Ems Creation Date", vec![Some("garbage"), None, Some("2024-05-01")])],
        );
        let range = DateRange::from_selection(&[date("2024-05-01"), date("2024-05-01")]).unwrap();
        let out = filter_date_range(&t, "Ems Creation Date", &range).unwrap();
        assert_eq!(out.num_rows(), 1);
    }

    #[test]
    fn test_date_filter_skips_unconfigured_tables() {
        let other = table("incidents", &[("Ems Creation Date", vec![Some("1999-01-01")])]);
        let criteria = FilterCriteria {
            dates: vec![date("2024-05-01"), date("2024-05-02")],
            ..Default::default()
        };
        let out = engine().apply_to(&other, &criteria).unwrap();
        assert_eq!(out, other);
    }

    #[test]
    fn test_filters_commute() {
        let t = alerts();
        let range = DateRange::from_selection(&[date("2024-05-01"), date("2024-05-03")]).unwrap();

        let app_first = filter_date_range(
            &filter_app_name(&t, "App Name", "PaymentsGW").unwrap(),
            "Ems Creation Date",
            &range,
        )
        .unwrap();
        let date_first = filter_app_name(
            &filter_date_range(&t, "Ems Creation Date", &range).unwrap(),
            "App Name",
            "PaymentsGW",
        )
        .unwrap();

        assert_eq!(app_first, date_first);
        assert_eq!(app_first.num_rows(), 1);
    }

    #[test]
    fn test_filters_are_idempotent() {
        let criteria = FilterCriteria {
            app_name: "PaymentsGW".to_string(),
            dates: vec![date("2024-05-01"), date("2024-05-04")],
            business_impact: true,
        };
        let once = engine().apply_to(&alerts(), &criteria).unwrap();
        let twice = engine().apply_to(&once, &criteria).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_business_impact_only_touches_impact_table() {
        let changes = table(
            "changes",
            &[("Impact", vec![Some("GCOO/DDS"), Some("gcoo/dds"), None, Some("X GCOO/DDS Y")])],
        );
        let criteria = FilterCriteria {
            business_impact: true,
            ..Default::default()
        };

        let out = engine().apply_to(&changes, &criteria).unwrap();
        assert_eq!(
            out.cell_texts("Impact").unwrap().unwrap(),
            vec![Some("GCOO/DDS".to_string()), Some("X GCOO/DDS Y".to_string())]
        );

        let untouched = engine().apply_to(&alerts(), &criteria).unwrap();
        assert_eq!(untouched, alerts());
    }

    #[test]
    fn test_empty_tables_pass_through() {
        let empty = CanonicalTable::empty("alerts", &TableSchema::new(["App Name", "Ems Creation Date"]));
        let criteria = FilterCriteria {
            app_name: "PaymentsGW".to_string(),
            dates: vec![date("2024-05-01"), date("2024-05-02")],
            business_impact: true,
        };
        let out = engine().apply_to(&empty, &criteria).unwrap();
        assert_eq!(out, empty);
    }

    #[test]
    fn test_apply_keeps_every_table() {
        let mut tables = TableSet::new();
        _ = tables.insert("alerts".to_string(), alerts());
        _ = tables.insert("changes".to_string(), table("changes", &[("Impact", vec![None])]));

        let criteria = FilterCriteria {
            app_name: "Ledger".to_string(),
            ..Default::default()
        };
        let out = engine().apply(tables, &criteria).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out["alerts"].num_rows(), 1);
        assert_eq!(out["changes"].num_rows(), 1);
    }
}
