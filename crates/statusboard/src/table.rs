// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Canonical tables
//!
//! A canonical table is a named Arrow `RecordBatch` whose columns always
//! match a declared [`TableSchema`]. Scalar columns are nullable `Utf8`,
//! list-valued columns are nullable `List<Utf8>`.

use crate::error::Result;
use arrow::array::{Array, ArrayRef, BooleanArray, Int64Array, StringArray, new_null_array};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Name of the count column in aggregate tables
pub const COUNT_COLUMN: &str = "Count";

/// Arrow type of a list-valued column before `first_of_list` reduces it
#[must_use]
pub fn text_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

/// Ordered column names plus the subset holding lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<String>,
    list_columns: BTreeSet<String>,
}

impl TableSchema {
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            list_columns: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_list_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn is_list(&self, column: &str) -> bool {
        self.list_columns.contains(column)
    }

    #[must_use]
    pub fn to_arrow(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|name| {
                let data_type = if self.is_list(name) {
                    text_list_type()
                } else {
                    DataType::Utf8
                };
                Field::new(name, data_type, true)
            })
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// A named table of rows with a fixed column set
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    name: String,
    batch: RecordBatch,
}

impl CanonicalTable {
    /// Wrap an existing batch
    #[must_use]
    pub fn new(name: impl Into<String>, batch: RecordBatch) -> Self {
        Self {
            name: name.into(),
            batch,
        }
    }

    /// Zero rows, exactly the declared columns
    #[must_use]
    pub fn empty(name: impl Into<String>, schema: &TableSchema) -> Self {
        Self::new(name, RecordBatch::new_empty(schema.to_arrow()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.batch.column_by_name(column).is_some()
    }

    #[must_use]
    pub fn column(&self, column: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(column)
    }

    /// Display text of every cell in a column; `None` for null cells
    pub fn cell_texts(&self, column: &str) -> Result<Option<Vec<Option<String>>>> {
        let Some(array) = self.column(column) else {
            return Ok(None);
        };
        let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
        let texts = (0..array.len())
            .map(|i| {
                if array.is_null(i) {
                    None
                } else {
                    Some(formatter.value(i).to_string())
                }
            })
            .collect();
        Ok(Some(texts))
    }

    /// Swap one column for a new array, adopting the array's type
    pub fn replace_column(&self, column: &str, array: ArrayRef) -> Result<Self> {
        let schema = self.batch.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut columns = Vec::with_capacity(schema.fields().len());

        for (field, existing) in schema.fields().iter().zip(self.batch.columns()) {
            if field.name() == column {
                fields.push(Field::new(field.name(), array.data_type().clone(), true));
                columns.push(array.clone());
            } else {
                fields.push(field.as_ref().clone());
                columns.push(existing.clone());
            }
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self::new(self.name.clone(), batch))
    }

    /// Keep the rows where `predicate` is true. Null counts as false.
    pub fn filter(&self, predicate: &BooleanArray) -> Result<Self> {
        let batch = filter_record_batch(&self.batch, predicate)?;
        Ok(Self::new(self.name.clone(), batch))
    }

    /// Select columns in the given order. Columns the table lacks come back
    /// as all-null text columns.
    pub fn project(&self, columns: &[String]) -> Result<Self> {
        let schema = self.batch.schema();
        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());

        for name in columns {
            match schema.index_of(name) {
                Ok(index) => {
                    fields.push(schema.field(index).clone());
                    arrays.push(self.batch.column(index).clone());
                }
                Err(_) => {
                    fields.push(Field::new(name, DataType::Utf8, true));
                    arrays.push(new_null_array(&DataType::Utf8, self.num_rows()));
                }
            }
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self::new(self.name.clone(), batch))
    }

    /// Rows per distinct value of `column`, most frequent first.
    ///
    /// Null cells are not counted. A table without the column yields an
    /// empty aggregate.
    pub fn value_counts(&self, column: &str, name: impl Into<String>) -> Result<Self> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        if let Some(texts) = self.cell_texts(column)? {
            for value in texts.into_iter().flatten() {
                *counts.entry(value).or_insert(0) += 1;
            }
        }

        let mut ordered: Vec<(String, i64)> = counts.into_iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let schema = Arc::new(Schema::new(vec![
            Field::new(column, DataType::Utf8, true),
            Field::new(COUNT_COLUMN, DataType::Int64, false),
        ]));
        let values: StringArray = ordered.iter().map(|(v, _)| Some(v.as_str())).collect();
        let totals: Int64Array = ordered.iter().map(|(_, n)| *n).collect();

        let batch = RecordBatch::try_new(schema, vec![Arc::new(values), Arc::new(totals)])?;
        Ok(Self::new(name, batch))
    }
}
