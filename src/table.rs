use polars::prelude::*;
use std::{collections::HashMap, fmt};

/// A single cell value of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Converts a Polars value. Types without a scalar counterpart (dates, lists,
    /// structs, ...) keep their Polars string form.
    pub fn from_any_value(value: &AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Scalar::Null,
            AnyValue::Boolean(b) => Scalar::Bool(*b),
            AnyValue::String(s) => Scalar::String(s.to_string()),
            AnyValue::StringOwned(s) => Scalar::String(s.to_string()),
            AnyValue::Int8(v) => Scalar::Int(i64::from(*v)),
            AnyValue::Int16(v) => Scalar::Int(i64::from(*v)),
            AnyValue::Int32(v) => Scalar::Int(i64::from(*v)),
            AnyValue::Int64(v) => Scalar::Int(*v),
            AnyValue::UInt8(v) => Scalar::UInt(u64::from(*v)),
            AnyValue::UInt16(v) => Scalar::UInt(u64::from(*v)),
            AnyValue::UInt32(v) => Scalar::UInt(u64::from(*v)),
            AnyValue::UInt64(v) => Scalar::UInt(*v),
            AnyValue::Float32(v) => Scalar::Float(f64::from(*v)),
            AnyValue::Float64(v) => Scalar::Float(*v),
            other => Scalar::String(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Reads the value as a row count, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Int(v) => u64::try_from(*v).ok(),
            Scalar::UInt(v) => Some(*v),
            _ => None,
        }
    }
}

/// Canonical string form of a value. `Null` displays as the empty string.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// One result row: column name to value.
pub type Row = HashMap<String, Scalar>;

/// Column names plus rows, as returned by a query.
///
/// Column order is significant and names are not required to be unique; a row
/// holds one value per distinct name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl TableResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        TableResult { columns, rows }
    }

    /// Collects an eager DataFrame into rows of scalars.
    pub fn from_dataframe(df: &DataFrame) -> PolarsResult<Self> {
        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = Vec::with_capacity(df.height());
        for row_index in 0..df.height() {
            let mut row = Row::with_capacity(columns.len());
            for column in df.columns() {
                let value = column.get(row_index)?;
                row.insert(column.name().to_string(), Scalar::from_any_value(&value));
            }
            rows.push(row);
        }

        Ok(TableResult { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Values of the first column named `name`, one per row (missing values as `Null`).
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Scalar> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(name).unwrap_or(&Scalar::Null))
    }
}
