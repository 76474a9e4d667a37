use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::DataError;

/// A single cell of a query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Renders scalar keys (ids) as text regardless of the column type.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Materialized result of one query: column names plus rows of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from string column names, mostly for fixtures.
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |cells| RowRef {
            columns: &self.columns,
            cells,
        })
    }

    /// Decodes every row into `T`, failing on the first malformed row.
    pub fn decode<T: FromRow>(&self) -> Result<Vec<T>, DataError> {
        self.rows().map(|row| T::from_row(&row)).collect()
    }
}

/// Borrowed view of one row with by-name column access.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn get(&self, column: &str) -> Result<&'a Value, DataError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.cells.get(idx))
            .ok_or_else(|| DataError::decode(column, "column missing from result"))
    }

    pub fn i64(&self, column: &str) -> Result<i64, DataError> {
        self.get(column)?
            .as_i64()
            .ok_or_else(|| DataError::decode(column, "expected an integer"))
    }

    pub fn opt_i64(&self, column: &str) -> Result<Option<i64>, DataError> {
        let value = self.get(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_i64()
            .map(Some)
            .ok_or_else(|| DataError::decode(column, "expected an integer"))
    }

    pub fn f64(&self, column: &str) -> Result<f64, DataError> {
        self.get(column)?
            .as_f64()
            .ok_or_else(|| DataError::decode(column, "expected a number"))
    }

    pub fn text(&self, column: &str) -> Result<String, DataError> {
        self.get(column)?
            .to_key()
            .ok_or_else(|| DataError::decode(column, "expected text"))
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>, DataError> {
        let value = self.get(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .to_key()
            .map(Some)
            .ok_or_else(|| DataError::decode(column, "expected text"))
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate, DataError> {
        self.get(column)?
            .as_date()
            .ok_or_else(|| DataError::decode(column, "expected a date"))
    }

    pub fn opt_date(&self, column: &str) -> Result<Option<NaiveDate>, DataError> {
        let value = self.get(column)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_date()
            .map(Some)
            .ok_or_else(|| DataError::decode(column, "expected a date"))
    }
}

/// Decodes one result row into a typed entity.
pub trait FromRow: Sized {
    fn from_row(row: &RowRef<'_>) -> Result<Self, DataError>;
}
