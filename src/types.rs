use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//==============================================================================
// Cell Values
//==============================================================================

/// A single typed cell value
///
/// Blank cells are represented explicitly by [`CellValue::Empty`] so that a
/// record always carries every column of its header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Blank cell
    #[default]
    Empty,
    /// Boolean cell (TRUE/FALSE)
    Bool(bool),
    /// Numeric cell; Excel stores every number as a double
    Number(f64),
    /// Date or date-time cell
    Date(NaiveDateTime),
    /// Text cell
    String(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric view of the value (numbers only)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "Empty",
            CellValue::Bool(_) => "Boolean",
            CellValue::Number(_) => "Number",
            CellValue::Date(_) => "Date",
            CellValue::String(_) => "Text",
        }
    }
}

impl fmt::Display for CellValue {
    /// Renders the value the way it would appear in a cell with the
    /// General format. Used for header keys and column auto-fit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(true) => write!(f, "TRUE"),
            CellValue::Bool(false) => write!(f, "FALSE"),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Date(dt) => {
                if dt.time() == NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
            CellValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

//==============================================================================
// Records
//==============================================================================

/// One logical row keyed by column name, in header order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field; new keys keep insertion order
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every field holds [`CellValue::Empty`]
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(CellValue::is_empty)
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

//==============================================================================
// Read / Write Parameters
//==============================================================================

/// Identifies a sheet by name or by 0-based position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl FromStr for SheetSelector {
    type Err = std::convert::Infallible;

    /// Purely numeric input selects by index, anything else by name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(index) => SheetSelector::Index(index),
            Err(_) => SheetSelector::Name(s.to_string()),
        })
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        SheetSelector::Index(index)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(index) => write!(f, "#{}", index),
            SheetSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Options controlling how a sheet is turned into records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Row holding the column names, counted from the first non-blank row
    pub header_row: u32,
    /// Drop rows whose cells are all blank
    pub skip_empty_rows: bool,
    /// Columns that must be present in the header
    pub required_columns: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            header_row: 0,
            skip_empty_rows: true,
            required_columns: Vec::new(),
        }
    }
}

impl ReadOptions {
    pub fn header_row(mut self, row: u32) -> Self {
        self.header_row = row;
        self
    }

    pub fn skip_empty_rows(mut self, skip: bool) -> Self {
        self.skip_empty_rows = skip;
        self
    }

    pub fn require<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Options controlling how rows land in the target workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Replace an existing sheet of the same name
    pub overwrite: bool,
    /// Append below the last populated row of an existing sheet
    pub append: bool,
}

impl WriteOptions {
    pub fn overwrite() -> Self {
        Self {
            overwrite: true,
            append: false,
        }
    }

    pub fn append() -> Self {
        Self {
            overwrite: false,
            append: true,
        }
    }
}

/// Data handed to the writer
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    /// Keyed records; the header is the union of keys in first-seen order
    Records(Vec<Record>),
    /// Positional rows under an explicit header
    Raw {
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
}

impl Rows {
    pub fn len(&self) -> usize {
        match self {
            Rows::Records(records) => records.len(),
            Rows::Raw { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Record>> for Rows {
    fn from(records: Vec<Record>) -> Self {
        Rows::Records(records)
    }
}

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    pub sheet_name: String,
    pub rows_written: usize,
}
