//! Sheetsmith - repeatable Excel ingestion and export
//!
//! This library reads worksheets into header-keyed records, writes records
//! back into worksheets, and applies declarative formatting rules so every
//! produced workbook looks the same.
//!
//! # Features
//!
//! - Sheet selection by name (case-insensitive) or position
//! - Typed cell values (numbers, text, booleans, dates)
//! - Overwrite / append / create-only writes with atomic saves
//! - Ordered formatting rules (widths, styles, number formats, panes, filters)
//!
//! # Example
//!
//! ```no_run
//! use sheetsmith::excel::{ExcelReader, ExcelWriter, standard_ruleset};
//! use sheetsmith::types::{Rows, SheetSelector, WriteOptions};
//!
//! let records = ExcelReader::new("people.xlsx").read(&SheetSelector::Index(0))?;
//! println!("Read {} records", records.len());
//!
//! let writer = ExcelWriter::new().with_rules(standard_ruleset());
//! let result = writer.write("report.xlsx", "People", &Rows::from(records), WriteOptions::overwrite())?;
//! println!("Wrote {} rows to {}", result.rows_written, result.sheet_name);
//! # Ok::<(), sheetsmith::error::SheetsmithError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod excel;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{SheetsmithError, SheetsmithResult};
pub use types::{CellValue, ReadOptions, Record, Rows, SheetSelector, WriteOptions, WriteResult};
