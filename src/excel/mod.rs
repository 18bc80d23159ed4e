//! Excel handling: read sheets into records, write records into sheets,
//! and apply formatting rules to written sheets.
//!
//! - Reader: Excel (.xlsx) sheet → header-keyed records
//! - Writer: records → sheet, saved atomically
//! - Formatter: ordered rules → column widths, styles, panes, filters

pub mod address;
mod formatter;
mod reader;
pub mod rules;
mod workbook;
mod writer;

pub use formatter::SheetFormatter;
pub use reader::{read, ExcelReader};
pub use rules::{
    standard_ruleset, CellStyle, ColumnRef, ColumnWidth, DataType, FormattingRule, Predicate,
    Target,
};
pub use workbook::{validate_sheet_name, Sheet, SheetLayout, UsedRange, Workbook};
pub use writer::{write, ExcelWriter};
