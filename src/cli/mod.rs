//! CLI command handlers

pub mod commands;

pub use commands::{convert, format, read, run, sheets, ConvertJob};
