use std::path::PathBuf;
use thiserror::Error;

pub type SheetsmithResult<T> = Result<T, SheetsmithError>;

#[derive(Error, Debug)]
pub enum SheetsmithError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported format: {} ({reason})", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Sheet '{selector}' not found. Available sheets: {available}")]
    SheetNotFound { selector: String, available: String },

    #[error("Duplicate header '{name}' in columns {first} and {second}")]
    DuplicateHeader {
        name: String,
        first: String,
        second: String,
    },

    #[error("Missing required columns: {missing:?}. Available columns: {available:?}")]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Cannot write to {}: {reason}", path.display())]
    PathUnwritable { path: PathBuf, reason: String },

    #[error("Sheet '{0}' already exists (use overwrite to replace it)")]
    SheetExists(String),

    #[error("Invalid sheet name '{0}'")]
    InvalidSheetName(String),

    #[error("Row {row} has {found} columns, expected {expected}")]
    RowShapeMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{rows} rows x {columns} columns exceed the sheet limits (1048576 rows, 16384 columns)")]
    SheetLimits { rows: usize, columns: usize },

    #[error("Invalid rule target: {0}")]
    InvalidRuleTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SheetsmithError {
    /// Stable machine-readable code, used in log events and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            SheetsmithError::FileNotFound { .. } => "FILE_NOT_FOUND",
            SheetsmithError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            SheetsmithError::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            SheetsmithError::DuplicateHeader { .. } => "DUPLICATE_HEADER",
            SheetsmithError::MissingColumns { .. } => "MISSING_COLUMNS",
            SheetsmithError::PathUnwritable { .. } => "PATH_UNWRITABLE",
            SheetsmithError::SheetExists(_) => "SHEET_EXISTS",
            SheetsmithError::InvalidSheetName(_) => "INVALID_SHEET_NAME",
            SheetsmithError::RowShapeMismatch { .. } => "ROW_SHAPE_MISMATCH",
            SheetsmithError::SheetLimits { .. } => "SHEET_LIMITS",
            SheetsmithError::InvalidRuleTarget(_) => "INVALID_RULE_TARGET",
            SheetsmithError::Config(_) => "CONFIG_ERROR",
            SheetsmithError::Io(_) => "IO_ERROR",
            SheetsmithError::Yaml(_) => "YAML_ERROR",
        }
    }

    pub(crate) fn sheet_not_found(selector: impl ToString, available: &[String]) -> Self {
        SheetsmithError::SheetNotFound {
            selector: selector.to_string(),
            available: available.join(", "),
        }
    }
}
