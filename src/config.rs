//! Run configuration
//!
//! An [`AppConfig`] is loaded once per run (YAML, every field optional) and
//! passed by reference to the components that need it.

use crate::error::{SheetsmithError, SheetsmithResult};
use crate::excel::rules::{standard_ruleset, FormattingRule};
use crate::types::{ReadOptions, SheetSelector, WriteOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Working directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = PathBuf::from("data");
        Self {
            input_dir: data.join("input"),
            output_dir: data.join("output"),
            temp_dir: data.join("temp"),
            logs_dir: data.join("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level; `SHEETSMITH_LOG` takes precedence
    pub level: String,
    /// Optional log file name, created inside `paths.logs_dir`
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Complete configuration for one processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub input_file: String,
    pub output_file: String,
    pub input_sheet: SheetSelector,
    pub output_sheet: String,
    pub read: ReadOptions,
    pub write: WriteOptions,
    pub logging: LoggingConfig,
    /// Rules applied to written sheets; `None` means the standard ruleset
    pub formatting: Option<Vec<FormattingRule>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            input_file: "input.xlsx".to_string(),
            output_file: "output.xlsx".to_string(),
            input_sheet: SheetSelector::default(),
            output_sheet: "Sheet1".to_string(),
            read: ReadOptions::default(),
            write: WriteOptions::default(),
            logging: LoggingConfig::default(),
            formatting: None,
        }
    }
}

impl AppConfig {
    /// Load and validate a YAML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> SheetsmithResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SheetsmithError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> SheetsmithResult<Self> {
        let config: AppConfig = if yaml.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SheetsmithResult<()> {
        if self.input_file.trim().is_empty() {
            return Err(SheetsmithError::Config("input_file must not be empty".to_string()));
        }
        if self.output_file.trim().is_empty() {
            return Err(SheetsmithError::Config("output_file must not be empty".to_string()));
        }
        crate::excel::validate_sheet_name(&self.output_sheet)
            .map_err(|e| SheetsmithError::Config(format!("output_sheet: {}", e)))?;
        if let SheetSelector::Name(name) = &self.input_sheet {
            if name.trim().is_empty() {
                return Err(SheetsmithError::Config("input_sheet must not be empty".to_string()));
            }
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(SheetsmithError::Config(format!(
                "unknown log level '{}', expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.write.append && self.write.overwrite {
            return Err(SheetsmithError::Config(
                "write.append and write.overwrite are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    /// Input workbook; relative names resolve against `paths.input_dir`
    pub fn input_path(&self) -> PathBuf {
        resolve(&self.paths.input_dir, &self.input_file)
    }

    /// Output workbook; relative names resolve against `paths.output_dir`
    pub fn output_path(&self) -> PathBuf {
        resolve(&self.paths.output_dir, &self.output_file)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging
            .file
            .as_ref()
            .map(|file| resolve(&self.paths.logs_dir, file))
    }

    /// Configured rules, or the standard ruleset when none are given
    pub fn formatting_rules(&self) -> Vec<FormattingRule> {
        self.formatting.clone().unwrap_or_else(standard_ruleset)
    }

    /// Create every working directory that does not exist yet
    pub fn create_directories(&self) -> SheetsmithResult<()> {
        for dir in [
            &self.paths.input_dir,
            &self.paths.output_dir,
            &self.paths.temp_dir,
            &self.paths.logs_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn resolve(dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = AppConfig::from_yaml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.input_path(), PathBuf::from("data/input/input.xlsx"));
        assert_eq!(config.formatting_rules(), standard_ruleset());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = AppConfig::from_yaml_str(
            "input_file: phones.xlsx\ninput_sheet: 1\nread:\n  header_row: 2\n",
        )
        .unwrap();
        assert_eq!(config.input_sheet, SheetSelector::Index(1));
        assert_eq!(config.read.header_row, 2);
        assert!(config.read.skip_empty_rows);
        assert_eq!(config.output_sheet, "Sheet1");
    }

    #[test]
    fn test_absolute_output_path_is_kept() {
        let config = AppConfig::from_yaml_str("output_file: /tmp/report.xlsx\n").unwrap();
        assert_eq!(config.output_path(), PathBuf::from("/tmp/report.xlsx"));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            AppConfig::from_yaml_str("output_sheet: ''\n"),
            Err(SheetsmithError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_yaml_str("logging:\n  level: loud\n"),
            Err(SheetsmithError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_yaml_str("write:\n  append: true\n  overwrite: true\n"),
            Err(SheetsmithError::Config(_))
        ));
    }

    #[test]
    fn test_explicit_empty_ruleset_disables_formatting() {
        let config = AppConfig::from_yaml_str("formatting: []\n").unwrap();
        assert!(config.formatting_rules().is_empty());
    }
}
