use crate::config::AppConfig;
use crate::error::SheetsmithResult;
use crate::excel::{ExcelReader, ExcelWriter, FormattingRule, SheetFormatter, Workbook};
use crate::types::{ReadOptions, Rows, SheetSelector, WriteOptions};
use colored::Colorize;
use std::path::PathBuf;

/// One read → write → format pass
#[derive(Debug, Clone)]
pub struct ConvertJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sheet: SheetSelector,
    pub output_sheet: String,
    pub read: ReadOptions,
    pub write: WriteOptions,
    /// Empty means the output is left unformatted
    pub rules: Vec<FormattingRule>,
    /// Staging directory for the atomic save; defaults to the output's directory
    pub temp_dir: Option<PathBuf>,
}

impl ConvertJob {
    /// Job described entirely by the configuration file
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            input: config.input_path(),
            output: config.output_path(),
            sheet: config.input_sheet.clone(),
            output_sheet: config.output_sheet.clone(),
            read: config.read.clone(),
            write: config.write,
            rules: config.formatting_rules(),
            temp_dir: Some(config.paths.temp_dir.clone()),
        }
    }
}

/// Execute the sheets command - list sheet names in file order
pub fn sheets(file: PathBuf) -> SheetsmithResult<()> {
    let names = ExcelReader::new(&file).sheet_names()?;

    println!("{}", "📚 Sheetsmith - Sheets".bold().green());
    println!("   File: {}\n", file.display());
    for (index, name) in names.iter().enumerate() {
        println!("   {} {}", format!("{:>3}.", index).dimmed(), name.bright_blue());
    }
    println!();

    Ok(())
}

/// Execute the read command - print the sheet's records as JSON on stdout
pub fn read(file: PathBuf, sheet: SheetSelector, options: ReadOptions) -> SheetsmithResult<()> {
    let records = ExcelReader::new(&file).with_options(options).read(&sheet)?;

    let json = serde_json::to_string_pretty(&records).map_err(std::io::Error::from)?;
    println!("{}", json);

    Ok(())
}

/// Execute the convert command
pub fn convert(job: ConvertJob, verbose: bool) -> SheetsmithResult<()> {
    println!("{}", "🔄 Sheetsmith - Convert".bold().green());
    println!("   Input:  {} [{}]", job.input.display(), job.sheet);
    println!("   Output: {} [{}]\n", job.output.display(), job.output_sheet);

    if verbose {
        println!("{}", "📖 Reading Excel file...".cyan());
    }

    let records = ExcelReader::new(&job.input)
        .with_options(job.read.clone())
        .read(&job.sheet)?;

    if verbose {
        let columns = records.first().map(|r| r.len()).unwrap_or(0);
        println!("   Found {} records, {} columns\n", records.len(), columns);
        println!("{}", "💾 Writing Excel file...".cyan());
        if job.rules.is_empty() {
            println!("   Formatting: {}", "disabled".yellow());
        } else {
            println!("   Formatting: {} rules", job.rules.len());
        }
    }

    let mut writer = ExcelWriter::new().with_rules(job.rules.clone());
    if let Some(dir) = &job.temp_dir {
        writer = writer.with_temp_dir(dir);
    }
    let result = writer.write(&job.output, &job.output_sheet, &Rows::from(records), job.write)?;

    println!("{}", "✅ Convert Complete!".bold().green());
    println!(
        "   {} rows → {} ({})\n",
        result.rows_written.to_string().bold(),
        result.sheet_name.bright_blue(),
        job.output.display()
    );

    Ok(())
}

/// Execute the format command - apply rules to one sheet in place
pub fn format(
    file: PathBuf,
    sheet: SheetSelector,
    rules: Vec<FormattingRule>,
    verbose: bool,
) -> SheetsmithResult<()> {
    println!("{}", "🎨 Sheetsmith - Format".bold().green());
    println!("   File:  {}", file.display());
    println!("   Sheet: {}\n", sheet);

    let mut workbook = Workbook::open(&file)?;
    let name = workbook.select(&sheet)?.name().to_string();

    if verbose {
        for rule in &rules {
            println!("   📐 {}", rule.kind().cyan());
        }
        println!();
    }

    SheetFormatter::new(rules).format(&mut workbook, &name)?;
    workbook.save(&file)?;

    println!("{}", "✅ Format Complete!".bold().green());
    println!("   Sheet {} formatted\n", name.bright_blue());

    Ok(())
}

/// Execute the run command - full pipeline from the configuration
pub fn run(config: &AppConfig, verbose: bool) -> SheetsmithResult<()> {
    config.create_directories()?;
    if verbose {
        println!("{}", "📁 Working directories ready".cyan());
        println!("   Input:  {}", config.paths.input_dir.display());
        println!("   Output: {}\n", config.paths.output_dir.display());
    }
    convert(ConvertJob::from_config(config), verbose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::standard_ruleset;

    #[test]
    fn test_job_from_default_config() {
        let config = AppConfig::default();
        let job = ConvertJob::from_config(&config);
        assert_eq!(job.input, PathBuf::from("data/input/input.xlsx"));
        assert_eq!(job.output, PathBuf::from("data/output/output.xlsx"));
        assert_eq!(job.output_sheet, "Sheet1");
        assert_eq!(job.rules, standard_ruleset());
        assert_eq!(job.temp_dir, Some(PathBuf::from("data/temp")));
    }
}
