use clap::{Parser, Subcommand};
use sheetsmith::cli::{self, ConvertJob};
use sheetsmith::config::AppConfig;
use sheetsmith::logging;
use sheetsmith::types::SheetSelector;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetsmith")]
#[command(about = "Read Excel sheets into records, write records to sheets, format the result.")]
#[command(long_about = "Sheetsmith - repeatable Excel ingestion and export

COMMANDS:
  sheets   - List the sheets of a workbook
  read     - Print a sheet's records as JSON
  convert  - Read a sheet, write it to another workbook, format it
  format   - Apply formatting rules to a sheet in place
  run      - Run the configured pipeline (input → output)

CONFIGURATION:
  YAML file given with --config or SHEETSMITH_CONFIG. Every key is optional:

  paths:
    input_dir: data/input
    output_dir: data/output
  input_file: contacts.xlsx
  output_sheet: Contacts
  formatting:
    - kind: header_style
      style: { bold: true, fill_color: \"366092\" }

LOGGING:
  Level from the config file, overridden by SHEETSMITH_LOG (e.g. debug).

EXAMPLES:
  sheetsmith sheets book.xlsx
  sheetsmith read book.xlsx --sheet Contacts --require Name,Phone
  sheetsmith convert in.xlsx out.xlsx --output-sheet Report --overwrite
  sheetsmith --config job.yaml run")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "SHEETSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Show verbose output (also raises the log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sheet names in file order
    Sheets {
        /// Path to Excel file (.xlsx)
        file: PathBuf,
    },

    /// Print a sheet's records as JSON
    Read {
        /// Path to Excel file (.xlsx)
        file: PathBuf,

        /// Sheet name or 0-based index (default: configured input sheet)
        #[arg(short, long)]
        sheet: Option<SheetSelector>,

        /// Header row, counted from the first non-blank row (0-based)
        #[arg(long)]
        header_row: Option<u32>,

        /// Keep rows whose cells are all blank
        #[arg(long)]
        keep_empty_rows: bool,

        /// Columns that must be present (comma-separated)
        #[arg(long, value_delimiter = ',')]
        require: Vec<String>,
    },

    #[command(long_about = "Read a sheet and write it into another workbook.

The output file is created when missing. An existing sheet with the same
name is an error unless --overwrite or --append is given. Appending matches
columns by header name and adds unknown columns to the right.

The written sheet is formatted with the configured rules (or the standard
ruleset: styled header, banded rows, auto-filter, auto-fit widths, frozen
header) unless --no-format is given.")]
    /// Read a sheet and write it into another workbook
    Convert {
        /// Source Excel file (.xlsx)
        input: PathBuf,

        /// Target Excel file (.xlsx)
        output: PathBuf,

        /// Source sheet name or 0-based index (default: configured input sheet)
        #[arg(short, long)]
        sheet: Option<SheetSelector>,

        /// Target sheet name (default: configured output sheet)
        #[arg(short, long)]
        output_sheet: Option<String>,

        /// Replace the target sheet if it exists
        #[arg(long, conflicts_with = "append")]
        overwrite: bool,

        /// Append below the target sheet's last populated row
        #[arg(long)]
        append: bool,

        /// Write values only, without formatting
        #[arg(long)]
        no_format: bool,
    },

    /// Apply the configured formatting rules to a sheet in place
    Format {
        /// Path to Excel file (.xlsx)
        file: PathBuf,

        /// Sheet name or 0-based index
        #[arg(short, long, default_value = "0")]
        sheet: SheetSelector,
    },

    /// Run the configured pipeline
    Run,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    logging::init(level, config.log_file().as_deref())?;

    match cli.command {
        Commands::Sheets { file } => cli::sheets(file)?,

        Commands::Read {
            file,
            sheet,
            header_row,
            keep_empty_rows,
            require,
        } => {
            let mut options = config.read.clone();
            if let Some(row) = header_row {
                options.header_row = row;
            }
            if keep_empty_rows {
                options.skip_empty_rows = false;
            }
            if !require.is_empty() {
                options.required_columns = require;
            }
            let sheet = sheet.unwrap_or_else(|| config.input_sheet.clone());
            cli::read(file, sheet, options)?
        }

        Commands::Convert {
            input,
            output,
            sheet,
            output_sheet,
            overwrite,
            append,
            no_format,
        } => {
            let mut write = config.write;
            if overwrite || append {
                write.overwrite = overwrite;
                write.append = append;
            }
            let job = ConvertJob {
                input,
                output,
                sheet: sheet.unwrap_or_else(|| config.input_sheet.clone()),
                output_sheet: output_sheet.unwrap_or_else(|| config.output_sheet.clone()),
                read: config.read.clone(),
                write,
                rules: if no_format {
                    Vec::new()
                } else {
                    config.formatting_rules()
                },
                temp_dir: None,
            };
            cli::convert(job, cli.verbose)?
        }

        Commands::Format { file, sheet } => {
            cli::format(file, sheet, config.formatting_rules(), cli.verbose)?
        }

        Commands::Run => cli::run(&config, cli.verbose)?,
    }

    Ok(())
}
