//! Footfall CLI - Command-line interface for footfall-stats
//!
//! Commands:
//! - summary: Store-wide and per-zone metrics as JSON
//! - unit10: Unit10 statistics report as JSON
//! - export: Write the table back as CSV, optionally masking identifiers
//! - validate: Check that a table loads and report its shape
//! - schema: Print the expected input columns

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use footfall_stats::export::export_csv;
use footfall_stats::store::{self, Source, REQUIRED_COLUMNS, TIMESTAMP_FORMAT};
use footfall_stats::{
    AnalysisConfig, ConfigError, ExportError, FootfallAnalyzer, LoadError, ResponseStatus,
    FOOTFALL_VERSION, PRODUCER_NAME,
};

/// Footfall - Statistical analysis of retail footfall detections
#[derive(Parser)]
#[command(name = "footfall")]
#[command(version = FOOTFALL_VERSION)]
#[command(about = "Compute dashboard statistics from footfall detection tables", long_about = None)]
struct Cli {
    /// Analysis configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store-wide and per-zone metrics
    Summary {
        /// Input CSV path (use - for stdin)
        input: String,

        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },

    /// Unit10 statistics report
    Unit10 {
        /// Input CSV path (use - for stdin)
        input: String,

        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },

    /// Write the table back as canonical CSV
    Export {
        /// Input CSV path (use - for stdin)
        input: String,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Replace detection IDs with ANON-HASH-<last 6 chars>
        #[arg(long)]
        mask: bool,
    },

    /// Check that a table loads and report its shape
    Validate {
        /// Input CSV path (use - for stdin)
        input: String,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the expected input columns
    Schema {
        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), FootfallCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Summary { input, pretty } => cmd_summary(&input, config, pretty),
        Commands::Unit10 { input, pretty } => cmd_unit10(&input, config, pretty),
        Commands::Export {
            input,
            output,
            mask,
        } => cmd_export(&input, &output, mask),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Schema { json_schema } => cmd_schema(json_schema),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, FootfallCliError> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn source_for(input: &str) -> Source {
    let source = Source::from_arg(input);
    if source == Source::Stdin && atty::is(atty::Stream::Stdin) {
        tracing::warn!("reading CSV from an interactive terminal; end input with Ctrl-D");
    }
    source
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), FootfallCliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn cmd_summary(input: &str, config: AnalysisConfig, pretty: bool) -> Result<(), FootfallCliError> {
    let response = FootfallAnalyzer::with_config(config).summary(&source_for(input));
    print_json(&response, pretty)?;

    match response.status {
        ResponseStatus::Error => Err(FootfallCliError::AnalysisFailed(
            response.message.unwrap_or_default(),
        )),
        ResponseStatus::Success | ResponseStatus::Empty => Ok(()),
    }
}

fn cmd_unit10(input: &str, config: AnalysisConfig, pretty: bool) -> Result<(), FootfallCliError> {
    let response = FootfallAnalyzer::with_config(config).unit10(&source_for(input));
    print_json(&response, pretty)?;

    match response.status {
        ResponseStatus::Error => Err(FootfallCliError::AnalysisFailed(
            response.message.unwrap_or_default(),
        )),
        ResponseStatus::Success | ResponseStatus::Empty => Ok(()),
    }
}

fn cmd_export(input: &str, output: &Path, mask: bool) -> Result<(), FootfallCliError> {
    let records = store::load(&source_for(input))?;

    if output.to_string_lossy() == "-" {
        export_csv(&records, io::stdout().lock(), mask)?;
    } else {
        let mut writer = BufWriter::new(File::create(output)?);
        export_csv(&records, &mut writer, mask)?;
        writer.flush()?;
    }

    Ok(())
}

fn cmd_validate(input: &str, json: bool) -> Result<(), FootfallCliError> {
    let records = store::load(&source_for(input))?;

    let report = ValidationReport {
        total_rows: records.len(),
        complete_rows: records.complete_indices().count(),
        zones: records
            .zone_counts()
            .into_iter()
            .map(|(zone, count)| (zone.to_string(), count))
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:      {}", report.total_rows);
        println!("Complete rows:   {}", report.complete_rows);
        println!("Incomplete rows: {}", report.total_rows - report.complete_rows);

        if !report.zones.is_empty() {
            println!("\nZones:");
            for (zone, count) in &report.zones {
                println!("  - {}: {}", zone, count);
            }
        }
    }

    if report.total_rows == 0 {
        Err(FootfallCliError::NoRows)
    } else {
        Ok(())
    }
}

fn cmd_schema(json_schema: bool) -> Result<(), FootfallCliError> {
    if json_schema {
        println!("{}", get_input_json_schema());
        return Ok(());
    }

    println!("Input Schema ({} {})", PRODUCER_NAME, FOOTFALL_VERSION);
    println!();
    println!("CSV with a header row containing these columns (any order, extras ignored):");
    println!();
    println!("  {:<16} detection identifier (string)", REQUIRED_COLUMNS[0]);
    println!("  {:<16} detection time, {}", REQUIRED_COLUMNS[1], TIMESTAMP_FORMAT);
    println!("  {:<16} zone name (open set, non-empty)", REQUIRED_COLUMNS[2]);
    println!("  {:<16} dwell time in seconds (>= 0, negatives rejected)", REQUIRED_COLUMNS[3]);
    println!("  {:<16} engagement score (nominally 0-100, not enforced)", REQUIRED_COLUMNS[4]);
    println!("  {:<16} detector confidence (0-1, out of range rejected)", REQUIRED_COLUMNS[5]);
    println!();
    println!("Empty numeric cells are treated as missing; such rows still count");
    println!("toward footfall but are excluded from means and statistics.");

    Ok(())
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Footfall detection row",
        "type": "object",
        "required": REQUIRED_COLUMNS,
        "properties": {
            "DetectionID": { "type": "string" },
            "Timestamp": { "type": "string", "pattern": "^\\d{4}-\\d{2}-\\d{2} \\d{2}:\\d{2}:\\d{2}$" },
            "Zone": { "type": "string", "minLength": 1 },
            "DwellTime_s": { "type": ["number", "null"], "minimum": 0 },
            "EngagementScore": { "type": ["number", "null"] },
            "AI_Confidence": { "type": ["number", "null"], "minimum": 0, "maximum": 1 }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum FootfallCliError {
    Io(io::Error),
    Load(LoadError),
    Export(ExportError),
    Config(ConfigError),
    Json(serde_json::Error),
    AnalysisFailed(String),
    NoRows,
}

impl From<io::Error> for FootfallCliError {
    fn from(e: io::Error) -> Self {
        FootfallCliError::Io(e)
    }
}

impl From<LoadError> for FootfallCliError {
    fn from(e: LoadError) -> Self {
        FootfallCliError::Load(e)
    }
}

impl From<ExportError> for FootfallCliError {
    fn from(e: ExportError) -> Self {
        FootfallCliError::Export(e)
    }
}

impl From<ConfigError> for FootfallCliError {
    fn from(e: ConfigError) -> Self {
        FootfallCliError::Config(e)
    }
}

impl From<serde_json::Error> for FootfallCliError {
    fn from(e: serde_json::Error) -> Self {
        FootfallCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FootfallCliError> for CliError {
    fn from(e: FootfallCliError) -> Self {
        match e {
            FootfallCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FootfallCliError::Load(e) => CliError {
                code: "LOAD_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'footfall schema' for the expected columns".to_string()),
            },
            FootfallCliError::Export(e) => CliError {
                code: "EXPORT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the output path".to_string()),
            },
            FootfallCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the --config file".to_string()),
            },
            FootfallCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FootfallCliError::AnalysisFailed(message) => CliError {
                code: "ANALYSIS_FAILED".to_string(),
                message,
                hint: Some("Run 'footfall validate' on the input".to_string()),
            },
            FootfallCliError::NoRows => CliError {
                code: "NO_ROWS".to_string(),
                message: "No rows found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_rows: usize,
    complete_rows: usize,
    zones: BTreeMap<String, usize>,
}
