//! Sightings CLI - Command-line interface for Sighting Flux
//!
//! Commands:
//! - analyze: Compute location analytics for a sighting list
//! - validate: Validate sighting records
//! - doctor: Diagnose configuration and environment
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sighting_flux::config::{self, AnalyzerConfig, InvalidRecordPolicy, TieBreak};
use sighting_flux::encoder::ReportEncoder;
use sighting_flux::schema::{SightingRecord, SightingRecordAdapter, SCHEMA_VERSION};
use sighting_flux::types::AnalysisResult;
use sighting_flux::{AnalyticsError, LocationAnalyzer, FLUX_VERSION, PRODUCER_NAME};

/// Sightings - Location analytics for tracked-subject sightings
#[derive(Parser)]
#[command(name = "sightings")]
#[command(version = FLUX_VERSION)]
#[command(about = "Compute visit and dwell-time analytics from sighting records", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute location analytics for a sighting list
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// TOML config file with an [analyzer] section
        #[arg(long)]
        config: Option<PathBuf>,

        /// Largest gap (seconds) between sightings of one visit
        #[arg(long)]
        gap_threshold_secs: Option<u64>,

        /// How most-frequent ties are resolved
        #[arg(long)]
        tie_break: Option<TieBreakArg>,

        /// Drop invalid records instead of rejecting the batch
        #[arg(long)]
        skip_invalid: bool,
    },

    /// Validate sighting records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of sighting records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Subject document with a `locations` array
    Subject,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// Human-readable summary
    Summary,
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    /// First key seen in the input wins
    FirstSeen,
    /// Smallest key wins
    Lexicographic,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::FirstSeen => TieBreak::FirstSeen,
            TieBreakArg::Lexicographic => TieBreak::Lexicographic,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (sighting.record.v1)
    Input,
    /// Output schema (analysis report)
    Output,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
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

fn run(cli: Cli) -> Result<(), SightingsCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            config,
            gap_threshold_secs,
            tie_break,
            skip_invalid,
        } => {
            let mut analyzer_config = match config {
                Some(path) => config::load_from_path(&path)?,
                None => AnalyzerConfig::default(),
            };
            if let Some(secs) = gap_threshold_secs {
                analyzer_config = analyzer_config.with_visit_gap_secs(secs);
            }
            if let Some(tie_break) = tie_break {
                analyzer_config = analyzer_config.with_tie_break(tie_break.into());
            }
            if skip_invalid {
                analyzer_config =
                    analyzer_config.with_invalid_records(InvalidRecordPolicy::SkipInvalid);
            }

            cmd_analyze(&input, &output, input_format, output_format, analyzer_config)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    analyzer_config: AnalyzerConfig,
) -> Result<(), SightingsCliError> {
    let input_data = read_input(input)?;
    let (records, subject) = parse_records(&input_data, &input_format)?;

    tracing::info!(
        records = records.len(),
        visit_gap_secs = analyzer_config.visit_gap_secs,
        "analyzing sightings"
    );

    let sightings =
        SightingRecordAdapter::to_sightings(&records, analyzer_config.invalid_records)?;
    let result = LocationAnalyzer::new(analyzer_config).analyze(&sightings);

    let encoder = ReportEncoder::new();
    let output_data = match output_format {
        OutputFormat::Json => {
            let report = encoder.encode(&result, subject.as_deref(), &analyzer_config)?;
            serde_json::to_string(&report)? + "\n"
        }
        OutputFormat::JsonPretty => {
            encoder.encode_to_json(&result, subject.as_deref(), &analyzer_config)? + "\n"
        }
        OutputFormat::Summary => format_summary(&result, subject.as_deref()),
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), SightingsCliError> {
    let input_data = read_input(input)?;
    let (records, _) = parse_records(&input_data, &input_format)?;

    let failures = SightingRecordAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures
            .iter()
            .map(|f| ValidationErrorDetail {
                index: f.index,
                error: f.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(SightingsCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), SightingsCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Flux version {}", FLUX_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(path) = config_path {
        let check = if !path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match config::load_from_path(path) {
                Ok(cfg) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (visit gap {}s, tie break {:?}, invalid records {:?})",
                        cfg.visit_gap_secs, cfg.tie_break, cfg.invalid_records
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for `analyze -i -`)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Sightings Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(SightingsCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), SightingsCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SCHEMA_VERSION);
                println!();
                println!("Each record is one sighting:");
                println!("- coordinates: {{ lat: -90..90, lng: -180..180 }} (numbers or numeric strings)");
                println!("- date: ISO-8601 instant, or epoch milliseconds");
                println!("  Extended JSON is accepted: {{\"$date\": <iso | millis | {{\"$numberLong\": \"..\"}}>}}");
                println!();
                println!("Input formats:");
                println!("- json: array of records");
                println!("- ndjson: one record per line");
                println!("- subject: {{ fullName, locations: [records] }}");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: analysis report");
                println!();
                println!("- reportVersion, producer {{ name, version, instance_id }}");
                println!("- provenance {{ subject, firstSightingUtc, lastSightingUtc, computedAtUtc, visitGapSecs }}");
                println!("- totalEntries, uniqueCoordinatesCount, uniqueDatesCount");
                println!("- mostFrequent {{ date, coordinates, dateOccurrences, coordinateOccurrences }} (null when empty)");
                println!("- dates: [{{ key, count }}] in first-seen order");
                println!("- coordinates: [{{ key, count }}] in first-seen order");
                println!("- avgTimePerLocation: [{{ location, averageTime, visitCount, sightings }}]");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, SightingsCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_records(
    data: &str,
    format: &InputFormat,
) -> Result<(Vec<SightingRecord>, Option<String>), SightingsCliError> {
    Ok(match format {
        InputFormat::Json => (SightingRecordAdapter::parse_array(data)?, None),
        InputFormat::Ndjson => (SightingRecordAdapter::parse_ndjson(data)?, None),
        InputFormat::Subject => {
            let doc = SightingRecordAdapter::parse_subject(data)?;
            let subject = doc.subject().map(str::to_string);
            (doc.locations, subject)
        }
    })
}

fn format_summary(result: &AnalysisResult, subject: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(subject) = subject {
        out.push_str(&format!("Subject: {}\n", subject));
    }
    out.push_str(&format!("Total Sightings: {}\n", result.total_entries));
    out.push_str(&format!(
        "Unique Locations Count: {}\n",
        result.unique_coordinates_count
    ));
    out.push_str(&format!("Unique Dates Count: {}\n", result.unique_dates_count));

    match &result.most_frequent {
        Some(most) => {
            out.push_str(&format!(
                "Most Frequent Date: {} ({} sightings)\n",
                most.date, most.date_occurrences
            ));
            out.push_str(&format!(
                "Most Frequent Location: {} ({} sightings)\n",
                most.coordinates, most.coordinate_occurrences
            ));
        }
        None => out.push_str("Most Frequent: n/a\n"),
    }

    if !result.dwell.is_empty() {
        out.push_str("\nAverage Time Per Location:\n");
        for dwell in &result.dwell {
            out.push_str(&format!(
                "  {:<32} {:>10.1}s  ({} visits, {} sightings)\n",
                dwell.coordinates.as_str(),
                dwell.average_dwell_secs,
                dwell.visit_count,
                dwell.sightings
            ));
        }
    }

    out
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "One timestamped location observation of a tracked subject",
        "type": "object",
        "required": ["coordinates", "date"],
        "properties": {
            "coordinates": {
                "type": "object",
                "required": ["lat", "lng"],
                "properties": {
                    "lat": {
                        "oneOf": [
                            { "type": "number", "minimum": -90, "maximum": 90 },
                            { "type": "string", "description": "numeric text" }
                        ]
                    },
                    "lng": {
                        "oneOf": [
                            { "type": "number", "minimum": -180, "maximum": 180 },
                            { "type": "string", "description": "numeric text" }
                        ]
                    }
                }
            },
            "date": {
                "oneOf": [
                    { "type": "string", "format": "date-time" },
                    { "type": "integer", "description": "epoch milliseconds" },
                    {
                        "type": "object",
                        "required": ["$date"],
                        "properties": {
                            "$date": {
                                "oneOf": [
                                    { "type": "string", "format": "date-time" },
                                    { "type": "integer" },
                                    {
                                        "type": "object",
                                        "required": ["$numberLong"],
                                        "properties": { "$numberLong": { "type": "string" } }
                                    }
                                ]
                            }
                        }
                    }
                ]
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let count = serde_json::json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "key": { "type": "string" },
                "count": { "type": "integer" }
            }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sighting analysis report",
        "type": "object",
        "required": ["reportVersion", "producer", "provenance", "totalEntries", "dates", "coordinates", "avgTimePerLocation"],
        "properties": {
            "reportVersion": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "provenance": {
                "type": "object",
                "properties": {
                    "subject": { "type": "string" },
                    "firstSightingUtc": { "type": "string" },
                    "lastSightingUtc": { "type": "string" },
                    "computedAtUtc": { "type": "string" },
                    "visitGapSecs": { "type": "integer" }
                }
            },
            "totalEntries": { "type": "integer" },
            "uniqueCoordinatesCount": { "type": "integer" },
            "uniqueDatesCount": { "type": "integer" },
            "mostFrequent": {
                "type": ["object", "null"],
                "properties": {
                    "date": { "type": "string" },
                    "coordinates": { "type": "string" },
                    "dateOccurrences": { "type": "integer" },
                    "coordinateOccurrences": { "type": "integer" }
                }
            },
            "dates": count,
            "coordinates": count,
            "avgTimePerLocation": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "location": { "type": "string" },
                        "averageTime": { "type": "number" },
                        "visitCount": { "type": "integer" },
                        "sightings": { "type": "integer" }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum SightingsCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    Config(config::ConfigError),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for SightingsCliError {
    fn from(e: io::Error) -> Self {
        SightingsCliError::Io(e)
    }
}

impl From<AnalyticsError> for SightingsCliError {
    fn from(e: AnalyticsError) -> Self {
        SightingsCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for SightingsCliError {
    fn from(e: serde_json::Error) -> Self {
        SightingsCliError::Json(e)
    }
}

impl From<config::ConfigError> for SightingsCliError {
    fn from(e: config::ConfigError) -> Self {
        SightingsCliError::Config(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SightingsCliError> for CliError {
    fn from(e: SightingsCliError) -> Self {
        match e {
            SightingsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SightingsCliError::Analytics(AnalyticsError::InvalidInput { index, reason }) => {
                CliError {
                    code: "INVALID_RECORD".to_string(),
                    message: format!("Record {} is invalid: {}", index, reason),
                    hint: Some(
                        "Run 'sightings validate' for details, or pass --skip-invalid".to_string(),
                    ),
                }
            }
            SightingsCliError::Analytics(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches the sighting.record.v1 schema".to_string()),
            },
            SightingsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SightingsCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the [analyzer] section of the config file".to_string()),
            },
            SightingsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            SightingsCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
