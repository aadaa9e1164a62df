// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use regspan_cli::{RunSettings, parse_settings_json, run_extraction};
use regspan_core::{ExtractionResult, Objective, RegspanError};
use regspan_resample::{SampleTable, resample_knn};
use serde::Serialize;
use std::env;
use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

struct Cli {
    command: Command,
}

enum Command {
    Extract(ExtractArgs),
    Resample(ResampleArgs),
}

#[derive(Debug, Default)]
struct ExtractArgs {
    objective: Option<Objective>,
    allowed_deviation: Option<f64>,
    min_seed_length: Option<usize>,
    max_interval: Option<f64>,
    tolerance: Option<f64>,
    gap_period: Option<f64>,
    gap_threshold: Option<f64>,
    no_skips: bool,
    no_gaps: bool,
    max_steps: Option<usize>,
    config: Option<PathBuf>,
    input: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug)]
struct ResampleArgs {
    step: f64,
    k: usize,
    input: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug)]
enum CliError {
    Core(RegspanError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
    NotSupported(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Core(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::NotSupported(_) => "not_supported",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
            Self::NotSupported(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Core(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) | Self::NotSupported(_) => None,
        }
    }
}

impl From<RegspanError> for CliError {
    fn from(value: RegspanError) -> Self {
        Self::Core(value)
    }
}

#[derive(Serialize)]
struct TimestampInputSummary {
    path: String,
    n: usize,
}

#[derive(Serialize)]
struct TableInputSummary {
    path: String,
    n_samples: usize,
    n_features: usize,
}

#[derive(Serialize)]
struct ExtractOutput {
    command: &'static str,
    input: TimestampInputSummary,
    settings: RunSettings,
    result: ExtractionResult,
}

#[derive(Serialize)]
struct ResampleOutput {
    command: &'static str,
    input: TableInputSummary,
    step: f64,
    k: usize,
    table: SampleTable,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the `warn` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Extract(args) => handle_extract(args),
        Command::Resample(args) => handle_resample(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "extract" => Command::Extract(parse_extract_args(rest)?),
        "resample" => Command::Resample(parse_resample_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: extract, resample"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_objective_arg(raw: &str) -> Result<Objective, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "count" => Ok(Objective::Count),
        "span" => Ok(Objective::Span),
        _ => Err(CliError::invalid_input(format!(
            "invalid --objective '{raw}'; expected one of: count, span"
        ))),
    }
}

fn parse_extract_args(tokens: &[String]) -> Result<ExtractArgs, CliError> {
    let mut args = ExtractArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--objective" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.objective = Some(parse_objective_arg(raw.as_str())?);
            }
            "--allowed-deviation" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.allowed_deviation = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--min-seed-length" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.min_seed_length = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--max-interval" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.max_interval = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--tolerance" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.tolerance = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--gap-period" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.gap_period = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--gap-threshold" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.gap_threshold = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--no-skips" => {
                ensure_no_inline_value(flag, inline_value)?;
                args.no_skips = true;
            }
            "--no-gaps" => {
                ensure_no_inline_value(flag, inline_value)?;
                args.no_gaps = true;
            }
            "--max-steps" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.max_steps = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown extract option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("extract requires --input <path>"));
    }

    Ok(args)
}

fn parse_resample_args(tokens: &[String]) -> Result<ResampleArgs, CliError> {
    let mut step: Option<f64> = None;
    let mut k: Option<usize> = None;
    let mut input = PathBuf::new();
    let mut output: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--step" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                step = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--k" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                k = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown resample option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("resample requires --input <path>"));
    }
    let step = step.ok_or_else(|| CliError::invalid_input("resample requires --step <float>"))?;
    let k = k.ok_or_else(|| CliError::invalid_input("resample requires --k <usize>"))?;

    Ok(ResampleArgs {
        step,
        k,
        input,
        output,
    })
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn ensure_no_inline_value(flag: &str, inline_value: Option<String>) -> Result<(), CliError> {
    if inline_value.is_some() {
        return Err(CliError::invalid_input(format!(
            "{flag} does not accept a value"
        )));
    }
    Ok(())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn print_version() {
    println!("regspan {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "regspan {}\n\nUSAGE:\n  regspan <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  extract    Extract the best regularly spaced sub-sequence of timestamps\n  resample   Resample a feature table onto a regular grid (KNN kernel)\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nSet RUST_LOG to control log output on stderr (default: warn).\nRun 'regspan <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "extract" => {
            println!(
                "USAGE:\n  regspan extract --input <path> [OPTIONS]\n\nOPTIONS:\n  --objective <count|span>        Default: span\n  --allowed-deviation <float>     Default: 1.0\n  --min-seed-length <usize>       Default: 3\n  --max-interval <float>          Span objective only\n  --tolerance <float>             Default: 1e-6\n  --gap-period <float>            Default: 365.0\n  --gap-threshold <float>         Default: 28.0\n  --no-skips\n  --no-gaps\n  --max-steps <usize>             Extension step budget\n  --config <path>                 Settings JSON; flags override it\n  --input <path>                  Required .csv, one timestamp per row\n  --output <path>                 Write JSON output to file"
            );
            Ok(())
        }
        "resample" => {
            println!(
                "USAGE:\n  regspan resample --input <path> --step <float> --k <usize> [OPTIONS]\n\nOPTIONS:\n  --step <float>                  Required grid step\n  --k <usize>                     Required neighbor rank for the bandwidth\n  --input <path>                  Required .csv: header row of sample times, one labeled row per feature\n  --output <path>                 Write output to file (.csv writes CSV, otherwise JSON)"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: extract, resample"
        ))),
    }
}

fn handle_extract(args: ExtractArgs) -> Result<(), CliError> {
    let timestamps = load_timestamps(args.input.as_path())?;
    let settings = build_settings(&args)?;
    tracing::debug!(
        path = %args.input.display(),
        n = timestamps.len(),
        objective = settings.extraction.objective.as_str(),
        "loaded timestamps"
    );
    let result = run_extraction(&timestamps, &settings)?;

    write_json_output(
        &ExtractOutput {
            command: "extract",
            input: TimestampInputSummary {
                path: args.input.display().to_string(),
                n: timestamps.len(),
            },
            settings,
            result,
        },
        args.output.as_deref(),
    )
}

fn handle_resample(args: ResampleArgs) -> Result<(), CliError> {
    let table = load_table(args.input.as_path())?;
    tracing::debug!(
        path = %args.input.display(),
        samples = table.n_samples(),
        features = table.n_features(),
        "loaded sample table"
    );
    let resampled = resample_knn(&table, args.step, args.k)?;

    if let Some(path) = args.output.as_deref()
        && has_csv_extension(path)
    {
        return fs::write(path, format_table_csv(&resampled)).map_err(|source| {
            CliError::io(format!("failed to write '{}'", path.display()), source)
        });
    }

    write_json_output(
        &ResampleOutput {
            command: "resample",
            input: TableInputSummary {
                path: args.input.display().to_string(),
                n_samples: table.n_samples(),
                n_features: table.n_features(),
            },
            step: args.step,
            k: args.k,
            table: resampled,
        },
        args.output.as_deref(),
    )
}

/// Layers command-line overrides on top of the optional settings file.
fn build_settings(args: &ExtractArgs) -> Result<RunSettings, CliError> {
    let mut settings = match args.config.as_deref() {
        Some(path) => load_settings(path)?,
        None => RunSettings::default(),
    };

    let extraction = &mut settings.extraction;
    if let Some(objective) = args.objective {
        extraction.objective = objective;
    }
    if let Some(value) = args.allowed_deviation {
        extraction.allowed_deviation = value;
    }
    if let Some(value) = args.min_seed_length {
        extraction.min_seed_length = value;
    }
    if let Some(value) = args.max_interval {
        extraction.max_interval = Some(value);
    }
    if let Some(value) = args.tolerance {
        extraction.tolerance = value;
    }
    if let Some(value) = args.gap_period {
        extraction.gap_allowance_period = value;
    }
    if let Some(value) = args.gap_threshold {
        extraction.gap_extension_threshold = value;
    }
    if args.no_skips {
        extraction.allow_skips = false;
    }
    if args.no_gaps {
        extraction.allow_gaps = false;
    }
    if let Some(value) = args.max_steps {
        settings.constraints.max_extension_steps = Some(value);
    }

    Ok(settings)
}

fn load_settings(path: &Path) -> Result<RunSettings, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    Ok(parse_settings_json(raw.as_str())?)
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .is_some_and(|value| value.eq_ignore_ascii_case("csv"))
}

fn read_csv_input(path: &Path) -> Result<String, CliError> {
    if !has_csv_extension(path) {
        return Err(CliError::not_supported(format!(
            "unsupported input format for '{}'; expected .csv",
            path.display()
        )));
    }
    fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))
}

fn load_timestamps(path: &Path) -> Result<Vec<f64>, CliError> {
    parse_timestamp_csv(read_csv_input(path)?.as_str())
}

fn load_table(path: &Path) -> Result<SampleTable, CliError> {
    parse_table_csv(read_csv_input(path)?.as_str())
}

fn csv_rows(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn first_cell(row: &str) -> &str {
    row.split(',').next().map(str::trim).unwrap_or_default()
}

/// Reads the first column of every row; a leading non-numeric row is a header.
fn parse_timestamp_csv(raw: &str) -> Result<Vec<f64>, CliError> {
    let rows = csv_rows(raw);
    if rows.is_empty() {
        return Err(CliError::invalid_input("CSV input is empty"));
    }

    let skip_header = rows.len() > 1
        && first_cell(rows[0]).parse::<f64>().is_err()
        && first_cell(rows[1]).parse::<f64>().is_ok();
    let offset = usize::from(skip_header);

    rows[offset..]
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let cell = first_cell(row);
            cell.parse::<f64>().map_err(|_| {
                CliError::invalid_input(format!(
                    "CSV row {} column 1 is not a valid float: '{}'",
                    row_idx + offset + 1,
                    cell
                ))
            })
        })
        .collect()
}

fn parse_table_csv(raw: &str) -> Result<SampleTable, CliError> {
    let rows = csv_rows(raw);
    let Some((header, feature_rows)) = rows.split_first() else {
        return Err(CliError::invalid_input("CSV input is empty"));
    };

    let header_cells = header.split(',').map(str::trim).collect::<Vec<_>>();
    let times = header_cells
        .iter()
        .enumerate()
        .skip(1)
        .map(|(col_idx, cell)| {
            cell.parse::<f64>().map_err(|_| {
                CliError::invalid_input(format!(
                    "CSV header column {} is not a valid sample time: '{}'",
                    col_idx + 1,
                    cell
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut features = Vec::with_capacity(feature_rows.len());
    for (row_idx, row) in feature_rows.iter().enumerate() {
        let cells = row.split(',').map(str::trim).collect::<Vec<_>>();
        if cells.len() != header_cells.len() {
            return Err(CliError::invalid_input(format!(
                "CSV row {} has {} columns but expected {}",
                row_idx + 2,
                cells.len(),
                header_cells.len()
            )));
        }
        let label = cells[0].to_string();
        let values = cells[1..]
            .iter()
            .enumerate()
            .map(|(col_idx, cell)| {
                cell.parse::<f64>().map_err(|_| {
                    CliError::invalid_input(format!(
                        "CSV row {} column {} is not a valid float: '{}'",
                        row_idx + 2,
                        col_idx + 2,
                        cell
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        features.push((label, values));
    }

    Ok(SampleTable::from_rows(times, features)?)
}

fn format_table_csv(table: &SampleTable) -> String {
    let mut out = String::from("feature");
    for time in table.times() {
        let _ = write!(out, ",{time}");
    }
    out.push('\n');
    for (label, row) in table.rows() {
        out.push_str(label);
        for value in row {
            let _ = write!(out, ",{value}");
        }
        out.push('\n');
    }
    out
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}
