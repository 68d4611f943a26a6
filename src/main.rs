//! Binary entry point for the tugmock CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Resolve every mockable type in a project
//! tugmock resolve --input project.json
//!
//! # Show one resolved type
//! tugmock inspect --input project.json --type Child
//!
//! # Strict imports only, four workers, compact output
//! tugmock --no-relaxed-linking --jobs 4 --compact resolve --input project.json
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tugmock::cli::{run_inspect, run_resolve};
use tugmock::config::{ConfigOverrides, ResolveConfig};
use tugmock_core::error::{MockError, OutputErrorCode};
use tugmock_core::output::{emit_response, emit_response_compact, ErrorResponse, Response};

// ============================================================================
// CLI Structure
// ============================================================================

/// Semantic resolution for test-double generation.
///
/// Reads parser output as JSON and writes flattened, fully-qualified type graphs as JSON.
#[derive(Parser, Debug)]
#[command(name = "tugmock", version, about = "Semantic resolution for test-double generation")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only resolve ancestors through explicit imports.
    #[arg(long, global = true)]
    no_relaxed_linking: bool,

    /// Worker threads (default: one per processor).
    #[arg(long, global = true)]
    jobs: Option<usize>,

    /// Single-line JSON output.
    #[arg(long, global = true)]
    compact: bool,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every mockable type in a project.
    Resolve {
        /// Parser output (project JSON).
        #[arg(long)]
        input: PathBuf,
    },
    /// Resolve a project and print one type.
    Inspect {
        /// Parser output (project JSON).
        #[arg(long)]
        input: PathBuf,
        /// Bare, module-local or canonical type name.
        #[arg(long = "type")]
        type_name: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like successful responses.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(global: &GlobalArgs) -> Result<ResolveConfig, MockError> {
    let overrides = ConfigOverrides {
        no_relaxed_linking: global.no_relaxed_linking,
        jobs: global.jobs,
    };
    Ok(ResolveConfig::load(global.config.as_deref(), overrides)?)
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), MockError> {
    let config = load_config(&cli.global)?;
    match cli.command {
        Command::Resolve { input } => {
            let graph = run_resolve(&input, &config)?;
            emit(&Response::ok(graph), cli.global.compact)
        }
        Command::Inspect { input, type_name } => {
            let body = run_inspect(&input, &type_name, &config)?;
            emit(&Response::ok(body), cli.global.compact)
        }
    }
}

fn emit<T: serde::Serialize>(response: &T, compact: bool) -> Result<(), MockError> {
    let mut stdout = io::stdout();
    let written = if compact {
        emit_response_compact(response, &mut stdout)
    } else {
        emit_response(response, &mut stdout)
    };
    written.map_err(|e| MockError::internal(e.to_string()))?;
    let _ = stdout.flush();
    Ok(())
}
