//! sql-data-compare CLI - reconcile query results across MSSQL, PostgreSQL and MySQL.

use clap::{Parser, Subcommand};
use sql_data_compare::config::QuerySource;
use sql_data_compare::{CompareError, Config, Orchestrator, RunSummary, Side, SpecStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit status when any comparison differs or fails.
const EXIT_DIFFERS: u8 = 1;

#[derive(Parser)]
#[command(name = "sql-data-compare")]
#[command(about = "Compare query results across database engines")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured comparisons
    Run {
        /// Only run the named comparison (repeatable)
        #[arg(long, value_name = "NAME")]
        only: Vec<String>,
    },

    /// Validate the configuration file without connecting
    CheckConfig,

    /// List the configured comparisons
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CompareError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| CompareError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run { only } => {
            let cancel_token = setup_signal_handler()?;
            let orchestrator = Orchestrator::new(config).with_only(only);
            let summary = orchestrator.run(cancel_token).await?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                print_summary(&summary);
            }

            Ok(match summary.status.as_str() {
                "matched" => ExitCode::SUCCESS,
                "cancelled" => ExitCode::from(CompareError::Cancelled.exit_code()),
                _ => ExitCode::from(EXIT_DIFFERS),
            })
        }

        Commands::CheckConfig => {
            if cli.output_json {
                let report = serde_json::json!({
                    "valid": true,
                    "config_hash": config.hash(),
                    "connections": config.connections.keys().collect::<Vec<_>>(),
                    "comparisons": config.compare_list.len(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Configuration OK: {}", cli.config.display());
                println!("  Connections: {}", config.connections.len());
                for (name, conn) in &config.connections {
                    println!("    {}: {}", name, conn);
                }
                println!("  Comparisons: {}", config.compare_list.len());
                println!("  Config hash: {}", config.hash());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::List => {
            if cli.output_json {
                let names: Vec<&str> = config.compare_list.iter().map(|s| s.name.as_str()).collect();
                println!("{}", serde_json::to_string_pretty(&names)?);
                return Ok(ExitCode::SUCCESS);
            }

            for spec in &config.compare_list {
                println!("{}", spec.name);
                for side in [Side::Left, Side::Right] {
                    let db_type = config.db_type_for(spec, side)?;
                    let source = match spec.query_source(side)? {
                        QuerySource::Inline(_) => "inline query".to_string(),
                        QuerySource::File(path) => format!("file {}", path.display()),
                    };
                    println!(
                        "  {:<5} {} ({}), {}",
                        side.as_str(),
                        spec.connection_name(side),
                        db_type,
                        source
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\nComparison run {}", summary.status);
    println!("  Run ID: {}", summary.run_id);
    println!("  Duration: {:.2}s", summary.duration_seconds);
    println!(
        "  Comparisons: {} matched, {} differ, {} failed",
        summary.specs_matched, summary.specs_differ, summary.specs_failed
    );

    for spec in &summary.specs {
        let mark = match spec.status {
            SpecStatus::Matched => "✓ Matched",
            SpecStatus::Differs => "✗ Differs",
            SpecStatus::Failed => "✗ Failed",
        };
        match (&spec.counts, &spec.error) {
            (Some(counts), _) => println!(
                "  {} {} (left: {}, right: {}, left only: {}, right only: {}, common: {})",
                mark,
                spec.name,
                counts.left_count,
                counts.right_count,
                counts.left_only,
                counts.right_only,
                counts.common
            ),
            (None, Some(err)) => println!("  {} {}: {}", mark, spec.name, err),
            (None, None) => println!("  {} {}", mark, spec.name),
        }
        if let Some(ref perf) = spec.performance {
            println!("      {}", perf);
        }
        if let Some(ref path) = spec.output_path {
            println!("      Output saved to: {}", path.display());
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so --output-json leaves stdout parseable
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, CompareError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let token = cancel_token.clone();

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        eprintln!("\nReceived {}. Cancelling comparison run...", name);
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, CompareError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
