//! mysql-remap CLI - mapping-driven batch row transfer between MySQL databases.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use mysql_remap::engine::sql;
use mysql_remap::{
    CompiledMapping, Config, MysqlReader, MysqlWriter, SourcePort, TransferEngine, TransferError,
    TransformRegistry, SAMPLE_CONFIG,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "mysql-remap")]
#[command(about = "Mapping-driven batch row transfer between MySQL databases")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON results to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all configured transfers in order
    Run {
        /// Dry run: validate, connect, and show the plan without writing rows
        #[arg(long)]
        dry_run: bool,
    },

    /// Test database connections
    HealthCheck,

    /// Write a commented sample configuration file
    Init {
        /// Output path for configuration file [default: config.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite existing file without confirmation
        #[arg(long, short)]
        force: bool,
    },
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

async fn run() -> Result<ExitCode, TransferError> {
    let cli = Cli::parse();

    // Handle init separately (doesn't need existing config or logging)
    if let Commands::Init { output, force } = cli.command {
        let path = output.unwrap_or_else(|| PathBuf::from("config.yaml"));
        if path.exists() && !force {
            return Err(TransferError::config(format!(
                "{} already exists; pass --force to overwrite",
                path.display()
            )));
        }
        std::fs::write(&path, SAMPLE_CONFIG)?;
        println!("Wrote sample configuration to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    setup_logging(&cli.verbosity, &cli.log_format).map_err(TransferError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // SIGINT/SIGTERM stop the run at the next batch boundary
    let cancel_token = setup_signal_handler().await?;

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above

        Commands::Run { dry_run } => {
            let registry = TransformRegistry::default();
            let specs = config.resolve_transfers(&registry)?;

            if dry_run {
                let reader = MysqlReader::connect(&config.source).await?;
                let writer = MysqlWriter::connect(&config.destination).await?;

                println!("Dry run: connections verified, no rows will be written.\n");
                for spec in &specs {
                    let compiled = CompiledMapping::compile(spec)?;
                    let count_sql =
                        sql::build_count(&spec.source_table, spec.where_condition.as_deref());
                    let total = reader.count(&count_sql).await?;

                    println!(
                        "  {} ({} rows, batch size {})",
                        spec.label(),
                        total,
                        spec.batch_size
                    );
                    println!(
                        "    {}",
                        sql::build_select(
                            compiled.source_columns(),
                            &spec.source_table,
                            spec.where_condition.as_deref()
                        )
                    );
                    println!(
                        "    {}",
                        sql::build_insert(compiled.dest_columns(), &spec.dest_table)
                    );
                }

                writer.close().await;
                reader.close().await;
                return Ok(ExitCode::SUCCESS);
            }

            let reader = Arc::new(MysqlReader::connect(&config.source).await?);
            let writer = Arc::new(MysqlWriter::connect(&config.destination).await?);

            let mut engine = TransferEngine::new(reader.clone(), writer.clone())
                .with_cancellation(cancel_token);
            if cli.progress {
                engine = engine.with_progress(Arc::new(|transferred, total| {
                    let line = serde_json::json!({
                        "transferred": transferred,
                        "total": total,
                    });
                    eprintln!("{}", line);
                }));
            }

            let results = engine.run_all(&specs).await?;
            writer.close().await;
            reader.close().await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("\nTransfer run complete.");
                for result in &results {
                    let status = if result.succeeded { "✓" } else { "✗" };
                    println!("  {} {}", status, result.label());
                    println!(
                        "      {}/{} rows, {} batches, {:.2}s ({} rows/sec)",
                        result.transferred_records,
                        result.total_records,
                        result.batches_committed,
                        result.duration_seconds,
                        result.rows_per_second()
                    );
                    if let Some(ref error) = result.error {
                        println!("      error: {}", error);
                    }
                }
            }

            if results.iter().any(|r| !r.succeeded) {
                return Ok(ExitCode::from(2));
            }
        }

        Commands::HealthCheck => {
            let started = Instant::now();
            let (source_ok, source_err) = match MysqlReader::connect(&config.source).await {
                Ok(reader) => {
                    let probe = reader.test_connection().await;
                    reader.close().await;
                    match probe {
                        Ok(()) => (true, None),
                        Err(e) => (false, Some(e.to_string())),
                    }
                }
                Err(e) => (false, Some(e.to_string())),
            };
            let source_ms = started.elapsed().as_millis() as u64;

            let started = Instant::now();
            let (dest_ok, dest_err) = match MysqlWriter::connect(&config.destination).await {
                Ok(writer) => {
                    let probe = writer.test_connection().await;
                    writer.close().await;
                    match probe {
                        Ok(()) => (true, None),
                        Err(e) => (false, Some(e.to_string())),
                    }
                }
                Err(e) => (false, Some(e.to_string())),
            };
            let dest_ms = started.elapsed().as_millis() as u64;

            let healthy = source_ok && dest_ok;
            if cli.output_json {
                let report = serde_json::json!({
                    "source_connected": source_ok,
                    "source_latency_ms": source_ms,
                    "source_error": source_err,
                    "destination_connected": dest_ok,
                    "destination_latency_ms": dest_ms,
                    "destination_error": dest_err,
                    "healthy": healthy,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source: {} ({}ms)",
                    if source_ok { "OK" } else { "FAILED" },
                    source_ms
                );
                if let Some(ref err) = source_err {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Destination: {} ({}ms)",
                    if dest_ok { "OK" } else { "FAILED" },
                    dest_ms
                );
                if let Some(ref err) = dest_err {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !healthy {
                return Err(TransferError::config("Health check failed"));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM (Kubernetes/Airflow shutdown).
/// The engine checks the returned token between batches, so the batch in
/// flight commits before the process stops.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, TransferError> {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Stopping at the next batch boundary...");
        token_int.cancel();
    });

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Stopping at the next batch boundary...");
        token_term.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only SIGINT/Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, TransferError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl-C handler");
        eprintln!("\nReceived Ctrl-C. Stopping at the next batch boundary...");
        token.cancel();
    });

    Ok(cancel_token)
}
