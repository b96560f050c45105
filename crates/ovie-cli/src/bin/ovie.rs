//! Ovie CLI Binary
//!
//! Top-level driver for the Ovie compilation-pipeline integrity subsystem.
//! Every terminal outcome maps to exactly one of four exit codes:
//!
//! ```text
//! 0  compilation and all requested verifications succeeded
//! 1  source errors: the user's input is at fault
//! 2  invariant violation: a compiler defect, reported as a bug dump
//! 3  the runtime environment failed to resolve or validate
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Compile stage-tagged trees handed over by the frontend
//! ovie compile unit.ast.json --target x86_64-unknown-linux-gnu
//!
//! # Validate a tree against its stage's invariants, nothing more
//! ovie check unit.mir.json --stage mir
//!
//! # Validate the installation without compiling anything
//! ovie selfcheck
//!
//! # Prove the compiler rebuilds itself bit-for-bit
//! ovie verify-bootstrap ./src ./bin/ovie-gen0 --strict
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use ovie_cli::{
    cli::CliConfig,
    commands::{
        self, CheckArgs, CompileArgs, SelfcheckArgs, VerifyBootstrapArgs,
    },
    diagnostics::setup_error_reporting,
    Result,
};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(
    name = "ovie",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ovie: staged compilation pipeline with bootstrap verification",
    long_about = r#"
The Ovie driver validates every intermediate representation at its stage
boundary, proves the compiler can rebuild itself reproducibly, and reports
all failures through one structured diagnostic model with a fixed four-value
exit-code contract.

EXAMPLES:
    ovie compile unit.ast.json            # Lower a frontend tree to an artifact
    ovie check unit.mir.json --stage mir  # Validate one stage's invariants
    ovie selfcheck                        # Validate the installation layout
    ovie verify-bootstrap src gen0        # Prove bit-for-bit reproducibility
    "#
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Set log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile stage-tagged trees to backend artifacts
    Compile(CompileArgs),

    /// Validate stage-tagged trees without lowering
    Check(CheckArgs),

    /// Validate the runtime environment, never compiling anything
    Selfcheck(SelfcheckArgs),

    /// Prove the compiler reproduces itself across generations
    VerifyBootstrap(VerifyBootstrapArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ovie_core::error::exit::SOURCE_ERROR
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    // Set up error reporting
    setup_error_reporting()?;

    // Configure logging
    setup_logging(cli.verbose, cli.quiet, cli.log, cli.log_format)?;

    // Change working directory if specified
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir).map_err(ovie_cli::CliError::Io)?;
    }

    // Load configuration
    let config = CliConfig::load(cli.config.as_deref())?;

    // Execute command; each returns its exit code per the four-value contract.
    match cli.command {
        Commands::Compile(args) => commands::compile_command(args, &config).await,
        Commands::Check(args) => commands::check_command(args, &config).await,
        Commands::Selfcheck(args) => commands::selfcheck_command(args, &config).await,
        Commands::VerifyBootstrap(args) => {
            commands::verify_bootstrap_command(args, &config).await
        }
    }
}

fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_level: Option<LogLevel>,
    log_format: LogFormat,
) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    match log_format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(formatter)
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(formatter.json())
                .with(filter)
                .init();
        }
    }

    Ok(())
}
