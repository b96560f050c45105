//! Verify-bootstrap command: the release/CI entry point for the
//! three-generation reproducibility proof.

use crate::{cli::CliConfig, Result};
use clap::Args;
use console::style;
use ovie_core::diagnostics::{emit, DiagnosticDisplayOptions, DiagnosticSet};
use ovie_core::error::exit;
use ovie_bootstrap::BootstrapVerifier;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Arguments for the verify-bootstrap command
#[derive(Debug, Clone, Args)]
pub struct VerifyBootstrapArgs {
    /// The compiler's own source tree
    pub source_tree: PathBuf,

    /// Trusted Gen0 bootstrap binary
    pub bootstrap_binary: PathBuf,

    /// Exit non-zero when the result is not reproducible
    #[arg(long)]
    pub strict: bool,

    /// Per-compile-step timeout in seconds (overrides the config)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Where generation binaries are written (defaults under the runtime
    /// environment's logs directory)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
}

/// Execute the verify-bootstrap command
pub async fn verify_bootstrap_command(
    args: VerifyBootstrapArgs,
    config: &CliConfig,
) -> Result<i32> {
    let env = match ovie_ore::resolve() {
        Ok(env) => env,
        Err(err) => {
            eprintln!("{} {}", style("✗").red(), err);
            return Ok(exit::ENVIRONMENT_ERROR);
        }
    };

    let work_dir = args
        .work_dir
        .clone()
        .unwrap_or_else(|| env.logs.join("bootstrap-work"));
    let timeout_secs = args.timeout_secs.unwrap_or(config.bootstrap.timeout_secs);
    let strict = args.strict || config.bootstrap.strict;

    let verifier = BootstrapVerifier::new(work_dir)
        .with_timeout(Duration::from_secs(timeout_secs))
        .with_audit_log(env.logs.join("bootstrap.jsonl"))
        .with_compiler_version(env!("CARGO_PKG_VERSION"));

    info!(
        source = %args.source_tree.display(),
        bootstrap = %args.bootstrap_binary.display(),
        "starting bootstrap verification"
    );

    match verifier
        .verify_bootstrap(&args.source_tree, &args.bootstrap_binary)
        .await
    {
        Ok(report) => {
            println!("{}", report);
            if report.reproducible {
                println!("{} bootstrap is reproducible", style("✓").green());
                Ok(exit::SUCCESS)
            } else if strict {
                eprintln!("{} bootstrap is NOT reproducible", style("✗").red());
                Ok(exit::SOURCE_ERROR)
            } else {
                // Soft result: reported and logged; the caller decides whether
                // to block on it.
                println!(
                    "{} bootstrap is NOT reproducible (non-strict mode)",
                    style("⚠").yellow()
                );
                Ok(exit::SUCCESS)
            }
        }
        Err(err) => {
            // Tooling failure: the bootstrap process broke before any hashes
            // could be compared. Reported through the diagnostic channel.
            let mut diagnostics = DiagnosticSet::new();
            diagnostics.push(err.to_diagnostic());
            emit(
                &diagnostics,
                Some("verify-bootstrap"),
                &DiagnosticDisplayOptions::default(),
            );
            Ok(exit::SOURCE_ERROR)
        }
    }
}
