//! Compile command: ingest stage-tagged trees, run the full
//! validate→lower→validate pipeline per unit, units in parallel.

use crate::diagnostics::render_violation;
use crate::{cli::CliConfig, Result};
use clap::Args;
use console::style;
use ovie_core::backend::AbiDescriptor;
use ovie_core::diagnostics::DiagnosticDisplayOptions;
use ovie_core::error::exit;
use ovie_core::{Error, StageTree};
use ovie_pipeline::{standard_pipeline, UnitDiagnostics, ValidationContext};
use std::path::PathBuf;
use tracing::info;

/// Arguments for the compile command
#[derive(Debug, Clone, Args)]
pub struct CompileArgs {
    /// Stage-tagged input trees (JSON), one compilation unit each
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Target triple (defaults to the config, then the first installed target)
    #[arg(long)]
    pub target: Option<String>,

    /// Validate and lower without writing artifacts
    #[arg(long)]
    pub no_emit: bool,

    /// Directory for emitted artifacts (defaults next to each input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Execute the compile command
pub async fn compile_command(args: CompileArgs, config: &CliConfig) -> Result<i32> {
    let env = match ovie_ore::resolve() {
        Ok(env) => env,
        Err(err) => {
            eprintln!("{} {}", style("✗").red(), err);
            return Ok(exit::ENVIRONMENT_ERROR);
        }
    };
    let targets = match ovie_ore::installed_targets(&env) {
        Ok(targets) => targets,
        Err(err) => {
            eprintln!("{} {}", style("✗").red(), err);
            return Ok(exit::ENVIRONMENT_ERROR);
        }
    };

    let requested = args
        .target
        .as_deref()
        .or(config.compilation.default_target.as_deref());
    let Some(abi) = select_target(&targets, requested) else {
        eprintln!(
            "{} no usable target: {} (installed: {})",
            style("✗").red(),
            requested.unwrap_or("none requested"),
            targets
                .iter()
                .map(|target| target.target_triple.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        return Ok(exit::SOURCE_ERROR);
    };

    info!(target = %abi.target_triple, units = args.inputs.len(), "starting compilation");

    let emit = EmitOptions {
        enabled: !args.no_emit,
        output_dir: args.output_dir.clone(),
    };
    let display = DiagnosticDisplayOptions::pretty(config.compilation.verbose_diagnostics);
    let summary = run_units(
        ValidationContext::with_targets(targets),
        abi,
        args.inputs.clone(),
        emit,
        display,
    )
    .await;

    if summary.exit_code == exit::SUCCESS {
        println!(
            "{} Compiled {} unit(s) successfully",
            style("✓").green(),
            summary.succeeded.len()
        );
    } else if !summary.failed.is_empty() {
        eprintln!(
            "{} {} of {} unit(s) failed",
            style("✗").red(),
            summary.failed.len(),
            summary.failed.len() + summary.succeeded.len()
        );
    }
    Ok(summary.exit_code)
}

/// Pick the ABI to emit for. An explicit request must name an installed
/// target; otherwise the first installed target wins.
pub fn select_target(targets: &[AbiDescriptor], requested: Option<&str>) -> Option<AbiDescriptor> {
    match requested {
        Some(triple) => targets
            .iter()
            .find(|target| target.target_triple == triple)
            .cloned(),
        None => targets.first().cloned(),
    }
}

#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub enabled: bool,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct BatchSummary {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub exit_code: i32,
}

/// Drive a batch of units through the pipeline, one worker per unit. Each
/// unit's tree is exclusively owned by its worker; an error in one unit never
/// halts its siblings. The exit code is the worst outcome observed: any
/// invariant violation dominates, then source errors, then success.
pub async fn run_units(
    ctx: ValidationContext,
    abi: AbiDescriptor,
    inputs: Vec<PathBuf>,
    emit: EmitOptions,
    display: DiagnosticDisplayOptions,
) -> BatchSummary {
    let mut handles = Vec::new();
    for input in inputs {
        let ctx = ctx.clone();
        let abi = abi.clone();
        let emit = emit.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            process_unit(input, ctx, abi, emit)
        }));
    }

    let mut summary = BatchSummary {
        succeeded: Vec::new(),
        failed: Vec::new(),
        exit_code: exit::SUCCESS,
    };
    let mut first_violation = None;

    for handle in handles {
        let Ok((input, diagnostics, outcome)) = handle.await else {
            continue;
        };
        diagnostics.emit(&display);
        match outcome {
            Ok(()) => summary.succeeded.push(input),
            Err(Error::Invariant(violation)) => {
                summary.failed.push(input);
                first_violation.get_or_insert(violation);
            }
            Err(err) => {
                // Unit-level failure: already rendered through its
                // diagnostics, or a read/parse error worth naming.
                if !matches!(err, Error::Source(_)) {
                    eprintln!("{} {}", style("✗").red(), err);
                }
                summary.failed.push(input);
                if summary.exit_code == exit::SUCCESS {
                    summary.exit_code = err.exit_code();
                }
            }
        }
    }

    if let Some(violation) = first_violation {
        render_violation(&violation);
        summary.exit_code = exit::INVARIANT_VIOLATION;
    }
    summary
}

fn process_unit(
    input: PathBuf,
    ctx: ValidationContext,
    abi: AbiDescriptor,
    emit: EmitOptions,
) -> (PathBuf, UnitDiagnostics, std::result::Result<(), Error>) {
    let unit_name = input.display().to_string();
    let mut diagnostics = UnitDiagnostics::new(&unit_name);

    let outcome = (|| {
        let raw = std::fs::read_to_string(&input)?;
        let tree: StageTree = serde_json::from_str(&raw)?;

        let pipeline = standard_pipeline(ctx, abi);
        let validated = pipeline.run(tree, &mut diagnostics)?;

        if emit.enabled {
            let output = match &emit.output_dir {
                Some(dir) => {
                    let stem = input
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().to_string())
                        .unwrap_or_else(|| "unit".to_string());
                    dir.join(format!("{}.art.json", stem))
                }
                None => input.with_extension("art.json"),
            };
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let rendered = serde_json::to_string_pretty(validated.get())?;
            std::fs::write(&output, rendered)?;
            info!(unit = %unit_name, artifact = %output.display(), "artifact written");
        }
        Ok(())
    })();

    (input, diagnostics, outcome)
}
