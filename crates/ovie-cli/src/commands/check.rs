//! Check command: validate stage-tagged trees without lowering or emission.

use crate::diagnostics::render_violation;
use crate::{cli::CliConfig, Result};
use clap::Args;
use console::style;
use ovie_core::error::exit;
use ovie_core::{Stage, StageTree};
use ovie_pipeline::{validate, validate_as, ValidationContext};
use std::path::PathBuf;

/// Arguments for the check command
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Stage-tagged trees (JSON) to validate
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Require every tree to carry this stage tag (ast, hir, mir, backend)
    #[arg(long)]
    pub stage: Option<Stage>,
}

/// Execute the check command
pub async fn check_command(args: CheckArgs, _config: &CliConfig) -> Result<i32> {
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

    Ok(check_trees(
        &ValidationContext::with_targets(targets),
        &args.inputs,
        args.stage,
    ))
}

/// Validate each tree against the validator for its tag (or the required
/// tag). A malformed tree is an internal invariant violation, exit 2; a file
/// that cannot be read or parsed is a user-input problem, exit 1.
pub fn check_trees(ctx: &ValidationContext, inputs: &[PathBuf], stage: Option<Stage>) -> i32 {
    let mut exit_code = exit::SUCCESS;

    for input in inputs {
        let tree: StageTree = match std::fs::read_to_string(input)
            .map_err(|err| err.to_string())
            .and_then(|raw| serde_json::from_str(&raw).map_err(|err| err.to_string()))
        {
            Ok(tree) => tree,
            Err(err) => {
                eprintln!("{} {}: {}", style("✗").red(), input.display(), err);
                if exit_code == exit::SUCCESS {
                    exit_code = exit::SOURCE_ERROR;
                }
                continue;
            }
        };

        let verdict = match stage {
            Some(expected) => validate_as(&tree, expected, ctx),
            None => validate(&tree, ctx),
        };
        match verdict {
            Ok(()) => println!(
                "{} {} ({})",
                style("✓").green(),
                input.display(),
                tree.stage()
            ),
            Err(violation) => {
                render_violation(&violation);
                return exit::INVARIANT_VIOLATION;
            }
        }
    }

    exit_code
}
