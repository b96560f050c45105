//! Selfcheck command: runtime environment validation as its own command.
//! Prints a pass/fail line per required subpath and never compiles anything.

use crate::{cli::CliConfig, Result};
use clap::Args;
use console::style;
use ovie_core::error::exit;
use ovie_ore::{self_check, DiscoverySources, SelfCheckReport};
use std::path::PathBuf;

/// Arguments for the selfcheck command
#[derive(Debug, Clone, Args)]
pub struct SelfcheckArgs {
    /// Check this root instead of running discovery
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Execute the selfcheck command
pub async fn selfcheck_command(args: SelfcheckArgs, _config: &CliConfig) -> Result<i32> {
    let mut sources = DiscoverySources::from_process();
    if args.root.is_some() {
        sources.env_root = args.root.clone();
    }
    Ok(run_selfcheck(&sources))
}

pub fn run_selfcheck(sources: &DiscoverySources) -> i32 {
    let report = match self_check(sources) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{} {}", style("✗").red(), err);
            return exit::ENVIRONMENT_ERROR;
        }
    };

    print_report(&report);
    if report.passed() {
        exit::SUCCESS
    } else {
        exit::ENVIRONMENT_ERROR
    }
}

fn print_report(report: &SelfCheckReport) {
    println!("runtime environment: {}", report.root.display());
    for entry in &report.entries {
        if entry.ok {
            println!("  {} {:8} {}", style("✓").green(), entry.name, entry.path.display());
        } else {
            let detail = entry.detail.as_deref().unwrap_or("failed");
            println!(
                "  {} {:8} {} ({})",
                style("✗").red(),
                entry.name,
                entry.path.display(),
                detail
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovie_ore::REQUIRED_SUBDIRS;
    use tempfile::TempDir;

    #[test]
    fn complete_install_passes() {
        let dir = TempDir::new().expect("tempdir");
        for subdir in REQUIRED_SUBDIRS {
            std::fs::create_dir_all(dir.path().join(subdir)).expect("create subdir");
        }
        let sources = DiscoverySources {
            env_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(run_selfcheck(&sources), exit::SUCCESS);
    }

    #[test]
    fn missing_subpath_exits_with_the_environment_code() {
        let dir = TempDir::new().expect("tempdir");
        for subdir in &["bin", "aproko", "targets", "config", "logs"] {
            std::fs::create_dir_all(dir.path().join(subdir)).expect("create subdir");
        }
        let sources = DiscoverySources {
            env_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(run_selfcheck(&sources), exit::ENVIRONMENT_ERROR);
    }

    #[test]
    fn no_environment_at_all_exits_with_the_environment_code() {
        assert_eq!(
            run_selfcheck(&DiscoverySources::default()),
            exit::ENVIRONMENT_ERROR
        );
    }
}
