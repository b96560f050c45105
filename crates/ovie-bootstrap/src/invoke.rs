//! Scoped external process invocation.
//!
//! Both compile steps of a verification run must see identical inputs, so the
//! child environment is scrubbed and pinned rather than inherited. The child
//! is spawned with `kill_on_drop`: on timeout the in-flight future is dropped,
//! the process is killed, and its partial output is discarded on every exit
//! path without manual handle bookkeeping.

use crate::error::BootstrapError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct InvokeSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct InvokeOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub success: bool,
}

/// The fixed environment both compile invocations run under. Locale, timezone
/// and embedded-timestamp behavior are pinned here — determinism is achieved
/// by normalizing inputs, not by special-casing the hash comparison.
fn deterministic_env() -> [(&'static str, &'static str); 4] {
    [
        ("PATH", "/usr/local/bin:/usr/bin:/bin"),
        ("LC_ALL", "C"),
        ("TZ", "UTC"),
        ("SOURCE_DATE_EPOCH", "0"),
    ]
}

pub async fn run(spec: &InvokeSpec) -> Result<InvokeOutput, BootstrapError> {
    let program = spec.program.display().to_string();

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .env_clear()
        .envs(deterministic_env())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let child = command.spawn().map_err(|source| BootstrapError::Spawn {
        program: program.clone(),
        source,
    })?;

    let output = match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            // Dropping the future killed the child; nothing it produced is
            // kept.
            return Err(BootstrapError::Timeout {
                program,
                timeout_secs: spec.timeout.as_secs(),
            });
        }
    };

    let duration = start.elapsed();
    let exit_code = output.status.code().unwrap_or(-1);
    debug!(%program, exit_code, ?duration, "external invocation finished");

    Ok(InvokeOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration,
        success: output.status.success(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn spec(program: &str, args: &[&str], timeout: Duration, cwd: &TempDir) -> InvokeSpec {
        InvokeSpec {
            program: PathBuf::from(program),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            cwd: cwd.path().to_path_buf(),
            timeout,
        }
    }

    #[tokio::test]
    async fn captures_output_of_a_successful_command() {
        let dir = TempDir::new().expect("tempdir");
        let output = run(&spec("echo", &["hello"], Duration::from_secs(10), &dir))
            .await
            .expect("echo runs");
        assert!(output.success);
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_hidden() {
        let dir = TempDir::new().expect("tempdir");
        let output = run(&spec("false", &[], Duration::from_secs(10), &dir))
            .await
            .expect("false runs");
        assert!(!output.success);
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn overrunning_child_is_killed_and_reported_as_timeout() {
        let dir = TempDir::new().expect("tempdir");
        let err = run(&spec("sleep", &["30"], Duration::from_millis(200), &dir))
            .await
            .expect_err("sleep must time out");
        assert!(matches!(err, BootstrapError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = run(&spec(
            "/nonexistent/ovie-bootstrap-compiler",
            &[],
            Duration::from_secs(1),
            &dir,
        ))
        .await
        .expect_err("spawn must fail");
        assert!(matches!(err, BootstrapError::Spawn { .. }));
    }
}
