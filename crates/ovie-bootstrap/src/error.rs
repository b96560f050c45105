use ovie_core::diagnostics::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// A failure of the bootstrap *process*, not of the compiler under test.
///
/// These are tooling failures: they abort verification and surface through
/// the normal diagnostic channel. They are never invariant violations — the
/// compiler itself may be perfectly fine. A hash mismatch with both compile
/// steps green is not an error at all; it is `VerificationReport
/// { reproducible: false, .. }`.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with status {code}:\n{stderr}")]
    CompileFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("`{program}` exceeded the {timeout_secs}s timeout and was killed")]
    Timeout { program: String, timeout_secs: u64 },

    #[error("compile step reported success but produced no artifact at {path}")]
    MissingArtifact { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not record verification report: {0}")]
    Record(#[from] serde_json::Error),
}

impl BootstrapError {
    /// Render as a user-facing diagnostic for the CLI's reporting channel.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            BootstrapError::Spawn { .. } => "E_BOOT_001",
            BootstrapError::CompileFailed { .. } => "E_BOOT_002",
            BootstrapError::Timeout { .. } => "E_BOOT_003",
            BootstrapError::MissingArtifact { .. } => "E_BOOT_004",
            BootstrapError::Io(_) => "E_BOOT_005",
            BootstrapError::Record(_) => "E_BOOT_006",
        };
        Diagnostic::error(code, self.to_string()).with_explanation(
            "the bootstrap process failed before any hashes could be compared; \
             this is a tooling failure, not evidence of non-reproducibility",
        )
    }
}
