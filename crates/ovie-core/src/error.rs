use crate::diagnostics::DiagnosticSet;
use crate::stage::Stage;
use std::path::PathBuf;
use std::result;
use thiserror::Error;

/// The stable four-value exit-code contract consumed by automation wrapping
/// the compiler.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const SOURCE_ERROR: i32 = 1;
    pub const INVARIANT_VIOLATION: i32 = 2;
    pub const ENVIRONMENT_ERROR: i32 = 3;
}

/// A problem in user input. Recoverable at the granularity of one compilation
/// unit: the unit stops, its diagnostics are reported, unrelated units keep
/// going.
#[derive(Debug, Clone, Error)]
#[error("compilation of `{unit}` failed with {} error(s)", diagnostics.error_count())]
pub struct SourceError {
    pub unit: String,
    pub diagnostics: DiagnosticSet,
}

impl SourceError {
    pub fn new(unit: impl Into<String>, diagnostics: DiagnosticSet) -> Self {
        Self {
            unit: unit.into(),
            diagnostics,
        }
    }
}

/// A structural defect in the compiler itself, caught at a stage boundary.
/// Never user-facing beyond a bug-report dump; fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal invariant {rule_id} violated at {detected_at} ({stage}): {offending_node}")]
pub struct InvariantViolation {
    pub stage: Stage,
    pub rule_id: &'static str,
    pub offending_node: String,
    /// The validator checkpoint that caught the defect.
    pub detected_at: &'static str,
}

impl InvariantViolation {
    pub fn new(
        stage: Stage,
        rule_id: &'static str,
        offending_node: impl Into<String>,
        detected_at: &'static str,
    ) -> Self {
        Self {
            stage,
            rule_id,
            offending_node: offending_node.into(),
            detected_at,
        }
    }

    /// Render the bug-report template shown on exit code 2. Deliberately not
    /// "fix your code" guidance: the user's program is not at fault.
    pub fn bug_report(&self) -> String {
        format!(
            "internal compiler error: invariant violation\n\
             \x20 stage:    {}\n\
             \x20 rule:     {}\n\
             \x20 detected: {}\n\
             \x20 node:     {}\n\
             This is a bug in the Ovie compiler, not in your program.\n\
             Please file a bug report and attach this dump.",
            self.stage, self.rule_id, self.detected_at, self.offending_node
        )
    }
}

/// The installation the process runs from is broken or absent. Fatal before
/// any compilation starts.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error(
        "no runtime environment root could be located \
         (checked OVIE_HOME, ./.ovie, the executable directory, and system install locations)"
    )]
    NotFound,

    #[error("runtime environment at {root} is missing required subpath `{subpath}`")]
    MissingSubpath { root: PathBuf, subpath: &'static str },

    #[error("runtime environment subpath {path} is not readable")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed target descriptor {path}: {message}")]
    MalformedTarget { path: PathBuf, message: String },
}

/// Closed error taxonomy for the subsystem. A `BootstrapMismatch` is not here:
/// it is a result conveyed through `VerificationReport.reproducible`, never an
/// error value.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input tree: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Map onto the exit-code contract. I/O and deserialization failures while
    /// ingesting trees are user-input problems, so they share exit code 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Source(_) | Error::Io(_) | Error::Serde(_) => exit::SOURCE_ERROR,
            Error::Invariant(_) => exit::INVARIANT_VIOLATION,
            Error::Environment(_) => exit::ENVIRONMENT_ERROR,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;

    #[test]
    fn exit_codes_do_not_overlap() {
        let mut diagnostics = DiagnosticSet::new();
        diagnostics.push(Diagnostic::error("E_NAME_001", "unknown name"));
        let source: Error = SourceError::new("main.ov", diagnostics).into();
        let invariant: Error =
            InvariantViolation::new(Stage::Mir, "MIR_NO_TERMINATOR", "bb0", "validate::mir").into();
        let environment: Error = EnvironmentError::NotFound.into();

        assert_eq!(source.exit_code(), 1);
        assert_eq!(invariant.exit_code(), 2);
        assert_eq!(environment.exit_code(), 3);
    }

    #[test]
    fn bug_report_names_stage_and_rule() {
        let violation = InvariantViolation::new(
            Stage::Hir,
            "HIR_UNRESOLVED_REF",
            "reference `frobnicate` in fn main",
            "validate::hir",
        );
        let report = violation.bug_report();
        assert!(report.contains("HIR_UNRESOLVED_REF"));
        assert!(report.contains("HIR"));
        assert!(report.contains("file a bug report"));
        assert!(!report.to_lowercase().contains("fix your code"));
    }
}
