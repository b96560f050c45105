//! Verification reports and the audit trail.

use crate::error::BootstrapError;
use crate::hash::digest_bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationLabel {
    Gen0,
    Gen1,
    Gen2,
}

impl Display for GenerationLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationLabel::Gen0 => f.write_str("gen0"),
            GenerationLabel::Gen1 => f.write_str("gen1"),
            GenerationLabel::Gen2 => f.write_str("gen2"),
        }
    }
}

/// One compiler generation in a verification run. Created fresh per run and
/// discarded with the report; only the on-disk binaries outlive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapGeneration {
    pub label: GenerationLabel,
    pub binary_path: PathBuf,
    pub content_hash: String,
}

/// The toolchain/platform fingerprint a report was produced under. Reports
/// are only comparable across equivalent environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFingerprint {
    pub os: String,
    pub arch: String,
    pub compiler_version: String,
}

impl EnvironmentFingerprint {
    pub fn current(compiler_version: impl Into<String>) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            compiler_version: compiler_version.into(),
        }
    }

    pub fn hash(&self) -> String {
        let canonical = format!(
            "os={};arch={};compiler={}",
            self.os, self.arch, self.compiler_version
        );
        digest_bytes(canonical.as_bytes())
    }
}

/// Immutable outcome of one `verify_bootstrap` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub reproducible: bool,
    /// Hashes entering the equality check, in generation order. Gen0 is
    /// deliberately absent — its hash is not comparable to the others.
    pub reproducibility_hashes: Vec<(GenerationLabel, String)>,
    /// Every generation observed during the run, Gen0 included, for audit.
    pub generations: Vec<BootstrapGeneration>,
    pub timestamp: DateTime<Utc>,
    pub environment_hash: String,
}

impl VerificationReport {
    /// Append as one JSON line to the audit log.
    pub fn append_to_log(&self, path: &Path) -> Result<(), BootstrapError> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let line = serde_json::to_string(self)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl Display for VerificationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "bootstrap verification: {}",
            if self.reproducible {
                "reproducible"
            } else {
                "NOT reproducible"
            }
        )?;
        for (label, hash) in &self.reproducibility_hashes {
            writeln!(f, "  {}: {}", label, hash)?;
        }
        writeln!(f, "  environment: {}", self.environment_hash)?;
        write!(f, "  recorded at: {}", self.timestamp.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report(reproducible: bool) -> VerificationReport {
        VerificationReport {
            reproducible,
            reproducibility_hashes: vec![
                (GenerationLabel::Gen1, "aa".repeat(32)),
                (GenerationLabel::Gen2, "aa".repeat(32)),
            ],
            generations: Vec::new(),
            timestamp: Utc::now(),
            environment_hash: "bb".repeat(32),
        }
    }

    #[test]
    fn fingerprint_hash_is_stable_per_environment() {
        let first = EnvironmentFingerprint::current("0.1.0");
        let second = EnvironmentFingerprint::current("0.1.0");
        assert_eq!(first.hash(), second.hash());

        let other = EnvironmentFingerprint::current("0.2.0");
        assert_ne!(first.hash(), other.hash());
    }

    #[test]
    fn audit_log_accumulates_json_lines() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("bootstrap.jsonl");

        report(true).append_to_log(&log).expect("append");
        report(false).append_to_log(&log).expect("append");

        let contents = std::fs::read_to_string(&log).expect("read log");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: VerificationReport = serde_json::from_str(lines[1]).expect("parse line");
        assert!(!parsed.reproducible);
    }

    #[test]
    fn display_marks_non_reproducible_runs() {
        let rendered = report(false).to_string();
        assert!(rendered.contains("NOT reproducible"));
        assert!(rendered.contains("gen1"));
    }
}
