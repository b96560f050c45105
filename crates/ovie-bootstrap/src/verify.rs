//! The three-generation verification drive.

use crate::error::BootstrapError;
use crate::hash::hash_artifact;
use crate::invoke::{run, InvokeSpec};
use crate::report::{
    BootstrapGeneration, EnvironmentFingerprint, GenerationLabel, VerificationReport,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Drives `verify_bootstrap`. One verifier per run directory; generation
/// binaries land under `work_dir` and are left on disk for inspection.
pub struct BootstrapVerifier {
    work_dir: PathBuf,
    timeout: Duration,
    log_path: Option<PathBuf>,
    compiler_version: String,
}

impl BootstrapVerifier {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout: DEFAULT_TIMEOUT,
            log_path: None,
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append every report to this audit log (normally `logs/bootstrap.jsonl`
    /// under the runtime environment).
    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn with_compiler_version(mut self, version: impl Into<String>) -> Self {
        self.compiler_version = version.into();
        self
    }

    /// Compile the compiler with itself, twice, and compare the results.
    ///
    /// Invocation failures abort with an error; a hash mismatch does not — it
    /// comes back as `reproducible == false` and the caller decides whether
    /// to block on it.
    pub async fn verify_bootstrap(
        &self,
        source_tree: &Path,
        bootstrap_binary: &Path,
    ) -> Result<VerificationReport, BootstrapError> {
        std::fs::create_dir_all(&self.work_dir)?;

        // Gen0 is trusted input: hashed for the audit trail only, never part
        // of the equality check.
        let gen0 = BootstrapGeneration {
            label: GenerationLabel::Gen0,
            binary_path: bootstrap_binary.to_path_buf(),
            content_hash: hash_artifact(bootstrap_binary)?,
        };

        let gen1_path = self.work_dir.join("ovie-gen1");
        self.compile_self(bootstrap_binary, source_tree, &gen1_path)
            .await?;
        let gen1 = BootstrapGeneration {
            label: GenerationLabel::Gen1,
            binary_path: gen1_path.clone(),
            content_hash: hash_artifact(&gen1_path)?,
        };
        info!(hash = %gen1.content_hash, "gen1 produced");

        let gen2_path = self.work_dir.join("ovie-gen2");
        self.compile_self(&gen1_path, source_tree, &gen2_path).await?;
        let gen2 = BootstrapGeneration {
            label: GenerationLabel::Gen2,
            content_hash: hash_artifact(&gen2_path)?,
            binary_path: gen2_path,
        };
        info!(hash = %gen2.content_hash, "gen2 produced");

        let reproducible = gen1.content_hash == gen2.content_hash;
        if !reproducible {
            warn!(
                gen1 = %gen1.content_hash,
                gen2 = %gen2.content_hash,
                "bootstrap hashes differ"
            );
        }

        let report = VerificationReport {
            reproducible,
            reproducibility_hashes: vec![
                (GenerationLabel::Gen1, gen1.content_hash.clone()),
                (GenerationLabel::Gen2, gen2.content_hash.clone()),
            ],
            generations: vec![gen0, gen1, gen2],
            timestamp: Utc::now(),
            environment_hash: EnvironmentFingerprint::current(&self.compiler_version).hash(),
        };

        if let Some(log_path) = &self.log_path {
            report.append_to_log(log_path)?;
        }

        Ok(report)
    }

    /// One self-compile step: `<compiler> build-self <source-tree> --output
    /// <artifact>`. The contract the external compile-self operation must
    /// honor.
    async fn compile_self(
        &self,
        compiler: &Path,
        source_tree: &Path,
        output: &Path,
    ) -> Result<(), BootstrapError> {
        let spec = InvokeSpec {
            program: compiler.to_path_buf(),
            args: vec![
                "build-self".to_string(),
                source_tree.display().to_string(),
                "--output".to_string(),
                output.display().to_string(),
            ],
            cwd: self.work_dir.clone(),
            timeout: self.timeout,
        };

        let result = run(&spec).await?;
        if !result.success {
            return Err(BootstrapError::CompileFailed {
                program: compiler.display().to_string(),
                code: result.exit_code,
                stderr: result.stderr,
            });
        }
        if !output.is_file() {
            return Err(BootstrapError::MissingArtifact {
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}
