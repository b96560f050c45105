//! Verification runs against small fake compilers that honor the
//! `build-self <source-tree> --output <artifact>` contract.

#![cfg(unix)]

use ovie_bootstrap::{BootstrapError, BootstrapVerifier, GenerationLabel};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_fake_compiler(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, script).expect("write script");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod");
    path
}

fn source_tree(dir: &Path) -> PathBuf {
    let tree = dir.join("src");
    fs::create_dir_all(&tree).expect("create source tree");
    fs::write(tree.join("main.ov"), "fn main() -> int { 0 }\n").expect("write source");
    tree
}

/// A compiler that reproduces itself exactly: the artifact is a byte-for-byte
/// copy of the compiler that built it.
const REPRODUCIBLE: &str = "#!/bin/sh\n\
# build-self <source-tree> --output <artifact>\n\
cp \"$0\" \"$4\"\n\
chmod +x \"$4\"\n";

/// Reproducible except for an embedded RFC 3339 build timestamp; only hash
/// normalization keeps the generations equal.
const TIMESTAMPED: &str = "#!/bin/sh\n\
sed \"s/^#BUILT:.*/#BUILT: $(date -u +%Y-%m-%dT%H:%M:%SZ)/\" \"$0\" > \"$4\"\n\
chmod +x \"$4\"\n\
#BUILT: 1970-01-01T00:00:00Z\n";

/// Genuinely non-deterministic: each artifact embeds the builder's pid.
const NONDETERMINISTIC: &str = "#!/bin/sh\n\
sed \"s/^#ID:.*/#ID: $$/\" \"$0\" > \"$4\"\n\
chmod +x \"$4\"\n\
#ID: 0\n";

const FAILING: &str = "#!/bin/sh\n\
echo 'internal assembler error' >&2\n\
exit 1\n";

const SILENT: &str = "#!/bin/sh\n\
exit 0\n";

#[tokio::test]
async fn reproducible_compiler_verifies_true_on_repeated_runs() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", REPRODUCIBLE);
    let tree = source_tree(dir.path());

    for run in 0..2 {
        let verifier = BootstrapVerifier::new(dir.path().join(format!("work{}", run)));
        let report = verifier
            .verify_bootstrap(&tree, &compiler)
            .await
            .expect("verification runs");

        assert!(report.reproducible, "run {} must be reproducible", run);
        assert_eq!(report.reproducibility_hashes.len(), 2);
        assert_eq!(report.reproducibility_hashes[0].0, GenerationLabel::Gen1);
        assert_eq!(report.reproducibility_hashes[1].0, GenerationLabel::Gen2);
        assert_eq!(
            report.reproducibility_hashes[0].1,
            report.reproducibility_hashes[1].1
        );
    }
}

#[tokio::test]
async fn gen0_is_recorded_for_audit_but_not_compared() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", REPRODUCIBLE);
    let tree = source_tree(dir.path());

    let report = BootstrapVerifier::new(dir.path().join("work"))
        .verify_bootstrap(&tree, &compiler)
        .await
        .expect("verification runs");

    let labels: Vec<_> = report
        .generations
        .iter()
        .map(|generation| generation.label)
        .collect();
    assert_eq!(
        labels,
        vec![
            GenerationLabel::Gen0,
            GenerationLabel::Gen1,
            GenerationLabel::Gen2
        ]
    );
    assert!(report
        .reproducibility_hashes
        .iter()
        .all(|(label, _)| *label != GenerationLabel::Gen0));
}

#[tokio::test]
async fn embedded_build_timestamp_is_normalized_away() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", TIMESTAMPED);
    let tree = source_tree(dir.path());

    let report = BootstrapVerifier::new(dir.path().join("work"))
        .verify_bootstrap(&tree, &compiler)
        .await
        .expect("verification runs");

    assert!(report.reproducible);
}

#[tokio::test]
async fn nondeterministic_compiler_reports_false_without_crashing() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", NONDETERMINISTIC);
    let tree = source_tree(dir.path());

    let report = BootstrapVerifier::new(dir.path().join("work"))
        .verify_bootstrap(&tree, &compiler)
        .await
        .expect("a mismatch is a result, not an error");

    assert!(!report.reproducible);
    assert_ne!(
        report.reproducibility_hashes[0].1,
        report.reproducibility_hashes[1].1
    );
}

#[tokio::test]
async fn failing_compile_step_is_a_tooling_failure() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", FAILING);
    let tree = source_tree(dir.path());

    let err = BootstrapVerifier::new(dir.path().join("work"))
        .verify_bootstrap(&tree, &compiler)
        .await
        .expect_err("verification must abort");

    match err {
        BootstrapError::CompileFailed { code, stderr, .. } => {
            assert_eq!(code, 1);
            assert!(stderr.contains("assembler"));
        }
        other => panic!("expected CompileFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn successful_exit_without_artifact_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", SILENT);
    let tree = source_tree(dir.path());

    let err = BootstrapVerifier::new(dir.path().join("work"))
        .verify_bootstrap(&tree, &compiler)
        .await
        .expect_err("verification must abort");
    assert!(matches!(err, BootstrapError::MissingArtifact { .. }));
}

#[tokio::test]
async fn hanging_compile_step_times_out() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", "#!/bin/sh\nsleep 30\n");
    let tree = source_tree(dir.path());

    let err = BootstrapVerifier::new(dir.path().join("work"))
        .with_timeout(Duration::from_millis(200))
        .verify_bootstrap(&tree, &compiler)
        .await
        .expect_err("verification must time out");
    assert!(matches!(err, BootstrapError::Timeout { .. }));
}

#[tokio::test]
async fn reports_are_appended_to_the_audit_log() {
    let dir = TempDir::new().expect("tempdir");
    let compiler = write_fake_compiler(dir.path(), "gen0", REPRODUCIBLE);
    let tree = source_tree(dir.path());
    let log = dir.path().join("bootstrap.jsonl");

    BootstrapVerifier::new(dir.path().join("work"))
        .with_audit_log(&log)
        .verify_bootstrap(&tree, &compiler)
        .await
        .expect("verification runs");

    let contents = fs::read_to_string(&log).expect("audit log written");
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains("\"reproducible\":true"));
}
