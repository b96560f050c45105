//! The `selfcheck` operation: validation exposed as its own command, with a
//! per-subpath verdict. Never compiles anything.

use crate::resolve::{candidate_root, DiscoverySources, REQUIRED_SUBDIRS};
use ovie_core::error::EnvironmentError;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SelfCheckEntry {
    pub name: &'static str,
    pub path: PathBuf,
    pub ok: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SelfCheckReport {
    pub root: PathBuf,
    pub entries: Vec<SelfCheckEntry>,
}

impl SelfCheckReport {
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|entry| entry.ok)
    }
}

impl Display for SelfCheckReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "runtime environment: {}", self.root.display())?;
        for entry in &self.entries {
            let verdict = if entry.ok { "ok" } else { "MISSING" };
            match &entry.detail {
                Some(detail) => writeln!(f, "  {:8} {:8} {}", entry.name, verdict, detail)?,
                None => writeln!(f, "  {:8} {}", entry.name, verdict)?,
            }
        }
        Ok(())
    }
}

/// Run the per-subpath validation against the winning candidate root. Unlike
/// [`crate::resolve_with`], a broken subpath does not abort the walk — the
/// point is a complete pass/fail listing.
pub fn self_check(sources: &DiscoverySources) -> Result<SelfCheckReport, EnvironmentError> {
    let root = candidate_root(sources).ok_or(EnvironmentError::NotFound)?;

    let entries = REQUIRED_SUBDIRS
        .iter()
        .map(|&name| {
            let path = root.join(name);
            if !path.is_dir() {
                return SelfCheckEntry {
                    name,
                    path,
                    ok: false,
                    detail: Some("directory does not exist".to_string()),
                };
            }
            match fs::read_dir(&path) {
                Ok(_) => SelfCheckEntry {
                    name,
                    path,
                    ok: true,
                    detail: None,
                },
                Err(err) => SelfCheckEntry {
                    name,
                    path,
                    ok: false,
                    detail: Some(format!("not readable: {}", err)),
                },
            }
        })
        .collect();

    Ok(SelfCheckReport { root, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reports_every_subpath() {
        let dir = TempDir::new().expect("tempdir");
        for subdir in &["bin", "std", "aproko", "targets", "config"] {
            fs::create_dir_all(dir.path().join(subdir)).expect("create subdir");
        }
        // `logs` deliberately missing.

        let sources = DiscoverySources {
            env_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let report = self_check(&sources).expect("candidate exists");

        assert_eq!(report.entries.len(), REQUIRED_SUBDIRS.len());
        assert!(!report.passed());
        let logs = report
            .entries
            .iter()
            .find(|entry| entry.name == "logs")
            .expect("logs entry");
        assert!(!logs.ok);
        assert!(report.entries.iter().filter(|entry| entry.ok).count() == 5);
    }

    #[test]
    fn display_lists_pass_fail_lines() {
        let dir = TempDir::new().expect("tempdir");
        for subdir in REQUIRED_SUBDIRS {
            fs::create_dir_all(dir.path().join(subdir)).expect("create subdir");
        }
        let sources = DiscoverySources {
            env_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let report = self_check(&sources).expect("candidate exists");
        assert!(report.passed());

        let rendered = report.to_string();
        for subdir in REQUIRED_SUBDIRS {
            assert!(rendered.contains(subdir));
        }
    }
}
