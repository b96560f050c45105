use ovie_core::error::EnvironmentError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the installation root explicitly.
pub const ENV_VAR: &str = "OVIE_HOME";

/// Project-local marker directory checked under the working directory.
pub const LOCAL_MARKER: &str = ".ovie";

/// Every subdirectory an installation must provide, in report order.
pub const REQUIRED_SUBDIRS: [&str; 6] = ["bin", "std", "aproko", "targets", "config", "logs"];

/// A resolved, validated installation root. All six subpaths exist and were
/// readable at resolution time.
#[derive(Debug, Clone)]
pub struct RuntimeEnvironment {
    pub root: PathBuf,
    pub bin: PathBuf,
    pub std: PathBuf,
    pub aproko: PathBuf,
    pub targets: PathBuf,
    pub config: PathBuf,
    pub logs: PathBuf,
}

impl RuntimeEnvironment {
    fn from_root(root: PathBuf) -> Self {
        Self {
            bin: root.join("bin"),
            std: root.join("std"),
            aproko: root.join("aproko"),
            targets: root.join("targets"),
            config: root.join("config"),
            logs: root.join("logs"),
            root,
        }
    }
}

/// The inputs discovery reads, captured as a value so precedence is testable
/// without mutating process globals.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySources {
    /// Value of [`ENV_VAR`], if set.
    pub env_root: Option<PathBuf>,
    /// Current working directory.
    pub working_dir: Option<PathBuf>,
    /// Path of the running executable.
    pub exe_path: Option<PathBuf>,
    /// Fixed system-wide install locations, checked in order.
    pub system_roots: Vec<PathBuf>,
}

impl DiscoverySources {
    pub fn from_process() -> Self {
        Self {
            env_root: std::env::var_os(ENV_VAR).map(PathBuf::from),
            working_dir: std::env::current_dir().ok(),
            exe_path: std::env::current_exe().ok(),
            system_roots: default_system_roots(),
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn default_system_roots() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/local/lib/ovie"),
        PathBuf::from("/opt/ovie"),
    ]
}

#[cfg(target_os = "windows")]
fn default_system_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(r"C:\Program Files\Ovie")]
}

/// Resolve against the real process state.
pub fn resolve() -> Result<RuntimeEnvironment, EnvironmentError> {
    resolve_with(&DiscoverySources::from_process())
}

/// Resolve against explicit sources. First matching candidate wins; a winning
/// candidate that fails validation is an error, never a fallthrough to the
/// next source — the user must know exactly which root was assumed and what
/// was wrong with it.
pub fn resolve_with(sources: &DiscoverySources) -> Result<RuntimeEnvironment, EnvironmentError> {
    let root = candidate_root(sources).ok_or(EnvironmentError::NotFound)?;
    debug!(root = %root.display(), "runtime environment candidate");
    validate_root(&root)?;
    Ok(RuntimeEnvironment::from_root(root))
}

/// Pick the winning candidate. An explicit env var always matches (even when
/// the directory it names is broken — that is a validation error, not a
/// reason to keep looking). The implicit sources match only when they look
/// like an installation.
pub(crate) fn candidate_root(sources: &DiscoverySources) -> Option<PathBuf> {
    if let Some(root) = &sources.env_root {
        return Some(root.clone());
    }

    if let Some(working_dir) = &sources.working_dir {
        let marker = working_dir.join(LOCAL_MARKER);
        if marker.is_dir() {
            return Some(marker);
        }
    }

    if let Some(exe_path) = &sources.exe_path {
        if let Some(exe_dir) = exe_path.parent() {
            // A binary installed under `root/bin` resolves to `root`.
            let root = if exe_dir.file_name().map(|name| name == "bin").unwrap_or(false) {
                exe_dir.parent().unwrap_or(exe_dir)
            } else {
                exe_dir
            };
            if root.join("std").is_dir() {
                return Some(root.to_path_buf());
            }
        }
    }

    sources
        .system_roots
        .iter()
        .find(|root| root.is_dir())
        .cloned()
}

/// Check all six required subpaths exist and are readable.
pub fn validate_root(root: &Path) -> Result<(), EnvironmentError> {
    for subpath in REQUIRED_SUBDIRS {
        let path = root.join(subpath);
        if !path.is_dir() {
            return Err(EnvironmentError::MissingSubpath {
                root: root.to_path_buf(),
                subpath,
            });
        }
        if let Err(source) = fs::read_dir(&path) {
            return Err(EnvironmentError::Unreadable { path, source });
        }
    }
    Ok(())
}
