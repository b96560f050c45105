//! CLI configuration loaded from `ovie.toml` and standard locations.

use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub compilation: CompilationConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationConfig {
    /// Target triple to emit for when `--target` is not given. Falls back to
    /// the first target installed in the runtime environment.
    pub default_target: Option<String>,

    /// Render info/hint diagnostics as well as warnings and errors.
    pub verbose_diagnostics: bool,
}

impl Default for CompilationConfig {
    fn default() -> Self {
        Self {
            default_target: None,
            verbose_diagnostics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Per-compile-step timeout for `verify-bootstrap`.
    pub timeout_secs: u64,

    /// Treat a non-reproducible result as a failing exit code.
    pub strict: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            strict: false,
        }
    }
}

impl CliConfig {
    /// Load configuration: an explicit path must parse; otherwise the first
    /// readable of `./ovie.toml`, `~/.ovie.toml`, `<config dir>/ovie/config.toml`
    /// wins, and defaults apply when none exists.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let mut candidates = vec![std::path::PathBuf::from("ovie.toml")];
        if let Some(home_dir) = dirs::home_dir() {
            candidates.push(home_dir.join(".ovie.toml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("ovie").join("config.toml"));
        }

        for candidate in candidates {
            if candidate.is_file() {
                return Self::load_from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CliError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        toml::from_str(&raw)
            .map_err(|err| CliError::Config(format!("cannot parse {}: {}", path.display(), err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_sections() {
        let config: CliConfig = toml::from_str("").expect("empty config parses");
        assert_eq!(config.bootstrap.timeout_secs, 600);
        assert!(!config.bootstrap.strict);
        assert!(config.compilation.default_target.is_none());
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config: CliConfig = toml::from_str(
            "[bootstrap]\nstrict = true\n\n[compilation]\ndefault_target = \"wasm32-unknown-unknown\"\n",
        )
        .expect("config parses");
        assert!(config.bootstrap.strict);
        assert_eq!(config.bootstrap.timeout_secs, 600);
        assert_eq!(
            config.compilation.default_target.as_deref(),
            Some("wasm32-unknown-unknown")
        );
    }
}
