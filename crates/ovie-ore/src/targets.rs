//! Installed target descriptors.
//!
//! Each file under `targets/` is `<triple>.toml` carrying the ABI the backend
//! validator checks artifacts against. The listing is sorted so two processes
//! over the same installation always see the same target order.

use crate::resolve::RuntimeEnvironment;
use ovie_core::backend::{AbiDescriptor, CallingConvention};
use ovie_core::error::EnvironmentError;
use serde::Deserialize;
use std::fs;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TargetDescriptor {
    abi: AbiSection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AbiSection {
    calling_convention: CallingConvention,
    pointer_width: u8,
}

/// Read every `targets/*.toml` descriptor, sorted by file name.
pub fn installed_targets(
    env: &RuntimeEnvironment,
) -> Result<Vec<AbiDescriptor>, EnvironmentError> {
    let entries = fs::read_dir(&env.targets).map_err(|source| EnvironmentError::Unreadable {
        path: env.targets.clone(),
        source,
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    paths.sort();

    let mut targets = Vec::new();
    for path in paths {
        let Some(triple) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let raw = fs::read_to_string(&path).map_err(|source| EnvironmentError::Unreadable {
            path: path.clone(),
            source,
        })?;
        let descriptor: TargetDescriptor =
            toml::from_str(&raw).map_err(|err| EnvironmentError::MalformedTarget {
                path: path.clone(),
                message: err.to_string(),
            })?;
        debug!(triple, "loaded target descriptor");
        targets.push(AbiDescriptor {
            target_triple: triple.to_string(),
            calling_convention: descriptor.abi.calling_convention,
            pointer_width: descriptor.abi.pointer_width,
        });
    }
    Ok(targets)
}
