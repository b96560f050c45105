//! Backend artifact validator: every referenced symbol resolved, and the
//! declared ABI consistent both internally and with the targets installed in
//! the runtime environment.

use super::{rules, ValidationContext};
use itertools::Itertools;
use ovie_core::backend::{Artifact, CallingConvention};
use ovie_core::{InvariantViolation, Stage};

const DETECTED_AT: &str = "validate::backend";

pub fn validate(artifact: &Artifact, ctx: &ValidationContext) -> Result<(), InvariantViolation> {
    if let Some(name) = artifact
        .symbols
        .iter()
        .map(|symbol| symbol.name.as_str())
        .duplicates()
        .next()
    {
        return Err(violation(
            rules::BACKEND_DUPLICATE_SYMBOL,
            format!("symbol `{}` defined more than once", name),
        ));
    }

    for symbol in &artifact.symbols {
        if symbol.address.is_none() {
            return Err(violation(
                rules::BACKEND_UNRESOLVED_SYMBOL,
                format!("symbol `{}` has no resolved address", symbol.name),
            ));
        }
    }

    for relocation in &artifact.relocations {
        if artifact.symbol(&relocation.symbol).is_none() {
            return Err(violation(
                rules::BACKEND_UNDEFINED_SYMBOL,
                format!(
                    "relocation at offset {:#x} references undefined symbol `{}`",
                    relocation.offset, relocation.symbol
                ),
            ));
        }
    }

    check_internal_consistency(artifact)?;
    check_environment_targets(artifact, ctx)
}

/// Calling convention and pointer width implied by the triple itself.
fn expected_abi(triple: &str) -> Option<(CallingConvention, u8)> {
    if triple.starts_with("wasm32") {
        return Some((CallingConvention::WasmBasic, 32));
    }
    let width = if triple.starts_with("x86_64") || triple.starts_with("aarch64") {
        64
    } else if triple.starts_with("i686") || triple.starts_with("armv7") {
        32
    } else {
        return None;
    };
    let convention = if triple.contains("windows") {
        CallingConvention::Win64
    } else {
        CallingConvention::SystemV
    };
    Some((convention, width))
}

fn check_internal_consistency(artifact: &Artifact) -> Result<(), InvariantViolation> {
    let abi = &artifact.abi;
    if let Some((convention, width)) = expected_abi(&abi.target_triple) {
        if abi.calling_convention != convention {
            return Err(violation(
                rules::BACKEND_ABI_MISMATCH,
                format!(
                    "calling convention {} is not valid for target {}",
                    abi.calling_convention, abi.target_triple
                ),
            ));
        }
        if abi.pointer_width != width {
            return Err(violation(
                rules::BACKEND_ABI_MISMATCH,
                format!(
                    "pointer width {} is not valid for target {}",
                    abi.pointer_width, abi.target_triple
                ),
            ));
        }
    }
    Ok(())
}

fn check_environment_targets(
    artifact: &Artifact,
    ctx: &ValidationContext,
) -> Result<(), InvariantViolation> {
    let abi = &artifact.abi;
    match ctx
        .known_targets
        .iter()
        .find(|target| target.target_triple == abi.target_triple)
    {
        None => Err(violation(
            rules::BACKEND_UNKNOWN_TARGET,
            format!(
                "target {} is not installed in the runtime environment",
                abi.target_triple
            ),
        )),
        Some(installed) => {
            if installed.calling_convention != abi.calling_convention
                || installed.pointer_width != abi.pointer_width
            {
                return Err(violation(
                    rules::BACKEND_ABI_MISMATCH,
                    format!(
                        "artifact ABI ({}, {} bit) disagrees with installed target {} ({}, {} bit)",
                        abi.calling_convention,
                        abi.pointer_width,
                        installed.target_triple,
                        installed.calling_convention,
                        installed.pointer_width
                    ),
                ));
            }
            Ok(())
        }
    }
}

fn violation(rule_id: &'static str, node: String) -> InvariantViolation {
    InvariantViolation::new(Stage::Backend, rule_id, node, DETECTED_AT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovie_core::backend::{AbiDescriptor, Relocation, Symbol, SymbolKind};

    const TRIPLE: &str = "x86_64-unknown-linux-gnu";

    fn linux_abi() -> AbiDescriptor {
        AbiDescriptor {
            target_triple: TRIPLE.to_string(),
            calling_convention: CallingConvention::SystemV,
            pointer_width: 64,
        }
    }

    fn ctx() -> ValidationContext {
        ValidationContext::with_targets(vec![linux_abi()])
    }

    fn artifact() -> Artifact {
        Artifact {
            module_name: "unit".to_string(),
            abi: linux_abi(),
            symbols: vec![Symbol {
                name: "main".to_string(),
                kind: SymbolKind::Function,
                address: Some(0x1000),
            }],
            relocations: Vec::new(),
            bytes: vec![0x7f],
        }
    }

    #[test]
    fn resolved_consistent_artifact_passes() {
        assert!(validate(&artifact(), &ctx()).is_ok());
    }

    #[test]
    fn unresolved_symbol_fails() {
        let mut artifact = artifact();
        artifact.symbols[0].address = None;
        let err = validate(&artifact, &ctx()).unwrap_err();
        assert_eq!(err.rule_id, rules::BACKEND_UNRESOLVED_SYMBOL);
    }

    #[test]
    fn relocation_against_undefined_symbol_fails() {
        let mut artifact = artifact();
        artifact.relocations.push(Relocation {
            offset: 0x10,
            symbol: "helper".to_string(),
        });
        let err = validate(&artifact, &ctx()).unwrap_err();
        assert_eq!(err.rule_id, rules::BACKEND_UNDEFINED_SYMBOL);
    }

    #[test]
    fn wrong_calling_convention_for_triple_fails() {
        let mut artifact = artifact();
        artifact.abi.calling_convention = CallingConvention::Win64;
        let err = validate(&artifact, &ctx()).unwrap_err();
        assert_eq!(err.rule_id, rules::BACKEND_ABI_MISMATCH);
    }

    #[test]
    fn target_absent_from_environment_fails() {
        let err = validate(&artifact(), &ValidationContext::default()).unwrap_err();
        assert_eq!(err.rule_id, rules::BACKEND_UNKNOWN_TARGET);
    }

    #[test]
    fn duplicate_symbols_fail() {
        let mut artifact = artifact();
        artifact.symbols.push(Symbol {
            name: "main".to_string(),
            kind: SymbolKind::Function,
            address: Some(0x2000),
        });
        let err = validate(&artifact, &ctx()).unwrap_err();
        assert_eq!(err.rule_id, rules::BACKEND_DUPLICATE_SYMBOL);
    }
}
