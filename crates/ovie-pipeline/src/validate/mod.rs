//! Well-formedness validation at every stage boundary.
//!
//! Exactly one validator exists per stage tag, dispatched through an
//! exhaustive match — the stage set is closed and exhaustiveness checking is
//! the point. A failed check is an [`InvariantViolation`]: a defect in the
//! compiler, never a user-facing diagnostic, and it is never downgraded or
//! retried.

mod ast;
mod backend;
mod hir;
mod mir;

use ovie_core::backend::AbiDescriptor;
use ovie_core::{InvariantViolation, Stage, StageTree};

/// Rule identifiers carried in violation dumps. Stable across releases so bug
/// reports stay comparable.
pub mod rules {
    pub const STAGE_TAG_MISMATCH: &str = "STAGE_TAG_MISMATCH";

    pub const AST_PREMATURE_RESOLUTION: &str = "AST_PREMATURE_RESOLUTION";
    pub const AST_PREMATURE_TYPE: &str = "AST_PREMATURE_TYPE";

    pub const HIR_UNRESOLVED_REF: &str = "HIR_UNRESOLVED_REF";
    pub const HIR_DANGLING_DEF: &str = "HIR_DANGLING_DEF";
    pub const HIR_UNTYPED_EXPR: &str = "HIR_UNTYPED_EXPR";

    pub const MIR_NO_TERMINATOR: &str = "MIR_NO_TERMINATOR";
    pub const MIR_MULTIPLE_TERMINATORS: &str = "MIR_MULTIPLE_TERMINATORS";
    pub const MIR_TERMINATOR_NOT_LAST: &str = "MIR_TERMINATOR_NOT_LAST";
    pub const MIR_BRANCH_TARGET_OOB: &str = "MIR_BRANCH_TARGET_OOB";
    pub const MIR_LOCAL_OOB: &str = "MIR_LOCAL_OOB";
    pub const MIR_USE_BEFORE_DEF: &str = "MIR_USE_BEFORE_DEF";

    pub const BACKEND_UNDEFINED_SYMBOL: &str = "BACKEND_UNDEFINED_SYMBOL";
    pub const BACKEND_UNRESOLVED_SYMBOL: &str = "BACKEND_UNRESOLVED_SYMBOL";
    pub const BACKEND_DUPLICATE_SYMBOL: &str = "BACKEND_DUPLICATE_SYMBOL";
    pub const BACKEND_ABI_MISMATCH: &str = "BACKEND_ABI_MISMATCH";
    pub const BACKEND_UNKNOWN_TARGET: &str = "BACKEND_UNKNOWN_TARGET";
}

/// Environment-derived facts the validators check against.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// ABI descriptors of the targets installed under the runtime
    /// environment's `targets` directory.
    pub known_targets: Vec<AbiDescriptor>,
}

impl ValidationContext {
    pub fn with_targets(known_targets: Vec<AbiDescriptor>) -> Self {
        Self { known_targets }
    }
}

/// Witness that a tree has passed the validator for its own tag.
///
/// Only this module can mint one, so a lowering step cannot self-tag a tree
/// it never routed through validation.
#[derive(Debug)]
pub struct ValidatedTree {
    tree: StageTree,
}

impl ValidatedTree {
    pub fn stage(&self) -> Stage {
        self.tree.stage()
    }

    pub fn get(&self) -> &StageTree {
        &self.tree
    }

    pub fn into_inner(self) -> StageTree {
        self.tree
    }
}

/// Validate a tree against the validator matching its own tag.
pub fn validate(tree: &StageTree, ctx: &ValidationContext) -> Result<(), InvariantViolation> {
    match tree {
        StageTree::Ast(module) => ast::validate(module),
        StageTree::Hir(program) => hir::validate(program),
        StageTree::Mir(program) => mir::validate(program),
        StageTree::Backend(artifact) => backend::validate(artifact, ctx),
    }
}

/// Validate a tree a collaborator claims to be of `expected` stage. A tag
/// mismatch is itself a violation — the producer handed over the wrong tree,
/// which is a pipeline defect, not a property of the user's input.
pub fn validate_as(
    tree: &StageTree,
    expected: Stage,
    ctx: &ValidationContext,
) -> Result<(), InvariantViolation> {
    let actual = tree.stage();
    if actual != expected {
        return Err(InvariantViolation::new(
            expected,
            rules::STAGE_TAG_MISMATCH,
            format!("expected a {} tree, got {}", expected, tree.describe()),
            "validate::dispatch",
        ));
    }
    validate(tree, ctx)
}

/// Validate and take ownership, minting the witness the lowering driver
/// requires at every boundary.
pub fn validate_tree(
    tree: StageTree,
    ctx: &ValidationContext,
) -> Result<ValidatedTree, InvariantViolation> {
    validate(&tree, ctx)?;
    Ok(ValidatedTree { tree })
}
