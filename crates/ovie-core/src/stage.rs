//! The four fixed points of the lowering pipeline and the stage-tagged tree.

use crate::{ast, backend, hir, mir};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Closed stage set. Exhaustive matching over this enum is the point: adding a
/// stage must break every dispatcher until it handles the new tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ast,
    Hir,
    Mir,
    Backend,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ast => "AST",
            Stage::Hir => "HIR",
            Stage::Mir => "MIR",
            Stage::Backend => "Backend",
        }
    }

    /// The stage the next lowering step must produce, if any.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Stage::Ast => Some(Stage::Hir),
            Stage::Hir => Some(Stage::Mir),
            Stage::Mir => Some(Stage::Backend),
            Stage::Backend => None,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ast" => Ok(Stage::Ast),
            "hir" => Ok(Stage::Hir),
            "mir" => Ok(Stage::Mir),
            "backend" => Ok(Stage::Backend),
            other => Err(format!("unknown stage `{}`", other)),
        }
    }
}

/// A stage-tagged tree, owned by value by whichever pipeline step produced it
/// and moved onward from there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "tree", rename_all = "lowercase")]
pub enum StageTree {
    Ast(ast::Module),
    Hir(hir::Program),
    Mir(mir::Program),
    Backend(backend::Artifact),
}

impl StageTree {
    pub fn stage(&self) -> Stage {
        match self {
            StageTree::Ast(_) => Stage::Ast,
            StageTree::Hir(_) => Stage::Hir,
            StageTree::Mir(_) => Stage::Mir,
            StageTree::Backend(_) => Stage::Backend,
        }
    }

    /// Short description of the tree for logs and violation dumps.
    pub fn describe(&self) -> String {
        match self {
            StageTree::Ast(module) => {
                format!("AST module `{}` ({} items)", module.name, module.items.len())
            }
            StageTree::Hir(program) => format!(
                "HIR program ({} items, {} defs)",
                program.items.len(),
                program.def_map.len()
            ),
            StageTree::Mir(program) => {
                format!("MIR program ({} functions)", program.functions.len())
            }
            StageTree::Backend(artifact) => format!(
                "backend artifact `{}` for {}",
                artifact.module_name, artifact.abi.target_triple
            ),
        }
    }
}
