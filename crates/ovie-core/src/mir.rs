//! Mid-level IR: explicit control flow only.
//!
//! A basic block is a flat instruction list so that malformed shapes — a block
//! with no terminator, two terminators, or a terminator that is not the final
//! instruction — are representable. The validator rejects them; nothing else
//! in the pipeline is allowed to consume an unvalidated body.

use crate::hir::Ty;
use crate::ops::{BinOp, Lit, UnOp};
use crate::span::Span;
use serde::{Deserialize, Serialize};

pub type LocalId = u32;
pub type BlockId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub body: Body,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Local 0 is the return place; locals `1..=arg_count` are arguments and
    /// are defined on entry.
    pub locals: Vec<LocalDecl>,
    pub arg_count: usize,
    pub basic_blocks: Vec<BasicBlockData>,
}

impl Body {
    pub const RETURN_LOCAL: LocalId = 0;
    pub const ENTRY_BLOCK: BlockId = 0;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: Option<String>,
    pub ty: Ty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicBlockData {
    pub instructions: Vec<Instruction>,
}

impl BasicBlockData {
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.instructions.iter().filter_map(|inst| match inst {
            Instruction::Statement(stmt) => Some(stmt),
            Instruction::Terminator(_) => None,
        })
    }

    pub fn terminators(&self) -> impl Iterator<Item = &Terminator> {
        self.instructions.iter().filter_map(|inst| match inst {
            Instruction::Statement(_) => None,
            Instruction::Terminator(term) => Some(term),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Statement(Statement),
    Terminator(Terminator),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    Assign { dest: LocalId, rvalue: Rvalue },
    Nop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rvalue {
    Use(Operand),
    Binary {
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    Unary {
        op: UnOp,
        operand: Operand,
    },
    Call {
        callee: String,
        args: Vec<Operand>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Copy(LocalId),
    Const(Lit),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminator {
    pub kind: TerminatorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerminatorKind {
    Goto {
        target: BlockId,
    },
    Branch {
        cond: Operand,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return,
}

impl TerminatorKind {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            TerminatorKind::Goto { target } => vec![*target],
            TerminatorKind::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            TerminatorKind::Return => Vec::new(),
        }
    }
}
