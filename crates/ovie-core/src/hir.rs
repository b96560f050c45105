//! High-level IR: names resolved, every expression carrying a concrete type.
//!
//! `Res::Unresolved` and `Ty::Unknown` exist so a defective lowering can be
//! represented and rejected; neither may survive to a tree tagged `HIR`.

use crate::ops::{BinOp, Lit, UnOp};
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type HirId = u32;
pub type DefId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
    /// Every declaration reachable from this tree, keyed by its `DefId`.
    pub def_map: BTreeMap<DefId, DefInfo>,
    pub next_hir_id: HirId,
}

impl Program {
    pub fn def(&self, id: DefId) -> Option<&DefInfo> {
        self.def_map.get(&id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefInfo {
    pub name: String,
    pub kind: DefKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefKind {
    Function,
    Const,
    Param,
    Local,
}

/// Outcome of name resolution for one identifier reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Res {
    Def(DefId),
    /// Resolution failed upstream. Must have been reported as a source error
    /// before lowering; reaching HIR validation in this state is a compiler
    /// defect.
    Unresolved(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ty {
    Unit,
    Bool,
    Int,
    Str,
    /// Placeholder for a type the checker has not filled in.
    Unknown,
}

impl Ty {
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Ty::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ty::Unit => "()",
            Ty::Bool => "bool",
            Ty::Int => "int",
            Ty::Str => "str",
            Ty::Unknown => "{unknown}",
        }
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub hir_id: HirId,
    pub def_id: DefId,
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    Function(Function),
    Const(ConstDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret_ty: Ty,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub hir_id: HirId,
    pub def_id: DefId,
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDef {
    pub name: String,
    pub ty: Ty,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub hir_id: HirId,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub hir_id: HirId,
    pub kind: ExprKind,
    pub ty: Ty,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Lit),
    Ref(Res),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Res,
        args: Vec<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Option<Box<Expr>>,
    },
    While {
        cond: Box<Expr>,
        body: Box<Expr>,
    },
    Block {
        stmts: Vec<Stmt>,
        tail: Option<Box<Expr>>,
    },
    Assign {
        target: Res,
        value: Box<Expr>,
    },
    Return(Option<Box<Expr>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub hir_id: HirId,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Local {
        def_id: DefId,
        name: String,
        ty: Ty,
        init: Option<Expr>,
    },
    Expr(Expr),
}
