//! Grammar-shaped syntax tree as handed over by the frontend.
//!
//! An AST carries no resolution or typing results. Later stages record those
//! in [`NodeMeta`], which must still be empty on any tree tagged `AST` — a
//! populated slot at that stage is a pipeline invariant violation, not a user
//! error.

use crate::ops::{BinOp, Lit, UnOp};
use crate::span::Span;
use serde::{Deserialize, Serialize};

pub type NodeId = u32;

/// Side-slot for metadata attached by resolution and type checking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_def: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_ty: Option<String>,
}

impl NodeMeta {
    pub fn is_empty(&self) -> bool {
        self.resolved_def.is_none() && self.inferred_ty.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: NodeId,
    pub kind: ItemKind,
    pub span: Span,
    #[serde(default)]
    pub meta: NodeMeta,
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
    pub ret_ty: Option<TyExpr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: TyExpr,
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDef {
    pub name: String,
    pub ty: TyExpr,
    pub value: Expr,
}

/// Source-level type syntax, uninterpreted at this stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyExpr {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub tail: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Let {
        name: String,
        ty: Option<TyExpr>,
        init: Expr,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Lit),
    Name(String),
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
        callee: String,
        args: Vec<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Box<Expr>,
        body: Block,
    },
    Block(Block),
    Assign {
        target: String,
        value: Box<Expr>,
    },
    Return(Option<Box<Expr>>),
}
