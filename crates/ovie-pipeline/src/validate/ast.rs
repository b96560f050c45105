//! AST validator: the tree must be grammar-shaped only. Any node already
//! carrying resolution or typing metadata belongs to a later stage and its
//! presence here means a pass ran out of order.

use super::rules;
use ovie_core::ast::{Block, Expr, ExprKind, ItemKind, Module, NodeId, NodeMeta};
use ovie_core::{InvariantViolation, Stage};

const DETECTED_AT: &str = "validate::ast";

pub fn validate(module: &Module) -> Result<(), InvariantViolation> {
    for item in &module.items {
        check_meta(item.id, &item.meta, "item")?;
        match &item.kind {
            ItemKind::Function(function) => {
                for param in &function.params {
                    check_meta(param.id, &param.meta, "param")?;
                }
                check_block(&function.body)?;
            }
            ItemKind::Const(const_def) => check_expr(&const_def.value)?,
        }
    }
    Ok(())
}

fn check_meta(id: NodeId, meta: &NodeMeta, what: &str) -> Result<(), InvariantViolation> {
    if let Some(def) = meta.resolved_def {
        return Err(InvariantViolation::new(
            Stage::Ast,
            rules::AST_PREMATURE_RESOLUTION,
            format!("{} node {} already resolved to def {}", what, id, def),
            DETECTED_AT,
        ));
    }
    if let Some(ty) = &meta.inferred_ty {
        return Err(InvariantViolation::new(
            Stage::Ast,
            rules::AST_PREMATURE_TYPE,
            format!("{} node {} already typed as `{}`", what, id, ty),
            DETECTED_AT,
        ));
    }
    Ok(())
}

fn check_block(block: &Block) -> Result<(), InvariantViolation> {
    for stmt in &block.stmts {
        match &stmt.kind {
            ovie_core::ast::StmtKind::Let { init, .. } => check_expr(init)?,
            ovie_core::ast::StmtKind::Expr(expr) => check_expr(expr)?,
        }
    }
    if let Some(tail) = &block.tail {
        check_expr(tail)?;
    }
    Ok(())
}

fn check_expr(expr: &Expr) -> Result<(), InvariantViolation> {
    check_meta(expr.id, &expr.meta, "expression")?;
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Name(_) => Ok(()),
        ExprKind::Binary { lhs, rhs, .. } => {
            check_expr(lhs)?;
            check_expr(rhs)
        }
        ExprKind::Unary { operand, .. } => check_expr(operand),
        ExprKind::Call { args, .. } => {
            for arg in args {
                check_expr(arg)?;
            }
            Ok(())
        }
        ExprKind::If {
            cond,
            then_block,
            else_block,
        } => {
            check_expr(cond)?;
            check_block(then_block)?;
            if let Some(else_block) = else_block {
                check_block(else_block)?;
            }
            Ok(())
        }
        ExprKind::While { cond, body } => {
            check_expr(cond)?;
            check_block(body)
        }
        ExprKind::Block(block) => check_block(block),
        ExprKind::Assign { value, .. } => check_expr(value),
        ExprKind::Return(value) => {
            if let Some(value) = value {
                check_expr(value)?;
            }
            Ok(())
        }
    }
}
