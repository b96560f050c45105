//! HIR validator: every reference resolved to a declaration in the same tree,
//! every expression carrying a concrete type.
//!
//! An unresolved name here is a compiler defect — user-level resolution
//! failures must already have surfaced as source errors before lowering.

use super::rules;
use ovie_core::hir::{Expr, ExprKind, ItemKind, Program, Res, Stmt, StmtKind, Ty};
use ovie_core::{InvariantViolation, Stage};

const DETECTED_AT: &str = "validate::hir";

pub fn validate(program: &Program) -> Result<(), InvariantViolation> {
    for item in &program.items {
        if program.def(item.def_id).is_none() {
            return Err(InvariantViolation::new(
                Stage::Hir,
                rules::HIR_DANGLING_DEF,
                format!("item def {} is absent from the def map", item.def_id),
                DETECTED_AT,
            ));
        }
        match &item.kind {
            ItemKind::Function(function) => {
                for param in &function.params {
                    check_def(program, &Res::Def(param.def_id), &param.name)?;
                    check_ty(param.ty, &format!("param `{}`", param.name))?;
                }
                check_ty(function.ret_ty, &format!("fn `{}` return", function.name))?;
                check_expr(program, &function.body.value)?;
            }
            ItemKind::Const(const_def) => {
                check_ty(const_def.ty, &format!("const `{}`", const_def.name))?;
                check_expr(program, &const_def.value)?;
            }
        }
    }
    Ok(())
}

fn check_def(program: &Program, res: &Res, context: &str) -> Result<(), InvariantViolation> {
    match res {
        Res::Def(def_id) => {
            if program.def(*def_id).is_none() {
                return Err(InvariantViolation::new(
                    Stage::Hir,
                    rules::HIR_UNRESOLVED_REF,
                    format!("{} resolves to def {} which has no declaration", context, def_id),
                    DETECTED_AT,
                ));
            }
            Ok(())
        }
        Res::Unresolved(name) => Err(InvariantViolation::new(
            Stage::Hir,
            rules::HIR_UNRESOLVED_REF,
            format!("{} still references unresolved name `{}`", context, name),
            DETECTED_AT,
        )),
    }
}

fn check_ty(ty: Ty, context: &str) -> Result<(), InvariantViolation> {
    if ty.is_concrete() {
        Ok(())
    } else {
        Err(InvariantViolation::new(
            Stage::Hir,
            rules::HIR_UNTYPED_EXPR,
            format!("{} carries placeholder type", context),
            DETECTED_AT,
        ))
    }
}

fn check_expr(program: &Program, expr: &Expr) -> Result<(), InvariantViolation> {
    check_ty(expr.ty, &format!("expression {}", expr.hir_id))?;
    match &expr.kind {
        ExprKind::Literal(_) => Ok(()),
        ExprKind::Ref(res) => check_def(program, res, &format!("expression {}", expr.hir_id)),
        ExprKind::Binary { lhs, rhs, .. } => {
            check_expr(program, lhs)?;
            check_expr(program, rhs)
        }
        ExprKind::Unary { operand, .. } => check_expr(program, operand),
        ExprKind::Call { callee, args } => {
            check_def(program, callee, &format!("call in expression {}", expr.hir_id))?;
            for arg in args {
                check_expr(program, arg)?;
            }
            Ok(())
        }
        ExprKind::If {
            cond,
            then_expr,
            else_expr,
        } => {
            check_expr(program, cond)?;
            check_expr(program, then_expr)?;
            if let Some(else_expr) = else_expr {
                check_expr(program, else_expr)?;
            }
            Ok(())
        }
        ExprKind::While { cond, body } => {
            check_expr(program, cond)?;
            check_expr(program, body)
        }
        ExprKind::Block { stmts, tail } => {
            for stmt in stmts {
                check_stmt(program, stmt)?;
            }
            if let Some(tail) = tail {
                check_expr(program, tail)?;
            }
            Ok(())
        }
        ExprKind::Assign { target, value } => {
            check_def(program, target, &format!("assignment in expression {}", expr.hir_id))?;
            check_expr(program, value)
        }
        ExprKind::Return(value) => {
            if let Some(value) = value {
                check_expr(program, value)?;
            }
            Ok(())
        }
    }
}

fn check_stmt(program: &Program, stmt: &Stmt) -> Result<(), InvariantViolation> {
    match &stmt.kind {
        StmtKind::Local { name, ty, init, .. } => {
            check_ty(*ty, &format!("local `{}`", name))?;
            if let Some(init) = init {
                check_expr(program, init)?;
            }
            Ok(())
        }
        StmtKind::Expr(expr) => check_expr(program, expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovie_core::hir::{self, DefInfo, DefKind};
    use ovie_core::ops::Lit;
    use ovie_core::span::Span;
    use std::collections::BTreeMap;

    fn empty_function(def_id: u32, body: Expr) -> hir::Item {
        hir::Item {
            hir_id: 0,
            def_id,
            kind: ItemKind::Function(hir::Function {
                name: "main".to_string(),
                params: Vec::new(),
                ret_ty: Ty::Unit,
                body: hir::Body {
                    hir_id: 1,
                    value: body,
                },
            }),
            span: Span::DUMMY,
        }
    }

    fn program_with_body(body: Expr) -> Program {
        let mut def_map = BTreeMap::new();
        def_map.insert(
            0,
            DefInfo {
                name: "main".to_string(),
                kind: DefKind::Function,
            },
        );
        Program {
            items: vec![empty_function(0, body)],
            def_map,
            next_hir_id: 10,
        }
    }

    fn unit_literal() -> Expr {
        Expr {
            hir_id: 2,
            kind: ExprKind::Literal(Lit::Unit),
            ty: Ty::Unit,
            span: Span::DUMMY,
        }
    }

    #[test]
    fn fully_resolved_typed_program_passes() {
        let program = program_with_body(unit_literal());
        assert!(validate(&program).is_ok());
    }

    #[test]
    fn unresolved_reference_is_a_violation() {
        let body = Expr {
            hir_id: 2,
            kind: ExprKind::Ref(Res::Unresolved("frobnicate".to_string())),
            ty: Ty::Unit,
            span: Span::DUMMY,
        };
        let err = validate(&program_with_body(body)).unwrap_err();
        assert_eq!(err.rule_id, rules::HIR_UNRESOLVED_REF);
        assert!(err.offending_node.contains("frobnicate"));
    }

    #[test]
    fn reference_to_missing_def_is_a_violation() {
        let body = Expr {
            hir_id: 2,
            kind: ExprKind::Ref(Res::Def(99)),
            ty: Ty::Int,
            span: Span::DUMMY,
        };
        let err = validate(&program_with_body(body)).unwrap_err();
        assert_eq!(err.rule_id, rules::HIR_UNRESOLVED_REF);
    }

    #[test]
    fn placeholder_type_is_a_violation() {
        let body = Expr {
            hir_id: 2,
            kind: ExprKind::Literal(Lit::Int(1)),
            ty: Ty::Unknown,
            span: Span::DUMMY,
        };
        let err = validate(&program_with_body(body)).unwrap_err();
        assert_eq!(err.rule_id, rules::HIR_UNTYPED_EXPR);
    }
}
