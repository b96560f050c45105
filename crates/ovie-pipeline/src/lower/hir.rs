//! AST → HIR: name resolution and type assignment.
//!
//! Everything a user can get wrong surfaces here as a source diagnostic. A
//! tree that leaves this stage with errors never reaches the HIR validator —
//! the driver halts the unit first.

use crate::error::UnitDiagnostics;
use crate::pipeline::LowerStage;
use crate::validate::rules;
use ovie_core::diagnostics::Diagnostic;
use ovie_core::ops::Lit;
use ovie_core::{ast, hir, Error, InvariantViolation, Stage, StageTree};
use std::collections::{BTreeMap, HashMap};

pub struct AstToHir;

impl AstToHir {
    pub fn new() -> Self {
        AstToHir
    }
}

impl Default for AstToHir {
    fn default() -> Self {
        Self::new()
    }
}

impl LowerStage for AstToHir {
    fn name(&self) -> &'static str {
        "ast→hir"
    }

    fn input_stage(&self) -> Stage {
        Stage::Ast
    }

    fn run(
        &self,
        tree: StageTree,
        diagnostics: &mut UnitDiagnostics,
    ) -> Result<StageTree, Error> {
        let module = match tree {
            StageTree::Ast(module) => module,
            other => {
                return Err(InvariantViolation::new(
                    Stage::Ast,
                    rules::STAGE_TAG_MISMATCH,
                    format!("ast→hir received {}", other.describe()),
                    "lower::hir",
                )
                .into())
            }
        };
        let program = Lowering::new(diagnostics).lower_module(&module);
        Ok(StageTree::Hir(program))
    }
}

#[derive(Clone)]
enum Global {
    Function {
        def_id: hir::DefId,
        params: Vec<hir::Ty>,
        ret_ty: hir::Ty,
    },
    Const {
        def_id: hir::DefId,
        ty: hir::Ty,
    },
}

#[derive(Clone, Copy)]
struct LocalBinding {
    def_id: hir::DefId,
    ty: hir::Ty,
}

struct Lowering<'a> {
    diagnostics: &'a mut UnitDiagnostics,
    def_map: BTreeMap<hir::DefId, hir::DefInfo>,
    globals: HashMap<String, Global>,
    scopes: Vec<HashMap<String, LocalBinding>>,
    next_def_id: hir::DefId,
    next_hir_id: hir::HirId,
}

impl<'a> Lowering<'a> {
    fn new(diagnostics: &'a mut UnitDiagnostics) -> Self {
        Self {
            diagnostics,
            def_map: BTreeMap::new(),
            globals: HashMap::new(),
            scopes: Vec::new(),
            next_def_id: 0,
            next_hir_id: 0,
        }
    }

    fn lower_module(mut self, module: &ast::Module) -> hir::Program {
        // Item signatures first so bodies can call forward.
        for item in &module.items {
            self.declare_item(item);
        }

        let mut items = Vec::new();
        for item in &module.items {
            if let Some(item) = self.lower_item(item) {
                items.push(item);
            }
        }

        hir::Program {
            items,
            def_map: self.def_map,
            next_hir_id: self.next_hir_id,
        }
    }

    fn declare_item(&mut self, item: &ast::Item) {
        let (name, kind) = match &item.kind {
            ast::ItemKind::Function(function) => (function.name.clone(), hir::DefKind::Function),
            ast::ItemKind::Const(const_def) => (const_def.name.clone(), hir::DefKind::Const),
        };
        if self.globals.contains_key(&name) {
            self.error("E_NAME_002", format!("`{}` is defined more than once", name));
            return;
        }

        let def_id = self.fresh_def(&name, kind);
        let global = match &item.kind {
            ast::ItemKind::Function(function) => {
                let params = function
                    .params
                    .iter()
                    .map(|param| self.resolve_ty(&param.ty))
                    .collect();
                let ret_ty = function
                    .ret_ty
                    .as_ref()
                    .map(|ty| self.resolve_ty(ty))
                    .unwrap_or(hir::Ty::Unit);
                Global::Function {
                    def_id,
                    params,
                    ret_ty,
                }
            }
            ast::ItemKind::Const(const_def) => Global::Const {
                def_id,
                ty: self.resolve_ty(&const_def.ty),
            },
        };
        self.globals.insert(name, global);
    }

    fn lower_item(&mut self, item: &ast::Item) -> Option<hir::Item> {
        match &item.kind {
            ast::ItemKind::Function(function) => {
                let Some(Global::Function {
                    def_id,
                    params: param_tys,
                    ret_ty,
                }) = self.globals.get(&function.name).cloned()
                else {
                    return None;
                };

                let mut scope = HashMap::new();
                let mut params = Vec::new();
                for (param, ty) in function.params.iter().zip(param_tys) {
                    let param_def = self.fresh_def(&param.name, hir::DefKind::Param);
                    scope.insert(
                        param.name.clone(),
                        LocalBinding {
                            def_id: param_def,
                            ty,
                        },
                    );
                    params.push(hir::Param {
                        hir_id: self.fresh_hir(),
                        def_id: param_def,
                        name: param.name.clone(),
                        ty,
                    });
                }

                self.scopes.push(scope);
                let value = self.lower_block(&function.body, item.span);
                self.scopes.pop();

                // A body without a tail expression returns through `return`
                // statements; only a tail value is checked here.
                if function.body.tail.is_some()
                    && value.ty != ret_ty
                    && value.ty != hir::Ty::Unknown
                {
                    self.error(
                        "E_TYPE_010",
                        format!(
                            "fn `{}` returns {} but its body has type {}",
                            function.name, ret_ty, value.ty
                        ),
                    );
                }

                Some(hir::Item {
                    hir_id: self.fresh_hir(),
                    def_id,
                    kind: hir::ItemKind::Function(hir::Function {
                        name: function.name.clone(),
                        params,
                        ret_ty,
                        body: hir::Body {
                            hir_id: self.fresh_hir(),
                            value,
                        },
                    }),
                    span: item.span,
                })
            }
            ast::ItemKind::Const(const_def) => {
                let Some(Global::Const { def_id, ty }) = self.globals.get(&const_def.name).cloned()
                else {
                    return None;
                };

                if !matches!(const_def.value.kind, ast::ExprKind::Literal(_)) {
                    self.error(
                        "E_CONST_001",
                        format!("constant `{}` must be initialized with a literal", const_def.name),
                    );
                }
                let value = self.lower_expr(&const_def.value);
                if value.ty != ty && value.ty != hir::Ty::Unknown {
                    self.error(
                        "E_TYPE_006",
                        format!(
                            "constant `{}` declared as {} but initialized with {}",
                            const_def.name, ty, value.ty
                        ),
                    );
                }

                Some(hir::Item {
                    hir_id: self.fresh_hir(),
                    def_id,
                    kind: hir::ItemKind::Const(hir::ConstDef {
                        name: const_def.name.clone(),
                        ty,
                        value,
                    }),
                    span: item.span,
                })
            }
        }
    }

    fn lower_block(&mut self, block: &ast::Block, span: ovie_core::span::Span) -> hir::Expr {
        self.scopes.push(HashMap::new());

        let mut stmts = Vec::new();
        for stmt in &block.stmts {
            match &stmt.kind {
                ast::StmtKind::Let { name, ty, init } => {
                    let init = self.lower_expr(init);
                    let ty = match ty {
                        Some(annotation) => {
                            let declared = self.resolve_ty(annotation);
                            if declared != init.ty && init.ty != hir::Ty::Unknown {
                                self.error(
                                    "E_TYPE_009",
                                    format!(
                                        "`{}` declared as {} but initialized with {}",
                                        name, declared, init.ty
                                    ),
                                );
                            }
                            declared
                        }
                        None => init.ty,
                    };
                    let def_id = self.fresh_def(name, hir::DefKind::Local);
                    self.scopes
                        .last_mut()
                        .expect("scope stack is never empty inside a block")
                        .insert(name.clone(), LocalBinding { def_id, ty });
                    stmts.push(hir::Stmt {
                        hir_id: self.fresh_hir(),
                        kind: hir::StmtKind::Local {
                            def_id,
                            name: name.clone(),
                            ty,
                            init: Some(init),
                        },
                    });
                }
                ast::StmtKind::Expr(expr) => {
                    let expr = self.lower_expr(expr);
                    stmts.push(hir::Stmt {
                        hir_id: self.fresh_hir(),
                        kind: hir::StmtKind::Expr(expr),
                    });
                }
            }
        }

        let tail = block.tail.as_ref().map(|tail| Box::new(self.lower_expr(tail)));
        let ty = tail.as_ref().map(|tail| tail.ty).unwrap_or(hir::Ty::Unit);

        self.scopes.pop();

        hir::Expr {
            hir_id: self.fresh_hir(),
            kind: hir::ExprKind::Block { stmts, tail },
            ty,
            span,
        }
    }

    fn lower_expr(&mut self, expr: &ast::Expr) -> hir::Expr {
        let (kind, ty) = match &expr.kind {
            ast::ExprKind::Literal(lit) => {
                let ty = lit_ty(lit);
                (hir::ExprKind::Literal(lit.clone()), ty)
            }
            ast::ExprKind::Name(name) => match self.resolve_value(name) {
                Some((res, ty)) => (hir::ExprKind::Ref(res), ty),
                None => (
                    hir::ExprKind::Ref(hir::Res::Unresolved(name.clone())),
                    hir::Ty::Unknown,
                ),
            },
            ast::ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs);
                let rhs = self.lower_expr(rhs);
                let ty = self.binary_ty(*op, lhs.ty, rhs.ty);
                (
                    hir::ExprKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                )
            }
            ast::ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand);
                let ty = match op {
                    ovie_core::ops::UnOp::Neg => {
                        self.expect_ty(hir::Ty::Int, operand.ty, "unary `-` operand");
                        hir::Ty::Int
                    }
                    ovie_core::ops::UnOp::Not => {
                        self.expect_ty(hir::Ty::Bool, operand.ty, "unary `!` operand");
                        hir::Ty::Bool
                    }
                };
                (
                    hir::ExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                )
            }
            ast::ExprKind::Call { callee, args } => self.lower_call(callee, args),
            ast::ExprKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.lower_expr(cond);
                self.expect_ty(hir::Ty::Bool, cond.ty, "`if` condition");
                let then_expr = self.lower_block(then_block, expr.span);
                let else_expr = else_block
                    .as_ref()
                    .map(|block| Box::new(self.lower_block(block, expr.span)));
                let ty = match &else_expr {
                    Some(else_expr) => {
                        if then_expr.ty != else_expr.ty
                            && then_expr.ty != hir::Ty::Unknown
                            && else_expr.ty != hir::Ty::Unknown
                        {
                            self.error(
                                "E_TYPE_005",
                                format!(
                                    "`if` branches have different types: {} and {}",
                                    then_expr.ty, else_expr.ty
                                ),
                            );
                        }
                        then_expr.ty
                    }
                    None => hir::Ty::Unit,
                };
                (
                    hir::ExprKind::If {
                        cond: Box::new(cond),
                        then_expr: Box::new(then_expr),
                        else_expr,
                    },
                    ty,
                )
            }
            ast::ExprKind::While { cond, body } => {
                let cond = self.lower_expr(cond);
                self.expect_ty(hir::Ty::Bool, cond.ty, "`while` condition");
                let body = self.lower_block(body, expr.span);
                (
                    hir::ExprKind::While {
                        cond: Box::new(cond),
                        body: Box::new(body),
                    },
                    hir::Ty::Unit,
                )
            }
            ast::ExprKind::Block(block) => return self.lower_block(block, expr.span),
            ast::ExprKind::Assign { target, value } => {
                let value = self.lower_expr(value);
                let res = match self.resolve_local(target) {
                    Some(binding) => {
                        if binding.ty != value.ty && value.ty != hir::Ty::Unknown {
                            self.error(
                                "E_TYPE_006",
                                format!(
                                    "cannot assign {} to `{}` of type {}",
                                    value.ty, target, binding.ty
                                ),
                            );
                        }
                        hir::Res::Def(binding.def_id)
                    }
                    None => {
                        self.error(
                            "E_ASSIGN_001",
                            format!("cannot assign to `{}`: not a mutable binding in scope", target),
                        );
                        hir::Res::Unresolved(target.clone())
                    }
                };
                (
                    hir::ExprKind::Assign {
                        target: res,
                        value: Box::new(value),
                    },
                    hir::Ty::Unit,
                )
            }
            ast::ExprKind::Return(value) => {
                let value = value.as_ref().map(|value| Box::new(self.lower_expr(value)));
                (hir::ExprKind::Return(value), hir::Ty::Unit)
            }
        };

        hir::Expr {
            hir_id: self.fresh_hir(),
            kind,
            ty,
            span: expr.span,
        }
    }

    fn lower_call(&mut self, callee: &str, args: &[ast::Expr]) -> (hir::ExprKind, hir::Ty) {
        let args: Vec<_> = args.iter().map(|arg| self.lower_expr(arg)).collect();

        match self.globals.get(callee).cloned() {
            Some(Global::Function {
                def_id,
                params,
                ret_ty,
            }) => {
                if args.len() != params.len() {
                    self.error(
                        "E_ARITY_001",
                        format!(
                            "`{}` takes {} argument(s) but {} were supplied",
                            callee,
                            params.len(),
                            args.len()
                        ),
                    );
                } else {
                    for (index, (arg, expected)) in args.iter().zip(&params).enumerate() {
                        if arg.ty != *expected && arg.ty != hir::Ty::Unknown {
                            self.error(
                                "E_TYPE_003",
                                format!(
                                    "argument {} of `{}` expects {} but got {}",
                                    index + 1,
                                    callee,
                                    expected,
                                    arg.ty
                                ),
                            );
                        }
                    }
                }
                (
                    hir::ExprKind::Call {
                        callee: hir::Res::Def(def_id),
                        args,
                    },
                    ret_ty,
                )
            }
            Some(Global::Const { .. }) => {
                self.error("E_NAME_003", format!("`{}` is a constant, not a function", callee));
                (
                    hir::ExprKind::Call {
                        callee: hir::Res::Unresolved(callee.to_string()),
                        args,
                    },
                    hir::Ty::Unknown,
                )
            }
            None => {
                self.error("E_NAME_001", format!("unknown function `{}`", callee));
                (
                    hir::ExprKind::Call {
                        callee: hir::Res::Unresolved(callee.to_string()),
                        args,
                    },
                    hir::Ty::Unknown,
                )
            }
        }
    }

    fn resolve_value(&mut self, name: &str) -> Option<(hir::Res, hir::Ty)> {
        if let Some(binding) = self.resolve_local(name) {
            return Some((hir::Res::Def(binding.def_id), binding.ty));
        }
        match self.globals.get(name) {
            Some(Global::Const { def_id, ty }) => Some((hir::Res::Def(*def_id), *ty)),
            Some(Global::Function { .. }) => {
                self.error(
                    "E_NAME_003",
                    format!("`{}` is a function and cannot be used as a value", name),
                );
                None
            }
            None => {
                self.error("E_NAME_001", format!("unknown name `{}`", name));
                None
            }
        }
    }

    fn resolve_local(&self, name: &str) -> Option<LocalBinding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn resolve_ty(&mut self, ty: &ast::TyExpr) -> hir::Ty {
        match ty.name.as_str() {
            "int" => hir::Ty::Int,
            "bool" => hir::Ty::Bool,
            "str" => hir::Ty::Str,
            "unit" | "()" => hir::Ty::Unit,
            other => {
                self.error("E_TYPE_001", format!("unknown type `{}`", other));
                hir::Ty::Unknown
            }
        }
    }

    fn binary_ty(&mut self, op: ovie_core::ops::BinOp, lhs: hir::Ty, rhs: hir::Ty) -> hir::Ty {
        use ovie_core::ops::BinOp;
        if lhs == hir::Ty::Unknown || rhs == hir::Ty::Unknown {
            return hir::Ty::Unknown;
        }
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                if lhs != hir::Ty::Int || rhs != hir::Ty::Int {
                    self.error(
                        "E_TYPE_002",
                        format!("operator `{}` expects int operands, got {} and {}", op, lhs, rhs),
                    );
                }
                hir::Ty::Int
            }
            BinOp::Eq | BinOp::Ne => {
                if lhs != rhs {
                    self.error(
                        "E_TYPE_002",
                        format!("operator `{}` expects matching operands, got {} and {}", op, lhs, rhs),
                    );
                }
                hir::Ty::Bool
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if lhs != hir::Ty::Int || rhs != hir::Ty::Int {
                    self.error(
                        "E_TYPE_002",
                        format!("operator `{}` expects int operands, got {} and {}", op, lhs, rhs),
                    );
                }
                hir::Ty::Bool
            }
            BinOp::And | BinOp::Or => {
                if lhs != hir::Ty::Bool || rhs != hir::Ty::Bool {
                    self.error(
                        "E_TYPE_002",
                        format!("operator `{}` expects bool operands, got {} and {}", op, lhs, rhs),
                    );
                }
                hir::Ty::Bool
            }
        }
    }

    fn expect_ty(&mut self, expected: hir::Ty, actual: hir::Ty, what: &str) {
        if actual != expected && actual != hir::Ty::Unknown {
            self.error(
                "E_TYPE_004",
                format!("{} must be {}, got {}", what, expected, actual),
            );
        }
    }

    fn error(&mut self, code: &str, message: String) {
        self.diagnostics.push(Diagnostic::error(code, message));
    }

    fn fresh_def(&mut self, name: &str, kind: hir::DefKind) -> hir::DefId {
        let def_id = self.next_def_id;
        self.next_def_id += 1;
        self.def_map.insert(
            def_id,
            hir::DefInfo {
                name: name.to_string(),
                kind,
            },
        );
        def_id
    }

    fn fresh_hir(&mut self) -> hir::HirId {
        let hir_id = self.next_hir_id;
        self.next_hir_id += 1;
        hir_id
    }
}

fn lit_ty(lit: &Lit) -> hir::Ty {
    match lit {
        Lit::Int(_) => hir::Ty::Int,
        Lit::Bool(_) => hir::Ty::Bool,
        Lit::Str(_) => hir::Ty::Str,
        Lit::Unit => hir::Ty::Unit,
    }
}
