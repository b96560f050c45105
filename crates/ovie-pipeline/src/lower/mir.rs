//! HIR → MIR: flatten typed expressions into basic blocks with explicit
//! control flow. Constants are folded into their use sites; every temporary
//! becomes a named local so the def-before-use check has something to bite on.

use crate::error::UnitDiagnostics;
use crate::pipeline::LowerStage;
use crate::validate::rules;
use ovie_core::ops::Lit;
use ovie_core::span::Span;
use ovie_core::{hir, mir, Error, InvariantViolation, Stage, StageTree};
use std::collections::HashMap;

pub struct HirToMir;

impl HirToMir {
    pub fn new() -> Self {
        HirToMir
    }
}

impl Default for HirToMir {
    fn default() -> Self {
        Self::new()
    }
}

impl LowerStage for HirToMir {
    fn name(&self) -> &'static str {
        "hir→mir"
    }

    fn input_stage(&self) -> Stage {
        Stage::Hir
    }

    fn run(
        &self,
        tree: StageTree,
        _diagnostics: &mut UnitDiagnostics,
    ) -> Result<StageTree, Error> {
        let program = match tree {
            StageTree::Hir(program) => program,
            other => {
                return Err(InvariantViolation::new(
                    Stage::Hir,
                    rules::STAGE_TAG_MISMATCH,
                    format!("hir→mir received {}", other.describe()),
                    "lower::mir",
                )
                .into())
            }
        };

        let mut consts: HashMap<hir::DefId, Lit> = HashMap::new();
        let mut fn_names: HashMap<hir::DefId, String> = HashMap::new();
        for item in &program.items {
            match &item.kind {
                hir::ItemKind::Const(const_def) => {
                    if let hir::ExprKind::Literal(lit) = &const_def.value.kind {
                        consts.insert(item.def_id, lit.clone());
                    }
                }
                hir::ItemKind::Function(function) => {
                    fn_names.insert(item.def_id, function.name.clone());
                }
            }
        }

        let mut functions = Vec::new();
        for item in &program.items {
            if let hir::ItemKind::Function(function) = &item.kind {
                functions.push(lower_function(function, item.span, &consts, &fn_names));
            }
        }

        Ok(StageTree::Mir(mir::Program { functions }))
    }
}

fn lower_function(
    function: &hir::Function,
    span: Span,
    consts: &HashMap<hir::DefId, Lit>,
    fn_names: &HashMap<hir::DefId, String>,
) -> mir::Function {
    let mut lowering = FunctionLowering::new(function, consts, fn_names);
    let result = lowering.lower_expr(&function.body.value);

    // Fall-off-the-end return: assign the body value to the return place and
    // terminate whatever block is still open.
    if !lowering.current_terminated() {
        lowering.push_assign(mir::Body::RETURN_LOCAL, mir::Rvalue::Use(result));
        lowering.terminate(mir::TerminatorKind::Return, span);
    }

    mir::Function {
        name: function.name.clone(),
        body: mir::Body {
            locals: lowering.locals,
            arg_count: function.params.len(),
            basic_blocks: lowering.blocks,
        },
        span,
    }
}

struct FunctionLowering<'a> {
    locals: Vec<mir::LocalDecl>,
    blocks: Vec<mir::BasicBlockData>,
    current: mir::BlockId,
    bindings: HashMap<hir::DefId, mir::LocalId>,
    consts: &'a HashMap<hir::DefId, Lit>,
    fn_names: &'a HashMap<hir::DefId, String>,
}

impl<'a> FunctionLowering<'a> {
    fn new(
        function: &hir::Function,
        consts: &'a HashMap<hir::DefId, Lit>,
        fn_names: &'a HashMap<hir::DefId, String>,
    ) -> Self {
        let mut locals = vec![mir::LocalDecl {
            name: None,
            ty: function.ret_ty,
        }];
        let mut bindings = HashMap::new();
        for param in &function.params {
            bindings.insert(param.def_id, locals.len() as mir::LocalId);
            locals.push(mir::LocalDecl {
                name: Some(param.name.clone()),
                ty: param.ty,
            });
        }

        Self {
            locals,
            blocks: vec![mir::BasicBlockData::default()],
            current: mir::Body::ENTRY_BLOCK,
            bindings,
            consts,
            fn_names,
        }
    }

    fn new_local(&mut self, name: Option<String>, ty: hir::Ty) -> mir::LocalId {
        let local = self.locals.len() as mir::LocalId;
        self.locals.push(mir::LocalDecl { name, ty });
        local
    }

    fn new_block(&mut self) -> mir::BlockId {
        let block = self.blocks.len() as mir::BlockId;
        self.blocks.push(mir::BasicBlockData::default());
        block
    }

    fn switch_to(&mut self, block: mir::BlockId) {
        self.current = block;
    }

    fn current_terminated(&self) -> bool {
        self.blocks[self.current as usize]
            .terminators()
            .next()
            .is_some()
    }

    fn push_assign(&mut self, dest: mir::LocalId, rvalue: mir::Rvalue) {
        self.blocks[self.current as usize]
            .instructions
            .push(mir::Instruction::Statement(mir::Statement {
                kind: mir::StatementKind::Assign { dest, rvalue },
                span: Span::DUMMY,
            }));
    }

    fn terminate(&mut self, kind: mir::TerminatorKind, span: Span) {
        self.blocks[self.current as usize]
            .instructions
            .push(mir::Instruction::Terminator(mir::Terminator { kind, span }));
    }

    fn lower_expr(&mut self, expr: &hir::Expr) -> mir::Operand {
        match &expr.kind {
            hir::ExprKind::Literal(lit) => mir::Operand::Const(lit.clone()),
            hir::ExprKind::Ref(res) => self.lower_ref(res),
            hir::ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs);
                let rhs = self.lower_expr(rhs);
                let temp = self.new_local(None, expr.ty);
                self.push_assign(temp, mir::Rvalue::Binary { op: *op, lhs, rhs });
                mir::Operand::Copy(temp)
            }
            hir::ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand);
                let temp = self.new_local(None, expr.ty);
                self.push_assign(temp, mir::Rvalue::Unary { op: *op, operand });
                mir::Operand::Copy(temp)
            }
            hir::ExprKind::Call { callee, args } => {
                let args: Vec<_> = args.iter().map(|arg| self.lower_expr(arg)).collect();
                let callee = match callee {
                    hir::Res::Def(def_id) => self
                        .fn_names
                        .get(def_id)
                        .cloned()
                        .unwrap_or_else(|| format!("def{}", def_id)),
                    hir::Res::Unresolved(name) => name.clone(),
                };
                let temp = self.new_local(None, expr.ty);
                self.push_assign(temp, mir::Rvalue::Call { callee, args });
                mir::Operand::Copy(temp)
            }
            hir::ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => {
                let cond = self.lower_expr(cond);
                let result = self.new_local(None, expr.ty);
                let then_block = self.new_block();
                let else_block = self.new_block();
                let join_block = self.new_block();
                self.terminate(
                    mir::TerminatorKind::Branch {
                        cond,
                        then_block,
                        else_block,
                    },
                    expr.span,
                );

                self.switch_to(then_block);
                let then_value = self.lower_expr(then_expr);
                if !self.current_terminated() {
                    self.push_assign(result, mir::Rvalue::Use(then_value));
                    self.terminate(mir::TerminatorKind::Goto { target: join_block }, expr.span);
                }

                self.switch_to(else_block);
                let else_value = match else_expr {
                    Some(else_expr) => self.lower_expr(else_expr),
                    None => mir::Operand::Const(Lit::Unit),
                };
                if !self.current_terminated() {
                    self.push_assign(result, mir::Rvalue::Use(else_value));
                    self.terminate(mir::TerminatorKind::Goto { target: join_block }, expr.span);
                }

                self.switch_to(join_block);
                mir::Operand::Copy(result)
            }
            hir::ExprKind::While { cond, body } => {
                let header = self.new_block();
                self.terminate(mir::TerminatorKind::Goto { target: header }, expr.span);

                self.switch_to(header);
                let cond = self.lower_expr(cond);
                let body_block = self.new_block();
                let exit_block = self.new_block();
                self.terminate(
                    mir::TerminatorKind::Branch {
                        cond,
                        then_block: body_block,
                        else_block: exit_block,
                    },
                    expr.span,
                );

                self.switch_to(body_block);
                let _ = self.lower_expr(body);
                if !self.current_terminated() {
                    self.terminate(mir::TerminatorKind::Goto { target: header }, expr.span);
                }

                self.switch_to(exit_block);
                mir::Operand::Const(Lit::Unit)
            }
            hir::ExprKind::Block { stmts, tail } => {
                for stmt in stmts {
                    self.lower_stmt(stmt);
                }
                match tail {
                    Some(tail) => self.lower_expr(tail),
                    None => mir::Operand::Const(Lit::Unit),
                }
            }
            hir::ExprKind::Assign { target, value } => {
                let value = self.lower_expr(value);
                if let hir::Res::Def(def_id) = target {
                    if let Some(&local) = self.bindings.get(def_id) {
                        self.push_assign(local, mir::Rvalue::Use(value));
                    }
                }
                mir::Operand::Const(Lit::Unit)
            }
            hir::ExprKind::Return(value) => {
                let value = match value {
                    Some(value) => self.lower_expr(value),
                    None => mir::Operand::Const(Lit::Unit),
                };
                self.push_assign(mir::Body::RETURN_LOCAL, mir::Rvalue::Use(value));
                self.terminate(mir::TerminatorKind::Return, expr.span);
                // Anything after the return lands in a fresh, unreachable
                // block; it is terminated when the function is finalized.
                let continuation = self.new_block();
                self.switch_to(continuation);
                mir::Operand::Const(Lit::Unit)
            }
        }
    }

    fn lower_stmt(&mut self, stmt: &hir::Stmt) {
        match &stmt.kind {
            hir::StmtKind::Local {
                def_id,
                name,
                ty,
                init,
            } => {
                let local = self.new_local(Some(name.clone()), *ty);
                self.bindings.insert(*def_id, local);
                if let Some(init) = init {
                    let value = self.lower_expr(init);
                    self.push_assign(local, mir::Rvalue::Use(value));
                }
            }
            hir::StmtKind::Expr(expr) => {
                let _ = self.lower_expr(expr);
            }
        }
    }

    fn lower_ref(&mut self, res: &hir::Res) -> mir::Operand {
        match res {
            hir::Res::Def(def_id) => {
                if let Some(&local) = self.bindings.get(def_id) {
                    mir::Operand::Copy(local)
                } else if let Some(lit) = self.consts.get(def_id) {
                    mir::Operand::Const(lit.clone())
                } else {
                    mir::Operand::Const(Lit::Unit)
                }
            }
            hir::Res::Unresolved(_) => mir::Operand::Const(Lit::Unit),
        }
    }
}
