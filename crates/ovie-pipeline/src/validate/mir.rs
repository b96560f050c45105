//! MIR validator: explicit control-flow form.
//!
//! Each basic block must carry exactly one terminator and it must be the final
//! instruction; branch targets and locals must be in range; and every value
//! must be defined before use along every path that reaches the use (a
//! forward must-reach dataflow over the CFG).

use super::rules;
use ovie_core::mir::{
    Body, Function, Instruction, Operand, Program, Rvalue, StatementKind, TerminatorKind,
};
use ovie_core::{InvariantViolation, Stage};
use std::collections::HashSet;

const DETECTED_AT: &str = "validate::mir";

pub fn validate(program: &Program) -> Result<(), InvariantViolation> {
    for function in &program.functions {
        validate_function(function)?;
    }
    Ok(())
}

fn validate_function(function: &Function) -> Result<(), InvariantViolation> {
    let body = &function.body;
    for (block_id, block) in body.basic_blocks.iter().enumerate() {
        let terminator_count = block.terminators().count();
        if terminator_count == 0 {
            return Err(violation(
                rules::MIR_NO_TERMINATOR,
                format!("fn `{}` bb{} has no terminator", function.name, block_id),
            ));
        }
        if terminator_count > 1 {
            return Err(violation(
                rules::MIR_MULTIPLE_TERMINATORS,
                format!(
                    "fn `{}` bb{} has {} terminators",
                    function.name, block_id, terminator_count
                ),
            ));
        }
        match block.instructions.last() {
            Some(Instruction::Terminator(_)) => {}
            _ => {
                return Err(violation(
                    rules::MIR_TERMINATOR_NOT_LAST,
                    format!(
                        "fn `{}` bb{} has instructions after its terminator",
                        function.name, block_id
                    ),
                ));
            }
        }

        for terminator in block.terminators() {
            for target in terminator.kind.successors() {
                if target as usize >= body.basic_blocks.len() {
                    return Err(violation(
                        rules::MIR_BRANCH_TARGET_OOB,
                        format!(
                            "fn `{}` bb{} branches to missing bb{}",
                            function.name, block_id, target
                        ),
                    ));
                }
            }
        }

        for_each_local(block, |local| {
            if local as usize >= body.locals.len() {
                Err(violation(
                    rules::MIR_LOCAL_OOB,
                    format!(
                        "fn `{}` bb{} references missing local _{}",
                        function.name, block_id, local
                    ),
                ))
            } else {
                Ok(())
            }
        })?;
    }

    check_def_before_use(function)
}

fn violation(rule_id: &'static str, node: String) -> InvariantViolation {
    InvariantViolation::new(Stage::Mir, rule_id, node, DETECTED_AT)
}

fn for_each_local(
    block: &ovie_core::mir::BasicBlockData,
    mut f: impl FnMut(u32) -> Result<(), InvariantViolation>,
) -> Result<(), InvariantViolation> {
    for instruction in &block.instructions {
        match instruction {
            Instruction::Statement(stmt) => {
                if let StatementKind::Assign { dest, rvalue } = &stmt.kind {
                    f(*dest)?;
                    for operand in rvalue_operands(rvalue) {
                        if let Operand::Copy(local) = operand {
                            f(*local)?;
                        }
                    }
                }
            }
            Instruction::Terminator(terminator) => {
                if let TerminatorKind::Branch { cond, .. } = &terminator.kind {
                    if let Operand::Copy(local) = cond {
                        f(*local)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn rvalue_operands(rvalue: &Rvalue) -> Vec<&Operand> {
    match rvalue {
        Rvalue::Use(operand) => vec![operand],
        Rvalue::Binary { lhs, rhs, .. } => vec![lhs, rhs],
        Rvalue::Unary { operand, .. } => vec![operand],
        Rvalue::Call { args, .. } => args.iter().collect(),
    }
}

/// Forward must-reach analysis: a local is "defined" at a program point only
/// if it is assigned on every path from entry to that point. Arguments are
/// defined on entry.
fn check_def_before_use(function: &Function) -> Result<(), InvariantViolation> {
    let body = &function.body;
    let block_count = body.basic_blocks.len();
    if block_count == 0 {
        return Ok(());
    }

    let entry_defined: HashSet<u32> = (1..=body.arg_count as u32).collect();
    let universe: HashSet<u32> = (0..body.locals.len() as u32).collect();

    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); block_count];
    for (block_id, block) in body.basic_blocks.iter().enumerate() {
        for terminator in block.terminators() {
            for target in terminator.kind.successors() {
                if (target as usize) < block_count {
                    predecessors[target as usize].push(block_id);
                }
            }
        }
    }

    // in-state per block; non-entry blocks start at the full universe so the
    // intersection over predecessors converges downward.
    let mut in_sets: Vec<HashSet<u32>> = (0..block_count)
        .map(|block_id| {
            if block_id == Body::ENTRY_BLOCK as usize {
                entry_defined.clone()
            } else {
                universe.clone()
            }
        })
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for block_id in 0..block_count {
            if block_id == Body::ENTRY_BLOCK as usize {
                continue;
            }
            let mut merged: Option<HashSet<u32>> = None;
            for &pred in &predecessors[block_id] {
                let out = transfer(&body.basic_blocks[pred], &in_sets[pred]);
                merged = Some(match merged {
                    None => out,
                    Some(acc) => acc.intersection(&out).copied().collect(),
                });
            }
            let Some(merged) = merged else {
                continue;
            };
            if merged != in_sets[block_id] {
                in_sets[block_id] = merged;
                changed = true;
            }
        }
    }

    for (block_id, block) in body.basic_blocks.iter().enumerate() {
        let mut defined = in_sets[block_id].clone();
        for instruction in &block.instructions {
            match instruction {
                Instruction::Statement(stmt) => {
                    if let StatementKind::Assign { dest, rvalue } = &stmt.kind {
                        for operand in rvalue_operands(rvalue) {
                            check_operand(function, block_id, operand, &defined)?;
                        }
                        defined.insert(*dest);
                    }
                }
                Instruction::Terminator(terminator) => {
                    if let TerminatorKind::Branch { cond, .. } = &terminator.kind {
                        check_operand(function, block_id, cond, &defined)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn transfer(block: &ovie_core::mir::BasicBlockData, input: &HashSet<u32>) -> HashSet<u32> {
    let mut defined = input.clone();
    for stmt in block.statements() {
        if let StatementKind::Assign { dest, .. } = &stmt.kind {
            defined.insert(*dest);
        }
    }
    defined
}

fn check_operand(
    function: &Function,
    block_id: usize,
    operand: &Operand,
    defined: &HashSet<u32>,
) -> Result<(), InvariantViolation> {
    if let Operand::Copy(local) = operand {
        if !defined.contains(local) {
            return Err(violation(
                rules::MIR_USE_BEFORE_DEF,
                format!(
                    "fn `{}` bb{} reads local _{} before any assignment on some path",
                    function.name, block_id, local
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovie_core::hir::Ty;
    use ovie_core::mir::{BasicBlockData, LocalDecl, Statement, Terminator};
    use ovie_core::ops::Lit;
    use ovie_core::span::Span;

    fn assign(dest: u32, rvalue: Rvalue) -> Instruction {
        Instruction::Statement(Statement {
            kind: StatementKind::Assign { dest, rvalue },
            span: Span::DUMMY,
        })
    }

    fn terminator(kind: TerminatorKind) -> Instruction {
        Instruction::Terminator(Terminator {
            kind,
            span: Span::DUMMY,
        })
    }

    fn function(locals: usize, arg_count: usize, blocks: Vec<BasicBlockData>) -> Function {
        Function {
            name: "main".to_string(),
            body: Body {
                locals: (0..locals)
                    .map(|_| LocalDecl {
                        name: None,
                        ty: Ty::Int,
                    })
                    .collect(),
                arg_count,
                basic_blocks: blocks,
            },
            span: Span::DUMMY,
        }
    }

    fn program(functions: Vec<Function>) -> Program {
        Program { functions }
    }

    #[test]
    fn single_return_block_passes() {
        let blocks = vec![BasicBlockData {
            instructions: vec![
                assign(0, Rvalue::Use(Operand::Const(Lit::Int(1)))),
                terminator(TerminatorKind::Return),
            ],
        }];
        assert!(validate(&program(vec![function(1, 0, blocks)])).is_ok());
    }

    #[test]
    fn zero_terminators_fail() {
        let blocks = vec![BasicBlockData {
            instructions: vec![assign(0, Rvalue::Use(Operand::Const(Lit::Int(1))))],
        }];
        let err = validate(&program(vec![function(1, 0, blocks)])).unwrap_err();
        assert_eq!(err.rule_id, rules::MIR_NO_TERMINATOR);
    }

    #[test]
    fn two_terminators_fail() {
        let blocks = vec![BasicBlockData {
            instructions: vec![
                terminator(TerminatorKind::Return),
                terminator(TerminatorKind::Return),
            ],
        }];
        let err = validate(&program(vec![function(1, 0, blocks)])).unwrap_err();
        assert_eq!(err.rule_id, rules::MIR_MULTIPLE_TERMINATORS);
    }

    #[test]
    fn terminator_in_the_middle_fails() {
        let blocks = vec![BasicBlockData {
            instructions: vec![
                terminator(TerminatorKind::Return),
                assign(0, Rvalue::Use(Operand::Const(Lit::Int(1)))),
            ],
        }];
        let err = validate(&program(vec![function(1, 0, blocks)])).unwrap_err();
        assert_eq!(err.rule_id, rules::MIR_TERMINATOR_NOT_LAST);
    }

    #[test]
    fn branch_to_missing_block_fails() {
        let blocks = vec![BasicBlockData {
            instructions: vec![terminator(TerminatorKind::Goto { target: 5 })],
        }];
        let err = validate(&program(vec![function(1, 0, blocks)])).unwrap_err();
        assert_eq!(err.rule_id, rules::MIR_BRANCH_TARGET_OOB);
    }

    #[test]
    fn use_before_def_on_one_path_fails() {
        // bb0 branches; only the then-path defines _1, yet the join reads it.
        let blocks = vec![
            BasicBlockData {
                instructions: vec![
                    assign(2, Rvalue::Use(Operand::Const(Lit::Bool(true)))),
                    terminator(TerminatorKind::Branch {
                        cond: Operand::Copy(2),
                        then_block: 1,
                        else_block: 2,
                    }),
                ],
            },
            BasicBlockData {
                instructions: vec![
                    assign(1, Rvalue::Use(Operand::Const(Lit::Int(7)))),
                    terminator(TerminatorKind::Goto { target: 3 }),
                ],
            },
            BasicBlockData {
                instructions: vec![terminator(TerminatorKind::Goto { target: 3 })],
            },
            BasicBlockData {
                instructions: vec![
                    assign(0, Rvalue::Use(Operand::Copy(1))),
                    terminator(TerminatorKind::Return),
                ],
            },
        ];
        let err = validate(&program(vec![function(3, 0, blocks)])).unwrap_err();
        assert_eq!(err.rule_id, rules::MIR_USE_BEFORE_DEF);
    }

    #[test]
    fn value_defined_on_every_path_passes() {
        let blocks = vec![
            BasicBlockData {
                instructions: vec![
                    assign(2, Rvalue::Use(Operand::Const(Lit::Bool(true)))),
                    terminator(TerminatorKind::Branch {
                        cond: Operand::Copy(2),
                        then_block: 1,
                        else_block: 2,
                    }),
                ],
            },
            BasicBlockData {
                instructions: vec![
                    assign(1, Rvalue::Use(Operand::Const(Lit::Int(7)))),
                    terminator(TerminatorKind::Goto { target: 3 }),
                ],
            },
            BasicBlockData {
                instructions: vec![
                    assign(1, Rvalue::Use(Operand::Const(Lit::Int(9)))),
                    terminator(TerminatorKind::Goto { target: 3 }),
                ],
            },
            BasicBlockData {
                instructions: vec![
                    assign(0, Rvalue::Use(Operand::Copy(1))),
                    terminator(TerminatorKind::Return),
                ],
            },
        ];
        assert!(validate(&program(vec![function(3, 0, blocks)])).is_ok());
    }

    #[test]
    fn arguments_are_defined_on_entry() {
        let blocks = vec![BasicBlockData {
            instructions: vec![
                assign(0, Rvalue::Use(Operand::Copy(1))),
                terminator(TerminatorKind::Return),
            ],
        }];
        assert!(validate(&program(vec![function(2, 1, blocks)])).is_ok());
    }

    #[test]
    fn loop_shaped_cfg_converges() {
        // bb0 -> bb1 (header) -> bb2 (body) -> bb1, header exits to bb3.
        let blocks = vec![
            BasicBlockData {
                instructions: vec![
                    assign(1, Rvalue::Use(Operand::Const(Lit::Int(0)))),
                    terminator(TerminatorKind::Goto { target: 1 }),
                ],
            },
            BasicBlockData {
                instructions: vec![
                    assign(2, Rvalue::Binary {
                        op: ovie_core::ops::BinOp::Lt,
                        lhs: Operand::Copy(1),
                        rhs: Operand::Const(Lit::Int(10)),
                    }),
                    terminator(TerminatorKind::Branch {
                        cond: Operand::Copy(2),
                        then_block: 2,
                        else_block: 3,
                    }),
                ],
            },
            BasicBlockData {
                instructions: vec![
                    assign(1, Rvalue::Binary {
                        op: ovie_core::ops::BinOp::Add,
                        lhs: Operand::Copy(1),
                        rhs: Operand::Const(Lit::Int(1)),
                    }),
                    terminator(TerminatorKind::Goto { target: 1 }),
                ],
            },
            BasicBlockData {
                instructions: vec![
                    assign(0, Rvalue::Use(Operand::Copy(1))),
                    terminator(TerminatorKind::Return),
                ],
            },
        ];
        assert!(validate(&program(vec![function(3, 0, blocks)])).is_ok());
    }

    #[test]
    fn missing_local_fails() {
        let blocks = vec![BasicBlockData {
            instructions: vec![
                assign(9, Rvalue::Use(Operand::Const(Lit::Int(1)))),
                terminator(TerminatorKind::Return),
            ],
        }];
        let err = validate(&program(vec![function(1, 0, blocks)])).unwrap_err();
        assert_eq!(err.rule_id, rules::MIR_LOCAL_OOB);
    }

    #[test]
    fn empty_body_is_fine() {
        assert!(validate(&program(vec![function(0, 0, Vec::new())])).is_ok());
    }
}
