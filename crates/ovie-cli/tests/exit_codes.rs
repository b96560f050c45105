//! The four-value exit-code contract, exercised end-to-end through the batch
//! driver: success, user error, compiler defect, environment failure.

use ovie_cli::commands::check::check_trees;
use ovie_cli::commands::compile::{run_units, select_target, BatchSummary, EmitOptions};
use ovie_core::backend::{AbiDescriptor, CallingConvention};
use ovie_core::diagnostics::DiagnosticDisplayOptions;
use ovie_core::error::exit;
use ovie_core::ops::Lit;
use ovie_core::span::Span;
use ovie_core::{ast, mir, StageTree};
use ovie_pipeline::ValidationContext;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TRIPLE: &str = "x86_64-unknown-linux-gnu";

fn linux_abi() -> AbiDescriptor {
    AbiDescriptor {
        target_triple: TRIPLE.to_string(),
        calling_convention: CallingConvention::SystemV,
        pointer_width: 64,
    }
}

fn ctx() -> ValidationContext {
    ValidationContext::with_targets(vec![linux_abi()])
}

fn write_tree(dir: &Path, name: &str, tree: &StageTree) -> PathBuf {
    let path = dir.join(name);
    let raw = serde_json::to_string_pretty(tree).expect("serialize tree");
    std::fs::write(&path, raw).expect("write tree");
    path
}

/// fn main() -> int { 42 }
fn valid_ast() -> StageTree {
    StageTree::Ast(ast::Module {
        name: "demo".to_string(),
        items: vec![ast::Item {
            id: 0,
            kind: ast::ItemKind::Function(ast::Function {
                name: "main".to_string(),
                params: Vec::new(),
                ret_ty: Some(ast::TyExpr {
                    id: 1,
                    name: "int".to_string(),
                    span: Span::DUMMY,
                }),
                body: ast::Block {
                    id: 2,
                    stmts: Vec::new(),
                    tail: Some(Box::new(ast::Expr {
                        id: 3,
                        kind: ast::ExprKind::Literal(Lit::Int(42)),
                        span: Span::DUMMY,
                        meta: ast::NodeMeta::default(),
                    })),
                },
            }),
            span: Span::DUMMY,
            meta: ast::NodeMeta::default(),
        }],
    })
}

/// fn main() { frobnicate() } — unresolved identifier, a pure user error.
fn broken_ast() -> StageTree {
    StageTree::Ast(ast::Module {
        name: "broken".to_string(),
        items: vec![ast::Item {
            id: 0,
            kind: ast::ItemKind::Function(ast::Function {
                name: "main".to_string(),
                params: Vec::new(),
                ret_ty: None,
                body: ast::Block {
                    id: 1,
                    stmts: Vec::new(),
                    tail: Some(Box::new(ast::Expr {
                        id: 2,
                        kind: ast::ExprKind::Call {
                            callee: "frobnicate".to_string(),
                            args: Vec::new(),
                        },
                        span: Span::DUMMY,
                        meta: ast::NodeMeta::default(),
                    })),
                },
            }),
            span: Span::DUMMY,
            meta: ast::NodeMeta::default(),
        }],
    })
}

/// A deliberately corrupted MIR body: one block, two terminators.
fn corrupt_mir() -> StageTree {
    let terminator = mir::Instruction::Terminator(mir::Terminator {
        kind: mir::TerminatorKind::Return,
        span: Span::DUMMY,
    });
    StageTree::Mir(mir::Program {
        functions: vec![mir::Function {
            name: "main".to_string(),
            body: mir::Body {
                locals: vec![mir::LocalDecl {
                    name: None,
                    ty: ovie_core::hir::Ty::Int,
                }],
                arg_count: 0,
                basic_blocks: vec![mir::BasicBlockData {
                    instructions: vec![terminator.clone(), terminator],
                }],
            },
            span: Span::DUMMY,
        }],
    })
}

fn emit_disabled() -> EmitOptions {
    EmitOptions {
        enabled: false,
        output_dir: None,
    }
}

async fn run_batch(inputs: Vec<PathBuf>) -> BatchSummary {
    run_units(
        ctx(),
        linux_abi(),
        inputs,
        emit_disabled(),
        DiagnosticDisplayOptions::plain(false),
    )
    .await
}

#[tokio::test]
async fn valid_program_exits_zero_and_emits_an_artifact() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_tree(dir.path(), "demo.ast.json", &valid_ast());

    let summary = run_units(
        ctx(),
        linux_abi(),
        vec![input.clone()],
        EmitOptions {
            enabled: true,
            output_dir: None,
        },
        DiagnosticDisplayOptions::plain(false),
    )
    .await;

    assert_eq!(summary.exit_code, exit::SUCCESS);
    assert_eq!(summary.succeeded, vec![input.clone()]);
    assert!(input.with_extension("art.json").is_file());
}

#[tokio::test]
async fn unresolved_identifier_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_tree(dir.path(), "broken.ast.json", &broken_ast());

    let summary = run_batch(vec![input]).await;
    assert_eq!(summary.exit_code, exit::SOURCE_ERROR);
}

#[tokio::test]
async fn corrupt_mir_exits_two() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_tree(dir.path(), "corrupt.mir.json", &corrupt_mir());

    let summary = run_batch(vec![input]).await;
    assert_eq!(summary.exit_code, exit::INVARIANT_VIOLATION);
}

#[tokio::test]
async fn a_broken_unit_does_not_halt_its_siblings() {
    let dir = TempDir::new().expect("tempdir");
    let broken = write_tree(dir.path(), "broken.ast.json", &broken_ast());
    let fine = write_tree(dir.path(), "fine.ast.json", &valid_ast());

    let summary = run_batch(vec![broken.clone(), fine.clone()]).await;

    // The batch fails, but the healthy unit still completed.
    assert_eq!(summary.exit_code, exit::SOURCE_ERROR);
    assert_eq!(summary.succeeded, vec![fine]);
    assert_eq!(summary.failed, vec![broken]);
}

#[tokio::test]
async fn a_violation_dominates_source_errors_in_a_batch() {
    let dir = TempDir::new().expect("tempdir");
    let broken = write_tree(dir.path(), "broken.ast.json", &broken_ast());
    let corrupt = write_tree(dir.path(), "corrupt.mir.json", &corrupt_mir());

    let summary = run_batch(vec![broken, corrupt]).await;
    assert_eq!(summary.exit_code, exit::INVARIANT_VIOLATION);
}

#[test]
fn check_flags_corrupt_mir_as_a_compiler_defect() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_tree(dir.path(), "corrupt.mir.json", &corrupt_mir());

    let code = check_trees(&ctx(), &[input], None);
    assert_eq!(code, exit::INVARIANT_VIOLATION);
}

#[test]
fn check_honors_a_required_stage_tag() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_tree(dir.path(), "demo.ast.json", &valid_ast());

    // The tree is a perfectly valid AST, but the caller demanded MIR.
    let code = check_trees(&ctx(), &[input], Some(ovie_core::Stage::Mir));
    assert_eq!(code, exit::INVARIANT_VIOLATION);
}

#[test]
fn unreadable_input_is_a_user_problem() {
    let code = check_trees(&ctx(), &[PathBuf::from("/nonexistent/unit.json")], None);
    assert_eq!(code, exit::SOURCE_ERROR);
}

#[test]
fn requested_target_must_be_installed() {
    assert!(select_target(&[linux_abi()], Some("wasm32-unknown-unknown")).is_none());
    assert_eq!(
        select_target(&[linux_abi()], None).map(|abi| abi.target_triple),
        Some(TRIPLE.to_string())
    );
}
