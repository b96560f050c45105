//! MIR → backend artifact: symbol table, relocations, and an opaque encoded
//! payload. The encoding is a deterministic placeholder object format — the
//! integrity subsystem only ever checks it, never executes it.

use crate::error::UnitDiagnostics;
use crate::pipeline::LowerStage;
use crate::validate::rules;
use ovie_core::backend::{AbiDescriptor, Artifact, Relocation, Symbol, SymbolKind};
use ovie_core::mir::{Instruction, Rvalue, StatementKind, TerminatorKind};
use ovie_core::{Error, InvariantViolation, Stage, StageTree};

const SYMBOL_BASE: u64 = 0x1000;
const SYMBOL_STRIDE: u64 = 0x100;

pub struct MirToBackend {
    abi: AbiDescriptor,
}

impl MirToBackend {
    pub fn new(abi: AbiDescriptor) -> Self {
        Self { abi }
    }
}

impl LowerStage for MirToBackend {
    fn name(&self) -> &'static str {
        "mir→backend"
    }

    fn input_stage(&self) -> Stage {
        Stage::Mir
    }

    fn run(
        &self,
        tree: StageTree,
        diagnostics: &mut UnitDiagnostics,
    ) -> Result<StageTree, Error> {
        let program = match tree {
            StageTree::Mir(program) => program,
            other => {
                return Err(InvariantViolation::new(
                    Stage::Mir,
                    rules::STAGE_TAG_MISMATCH,
                    format!("mir→backend received {}", other.describe()),
                    "lower::backend",
                )
                .into())
            }
        };

        let mut symbols = Vec::new();
        let mut relocations = Vec::new();
        let mut bytes = Vec::new();

        for (index, function) in program.functions.iter().enumerate() {
            symbols.push(Symbol {
                name: function.name.clone(),
                kind: SymbolKind::Function,
                address: Some(SYMBOL_BASE + index as u64 * SYMBOL_STRIDE),
            });
            encode_function(function, &mut bytes, &mut relocations);
        }

        Ok(StageTree::Backend(Artifact {
            module_name: diagnostics.unit().to_string(),
            abi: self.abi.clone(),
            symbols,
            relocations,
            bytes,
        }))
    }
}

// Single-byte opcodes of the placeholder object format.
const OP_NOP: u8 = 0x00;
const OP_ASSIGN: u8 = 0x01;
const OP_CALL: u8 = 0x02;
const OP_GOTO: u8 = 0x10;
const OP_BRANCH: u8 = 0x11;
const OP_RETURN: u8 = 0x12;

fn encode_function(
    function: &ovie_core::mir::Function,
    bytes: &mut Vec<u8>,
    relocations: &mut Vec<Relocation>,
) {
    for block in &function.body.basic_blocks {
        for instruction in &block.instructions {
            match instruction {
                Instruction::Statement(stmt) => match &stmt.kind {
                    StatementKind::Assign { rvalue, .. } => {
                        if let Rvalue::Call { callee, .. } = rvalue {
                            relocations.push(Relocation {
                                offset: bytes.len() as u64,
                                symbol: callee.clone(),
                            });
                            bytes.push(OP_CALL);
                        } else {
                            bytes.push(OP_ASSIGN);
                        }
                    }
                    StatementKind::Nop => bytes.push(OP_NOP),
                },
                Instruction::Terminator(terminator) => match terminator.kind {
                    TerminatorKind::Goto { .. } => bytes.push(OP_GOTO),
                    TerminatorKind::Branch { .. } => bytes.push(OP_BRANCH),
                    TerminatorKind::Return => bytes.push(OP_RETURN),
                },
            }
        }
    }
}
