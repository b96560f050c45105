//! The lowering driver.
//!
//! Stages run strictly in sequence for one compilation unit: the validator for
//! a produced tree must pass before the next stage may trust it. A stage
//! cannot self-tag its way past validation — the driver owns the only path
//! from a raw [`StageTree`] to a [`ValidatedTree`].

use crate::error::UnitDiagnostics;
use crate::validate::{rules, validate_tree, ValidatedTree, ValidationContext};
use ovie_core::{Error, InvariantViolation, Stage, StageTree};
use tracing::{debug, info_span};

/// One lowering step: consumes a validated tree of `input_stage()` and must
/// produce a tree of the successor stage.
pub trait LowerStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn input_stage(&self) -> Stage;
    fn run(&self, tree: StageTree, diagnostics: &mut UnitDiagnostics)
        -> Result<StageTree, Error>;
}

pub struct LoweringPipeline {
    stages: Vec<Box<dyn LowerStage>>,
    ctx: ValidationContext,
}

impl LoweringPipeline {
    pub fn new(ctx: ValidationContext) -> Self {
        Self {
            stages: Vec::new(),
            ctx,
        }
    }

    pub fn with_stage(mut self, stage: impl LowerStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn context(&self) -> &ValidationContext {
        &self.ctx
    }

    /// Run one unit's tree from wherever it enters the pipeline through the
    /// last registered stage, validating at every boundary.
    ///
    /// Source errors accumulated by a stage halt the unit once the stage
    /// returns; an invariant violation aborts immediately.
    pub fn run(
        &self,
        tree: StageTree,
        diagnostics: &mut UnitDiagnostics,
    ) -> Result<ValidatedTree, Error> {
        let mut current = validate_tree(tree, &self.ctx)?;

        for stage in &self.stages {
            let input_stage = current.stage();
            if stage.input_stage() != input_stage {
                continue;
            }

            let span = info_span!("pipeline.stage", stage = stage.name());
            let _enter = span.enter();

            let Some(expected) = input_stage.successor() else {
                return Err(InvariantViolation::new(
                    input_stage,
                    rules::STAGE_TAG_MISMATCH,
                    format!(
                        "stage `{}` consumes {} which has no successor stage",
                        stage.name(),
                        input_stage
                    ),
                    "pipeline::boundary",
                )
                .into());
            };

            let produced = stage.run(current.into_inner(), diagnostics)?;
            if diagnostics.has_errors() {
                debug!(stage = stage.name(), unit = diagnostics.unit(), "unit halted");
                return Err(ovie_core::SourceError::new(
                    diagnostics.unit(),
                    diagnostics.set().clone(),
                )
                .into());
            }

            if produced.stage() != expected {
                return Err(InvariantViolation::new(
                    expected,
                    rules::STAGE_TAG_MISMATCH,
                    format!(
                        "stage `{}` consumed {} but produced {}",
                        stage.name(),
                        input_stage,
                        produced.describe()
                    ),
                    "pipeline::boundary",
                )
                .into());
            }

            current = validate_tree(produced, &self.ctx)?;
            debug!(stage = stage.name(), produced = %current.stage(), "stage complete");
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovie_core::ast::Module;
    use ovie_core::diagnostics::Diagnostic;
    use ovie_core::hir::Program;
    use std::collections::BTreeMap;

    struct SelfTaggingStage;

    impl LowerStage for SelfTaggingStage {
        fn name(&self) -> &'static str {
            "self-tag"
        }

        fn input_stage(&self) -> Stage {
            Stage::Ast
        }

        fn run(
            &self,
            tree: StageTree,
            _diagnostics: &mut UnitDiagnostics,
        ) -> Result<StageTree, Error> {
            // Hands back the same AST instead of lowering to HIR.
            Ok(tree)
        }
    }

    struct FailingStage;

    impl LowerStage for FailingStage {
        fn name(&self) -> &'static str {
            "resolve"
        }

        fn input_stage(&self) -> Stage {
            Stage::Ast
        }

        fn run(
            &self,
            _tree: StageTree,
            diagnostics: &mut UnitDiagnostics,
        ) -> Result<StageTree, Error> {
            diagnostics.push(Diagnostic::error("E_NAME_001", "unknown name `frobnicate`"));
            Ok(StageTree::Hir(Program {
                items: Vec::new(),
                def_map: BTreeMap::new(),
                next_hir_id: 0,
            }))
        }
    }

    fn ast_tree() -> StageTree {
        StageTree::Ast(Module {
            name: "unit".to_string(),
            items: Vec::new(),
        })
    }

    #[test]
    fn self_tagged_tree_is_rejected_at_the_boundary() {
        let pipeline = LoweringPipeline::new(ValidationContext::default())
            .with_stage(SelfTaggingStage);
        let mut diagnostics = UnitDiagnostics::new("unit");

        let err = pipeline.run(ast_tree(), &mut diagnostics).unwrap_err();
        match err {
            Error::Invariant(violation) => {
                assert_eq!(violation.rule_id, rules::STAGE_TAG_MISMATCH)
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn stage_errors_halt_the_unit_as_a_source_error() {
        let pipeline =
            LoweringPipeline::new(ValidationContext::default()).with_stage(FailingStage);
        let mut diagnostics = UnitDiagnostics::new("unit");

        let err = pipeline.run(ast_tree(), &mut diagnostics).unwrap_err();
        match err {
            Error::Source(source) => {
                assert_eq!(source.unit, "unit");
                assert_eq!(source.diagnostics.error_count(), 1);
            }
            other => panic!("expected source error, got {:?}", other),
        }
    }

    #[test]
    fn empty_pipeline_just_validates() {
        let pipeline = LoweringPipeline::new(ValidationContext::default());
        let mut diagnostics = UnitDiagnostics::new("unit");
        let validated = pipeline.run(ast_tree(), &mut diagnostics).unwrap();
        assert_eq!(validated.stage(), Stage::Ast);
    }
}
