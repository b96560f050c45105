//! Reference lowerings between the pipeline's fixed stages.
//!
//! Each step consumes a tree the driver has already validated at the previous
//! stage and produces the successor stage's tree; the driver revalidates the
//! result before anything downstream may trust it.

mod backend;
mod hir;
mod mir;

pub use backend::MirToBackend;
pub use hir::AstToHir;
pub use mir::HirToMir;

use crate::pipeline::LoweringPipeline;
use crate::validate::ValidationContext;
use ovie_core::backend::AbiDescriptor;

/// The full AST → HIR → MIR → Backend pipeline for one target ABI.
pub fn standard_pipeline(ctx: ValidationContext, abi: AbiDescriptor) -> LoweringPipeline {
    LoweringPipeline::new(ctx)
        .with_stage(AstToHir::new())
        .with_stage(HirToMir::new())
        .with_stage(MirToBackend::new(abi))
}
