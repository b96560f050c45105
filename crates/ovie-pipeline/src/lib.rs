//! Stage validators and the lowering pipeline driver.
//!
//! Every stage boundary is a trust boundary: a lowering step may only consume
//! a tree the matching validator has passed, and validation is mandatory in
//! debug and release builds alike.

pub mod error;
pub mod lower;
pub mod pipeline;
pub mod validate;

pub use error::UnitDiagnostics;
pub use lower::{standard_pipeline, AstToHir, HirToMir, MirToBackend};
pub use pipeline::{LowerStage, LoweringPipeline};
pub use validate::{validate, validate_as, validate_tree, ValidatedTree, ValidationContext};
