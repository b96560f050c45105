//! Bootstrap verification: prove the compiler reproduces itself bit-for-bit
//! across generations.
//!
//! Gen0 (the trusted external bootstrap toolchain) compiles the compiler's own
//! sources into Gen1; Gen1 compiles the same sources into Gen2. The compiler
//! is reproducible when the two artifacts hash identically after build
//! timestamps are normalized away.

pub mod error;
pub mod hash;
pub mod invoke;
pub mod report;
pub mod verify;

pub use error::BootstrapError;
pub use report::{
    BootstrapGeneration, EnvironmentFingerprint, GenerationLabel, VerificationReport,
};
pub use verify::BootstrapVerifier;
