//! Ovie Runtime Environment (ORE) resolution.
//!
//! Locates and validates the on-disk installation a compiler process depends
//! on. Resolution runs once at process start, the result is read-only for the
//! rest of the process lifetime, and nothing here ever triggers compilation.

pub mod resolve;
pub mod selfcheck;
pub mod targets;

pub use resolve::{
    resolve, resolve_with, DiscoverySources, RuntimeEnvironment, ENV_VAR, LOCAL_MARKER,
    REQUIRED_SUBDIRS,
};
pub use selfcheck::{self_check, SelfCheckEntry, SelfCheckReport};
pub use targets::installed_targets;
