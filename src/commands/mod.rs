//! Command implementations
//!
//! Commands are `impl Repository` blocks that compose the object store, the
//! merge engine and the rewrite engine into one user-visible operation.

pub mod porcelain;
