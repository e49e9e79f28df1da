//! Core repository components
//!
//! - `database`: Object database channel (`git cat-file --batch`)
//! - `refs`: Reference resolution and compare-and-swap updates
//! - `memory`: In-memory stand-ins for both collaborators
//! - `repository`: Canonicalizing object store tying it all together

pub mod database;
pub(crate) mod git;
pub mod memory;
pub mod refs;
pub mod repository;
