//! Git data structures and algorithms
//!
//! - `database`: Database entry types
//! - `objects`: Git object types (tree, commit) and their encodings
//! - `merge`: Single-level three-way tree merge
//! - `rewrite`: Rebase and linear history replay

pub mod database;
pub mod merge;
pub mod objects;
pub mod rewrite;
