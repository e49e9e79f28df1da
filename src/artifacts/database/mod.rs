//! Tree entry types
//!
//! A database entry is what a tree stores under a name: the target object id
//! together with its mode. The merge engine compares these values directly.

pub mod database_entry;
