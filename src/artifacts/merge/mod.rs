//! Three-way tree merge
//!
//! Merges two variants of a tree (`current` and `other`) against their common
//! ancestor (`root`), one tree level only:
//!
//! ```text
//! root == current  →  take other
//! root == other    →  take current
//! current == other →  take either
//! otherwise        →  conflict
//! ```
//!
//! An absent entry is a valid value in every comparison, so deletions merge by
//! the same rules. Subtrees are compared by id and never descended into; two
//! sides editing different files of the same directory therefore conflict.
//!
//! Each name resolves independently of the others, which lets
//! [`MergeStrategy::Parallel`] spread the work across a small tokio runtime.

pub mod resolution;
pub mod tree_merger;

use std::num::NonZeroUsize;

/// How per-name resolution is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    #[default]
    Sequential,
    /// Fan names out over at most `workers` threads
    Parallel { workers: NonZeroUsize },
}

impl MergeStrategy {
    /// Parallel over `workers` threads, or every available core when `None`
    pub fn parallel(workers: Option<NonZeroUsize>) -> Self {
        let workers = workers
            .or_else(|| std::thread::available_parallelism().ok())
            .unwrap_or(NonZeroUsize::MIN);

        MergeStrategy::Parallel { workers }
    }
}
