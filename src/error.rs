//! Failure kinds of a history rewrite.
//!
//! Everything is carried through `anyhow`; these variants are the ones callers
//! are expected to tell apart (via `downcast_ref`). None of them is retried and
//! none triggers a rollback: objects written before the failure stay in the
//! database, unreferenced.

use crate::artifacts::objects::object_id::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("object {0} does not exist")]
    MissingObject(String),

    #[error("malformed {kind}: {reason}")]
    MalformedRecord { kind: &'static str, reason: String },

    #[error("unsupported object kind '{kind}' for {descriptor}")]
    UnsupportedObjectKind { descriptor: String, kind: String },

    #[error("merge conflict on entry '{0}'")]
    MergeConflict(String),

    #[error("commit {oid} has {parents} parents, only linear history can be rewritten")]
    NonLinearHistory { oid: ObjectId, parents: usize },

    #[error("reference {0} could not be resolved")]
    UnresolvedReference(String),

    #[error("reference {name} was updated concurrently (expected {expected})")]
    StaleReference { name: String, expected: ObjectId },

    #[error("object id mismatch: expected {expected}, database reported {actual}")]
    IntegrityMismatch {
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("object database channel is broken: {0}")]
    BrokenChannel(String),

    #[error("no target commit given")]
    MissingTarget,
}

impl RewriteError {
    pub fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        RewriteError::MalformedRecord {
            kind,
            reason: reason.into(),
        }
    }
}
