//! Rebase and history replay
//!
//! A commit is moved onto a new parent by merging its own change (parent tree
//! to own tree) into the new parent's tree. Replaying a chain repeats that for
//! every descendant, oldest first, each one landing on the rewrite of its
//! predecessor.

use crate::areas::repository::Repository;
use crate::artifacts::merge::MergeStrategy;
use crate::artifacts::merge::tree_merger::TreeMerger;
use crate::artifacts::objects::commit::CommitExt;
use crate::artifacts::objects::object::SharedCommit;
use std::rc::Rc;
use tracing::{debug, instrument};

/// Linear chain from `oldest` (exclusive) to `newest` (inclusive), oldest first
///
/// Fails with [`crate::error::RewriteError::NonLinearHistory`] if a merge
/// commit is met on the way, or if the walk reaches a root commit without
/// meeting `oldest`.
pub fn commit_range(
    repository: &Repository,
    oldest: &SharedCommit,
    newest: &SharedCommit,
) -> anyhow::Result<Vec<SharedCommit>> {
    let mut commits = Vec::new();
    let mut cursor = Rc::clone(newest);

    while cursor.oid() != oldest.oid() {
        let parent = cursor.prev(repository)?;
        commits.push(cursor);
        cursor = parent;
    }

    commits.reverse();

    Ok(commits)
}

pub struct Rewriter<'r> {
    repository: &'r Repository,
    merger: TreeMerger<'r>,
}

impl<'r> Rewriter<'r> {
    pub fn new(repository: &'r Repository, strategy: MergeStrategy) -> anyhow::Result<Self> {
        Ok(Rewriter {
            repository,
            merger: TreeMerger::new(repository, strategy)?,
        })
    }

    /// Re-parent `commit` onto `new_parent`
    ///
    /// A commit already sitting on `new_parent` comes back unchanged. The
    /// result keeps the author and message and gets the default committer.
    #[instrument(skip_all, fields(commit = %commit.oid(), onto = %new_parent.oid()))]
    pub fn rebase(
        &self,
        commit: &SharedCommit,
        new_parent: &SharedCommit,
    ) -> anyhow::Result<SharedCommit> {
        let parent = commit.prev(self.repository)?;
        if parent.oid() == new_parent.oid() {
            debug!("already on the requested parent");
            return Ok(Rc::clone(commit));
        }

        let tree = self.merger.merge(
            &new_parent.tree(self.repository)?,
            &parent.tree(self.repository)?,
            &commit.tree(self.repository)?,
        )?;

        let rebased = self.repository.new_commit(
            &tree,
            &[Rc::clone(new_parent)],
            commit.message().clone(),
            Some(commit.author().clone()),
            None,
        )?;
        debug!(rebased = %rebased.oid(), "commit rebased");

        Ok(rebased)
    }

    /// Rebase every commit of `chain` onto the rewrite of the one before it
    ///
    /// Returns the rewritten chain; its last element is the new tip.
    pub fn replay(
        &self,
        chain: &[SharedCommit],
        onto: &SharedCommit,
    ) -> anyhow::Result<Vec<SharedCommit>> {
        let mut current = Rc::clone(onto);
        let mut rewritten = Vec::with_capacity(chain.len());

        for commit in chain {
            current = self.rebase(commit, &current)?;
            rewritten.push(Rc::clone(&current));
        }

        Ok(rewritten)
    }
}
