use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::merge::MergeStrategy;
use crate::artifacts::merge::resolution::{EntryTriple, Slot, merge_entries};
use crate::artifacts::objects::object::SharedTree;
use crate::error::RewriteError;
use anyhow::Context;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use tokio::runtime::Runtime;
use tokio::task::JoinSet;
use tracing::debug;

type Resolved = Vec<(Bytes, Result<Slot, RewriteError>)>;

/// Merges trees of one repository under a fixed [`MergeStrategy`]
///
/// The parallel strategy owns its runtime, so one merger can be reused for a
/// whole chain of rebases without respawning threads.
pub struct TreeMerger<'r> {
    repository: &'r Repository,
    runtime: Option<(Runtime, usize)>,
}

impl<'r> TreeMerger<'r> {
    pub fn new(repository: &'r Repository, strategy: MergeStrategy) -> anyhow::Result<Self> {
        let runtime = match strategy {
            MergeStrategy::Sequential => None,
            MergeStrategy::Parallel { workers } => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(workers.get())
                    .thread_name("revise-merge")
                    .build()
                    .context("failed to start merge workers")?;
                Some((runtime, workers.get()))
            }
        };

        Ok(TreeMerger {
            repository,
            runtime,
        })
    }

    /// Merge `other` into `current`, both descending from `root`
    pub fn merge(
        &self,
        current: &SharedTree,
        root: &SharedTree,
        other: &SharedTree,
    ) -> anyhow::Result<SharedTree> {
        let names: BTreeSet<&Bytes> = current
            .names()
            .chain(root.names())
            .chain(other.names())
            .collect();

        let work: Vec<(Bytes, EntryTriple)> = names
            .into_iter()
            .map(|name| {
                let triple = EntryTriple::new(
                    current.get(name).copied(),
                    root.get(name).copied(),
                    other.get(name).copied(),
                );
                (name.clone(), triple)
            })
            .collect();

        let resolved = match &self.runtime {
            None => resolve_all(work),
            Some((runtime, workers)) => resolve_parallel(runtime, *workers, work)?,
        };

        // resolved is keyed by name, so the first error is the smallest
        // conflicting name no matter which worker found it
        let mut entries: BTreeMap<Bytes, DatabaseEntry> = BTreeMap::new();
        for (name, slot) in resolved {
            if let Some(entry) = slot? {
                entries.insert(name, entry);
            }
        }

        let merged = self.repository.new_tree(entries)?;
        debug!(
            current = %current.oid(),
            root = %root.oid(),
            other = %other.oid(),
            merged = %merged.oid(),
            "trees merged"
        );

        Ok(merged)
    }
}

fn resolve_all(work: Vec<(Bytes, EntryTriple)>) -> Resolved {
    work.into_iter()
        .map(|(name, triple)| {
            let slot = merge_entries(&name, &triple);
            (name, slot)
        })
        .collect()
}

fn resolve_parallel(
    runtime: &Runtime,
    workers: usize,
    work: Vec<(Bytes, EntryTriple)>,
) -> anyhow::Result<Resolved> {
    if work.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = work.len().div_ceil(workers);

    runtime.block_on(async move {
        let mut tasks = JoinSet::new();
        let mut work = work.into_iter().peekable();
        while work.peek().is_some() {
            let chunk: Vec<_> = work.by_ref().take(chunk_size).collect();
            tasks.spawn(async move { resolve_all(chunk) });
        }

        // completion order is arbitrary; re-key every result by its name
        let mut by_name = BTreeMap::new();
        while let Some(chunk) = tasks.join_next().await {
            by_name.extend(chunk.context("merge worker failed")?);
        }

        Ok::<_, anyhow::Error>(by_name.into_iter().collect())
    })
}
