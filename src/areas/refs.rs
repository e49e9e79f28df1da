//! Git references (branches, HEAD, tags)
//!
//! References are human-readable names pointing to commits. This crate never
//! writes ref files itself: reads and updates go through a [`RefStore`], and
//! every update is a compare-and-swap against the value observed earlier, so a
//! concurrent writer makes the update fail instead of being overwritten.

use crate::areas::git::{git_string, run_git};
use crate::artifacts::objects::object::SharedCommit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::RewriteError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Outcome of resolving a (possibly abbreviated) reference name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    /// Fully-qualified name, e.g. `refs/heads/main`
    pub name: String,
    /// Current target; `None` when the reference does not point anywhere yet
    pub target: Option<ObjectId>,
}

pub trait RefStore {
    fn resolve(&self, name: &str) -> anyhow::Result<ResolvedRef>;

    /// Point `name` at `new` if it currently points at `expected`
    ///
    /// `expected == None` means the reference must not exist.
    fn compare_and_swap(
        &self,
        name: &str,
        new: &ObjectId,
        reason: &str,
        expected: Option<&ObjectId>,
    ) -> anyhow::Result<()>;
}

/// A named pointer to a commit, as last observed
#[derive(Debug, Clone)]
pub struct Reference {
    name: String,
    target: Option<SharedCommit>,
}

impl Reference {
    pub(crate) fn new(name: String, target: Option<SharedCommit>) -> Self {
        Reference { name, target }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<&SharedCommit> {
        self.target.as_ref()
    }

    pub(crate) fn set_target(&mut self, target: Option<SharedCommit>) {
        self.target = target;
    }
}

/// References read with `git rev-parse`, updated with `git update-ref`
#[derive(Debug)]
pub struct GitRefs {
    workdir: PathBuf,
}

impl GitRefs {
    pub fn new(workdir: &Path) -> Self {
        GitRefs {
            workdir: workdir.to_path_buf(),
        }
    }
}

impl RefStore for GitRefs {
    fn resolve(&self, name: &str) -> anyhow::Result<ResolvedRef> {
        let full_name = git_string(&self.workdir, &["rev-parse", "--symbolic-full-name", name])
            .map_err(|_| RewriteError::UnresolvedReference(name.to_string()))?;
        if full_name.is_empty() {
            return Err(RewriteError::UnresolvedReference(name.to_string()).into());
        }

        let output = run_git(
            &self.workdir,
            &["rev-parse", "--verify", "--quiet", &full_name],
            None,
        )?;
        let target = if output.status.success() {
            let hex = String::from_utf8_lossy(&output.stdout);
            Some(ObjectId::try_parse(hex.trim())?)
        } else {
            None
        };

        debug!(name, full_name, ?target, "reference resolved");

        Ok(ResolvedRef {
            name: full_name,
            target,
        })
    }

    fn compare_and_swap(
        &self,
        name: &str,
        new: &ObjectId,
        reason: &str,
        expected: Option<&ObjectId>,
    ) -> anyhow::Result<()> {
        let expected = expected.copied().unwrap_or_else(ObjectId::null);
        let new = new.to_hex();
        let old = expected.to_hex();

        let output = run_git(
            &self.workdir,
            &["update-ref", "-m", reason, name, &new, &old],
            None,
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !reports_stale_value(&stderr) {
                anyhow::bail!("git update-ref {name} failed: {stderr}");
            }

            return Err(anyhow::Error::new(RewriteError::StaleReference {
                name: name.to_string(),
                expected,
            })
            .context(stderr));
        }

        Ok(())
    }
}

/// Messages `update-ref` prints when the old value check fails
const STALE_VALUE_MARKERS: [&str; 3] = [
    "but expected",
    "reference already exists",
    "unable to resolve reference",
];

/// Whether `update-ref` failed because the reference moved, as opposed to
/// lock contention or a bad name
fn reports_stale_value(stderr: &str) -> bool {
    STALE_VALUE_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
}
