use crate::areas::repository::Repository;
use crate::artifacts::merge::MergeStrategy;
use crate::artifacts::objects::commit::{CommitExt, CommitUpdate};
use crate::artifacts::objects::object::SharedCommit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::rewrite::{Rewriter, commit_range};
use crate::error::RewriteError;
use bytes::Bytes;
use colored::Colorize;
use std::io::Write;
use std::rc::Rc;
use tracing::{info, instrument};

/// Reflog message recorded on every reference update
pub const REWRITE_REASON: &str = "revise rewrite";

/// One edit: give `target` a new message and replay `reference` on top of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendRequest {
    /// Any descriptor naming the commit to amend
    pub target: Option<String>,
    /// Reference whose history contains `target`
    pub reference: String,
    /// Message paragraphs; empty keeps the current message
    pub message_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmendOutcome {
    /// The edit produced the commit that was already there
    Unchanged,
    Rewritten {
        reference: String,
        old_target: ObjectId,
        new_target: ObjectId,
        /// `(original, rewritten)` for the amended commit and each replayed one
        rewritten: Vec<(ObjectId, ObjectId)>,
    },
}

/// Join message lines into a message, one paragraph each
///
/// Every line is newline-terminated and paragraphs are separated by a blank
/// line, so `["a", "b"]` becomes `"a\n\nb\n"`.
pub fn build_message(lines: &[String]) -> Bytes {
    let paragraphs: Vec<String> = lines.iter().map(|line| format!("{line}\n")).collect();

    Bytes::from(paragraphs.join("\n"))
}

impl Repository {
    #[instrument(skip_all, fields(descriptor = ?request.target, reference = %request.reference))]
    pub fn amend(
        &self,
        request: &AmendRequest,
        strategy: MergeStrategy,
    ) -> anyhow::Result<AmendOutcome> {
        let mut reference = self.commit_ref(&request.reference)?;
        let head = reference
            .target()
            .cloned()
            .ok_or_else(|| RewriteError::UnresolvedReference(request.reference.clone()))?;

        let descriptor = request.target.as_deref().ok_or(RewriteError::MissingTarget)?;
        let target = self.resolve_commit_descriptor(descriptor)?;
        let chain = commit_range(self, &target, &head)?;

        let update = CommitUpdate {
            message: (!request.message_lines.is_empty())
                .then(|| build_message(&request.message_lines)),
            ..Default::default()
        };
        let amended = target.update(self, update)?;

        if Rc::ptr_eq(&amended, &target) {
            info!(descriptor, "amended commit equals the original, nothing to rewrite");
            writeln!(self.diagnostics(), "{} no changes performed", "(warning)".yellow())?;
            return Ok(AmendOutcome::Unchanged);
        }

        self.print_commit(&amended)?;

        let rewriter = Rewriter::new(self, strategy)?;
        let replayed = rewriter.replay(&chain, &amended)?;
        for commit in &replayed {
            self.print_commit(commit)?;
        }

        let new_head = replayed.last().cloned().unwrap_or_else(|| Rc::clone(&amended));
        self.update_ref(&mut reference, &new_head, REWRITE_REASON)?;

        writeln!(
            self.writer(),
            "Updated {} ({} => {})",
            reference.name(),
            head.oid().to_short_oid(),
            new_head.oid().to_short_oid()
        )?;
        info!(reference = reference.name(), new = %new_head.oid(), "history rewritten");

        let rewritten = std::iter::once(&target)
            .chain(chain.iter())
            .map(|commit| *commit.oid())
            .zip(std::iter::once(&amended).chain(replayed.iter()).map(|commit| *commit.oid()))
            .collect();

        Ok(AmendOutcome::Rewritten {
            reference: reference.name().to_string(),
            old_target: *head.oid(),
            new_target: *new_head.oid(),
            rewritten,
        })
    }

    fn print_commit(&self, commit: &SharedCommit) -> anyhow::Result<()> {
        writeln!(
            self.writer(),
            "{} {}",
            commit.oid().to_short_oid().yellow(),
            commit.summary()
        )?;

        Ok(())
    }
}
