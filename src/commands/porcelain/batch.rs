//! Several message edits read from a file
//!
//! Each non-blank line is `<target> <message...>`. Lines run in order as
//! separate edits of the same reference. A target given as the id of a commit
//! that an earlier line already rewrote is translated to the rewritten commit,
//! since the original is no longer part of the reference's history.

use crate::areas::repository::Repository;
use crate::artifacts::merge::MergeStrategy;
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::porcelain::amend::{AmendOutcome, AmendRequest};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEdit {
    pub line: usize,
    pub target: String,
    pub message: String,
}

/// Parse a batch script, skipping blank lines
pub fn parse_batch(script: &str) -> anyhow::Result<Vec<BatchEdit>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let line_number = index + 1;
            let line = line.trim();
            let (target, message) = line
                .split_once(char::is_whitespace)
                .map(|(target, message)| (target, message.trim()))
                .filter(|(_, message)| !message.is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!("line {line_number}: expected `<target> <message>`")
                })?;

            Ok(BatchEdit {
                line: line_number,
                target: target.to_string(),
                message: message.to_string(),
            })
        })
        .collect()
}

impl Repository {
    pub fn amend_batch(
        &self,
        reference: &str,
        script: &str,
        strategy: MergeStrategy,
    ) -> anyhow::Result<Vec<AmendOutcome>> {
        let edits = parse_batch(script)?;
        let mut renamed: HashMap<ObjectId, ObjectId> = HashMap::new();
        let mut outcomes = Vec::with_capacity(edits.len());

        for edit in edits {
            let target = match ObjectId::try_parse(&edit.target) {
                Ok(oid) => renamed.get(&oid).unwrap_or(&oid).to_hex(),
                Err(_) => edit.target.clone(),
            };
            info!(line = edit.line, descriptor = %target, "batch edit");

            let request = AmendRequest {
                target: Some(target),
                reference: reference.to_string(),
                message_lines: vec![edit.message],
            };
            let outcome = self.amend(&request, strategy)?;

            if let AmendOutcome::Rewritten { rewritten, .. } = &outcome {
                let step: HashMap<ObjectId, ObjectId> = rewritten.iter().copied().collect();
                for current in renamed.values_mut() {
                    if let Some(next) = step.get(current) {
                        *current = *next;
                    }
                }
                for (original, new) in step {
                    renamed.entry(original).or_insert(new);
                }
            }

            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}
