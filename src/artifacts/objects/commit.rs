//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! ```text
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! Header values that span several lines are continued with a single leading
//! space on every continuation line. Headers other than the four above are
//! skipped on read.

use crate::areas::repository::Repository;
use crate::artifacts::objects::object::{Object, Packable, SharedCommit, SharedTree, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::signature::Signature;
use crate::error::RewriteError;
use bytes::Bytes;
use std::io::{BufRead, Write};
use std::rc::Rc;

/// Git commit object
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Tree object ID representing the directory snapshot
    tree_oid: ObjectId,
    /// Parent commit IDs, in header order
    parents: Vec<ObjectId>,
    /// Author who wrote the changes
    author: Signature,
    /// Committer who recorded the commit
    committer: Signature,
    /// Raw message bytes, everything after the blank line
    message: Bytes,
}

/// Field overrides for [`CommitExt::update`]; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct CommitUpdate {
    pub tree: Option<SharedTree>,
    pub parents: Option<Vec<SharedCommit>>,
    pub message: Option<Bytes>,
    pub author: Option<Signature>,
}

impl Commit {
    pub fn new(
        tree_oid: ObjectId,
        parents: Vec<ObjectId>,
        author: Signature,
        committer: Signature,
        message: Bytes,
    ) -> Self {
        Commit {
            tree_oid,
            parents,
            author,
            committer,
            message,
        }
    }

    /// Get the first line of the commit message
    ///
    /// Useful for short-form display, one line per rewritten commit
    pub fn summary(&self) -> String {
        let first_line = self.message.split(|byte| *byte == b'\n').next();
        String::from_utf8_lossy(first_line.unwrap_or_default()).into_owned()
    }

    pub fn message(&self) -> &Bytes {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parent_oids(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    /// The only parent of a commit on a linear chain
    pub fn sole_parent(&self, oid: &ObjectId) -> anyhow::Result<&ObjectId> {
        match self.parents.as_slice() {
            [parent] => Ok(parent),
            parents => Err(RewriteError::NonLinearHistory {
                oid: *oid,
                parents: parents.len(),
            }
            .into()),
        }
    }
}

pub trait CommitExt {
    fn tree(&self, repository: &Repository) -> anyhow::Result<SharedTree>;

    fn parents(&self, repository: &Repository) -> anyhow::Result<Vec<SharedCommit>>;

    fn prev(&self, repository: &Repository) -> anyhow::Result<SharedCommit>;

    fn update(&self, repository: &Repository, update: CommitUpdate)
    -> anyhow::Result<SharedCommit>;
}

impl CommitExt for SharedCommit {
    fn tree(&self, repository: &Repository) -> anyhow::Result<SharedTree> {
        repository.resolve_tree(self.tree_oid())
    }

    fn parents(&self, repository: &Repository) -> anyhow::Result<Vec<SharedCommit>> {
        self.parent_oids()
            .iter()
            .map(|parent| repository.resolve_commit(parent))
            .collect()
    }

    /// Resolve the single parent, failing on root and merge commits
    fn prev(&self, repository: &Repository) -> anyhow::Result<SharedCommit> {
        let parent = self.sole_parent(self.oid())?;
        repository.resolve_commit(parent)
    }

    /// Derive a commit with some fields replaced
    ///
    /// Returns this very instance when every resulting field equals the current
    /// one, so an edit that changes nothing never produces a new object. A new
    /// commit keeps the author but gets the default committer.
    fn update(
        &self,
        repository: &Repository,
        update: CommitUpdate,
    ) -> anyhow::Result<SharedCommit> {
        let tree = match update.tree {
            Some(tree) => tree,
            None => self.tree(repository)?,
        };
        let parents = match update.parents {
            Some(parents) => parents,
            None => self.parents(repository)?,
        };
        let message = update.message.unwrap_or_else(|| self.message.clone());
        let author = update.author.unwrap_or_else(|| self.author.clone());

        let unchanged = tree.oid() == self.tree_oid()
            && parents
                .iter()
                .map(|parent| *parent.oid())
                .eq(self.parent_oids().iter().copied())
            && message == self.message
            && author == self.author;

        if unchanged {
            return Ok(Rc::clone(self));
        }

        repository.new_commit(&tree, &parents, message, Some(author), None)
    }
}

fn write_header(buffer: &mut Vec<u8>, key: &str, value: &[u8]) -> anyhow::Result<()> {
    buffer.write_all(key.as_bytes())?;
    buffer.push(b' ');
    for (i, line) in value.split(|byte| *byte == b'\n').enumerate() {
        if i > 0 {
            buffer.write_all(b"\n ")?;
        }
        buffer.write_all(line)?;
    }
    buffer.push(b'\n');

    Ok(())
}

/// Split the header block into unwrapped `(key, value)` pairs
fn parse_headers(block: &[u8]) -> anyhow::Result<Vec<(&[u8], Vec<u8>)>> {
    let mut headers: Vec<(&[u8], Vec<u8>)> = Vec::new();

    for line in block.split(|byte| *byte == b'\n') {
        if let Some(continuation) = line.strip_prefix(b" ") {
            let (_, value) = headers
                .last_mut()
                .ok_or_else(|| RewriteError::malformed("commit", "continuation before header"))?;
            value.push(b'\n');
            value.extend_from_slice(continuation);
            continue;
        }

        let split = line
            .iter()
            .position(|byte| *byte == b' ')
            .ok_or_else(|| {
                RewriteError::malformed(
                    "commit",
                    format!("header without value: {}", String::from_utf8_lossy(line)),
                )
            })?;
        headers.push((&line[..split], line[split + 1..].to_vec()));
    }

    Ok(headers)
}

fn parse_oid(value: &[u8]) -> anyhow::Result<ObjectId> {
    let hex = std::str::from_utf8(value)
        .map_err(|_| RewriteError::malformed("commit", "non-ascii object id"))?;
    ObjectId::try_parse(hex.trim())
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut body = Vec::new();

        write_header(&mut body, "tree", self.tree_oid.to_hex().as_bytes())?;
        for parent in &self.parents {
            write_header(&mut body, "parent", parent.to_hex().as_bytes())?;
        }
        write_header(&mut body, "author", self.author.as_bytes())?;
        write_header(&mut body, "committer", self.committer.as_bytes())?;
        body.push(b'\n');
        body.write_all(&self.message)?;

        Ok(Bytes::from(body))
    }
}

impl Unpackable for Commit {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;

        let boundary = content
            .windows(2)
            .position(|window| window == b"\n\n");
        let (header_block, message) = match boundary {
            Some(at) => (&content[..at], &content[at + 2..]),
            None => (content.strip_suffix(b"\n").unwrap_or(&content[..]), &[][..]),
        };

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for (key, value) in parse_headers(header_block)? {
            match key {
                b"tree" => tree_oid = Some(parse_oid(&value)?),
                b"parent" => parents.push(parse_oid(&value)?),
                b"author" => author = Some(Signature::new(value)),
                b"committer" => committer = Some(Signature::new(value)),
                _ => {}
            }
        }

        Ok(Commit {
            tree_oid: tree_oid.ok_or_else(|| RewriteError::malformed("commit", "missing tree"))?,
            parents,
            author: author.ok_or_else(|| RewriteError::malformed("commit", "missing author"))?,
            committer: committer
                .ok_or_else(|| RewriteError::malformed("commit", "missing committer"))?,
            message: Bytes::copy_from_slice(message),
        })
    }
}

impl Object for Commit {
    const OBJECT_TYPE: ObjectType = ObjectType::Commit;
}
