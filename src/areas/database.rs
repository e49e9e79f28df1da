//! Object database channel
//!
//! The repository talks to git's object store through [`ObjectDatabase`]:
//! read an object by descriptor, write a body under a kind. The git-backed
//! implementation keeps one `git cat-file --batch` process open for reads and
//! shells out to `git hash-object -w` for writes.
//!
//! ## Batch protocol
//!
//! ```text
//! > <descriptor>\n
//! < <descriptor> missing\n
//! < <hex-oid> <kind> <size>\n<size bytes>\n
//! ```
//!
//! Exactly one request is in flight at a time; a response that does not parse
//! leaves the stream desynchronized and is reported as a broken channel.

use crate::areas::git::git;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::error::RewriteError;
use anyhow::Context;
use bytes::Bytes;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// An object as returned by the database, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub oid: ObjectId,
    /// Kind tag exactly as reported (`commit`, `tree`, `blob`, ...)
    pub kind: String,
    pub body: Bytes,
}

pub trait ObjectDatabase {
    /// Look up an object; `None` when the database reports it missing
    fn read(&mut self, descriptor: &str) -> anyhow::Result<Option<RawObject>>;

    /// Store a body and return the id the database computed for it
    ///
    /// Writing an object that already exists must succeed.
    fn write(&mut self, kind: ObjectType, body: &[u8]) -> anyhow::Result<ObjectId>;
}

/// `git cat-file --batch` reader plus `git hash-object` writer
#[derive(Debug)]
pub struct BatchDatabase {
    workdir: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl BatchDatabase {
    pub fn spawn(workdir: &Path) -> anyhow::Result<Self> {
        let mut child = Command::new("git")
            .args(["cat-file", "--batch"])
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn git cat-file --batch")?;

        let stdin = child.stdin.take().context("cat-file stdin was not captured")?;
        let stdout = child
            .stdout
            .take()
            .context("cat-file stdout was not captured")?;

        Ok(BatchDatabase {
            workdir: workdir.to_path_buf(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    fn broken(reason: impl Into<String>) -> anyhow::Error {
        RewriteError::BrokenChannel(reason.into()).into()
    }
}

impl ObjectDatabase for BatchDatabase {
    fn read(&mut self, descriptor: &str) -> anyhow::Result<Option<RawObject>> {
        if descriptor.contains('\n') {
            anyhow::bail!("descriptor {descriptor:?} contains a newline");
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Self::broken("cat-file stdin already closed"))?;
        writeln!(stdin, "{descriptor}").map_err(|e| Self::broken(e.to_string()))?;
        stdin.flush().map_err(|e| Self::broken(e.to_string()))?;

        let mut header = String::new();
        let read = self
            .stdout
            .read_line(&mut header)
            .map_err(|e| Self::broken(e.to_string()))?;
        if read == 0 {
            return Err(Self::broken("cat-file exited"));
        }

        let header = header.trim_end_matches('\n');
        if header.ends_with(" missing") {
            debug!(descriptor, "object missing");
            return Ok(None);
        }
        if header.ends_with(" ambiguous") {
            anyhow::bail!("descriptor {descriptor} is ambiguous");
        }

        let mut parts = header.rsplitn(3, ' ');
        let (size, kind, oid) = match (parts.next(), parts.next(), parts.next()) {
            (Some(size), Some(kind), Some(oid)) => (size, kind, oid),
            _ => return Err(Self::broken(format!("unexpected header {header:?}"))),
        };
        let size: usize = size
            .parse()
            .map_err(|_| Self::broken(format!("unexpected size in {header:?}")))?;
        let oid = ObjectId::try_parse(oid)?;

        let mut body = vec![0u8; size + 1];
        self.stdout
            .read_exact(&mut body)
            .map_err(|e| Self::broken(e.to_string()))?;
        if body.pop() != Some(b'\n') {
            return Err(Self::broken("object body not terminated by newline"));
        }

        debug!(descriptor, %oid, kind, size, "object read");

        Ok(Some(RawObject {
            oid,
            kind: kind.to_string(),
            body: Bytes::from(body),
        }))
    }

    fn write(&mut self, kind: ObjectType, body: &[u8]) -> anyhow::Result<ObjectId> {
        let stdout = git(
            &self.workdir,
            &[
                "hash-object",
                "--no-filters",
                "-t",
                kind.as_str(),
                "-w",
                "--stdin",
            ],
            Some(body),
        )?;
        let hex = String::from_utf8(stdout).context("hash-object printed non-utf8")?;

        ObjectId::try_parse(hex.trim())
    }
}

impl Drop for BatchDatabase {
    fn drop(&mut self) {
        // closing stdin makes cat-file exit on its own
        drop(self.stdin.take());

        if let Err(e) = self.child.wait() {
            warn!("failed to reap git cat-file: {e}");
            if let Err(e) = self.child.kill() {
                warn!("failed to kill git cat-file: {e}");
            }
        }
    }
}
