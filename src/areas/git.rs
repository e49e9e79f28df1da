//! One-shot `git` invocations
//!
//! Used for discovery, identity lookup, object writes and ref updates. The
//! long-lived `cat-file --batch` channel lives in [`super::database`].

use anyhow::Context;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Run `git <args>` in `cwd`, feeding `input` on stdin when given
pub(crate) fn run_git(cwd: &Path, args: &[&str], input: Option<&[u8]>) -> anyhow::Result<Output> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn git {}", args.join(" ")))?;

    if let Some(input) = input {
        let mut stdin = child
            .stdin
            .take()
            .context("git stdin was not captured")?;
        stdin
            .write_all(input)
            .with_context(|| format!("failed to feed git {}", args.join(" ")))?;
    }

    child
        .wait_with_output()
        .with_context(|| format!("failed to wait for git {}", args.join(" ")))
}

/// Like [`run_git`], but fails on a non-zero exit and strips one trailing newline
pub(crate) fn git(cwd: &Path, args: &[&str], input: Option<&[u8]>) -> anyhow::Result<Vec<u8>> {
    let output = run_git(cwd, args, input)?;

    if !output.status.success() {
        anyhow::bail!(
            "git {} failed ({}): {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let mut stdout = output.stdout;
    if stdout.last() == Some(&b'\n') {
        stdout.pop();
    }

    Ok(stdout)
}

pub(crate) fn git_string(cwd: &Path, args: &[&str]) -> anyhow::Result<String> {
    let stdout = git(cwd, args, None)?;
    String::from_utf8(stdout).with_context(|| format!("git {} printed non-utf8", args.join(" ")))
}
