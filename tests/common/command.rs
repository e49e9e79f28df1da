use crate::common::file::{FileSpec, generated_content, write_file};
use crate::common::{
    AUTHOR_DATE, AUTHOR_EMAIL, AUTHOR_NAME, COMMITTER_DATE, COMMITTER_EMAIL, COMMITTER_NAME,
};
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

fn identity_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("GIT_AUTHOR_NAME", AUTHOR_NAME),
        ("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL),
        ("GIT_AUTHOR_DATE", AUTHOR_DATE),
        ("GIT_COMMITTER_NAME", COMMITTER_NAME),
        ("GIT_COMMITTER_EMAIL", COMMITTER_EMAIL),
        ("GIT_COMMITTER_DATE", COMMITTER_DATE),
        ("GIT_CONFIG_NOSYSTEM", "1"),
        ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ]
}

pub fn run_revise_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("revise").expect("Failed to find revise binary");
    cmd.envs(identity_env());
    cmd.env_remove("REVISE_LOG");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.envs(identity_env());
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// Run git and return its trimmed stdout, panicking on failure
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = run_git_command(dir, args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run git {:?}: {}", args, e));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8(output.stdout)
        .expect("git printed non-utf8")
        .trim()
        .to_string()
}

/// Run git and return its stdout untouched, for object bodies
pub fn git_raw(dir: &Path, args: &[&str]) -> Vec<u8> {
    let output = run_git_command(dir, args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run git {:?}: {}", args, e));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );

    output.stdout
}

/// Write `path` with fresh content and commit it
pub fn commit_file(dir: &Path, path: &str, message: &str) -> String {
    write_file(FileSpec::new(dir.join(path), generated_content()));
    run_git_command(dir, &["add", path]).assert().success();
    run_git_command(dir, &["commit", "--quiet", "--no-gpg-sign", "-m", message])
        .assert()
        .success();

    git_stdout(dir, &["rev-parse", "HEAD"])
}

pub fn commit_message(dir: &Path, revision: &str) -> String {
    git_stdout(dir, &["log", "-1", "--format=%B", revision])
}

pub fn tree_of(dir: &Path, revision: &str) -> String {
    git_stdout(dir, &["rev-parse", &format!("{revision}^{{tree}}")])
}

#[fixture]
pub fn repository_dir() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    run_git_command(dir.path(), &["init", "--quiet", "--initial-branch=main"])
        .assert()
        .success();
    dir
}

/// `A ← B ← C ← D` on `main`, each commit adding its own file
#[fixture]
pub fn linear_repository(repository_dir: TempDir) -> TempDir {
    for name in ["A", "B", "C", "D"] {
        commit_file(repository_dir.path(), &format!("{name}.txt"), name);
    }

    repository_dir
}
