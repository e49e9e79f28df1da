use assert_fs::TempDir;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use revise::areas::database::{BatchDatabase, ObjectDatabase};
use revise::areas::refs::{GitRefs, RefStore};
use revise::artifacts::objects::commit::Commit;
use revise::artifacts::objects::entry_mode::EntryMode;
use revise::artifacts::objects::object::{Packable, Unpackable};
use revise::artifacts::objects::object_id::ObjectId;
use revise::artifacts::objects::signature::Signature;
use revise::artifacts::objects::tree::Tree;
use revise::error::RewriteError;
use rstest::{fixture, rstest};
use std::io::Cursor;

mod common;

use common::command::{
    commit_file, git_raw, git_stdout, linear_repository, repository_dir, run_git_command,
};

fn oid(dir: &std::path::Path, revision: &str) -> ObjectId {
    ObjectId::try_parse(&git_stdout(dir, &["rev-parse", revision])).unwrap()
}

/// Names chosen so that git's directory ordering differs from plain byte order
#[fixture]
fn mixed_tree_repository(repository_dir: TempDir) -> TempDir {
    let dir = repository_dir.path();
    commit_file(dir, "foo/inner.txt", "directory");
    commit_file(dir, "foo.txt", "file next to it");
    commit_file(dir, "foo-bar", "dash sorts before slash");
    run_git_command(dir, &["update-index", "--chmod=+x", "foo-bar"])
        .assert()
        .success();
    run_git_command(dir, &["commit", "--quiet", "--no-gpg-sign", "-m", "executable"])
        .assert()
        .success();

    repository_dir
}

#[rstest]
fn identity_from_git_var_exposes_every_field(repository_dir: TempDir) {
    let ident = git_stdout(repository_dir.path(), &["var", "GIT_AUTHOR_IDENT"]);
    let signature = Signature::new(ident);

    assert_eq!(signature.name().unwrap(), common::AUTHOR_NAME.as_bytes());
    assert_eq!(signature.email().unwrap(), common::AUTHOR_EMAIL.as_bytes());
    assert_eq!(signature.timestamp().unwrap(), 1_672_574_400);
    assert_eq!(signature.offset().unwrap(), Some(&b"+0000"[..]));
}

#[rstest]
fn committer_of_a_real_commit_parses(linear_repository: TempDir) {
    let body = git_raw(linear_repository.path(), &["cat-file", "commit", "HEAD"]);
    let commit = Commit::deserialize(Cursor::new(body)).unwrap();

    assert_eq!(
        commit.committer().name().unwrap(),
        common::COMMITTER_NAME.as_bytes()
    );
    assert_eq!(
        commit.committer().when().unwrap().offset().local_minus_utc(),
        2 * 3600
    );
}

#[rstest]
fn tree_written_by_git_reencodes_byte_for_byte(mixed_tree_repository: TempDir) {
    let dir = mixed_tree_repository.path();
    let body = git_raw(dir, &["cat-file", "tree", "HEAD^{tree}"]);

    let tree = Tree::deserialize(Cursor::new(body.clone())).unwrap();

    assert_eq!(tree.len(), 3);
    assert_eq!(tree.get(b"foo").unwrap().mode, EntryMode::Directory);
    assert_eq!(
        tree.get(b"foo-bar").unwrap().mode.as_str(),
        "100755"
    );
    assert_eq!(tree.serialize().unwrap(), Bytes::from(body));
}

#[rstest]
fn commit_written_by_git_reencodes_byte_for_byte(linear_repository: TempDir) {
    let body = git_raw(linear_repository.path(), &["cat-file", "commit", "HEAD~1"]);

    let commit = Commit::deserialize(Cursor::new(body.clone())).unwrap();

    assert_eq!(commit.serialize().unwrap(), Bytes::from(body));
}

#[rstest]
fn batch_channel_returns_verified_bodies(mixed_tree_repository: TempDir) {
    let dir = mixed_tree_repository.path();
    let mut database = BatchDatabase::spawn(dir).unwrap();

    let tree = database.read("HEAD^{tree}").unwrap().unwrap();
    let missing = database.read(&ObjectId::null().to_hex()).unwrap();

    assert_eq!(tree.kind, "tree");
    assert_eq!(tree.oid, oid(dir, "HEAD^{tree}"));
    assert_eq!(tree.oid, ObjectId::for_raw_kind("tree", &tree.body));
    assert_eq!(tree.body.to_vec(), git_raw(dir, &["cat-file", "tree", "HEAD^{tree}"]));
    assert_eq!(missing, None);
}

#[rstest]
fn moved_reference_is_stale(linear_repository: TempDir) {
    let dir = linear_repository.path();
    let head = oid(dir, "HEAD");
    let refs = GitRefs::new(dir);

    let error = refs
        .compare_and_swap(
            "refs/heads/main",
            &oid(dir, "HEAD~1"),
            "test",
            Some(&oid(dir, "HEAD~2")),
        )
        .unwrap_err();

    assert_eq!(
        error.downcast_ref::<RewriteError>(),
        Some(&RewriteError::StaleReference {
            name: "refs/heads/main".to_string(),
            expected: oid(dir, "HEAD~2"),
        })
    );
    assert_eq!(oid(dir, "refs/heads/main"), head);
}

#[rstest]
fn creating_an_existing_reference_is_stale(linear_repository: TempDir) {
    let dir = linear_repository.path();
    let refs = GitRefs::new(dir);

    let error = refs
        .compare_and_swap("refs/heads/main", &oid(dir, "HEAD~1"), "test", None)
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<RewriteError>(),
        Some(RewriteError::StaleReference { .. })
    ));
}

#[rstest]
fn bad_reference_name_is_not_stale(linear_repository: TempDir) {
    let dir = linear_repository.path();
    let refs = GitRefs::new(dir);

    let error = refs
        .compare_and_swap("refs/heads/bad..name", &oid(dir, "HEAD"), "test", None)
        .unwrap_err();

    assert!(error.downcast_ref::<RewriteError>().is_none());
    assert!(error.to_string().contains("bad name"));
}

#[rstest]
fn matching_expectation_moves_the_reference(linear_repository: TempDir) {
    let dir = linear_repository.path();
    let refs = GitRefs::new(dir);
    let previous = oid(dir, "HEAD~1");

    refs.compare_and_swap("refs/heads/main", &previous, "test", Some(&oid(dir, "HEAD")))
        .unwrap();

    assert_eq!(oid(dir, "refs/heads/main"), previous);
}
