use crate::areas::database::{BatchDatabase, ObjectDatabase, RawObject};
use crate::areas::git::git_string;
use crate::areas::memory::{MemoryDatabase, MemoryRefs};
use crate::areas::refs::{GitRefs, RefStore, Reference};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Canonical, ObjectBox, SharedCommit, SharedTree};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::signature::Signature;
use crate::artifacts::objects::tree::Tree;
use crate::error::RewriteError;
use anyhow::Context;
use bytes::Bytes;
use std::cell::{RefCell, RefMut};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

type ObjectShards = HashMap<u8, HashMap<ObjectId, ObjectBox>>;

pub struct Repository {
    workdir: PathBuf,
    gitdir: PathBuf,
    writer: RefCell<Box<dyn std::io::Write>>,
    /// Warnings meant for the user, stderr unless replaced
    diagnostics: RefCell<Box<dyn std::io::Write>>,
    default_author: Signature,
    default_committer: Signature,
    database: RefCell<Box<dyn ObjectDatabase>>,
    refs: Box<dyn RefStore>,
    /// Canonical instances, sharded by the first id byte
    objects: RefCell<ObjectShards>,
}

impl Repository {
    /// Open the git repository containing `path`
    ///
    /// Spawns the `cat-file --batch` channel and reads the default identities
    /// from `git var`.
    pub fn discover(path: &Path, writer: Box<dyn std::io::Write>) -> anyhow::Result<Self> {
        let workdir = git_string(path, &["rev-parse", "--show-toplevel"])
            .with_context(|| format!("{} is not inside a git work tree", path.display()))?;
        let workdir = PathBuf::from(workdir);
        let gitdir = git_string(&workdir, &["rev-parse", "--absolute-git-dir"])?;

        let default_author = Signature::new(git_string(&workdir, &["var", "GIT_AUTHOR_IDENT"])?);
        let default_committer =
            Signature::new(git_string(&workdir, &["var", "GIT_COMMITTER_IDENT"])?);

        let database = BatchDatabase::spawn(&workdir)?;
        let refs = GitRefs::new(&workdir);

        Self::new(
            RepositoryPaths {
                workdir,
                gitdir: PathBuf::from(gitdir),
            },
            writer,
            (default_author, default_committer),
            Box::new(database),
            Box::new(refs),
        )
    }

    /// Assemble a repository from explicit collaborators
    ///
    /// Fails if the database claims to hold the null object.
    pub fn new(
        paths: RepositoryPaths,
        writer: Box<dyn std::io::Write>,
        (default_author, default_committer): (Signature, Signature),
        database: Box<dyn ObjectDatabase>,
        refs: Box<dyn RefStore>,
    ) -> anyhow::Result<Self> {
        let repository = Repository {
            workdir: paths.workdir,
            gitdir: paths.gitdir,
            writer: RefCell::new(writer),
            diagnostics: RefCell::new(Box::new(std::io::stderr())),
            default_author,
            default_committer,
            database: RefCell::new(database),
            refs,
            objects: RefCell::new(HashMap::new()),
        };

        match repository.resolve_oid(&ObjectId::null()) {
            Err(error)
                if matches!(
                    error.downcast_ref::<RewriteError>(),
                    Some(RewriteError::MissingObject(_))
                ) => {}
            Ok(_) => {
                return Err(RewriteError::BrokenChannel(
                    "the null object id resolved to an object".to_string(),
                )
                .into());
            }
            Err(error) => return Err(error),
        }

        Ok(repository)
    }

    /// Repository over in-memory backends, with `identity` as both defaults
    pub fn in_memory(
        database: MemoryDatabase,
        refs: MemoryRefs,
        identity: Signature,
        writer: Box<dyn std::io::Write>,
    ) -> anyhow::Result<Self> {
        Self::new(
            RepositoryPaths::default(),
            writer,
            (identity.clone(), identity),
            Box::new(database),
            Box::new(refs),
        )
    }

    /// Send user-facing warnings to `diagnostics` instead of stderr
    pub fn with_diagnostics(self, diagnostics: Box<dyn std::io::Write>) -> Self {
        self.diagnostics.replace(diagnostics);
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn diagnostics(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.diagnostics.borrow_mut()
    }

    pub fn default_author(&self) -> &Signature {
        &self.default_author
    }

    pub fn default_committer(&self) -> &Signature {
        &self.default_committer
    }

    /// Look up any descriptor the database understands
    ///
    /// Full hex ids are answered from the cache when possible.
    pub fn resolve(&self, descriptor: &str) -> anyhow::Result<ObjectBox> {
        match ObjectId::try_parse(descriptor) {
            Ok(oid) => self.resolve_oid(&oid),
            Err(_) => self.fetch(descriptor),
        }
    }

    pub fn resolve_oid(&self, oid: &ObjectId) -> anyhow::Result<ObjectBox> {
        if let Some(object) = self.cached(oid) {
            return Ok(object);
        }

        self.fetch(&oid.to_hex())
    }

    pub fn resolve_commit(&self, oid: &ObjectId) -> anyhow::Result<SharedCommit> {
        expect_commit(self.resolve_oid(oid)?, &oid.to_hex())
    }

    pub fn resolve_tree(&self, oid: &ObjectId) -> anyhow::Result<SharedTree> {
        match self.resolve_oid(oid)? {
            ObjectBox::Tree(tree) => Ok(tree),
            ObjectBox::Commit(_) => Err(RewriteError::UnsupportedObjectKind {
                descriptor: oid.to_hex(),
                kind: ObjectType::Commit.to_string(),
            }
            .into()),
        }
    }

    /// Resolve a descriptor that must name a commit (`HEAD~2`, a short id, ...)
    pub fn resolve_commit_descriptor(&self, descriptor: &str) -> anyhow::Result<SharedCommit> {
        expect_commit(self.resolve(descriptor)?, descriptor)
    }

    /// Build an unpersisted commit; identities default to the repository's
    pub fn new_commit(
        &self,
        tree: &SharedTree,
        parents: &[SharedCommit],
        message: Bytes,
        author: Option<Signature>,
        committer: Option<Signature>,
    ) -> anyhow::Result<SharedCommit> {
        let commit = Commit::new(
            *tree.oid(),
            parents.iter().map(|parent| *parent.oid()).collect(),
            author.unwrap_or_else(|| self.default_author.clone()),
            committer.unwrap_or_else(|| self.default_committer.clone()),
            message,
        );
        let candidate = ObjectBox::Commit(Rc::new(Canonical::encode(commit)?));

        expect_commit(self.intern(candidate), "new commit")
    }

    /// Build an unpersisted tree from named entries
    pub fn new_tree(
        &self,
        entries: impl IntoIterator<Item = (Bytes, DatabaseEntry)>,
    ) -> anyhow::Result<SharedTree> {
        let tree: Tree = entries.into_iter().collect();
        let candidate = ObjectBox::Tree(Rc::new(Canonical::encode(tree)?));

        match self.intern(candidate) {
            ObjectBox::Tree(tree) => Ok(tree),
            ObjectBox::Commit(commit) => Err(RewriteError::UnsupportedObjectKind {
                descriptor: commit.oid().to_hex(),
                kind: ObjectType::Commit.to_string(),
            }
            .into()),
        }
    }

    /// Write `object` and everything it references that is not yet stored
    ///
    /// Dependencies go first, so the database never holds an object whose
    /// references are missing. Gitlink targets live in another repository and
    /// are skipped.
    pub fn persist(&self, object: &ObjectBox) -> anyhow::Result<ObjectId> {
        if object.is_persisted() {
            return Ok(*object.oid());
        }

        match object {
            ObjectBox::Commit(commit) => {
                self.persist(&self.resolve_tree(commit.tree_oid())?.into())?;
                for parent in commit.parent_oids() {
                    self.persist(&self.resolve_commit(parent)?.into())?;
                }
            }
            ObjectBox::Tree(tree) => {
                for (_, entry) in tree.entries() {
                    if entry.mode.is_gitlink() {
                        continue;
                    }
                    self.persist(&self.resolve_oid(&entry.oid)?)?;
                }
            }
        }

        let written = self
            .database
            .borrow_mut()
            .write(object.object_type(), object.body())?;
        if written != *object.oid() {
            return Err(RewriteError::IntegrityMismatch {
                expected: *object.oid(),
                actual: written,
            }
            .into());
        }

        object.mark_persisted();
        debug!(oid = %written, kind = %object.object_type(), "object persisted");

        Ok(written)
    }

    /// Resolve a reference that points to a commit (or nowhere yet)
    pub fn commit_ref(&self, name: &str) -> anyhow::Result<Reference> {
        let resolved = self.refs.resolve(name)?;
        let target = self.ref_target(resolved.target)?;

        Ok(Reference::new(resolved.name, target))
    }

    /// Re-read the reference's current target
    pub fn refresh(&self, reference: &mut Reference) -> anyhow::Result<()> {
        let resolved = self.refs.resolve(reference.name())?;
        reference.set_target(self.ref_target(resolved.target)?);

        Ok(())
    }

    /// Persist `new` and move the reference to it
    ///
    /// Fails with [`RewriteError::StaleReference`] if the reference no longer
    /// points where it did when last observed.
    pub fn update_ref(
        &self,
        reference: &mut Reference,
        new: &SharedCommit,
        reason: &str,
    ) -> anyhow::Result<()> {
        self.persist(&ObjectBox::Commit(Rc::clone(new)))?;

        let expected = reference.target().map(|target| *target.oid());
        self.refs
            .compare_and_swap(reference.name(), new.oid(), reason, expected.as_ref())?;
        debug!(name = reference.name(), new = %new.oid(), "reference updated");

        reference.set_target(Some(Rc::clone(new)));

        Ok(())
    }

    /// Number of canonical objects currently held
    pub fn cached_objects(&self) -> usize {
        self.objects.borrow().values().map(HashMap::len).sum()
    }

    fn ref_target(&self, target: Option<ObjectId>) -> anyhow::Result<Option<SharedCommit>> {
        let Some(oid) = target else {
            return Ok(None);
        };

        match self.resolve_commit(&oid) {
            Ok(commit) => Ok(Some(commit)),
            Err(error)
                if matches!(
                    error.downcast_ref::<RewriteError>(),
                    Some(RewriteError::MissingObject(_))
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn cached(&self, oid: &ObjectId) -> Option<ObjectBox> {
        self.objects
            .borrow()
            .get(&oid.first_byte())
            .and_then(|shard| shard.get(oid))
            .cloned()
    }

    /// Return the canonical instance for `candidate`'s id, inserting it if new
    fn intern(&self, candidate: ObjectBox) -> ObjectBox {
        let oid = *candidate.oid();
        let mut objects = self.objects.borrow_mut();

        objects
            .entry(oid.first_byte())
            .or_default()
            .entry(oid)
            .or_insert(candidate)
            .clone()
    }

    fn fetch(&self, descriptor: &str) -> anyhow::Result<ObjectBox> {
        let raw = self
            .database
            .borrow_mut()
            .read(descriptor)?
            .ok_or_else(|| RewriteError::MissingObject(descriptor.to_string()))?;

        let object = self.intern(decode(descriptor, raw)?);
        object.mark_persisted();

        Ok(object)
    }
}

/// Where a repository lives on disk
#[derive(Debug, Clone, Default)]
pub struct RepositoryPaths {
    pub workdir: PathBuf,
    pub gitdir: PathBuf,
}

fn decode(descriptor: &str, raw: RawObject) -> anyhow::Result<ObjectBox> {
    let kind = ObjectType::try_from(raw.kind.as_str()).map_err(|_| {
        RewriteError::UnsupportedObjectKind {
            descriptor: descriptor.to_string(),
            kind: raw.kind.clone(),
        }
    })?;

    let object = match kind {
        ObjectType::Commit => ObjectBox::Commit(Rc::new(Canonical::decode(raw.body)?)),
        ObjectType::Tree => ObjectBox::Tree(Rc::new(Canonical::decode(raw.body)?)),
    };

    if *object.oid() != raw.oid {
        return Err(RewriteError::IntegrityMismatch {
            expected: *object.oid(),
            actual: raw.oid,
        }
        .into());
    }

    Ok(object)
}

fn expect_commit(object: ObjectBox, descriptor: &str) -> anyhow::Result<SharedCommit> {
    match object {
        ObjectBox::Commit(commit) => Ok(commit),
        ObjectBox::Tree(_) => Err(RewriteError::UnsupportedObjectKind {
            descriptor: descriptor.to_string(),
            kind: ObjectType::Tree.to_string(),
        }
        .into()),
    }
}
