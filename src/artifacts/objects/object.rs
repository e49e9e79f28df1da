use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use bytes::Bytes;
use std::cell::Cell;
use std::io::{BufRead, Cursor};
use std::ops::Deref;
use std::rc::Rc;

pub trait Packable {
    /// Encode the object body, without the `<kind> <size>\0` header
    fn serialize(&self) -> anyhow::Result<Bytes>;
}

pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable + Unpackable {
    const OBJECT_TYPE: ObjectType;
}

/// A decoded object together with its identity
///
/// The id and body are fixed at construction; the only mutable state is the
/// persisted flag, which goes from `false` to `true` once and never back.
/// Instances are handed out by the repository's object cache, so within one
/// repository equal ids mean the same `Rc`.
#[derive(Debug)]
pub struct Canonical<T> {
    oid: ObjectId,
    body: Bytes,
    persisted: Cell<bool>,
    object: T,
}

impl<T: Object> Canonical<T> {
    pub(crate) fn decode(body: Bytes) -> anyhow::Result<Self> {
        let object = T::deserialize(Cursor::new(body.clone()))?;

        Ok(Canonical {
            oid: ObjectId::for_object(T::OBJECT_TYPE, &body),
            body,
            persisted: Cell::new(false),
            object,
        })
    }

    pub(crate) fn encode(object: T) -> anyhow::Result<Self> {
        let body = object.serialize()?;

        Ok(Canonical {
            oid: ObjectId::for_object(T::OBJECT_TYPE, &body),
            body,
            persisted: Cell::new(false),
            object,
        })
    }
}

impl<T> Canonical<T> {
    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted.get()
    }

    pub(crate) fn mark_persisted(&self) {
        self.persisted.set(true);
    }
}

impl<T> Deref for Canonical<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}

pub type SharedCommit = Rc<Canonical<Commit>>;
pub type SharedTree = Rc<Canonical<Tree>>;

/// Any object the repository can hold, dispatched by kind
#[derive(Debug, Clone)]
pub enum ObjectBox {
    Tree(SharedTree),
    Commit(SharedCommit),
}

impl ObjectBox {
    pub fn oid(&self) -> &ObjectId {
        match self {
            ObjectBox::Tree(tree) => tree.oid(),
            ObjectBox::Commit(commit) => commit.oid(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectBox::Tree(_) => ObjectType::Tree,
            ObjectBox::Commit(_) => ObjectType::Commit,
        }
    }

    pub fn body(&self) -> &Bytes {
        match self {
            ObjectBox::Tree(tree) => tree.body(),
            ObjectBox::Commit(commit) => commit.body(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        match self {
            ObjectBox::Tree(tree) => tree.is_persisted(),
            ObjectBox::Commit(commit) => commit.is_persisted(),
        }
    }

    pub(crate) fn mark_persisted(&self) {
        match self {
            ObjectBox::Tree(tree) => tree.mark_persisted(),
            ObjectBox::Commit(commit) => commit.mark_persisted(),
        }
    }

    /// Same in-memory instance, not merely the same id
    pub fn ptr_eq(&self, other: &ObjectBox) -> bool {
        match (self, other) {
            (ObjectBox::Tree(left), ObjectBox::Tree(right)) => Rc::ptr_eq(left, right),
            (ObjectBox::Commit(left), ObjectBox::Commit(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl From<SharedTree> for ObjectBox {
    fn from(tree: SharedTree) -> Self {
        ObjectBox::Tree(tree)
    }
}

impl From<SharedCommit> for ObjectBox {
    fn from(commit: SharedCommit) -> Self {
        ObjectBox::Commit(commit)
    }
}

impl PartialEq for ObjectBox {
    fn eq(&self, other: &Self) -> bool {
        self.oid() == other.oid()
    }
}

impl Eq for ObjectBox {}
