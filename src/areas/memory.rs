//! In-memory object database and reference store
//!
//! Both are cheap to clone and share their state, so a test can hand one
//! clone to a [`Repository`](crate::areas::repository::Repository) and keep
//! another to inspect what was written.

use crate::areas::database::{ObjectDatabase, RawObject};
use crate::areas::refs::{RefStore, ResolvedRef};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::error::RewriteError;
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
struct StoredObjects {
    objects: HashMap<ObjectId, (String, Bytes)>,
    writes: usize,
}

/// Object database keyed by full hex ids
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Rc<RefCell<StoredObjects>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object of any kind, bypassing the write counter
    pub fn insert_raw(&self, kind: &str, body: impl Into<Bytes>) -> ObjectId {
        let body = body.into();
        let oid = ObjectId::for_raw_kind(kind, &body);

        self.state
            .borrow_mut()
            .objects
            .insert(oid, (kind.to_string(), body));

        oid
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.state.borrow().objects.contains_key(oid)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `write` calls served so far
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }
}

impl ObjectDatabase for MemoryDatabase {
    fn read(&mut self, descriptor: &str) -> anyhow::Result<Option<RawObject>> {
        let Ok(oid) = ObjectId::try_parse(descriptor) else {
            return Ok(None);
        };

        Ok(self
            .state
            .borrow()
            .objects
            .get(&oid)
            .map(|(kind, body)| RawObject {
                oid,
                kind: kind.clone(),
                body: body.clone(),
            }))
    }

    fn write(&mut self, kind: ObjectType, body: &[u8]) -> anyhow::Result<ObjectId> {
        let oid = ObjectId::for_object(kind, body);

        let mut state = self.state.borrow_mut();
        state.writes += 1;
        state
            .objects
            .entry(oid)
            .or_insert_with(|| (kind.to_string(), Bytes::copy_from_slice(body)));

        Ok(oid)
    }
}

#[derive(Debug, Default)]
struct StoredRefs {
    direct: HashMap<String, ObjectId>,
    symbolic: HashMap<String, String>,
    reflog: Vec<(String, String)>,
}

/// Reference store with symbolic refs and compare-and-swap updates
#[derive(Debug, Clone, Default)]
pub struct MemoryRefs {
    state: Rc<RefCell<StoredRefs>>,
}

impl MemoryRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point a fully-qualified ref at `oid` unconditionally
    pub fn set(&self, name: &str, oid: ObjectId) {
        self.state
            .borrow_mut()
            .direct
            .insert(name.to_string(), oid);
    }

    /// Make `name` (e.g. `HEAD`) an alias of `target`
    pub fn set_symbolic(&self, name: &str, target: &str) {
        self.state
            .borrow_mut()
            .symbolic
            .insert(name.to_string(), target.to_string());
    }

    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.state.borrow().direct.get(name).copied()
    }

    /// `(ref, reason)` pairs of successful updates, oldest first
    pub fn reflog(&self) -> Vec<(String, String)> {
        self.state.borrow().reflog.clone()
    }

    fn full_name(&self, name: &str) -> Option<String> {
        let state = self.state.borrow();

        if let Some(target) = state.symbolic.get(name) {
            return Some(target.clone());
        }

        [
            name.to_string(),
            format!("refs/heads/{name}"),
            format!("refs/tags/{name}"),
        ]
        .into_iter()
        .find(|candidate| state.direct.contains_key(candidate))
        .or_else(|| name.starts_with("refs/").then(|| name.to_string()))
    }
}

impl RefStore for MemoryRefs {
    fn resolve(&self, name: &str) -> anyhow::Result<ResolvedRef> {
        let full_name = self
            .full_name(name)
            .ok_or_else(|| RewriteError::UnresolvedReference(name.to_string()))?;
        let target = self.get(&full_name);

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
        let mut state = self.state.borrow_mut();

        if state.direct.get(name) != expected {
            return Err(RewriteError::StaleReference {
                name: name.to_string(),
                expected: expected.copied().unwrap_or_else(ObjectId::null),
            }
            .into());
        }

        state.direct.insert(name.to_string(), *new);
        state.reflog.push((name.to_string(), reason.to_string()));

        Ok(())
    }
}
