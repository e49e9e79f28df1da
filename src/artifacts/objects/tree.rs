//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files (blobs),
//! subdirectories (other trees), symlinks and submodules, along with their names and modes.
//!
//! ## Format
//!
//! Each entry: `<mode> <name>\0<20-byte-sha1>`, entries concatenated with no
//! other delimiter.
//!
//! ## Ordering
//!
//! Entries are written sorted by name, where a directory name compares as if it
//! ended with `/`. That puts `foo.txt` before the directory `foo` (`.` < `/`),
//! matching git's own collation.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::error::RewriteError;
use anyhow::Context;
use bytes::Bytes;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Git tree object representing a directory snapshot
///
/// Names are raw bytes; git does not require them to be valid UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<Bytes, DatabaseEntry>,
}

impl Tree {
    pub fn new(entries: BTreeMap<Bytes, DatabaseEntry>) -> Self {
        Tree { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Bytes, &DatabaseEntry)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &Bytes> {
        self.entries.keys()
    }

    pub fn get(&self, name: &[u8]) -> Option<&DatabaseEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in on-disk order
    fn sorted_entries(&self) -> Vec<(&Bytes, &DatabaseEntry)> {
        let mut sorted = self.entries.iter().collect::<Vec<_>>();
        sorted.sort_by(|(left_name, left), (right_name, right)| {
            sort_key(left_name, left).cmp(&sort_key(right_name, right))
        });
        sorted
    }
}

fn sort_key<'n>(name: &'n [u8], entry: &DatabaseEntry) -> Cow<'n, [u8]> {
    if entry.is_tree() {
        let mut key = name.to_vec();
        key.push(b'/');
        Cow::Owned(key)
    } else {
        Cow::Borrowed(name)
    }
}

impl FromIterator<(Bytes, DatabaseEntry)> for Tree {
    fn from_iter<I: IntoIterator<Item = (Bytes, DatabaseEntry)>>(iter: I) -> Self {
        Tree::new(iter.into_iter().collect())
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for (name, entry) in self.sorted_entries() {
            content.write_all(entry.mode.as_str().as_bytes())?;
            content.push(b' ');
            content.write_all(name)?;
            content.push(0);
            entry.oid.write_raw_to(&mut content)?;
        }

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            // Must end with ' ' or it's malformed
            if mode_bytes.pop() != Some(b' ') {
                return Err(RewriteError::malformed("tree", "unexpected EOF in mode").into());
            }

            let mode_str = std::str::from_utf8(&mode_bytes)
                .map_err(|_| RewriteError::malformed("tree", "non-ascii mode"))?;
            let mode = EntryMode::from_octal_str(mode_str)
                .map_err(|e| RewriteError::malformed("tree", e.to_string()))?;

            // Read "name\0"
            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || name_bytes.pop() != Some(b'\0') {
                return Err(RewriteError::malformed("tree", "unexpected EOF in name").into());
            }

            let oid = ObjectId::read_raw_from(&mut reader)
                .map_err(|_| RewriteError::malformed("tree", "unexpected EOF in object id"))
                .with_context(|| format!("entry {}", String::from_utf8_lossy(&name_bytes)))?;

            entries.insert(
                Bytes::copy_from_slice(&name_bytes),
                DatabaseEntry::new(oid, mode),
            );
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    const OBJECT_TYPE: ObjectType = ObjectType::Tree;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::entry_mode::FileMode;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn oid(seed: u8) -> ObjectId {
        ObjectId::try_from_bytes(&[seed; 20]).unwrap()
    }

    fn file(seed: u8) -> DatabaseEntry {
        DatabaseEntry::new(oid(seed), EntryMode::File(FileMode::Regular))
    }

    fn dir(seed: u8) -> DatabaseEntry {
        DatabaseEntry::new(oid(seed), EntryMode::Directory)
    }

    fn names_in_body_order(body: &[u8]) -> Vec<String> {
        let tree = Tree::deserialize(Cursor::new(body.to_vec())).unwrap();
        let mut names = Vec::new();
        let mut rest = body;
        while !rest.is_empty() {
            let space = rest.iter().position(|b| *b == b' ').unwrap();
            let nul = rest.iter().position(|b| *b == 0).unwrap();
            names.push(String::from_utf8(rest[space + 1..nul].to_vec()).unwrap());
            rest = &rest[nul + 21..];
        }
        assert_eq!(names.len(), tree.len());
        names
    }

    #[test]
    fn directories_sort_as_if_suffixed_with_slash() {
        let tree = Tree::from_iter([
            (Bytes::from_static(b"foo"), dir(1)),
            (Bytes::from_static(b"foo.txt"), file(2)),
            (Bytes::from_static(b"foo-bar"), file(3)),
        ]);

        let body = tree.serialize().unwrap();

        assert_eq!(names_in_body_order(&body), vec!["foo-bar", "foo.txt", "foo"]);
    }

    #[test]
    fn encodes_mode_without_leading_zero() {
        let tree = Tree::from_iter([(Bytes::from_static(b"src"), dir(7))]);
        let body = tree.serialize().unwrap();

        let mut expected = b"40000 src\0".to_vec();
        expected.extend_from_slice(&[7u8; 20]);
        assert_eq!(body.to_vec(), expected);
    }

    #[test]
    fn decoding_then_encoding_reproduces_the_body() {
        let mut body = Vec::new();
        for (mode, name, seed) in [
            ("100644", "a.txt", 1u8),
            ("120000", "link", 3),
            ("100755", "run.sh", 2),
            ("160000", "vendor", 4),
            ("40000", "vendor-src", 5),
        ] {
            body.extend_from_slice(format!("{mode} {name}\0").as_bytes());
            body.extend_from_slice(&[seed; 20]);
        }

        let tree = Tree::deserialize(Cursor::new(body.clone())).unwrap();

        assert_eq!(tree.len(), 5);
        assert_eq!(tree.get(b"vendor").unwrap().mode, EntryMode::Gitlink);
        assert_eq!(tree.serialize().unwrap().to_vec(), body);
    }

    #[test]
    fn truncated_object_id_is_malformed() {
        let mut body = b"100644 a.txt\0".to_vec();
        body.extend_from_slice(&[1u8; 10]);

        let error = Tree::deserialize(Cursor::new(body)).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<RewriteError>(),
            Some(RewriteError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn empty_body_is_the_empty_tree() {
        let tree = Tree::deserialize(Cursor::new(Vec::new())).unwrap();

        assert!(tree.is_empty());
        assert!(tree.serialize().unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn serialization_order_ignores_insertion_order(
            names in proptest::collection::btree_set("[a-z]{1,3}(\\.[a-z])?", 1..12),
            directory_mask in any::<u16>(),
        ) {
            let entries = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let entry = if directory_mask & (1 << (i % 16)) != 0 { dir(i as u8) } else { file(i as u8) };
                    (Bytes::from(name.clone()), entry)
                })
                .collect::<Vec<_>>();

            let forward = Tree::from_iter(entries.clone());
            let backward = Tree::from_iter(entries.into_iter().rev());

            prop_assert_eq!(forward.serialize().unwrap(), backward.serialize().unwrap());
        }
    }
}
