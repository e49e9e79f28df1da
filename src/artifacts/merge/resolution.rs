use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::error::RewriteError;

/// One side's value for a name; `None` when the name is absent there
pub type Slot = Option<DatabaseEntry>;

/// The three values a single name takes in a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTriple {
    pub current: Slot,
    pub root: Slot,
    pub other: Slot,
}

impl EntryTriple {
    pub fn new(current: Slot, root: Slot, other: Slot) -> Self {
        EntryTriple {
            current,
            root,
            other,
        }
    }

    /// Merged value for this name, or `None` if the sides diverged
    pub fn resolve(&self) -> Option<Slot> {
        if self.root == self.current {
            Some(self.other)
        } else if self.root == self.other {
            Some(self.current)
        } else if self.current == self.other {
            Some(self.current)
        } else {
            None
        }
    }
}

/// Resolve `name`, reporting divergence as a merge conflict on that name
pub fn merge_entries(name: &[u8], triple: &EntryTriple) -> Result<Slot, RewriteError> {
    triple
        .resolve()
        .ok_or_else(|| RewriteError::MergeConflict(String::from_utf8_lossy(name).into_owned()))
}
