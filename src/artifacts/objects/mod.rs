//! Git object types and operations
//!
//! Git stores all content as objects identified by SHA-1 hashes. Two kinds are
//! decoded here:
//!
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//!
//! Blobs are referenced by tree entries but never read. All objects hash as
//! `<type> <size>\0<content>`.

pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod signature;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in bytes
pub const OBJECT_ID_SIZE: usize = 20;

/// Length of the abbreviated hex form
pub const SHORT_OBJECT_ID_LENGTH: usize = 12;
