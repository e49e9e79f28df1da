//! Porcelain commands (user-facing history edits)
//!
//! ## Commands
//!
//! - `amend`: Reword one commit and replay everything after it
//! - `batch`: Run several rewords read from a file

pub mod amend;
pub mod batch;
