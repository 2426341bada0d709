//! Filesystem tree entries as discovered by a walk.
//!
//! Entries are ephemeral: every reconciliation pass walks both trees afresh
//! and nothing about them is persisted between passes.

mod entry;

#[cfg(test)]
pub mod fixtures;

pub use entry::{EntryKind, TreeEntry};
