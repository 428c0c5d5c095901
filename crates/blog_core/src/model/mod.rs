//! Domain model for blog entries and their comments.
//!
//! # Responsibility
//! - Define the `Entry` parent record and the `Comment` child record.
//! - Keep presence validation pure and free of storage access.
//!
//! # Invariants
//! - Identity is the auto-increment row id, assigned only by storage.
//! - A record moves `Transient -> Persisted -> Destroyed` and never back.

pub mod collection;
pub mod comment;
pub mod entry;
pub mod validation;

use serde::{Deserialize, Serialize};

/// Persistence lifecycle shared by entries and comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Built in memory, never written.
    #[default]
    Transient,
    /// Row exists in storage.
    Persisted,
    /// Row was removed, explicitly or by cascade.
    Destroyed,
}

impl RecordState {
    pub fn is_persisted(self) -> bool {
        self == Self::Persisted
    }

    pub fn is_destroyed(self) -> bool {
        self == Self::Destroyed
    }

    pub fn is_new_record(self) -> bool {
        self == Self::Transient
    }
}
