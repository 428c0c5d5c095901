//! Comment: the child record bound to exactly one entry.
//!
//! # Invariants
//! - `text` must be present (non-blank).
//! - `entry_id` must be set and, at write time, resolve to an existing entry.
//! - `post_id` is a legacy name for `entry_id`; both address one field.

use crate::model::entry::{Entry, EntryId};
use crate::model::validation::{is_blank, ValidationErrors, BLANK, MUST_EXIST};
use crate::model::RecordState;
use serde::{Deserialize, Serialize};

/// Auto-increment row id of `comments`.
pub type CommentId = i64;

/// Comment record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub(crate) id: Option<CommentId>,
    pub text: Option<String>,
    #[serde(alias = "post_id")]
    pub(crate) entry_id: Option<EntryId>,
    pub(crate) created_at: Option<i64>,
    pub(crate) updated_at: Option<i64>,
    #[serde(skip)]
    pub(crate) state: RecordState,
}

impl Comment {
    /// Creates a transient comment with no owning entry.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a transient comment owned by `entry`.
    pub fn for_entry(text: impl Into<String>, entry: &Entry) -> Self {
        let mut comment = Self::new(text);
        comment.set_entry(Some(entry));
        comment
    }

    /// Creates a transient comment owned by the entry with `entry_id`.
    pub fn with_entry_id(text: impl Into<String>, entry_id: EntryId) -> Self {
        let mut comment = Self::new(text);
        comment.entry_id = Some(entry_id);
        comment
    }

    pub fn id(&self) -> Option<CommentId> {
        self.id
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        self.entry_id
    }

    pub fn set_entry_id(&mut self, entry_id: Option<EntryId>) {
        self.entry_id = entry_id;
    }

    /// Legacy accessor for `entry_id`.
    pub fn post_id(&self) -> Option<EntryId> {
        self.entry_id
    }

    /// Legacy mutator for `entry_id`.
    pub fn set_post_id(&mut self, post_id: Option<EntryId>) {
        self.set_entry_id(post_id);
    }

    /// Points this comment at `entry`, or clears the reference with `None`.
    ///
    /// A transient entry has no id yet, so assigning one leaves the
    /// reference unset.
    pub fn set_entry(&mut self, entry: Option<&Entry>) {
        self.entry_id = entry.and_then(Entry::id);
    }

    /// Whether this comment references `entry`.
    pub fn belongs_to(&self, entry: &Entry) -> bool {
        self.entry_id.is_some() && self.entry_id == entry.id()
    }

    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<i64> {
        self.updated_at
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn is_persisted(&self) -> bool {
        self.state.is_persisted()
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.is_destroyed()
    }

    pub fn is_new_record(&self) -> bool {
        self.state.is_new_record()
    }

    /// Runs presence checks without touching storage.
    ///
    /// Whether `entry_id` resolves to a stored entry is checked by the
    /// repository at write time.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if is_blank(self.text.as_deref()) {
            errors.add("text", BLANK);
        }
        if self.entry_id.is_none() {
            errors.add("entry", MUST_EXIST);
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    pub(crate) fn mark_persisted(&mut self, id: CommentId, created_at: i64, updated_at: i64) {
        self.id = Some(id);
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        self.state = RecordState::Persisted;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.state = RecordState::Destroyed;
    }
}
