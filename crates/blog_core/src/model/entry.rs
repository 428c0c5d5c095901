//! Entry: the parent record that owns comments.
//!
//! # Invariants
//! - `text` must be present (non-blank) for the entry to be saved.
//! - `id`, `created_at` and `updated_at` are assigned by storage only.

use crate::model::validation::{is_blank, ValidationErrors, BLANK};
use crate::model::RecordState;
use serde::{Deserialize, Serialize};

/// Auto-increment row id of `entries`.
pub type EntryId = i64;

/// Blog entry record.
///
/// `title` and `body` mirror the original `entries` columns and stay
/// optional; `text` is the validated payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub(crate) id: Option<EntryId>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub text: Option<String>,
    pub blog_id: Option<i64>,
    /// Epoch milliseconds, whole seconds only.
    pub(crate) created_at: Option<i64>,
    /// Epoch milliseconds, whole seconds only; unchanged by a second update
    /// within the same second.
    pub(crate) updated_at: Option<i64>,
    #[serde(skip)]
    pub(crate) state: RecordState,
}

impl Entry {
    /// Creates an empty transient entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transient entry with the given payload.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<EntryId> {
        self.id
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
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if is_blank(self.text.as_deref()) {
            errors.add("text", BLANK);
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    pub(crate) fn mark_persisted(&mut self, id: EntryId, created_at: i64, updated_at: i64) {
        self.id = Some(id);
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
        self.state = RecordState::Persisted;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.state = RecordState::Destroyed;
    }
}

#[cfg(test)]
mod tests {
    use super::Entry;
    use crate::model::RecordState;

    #[test]
    fn new_entry_is_transient_without_identity() {
        let entry = Entry::new();
        assert_eq!(entry.id(), None);
        assert_eq!(entry.state(), RecordState::Transient);
        assert!(entry.is_new_record());
        assert!(!entry.is_persisted());
    }

    #[test]
    fn text_presence_is_required() {
        assert!(Entry::with_text("Hello").is_valid());

        let errors = Entry::new().validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.on("text").len(), 1);

        assert_eq!(Entry::with_text("   ").validate().on("text").len(), 1);
    }

    #[test]
    fn title_and_body_do_not_satisfy_text() {
        let entry = Entry {
            title: Some("title".to_string()),
            body: Some("body".to_string()),
            ..Entry::new()
        };
        assert!(!entry.is_valid());
    }
}
