//! In-memory view of one entry's comments.
//!
//! # Invariants
//! - Loaded records come first, in storage order (`id ASC`).
//! - Records added by `build` are transient and always form a suffix.

use crate::model::comment::Comment;
use crate::model::entry::EntryId;

/// Comments of one entry as loaded from storage, plus built-but-unsaved ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentCollection {
    entry_id: Option<EntryId>,
    records: Vec<Comment>,
}

impl CommentCollection {
    pub(crate) fn loaded(entry_id: Option<EntryId>, records: Vec<Comment>) -> Self {
        Self { entry_id, records }
    }

    /// Owning entry id; `None` for a transient entry.
    pub fn entry_id(&self) -> Option<EntryId> {
        self.entry_id
    }

    pub fn records(&self) -> &[Comment] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comment> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Comment> {
        self.records.clone()
    }

    /// Number of built comments that have not been written yet.
    pub fn pending_len(&self) -> usize {
        self.records
            .iter()
            .filter(|comment| comment.is_new_record())
            .count()
    }

    /// Adds a transient comment owned by this collection's entry.
    ///
    /// Nothing is written; the returned copy equals the record kept here.
    pub fn build(&mut self, text: impl Into<String>) -> Comment {
        let mut comment = Comment::new(text);
        comment.set_entry_id(self.entry_id);
        self.records.push(comment.clone());
        comment
    }

    pub(crate) fn take_pending(&mut self) -> Vec<Comment> {
        let split = self
            .records
            .iter()
            .position(Comment::is_new_record)
            .unwrap_or(self.records.len());
        self.records.split_off(split)
    }

    /// Swaps in `records` and hands back what was held before.
    pub(crate) fn replace_records(&mut self, records: Vec<Comment>) -> Vec<Comment> {
        std::mem::replace(&mut self.records, records)
    }

    pub(crate) fn restore(&mut self, comments: Vec<Comment>) {
        self.records.extend(comments);
    }
}

impl<'a> IntoIterator for &'a CommentCollection {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
