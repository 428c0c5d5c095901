//! Entry use-case service.
//!
//! # Responsibility
//! - Create, save and destroy entries.
//! - Manage an entry's comment collection: read, create through, append,
//!   build-then-save and full replacement.
//!
//! # Invariants
//! - Destroying an entry removes all its comments in the same transaction.
//! - A transient entry has an empty collection and cannot accept comments.
//! - A rejected operation leaves caller-owned records in their prior state.

use crate::model::collection::CommentCollection;
use crate::model::comment::{Comment, CommentId};
use crate::model::entry::{Entry, EntryId};
use crate::model::validation::ValidationErrors;
use crate::model::RecordState;
use crate::repo::comment_repo::CommentRepository;
use crate::repo::entry_repo::{EntryRepository, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for entry and comment use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Field checks failed; nothing was written.
    Validation(ValidationErrors),
    EntryNotFound(EntryId),
    CommentNotFound(CommentId),
    /// The operation needs a saved record; `table` names which kind.
    NotSaved { table: &'static str },
    /// The record was destroyed and cannot be written again.
    Destroyed { table: &'static str, id: i64 },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    /// Validation errors carried by this error, if any.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "{errors}"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::CommentNotFound(id) => write!(f, "comment not found: {id}"),
            Self::NotSaved { table } => write!(f, "record in {table} has not been saved yet"),
            Self::Destroyed { table, id } => write!(f, "record {table}#{id} was destroyed"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(errors) => Self::Validation(errors),
            RepoError::EntryNotFound(id) => Self::EntryNotFound(id),
            RepoError::CommentNotFound(id) => Self::CommentNotFound(id),
            RepoError::Destroyed { table, id } => Self::Destroyed { table, id },
            other => Self::Repo(other),
        }
    }
}

/// Entry service facade over entry and comment repositories.
pub struct EntryService<E: EntryRepository, C: CommentRepository> {
    entries: E,
    comments: C,
}

impl<E: EntryRepository, C: CommentRepository> EntryService<E, C> {
    /// Creates a service using the provided repository implementations.
    pub fn new(entries: E, comments: C) -> Self {
        Self { entries, comments }
    }

    /// Inserts a transient entry.
    pub fn create_entry(&self, entry: &mut Entry) -> ServiceResult<EntryId> {
        Ok(self.entries.create_entry(entry)?)
    }

    /// Inserts a transient entry or updates a persisted one.
    pub fn save_entry(&self, entry: &mut Entry) -> ServiceResult<()> {
        match entry.state() {
            RecordState::Transient => {
                self.entries.create_entry(entry)?;
            }
            RecordState::Persisted => self.entries.update_entry(entry)?,
            RecordState::Destroyed => return Err(destroyed_entry(entry)),
        }
        Ok(())
    }

    pub fn get_entry(&self, id: EntryId) -> ServiceResult<Option<Entry>> {
        Ok(self.entries.get_entry(id)?)
    }

    pub fn list_entries(&self) -> ServiceResult<Vec<Entry>> {
        Ok(self.entries.list_entries()?)
    }

    pub fn count_entries(&self) -> ServiceResult<u64> {
        Ok(self.entries.count_entries()?)
    }

    /// Destroys the entry and every comment it owns.
    ///
    /// Returns the number of comments destroyed with it.
    pub fn destroy_entry(&self, entry: &mut Entry) -> ServiceResult<usize> {
        let id = self.owning_id(entry)?;
        let removed = self.entries.delete_entry(id)?;
        entry.mark_destroyed();
        info!(
            "event=entry_destroy module=service status=ok entry_id={id} comments_removed={removed}"
        );
        Ok(removed)
    }

    /// Loads the entry's comments in storage order.
    ///
    /// A transient entry yields an empty collection rather than an error.
    pub fn comments(&self, entry: &Entry) -> ServiceResult<CommentCollection> {
        match (entry.state(), entry.id()) {
            (RecordState::Persisted, Some(id)) => Ok(CommentCollection::loaded(
                Some(id),
                self.comments.find_by_entry(id)?,
            )),
            (RecordState::Destroyed, _) => Err(destroyed_entry(entry)),
            _ => Ok(CommentCollection::loaded(None, Vec::new())),
        }
    }

    /// Number of stored comments owned by the entry; zero for a transient one.
    pub fn comment_count(&self, entry: &Entry) -> ServiceResult<u64> {
        match (entry.state(), entry.id()) {
            (RecordState::Persisted, Some(id)) => Ok(self.comments.count_by_entry(id)?),
            (RecordState::Destroyed, _) => Err(destroyed_entry(entry)),
            _ => Ok(0),
        }
    }

    /// Creates and stores a comment owned by the entry.
    pub fn create_comment(&self, entry: &Entry, text: impl Into<String>) -> ServiceResult<Comment> {
        let id = self.owning_id(entry)?;
        let mut comment = Comment::with_entry_id(text, id);
        self.comments.insert_comment(&mut comment)?;
        Ok(comment)
    }

    /// Attaches `comment` to the entry and stores it immediately.
    ///
    /// A comment owned by another entry is moved to this one. It keeps its
    /// id, so it is listed by id among the entry's comments rather than
    /// after earlier appends.
    pub fn append_comment(&self, entry: &Entry, comment: &mut Comment) -> ServiceResult<()> {
        let id = self.owning_id(entry)?;
        let mut staged = comment.clone();
        staged.set_entry_id(Some(id));
        match staged.state() {
            RecordState::Transient => {
                self.comments.insert_comment(&mut staged)?;
            }
            RecordState::Persisted => self.comments.update_comment(&mut staged)?,
            RecordState::Destroyed => {
                return Err(ServiceError::Destroyed {
                    table: "comments",
                    id: staged.id().unwrap_or_default(),
                })
            }
        }
        *comment = staged;
        Ok(())
    }

    /// Replaces the entry's whole comment set with `comments`, in order.
    ///
    /// Returns the previously owned comments that were destroyed.
    pub fn replace_comments(
        &self,
        entry: &Entry,
        comments: &mut [Comment],
    ) -> ServiceResult<Vec<Comment>> {
        let id = self.owning_id(entry)?;
        Ok(self.comments.replace_for_entry(id, comments)?)
    }

    /// Replaces the whole comment set behind `collection`, in order.
    ///
    /// On success `collection` holds the stored `comments`. Its previously
    /// held records that were deleted are returned marked destroyed, along
    /// with any other deleted rows it had not loaded. Built comments that
    /// are not in `comments` are discarded. On error `collection` is left
    /// unchanged.
    pub fn replace_collection(
        &self,
        collection: &mut CommentCollection,
        mut comments: Vec<Comment>,
    ) -> ServiceResult<Vec<Comment>> {
        let id = collection
            .entry_id()
            .ok_or(ServiceError::NotSaved { table: "entries" })?;
        let removed = self.comments.replace_for_entry(id, &mut comments)?;

        let held: Vec<Comment> = collection
            .replace_records(comments)
            .into_iter()
            .filter(Comment::is_persisted)
            .collect();
        let mut destroyed = Vec::with_capacity(removed.len());
        for stored in removed {
            let mut record = held
                .iter()
                .find(|record| record.id() == stored.id())
                .cloned()
                .unwrap_or(stored);
            record.mark_destroyed();
            destroyed.push(record);
        }
        Ok(destroyed)
    }

    /// Stores every comment built on `collection` that is still transient.
    ///
    /// All-or-nothing; returns how many comments were written.
    pub fn save_collection(&self, collection: &mut CommentCollection) -> ServiceResult<usize> {
        let mut pending = collection.take_pending();
        let written = pending.len();
        let result = self.comments.insert_all(&mut pending);
        collection.restore(pending);
        if let Err(err) = result {
            warn!(
                "event=collection_save module=service status=error entry_id={:?} pending={} error={}",
                collection.entry_id(),
                written,
                err
            );
            return Err(err.into());
        }
        Ok(written)
    }

    fn owning_id(&self, entry: &Entry) -> ServiceResult<EntryId> {
        match (entry.state(), entry.id()) {
            (RecordState::Persisted, Some(id)) => Ok(id),
            (RecordState::Destroyed, _) => Err(destroyed_entry(entry)),
            _ => Err(ServiceError::NotSaved { table: "entries" }),
        }
    }
}

fn destroyed_entry(entry: &Entry) -> ServiceError {
    ServiceError::Destroyed {
        table: "entries",
        id: entry.id().unwrap_or_default(),
    }
}
