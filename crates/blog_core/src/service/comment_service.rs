//! Comment use-case service.
//!
//! # Responsibility
//! - Save comments created outside an entry's collection, whether their
//!   owner was set by object or by id.
//! - Destroy single comments and refresh stale in-memory handles.

use crate::model::comment::{Comment, CommentId};
use crate::model::RecordState;
use crate::repo::comment_repo::CommentRepository;
use crate::service::entry_service::{ServiceError, ServiceResult};

/// Comment service facade over a comment repository.
pub struct CommentService<C: CommentRepository> {
    repo: C,
}

impl<C: CommentRepository> CommentService<C> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: C) -> Self {
        Self { repo }
    }

    /// Inserts a transient comment or updates a persisted one.
    ///
    /// On validation failure the comment stays in its previous state.
    pub fn save_comment(&self, comment: &mut Comment) -> ServiceResult<()> {
        match comment.state() {
            RecordState::Transient => {
                self.repo.insert_comment(comment)?;
            }
            RecordState::Persisted => self.repo.update_comment(comment)?,
            RecordState::Destroyed => return Err(destroyed_comment(comment)),
        }
        Ok(())
    }

    /// Saves `comment` and hands it back persisted.
    pub fn create_comment(&self, mut comment: Comment) -> ServiceResult<Comment> {
        self.save_comment(&mut comment)?;
        Ok(comment)
    }

    pub fn get_comment(&self, id: CommentId) -> ServiceResult<Option<Comment>> {
        Ok(self.repo.get_comment(id)?)
    }

    /// Whether a row with `id` is still stored.
    pub fn comment_exists(&self, id: CommentId) -> ServiceResult<bool> {
        Ok(self.repo.exists(id)?)
    }

    /// Total number of stored comments across all entries.
    pub fn count_comments(&self) -> ServiceResult<u64> {
        Ok(self.repo.count_comments()?)
    }

    /// Deletes one persisted comment and marks it destroyed.
    pub fn destroy_comment(&self, comment: &mut Comment) -> ServiceResult<()> {
        let id = match (comment.state(), comment.id()) {
            (RecordState::Persisted, Some(id)) => id,
            (RecordState::Destroyed, _) => return Err(destroyed_comment(comment)),
            _ => return Err(ServiceError::NotSaved { table: "comments" }),
        };
        self.repo.delete_comment(id)?;
        comment.mark_destroyed();
        Ok(())
    }

    /// Reloads a persisted comment from storage.
    ///
    /// A comment whose row is gone, e.g. after a collection replace or an
    /// entry destroy, is marked destroyed. Transient and destroyed comments
    /// are left as they are.
    pub fn refresh_comment(&self, comment: &mut Comment) -> ServiceResult<RecordState> {
        let Some(id) = comment.id().filter(|_| comment.is_persisted()) else {
            return Ok(comment.state());
        };
        match self.repo.get_comment(id)? {
            Some(stored) => *comment = stored,
            None => comment.mark_destroyed(),
        }
        Ok(comment.state())
    }
}

fn destroyed_comment(comment: &Comment) -> ServiceError {
    ServiceError::Destroyed {
        table: "comments",
        id: comment.id().unwrap_or_default(),
    }
}
