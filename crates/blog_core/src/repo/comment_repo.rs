//! Comment repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `comments`.
//! - Own association bookkeeping keyed by `entry_id`: ordered lookup, full
//!   replacement and cascade delete.
//!
//! # Invariants
//! - Every written comment references an existing entry; a dangling
//!   `entry_id` is reported as a validation error on `entry`.
//! - Collection order is storage order (`id ASC`).
//! - `replace_for_entry` is all-or-nothing: on error no row changes and no
//!   in-memory record changes state.

use crate::model::comment::{Comment, CommentId};
use crate::model::entry::EntryId;
use crate::model::validation::MUST_EXIST;
use crate::model::RecordState;
use crate::repo::entry_repo::{count_to_u64, entry_exists, RepoError, RepoResult};
use crate::repo::ensure_table_ready;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    text,
    entry_id,
    created_at,
    updated_at
FROM comments";

const COMMENT_COLUMNS: &[&str] = &["id", "text", "entry_id", "created_at", "updated_at"];

/// Repository interface for comments and their entry association.
pub trait CommentRepository {
    /// Inserts a transient comment and marks it persisted.
    fn insert_comment(&self, comment: &mut Comment) -> RepoResult<CommentId>;
    /// Inserts several transient comments in one transaction, in slice order.
    fn insert_all(&self, comments: &mut [Comment]) -> RepoResult<()>;
    /// Writes a persisted comment's text and owner, refreshing `updated_at`.
    fn update_comment(&self, comment: &mut Comment) -> RepoResult<()>;
    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>>;
    fn exists(&self, id: CommentId) -> RepoResult<bool>;
    fn delete_comment(&self, id: CommentId) -> RepoResult<()>;
    fn count_comments(&self) -> RepoResult<u64>;
    fn count_by_entry(&self, entry_id: EntryId) -> RepoResult<u64>;
    /// Comments owned by `entry_id` in storage order.
    fn find_by_entry(&self, entry_id: EntryId) -> RepoResult<Vec<Comment>>;
    /// Makes `comments` the full comment set of `entry_id`.
    ///
    /// Transient comments are inserted, persisted ones are re-pointed at the
    /// entry, and previously owned comments missing from `comments` are
    /// deleted. Returns the deleted comments, marked destroyed.
    fn replace_for_entry(
        &self,
        entry_id: EntryId,
        comments: &mut [Comment],
    ) -> RepoResult<Vec<Comment>>;
    /// Deletes every comment owned by `entry_id`, returning how many.
    fn delete_by_entry(&self, entry_id: EntryId) -> RepoResult<usize>;
}

/// SQLite-backed comment repository.
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "comments", COMMENT_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn insert_comment(&self, comment: &mut Comment) -> RepoResult<CommentId> {
        ensure_transient(comment)?;
        validate_for_write(self.conn, comment)?;

        let (id, created_at, updated_at) = insert_row(self.conn, comment)?;
        comment.mark_persisted(id, created_at, updated_at);
        debug!("event=comment_insert module=comment_repo status=ok comment_id={id}");
        Ok(id)
    }

    fn insert_all(&self, comments: &mut [Comment]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut stamps = Vec::with_capacity(comments.len());
        for comment in comments.iter() {
            ensure_transient(comment)?;
            validate_for_write(&tx, comment)?;
            stamps.push(insert_row(&tx, comment)?);
        }
        tx.commit()?;

        for (comment, (id, created_at, updated_at)) in comments.iter_mut().zip(stamps) {
            comment.mark_persisted(id, created_at, updated_at);
        }
        debug!(
            "event=comment_insert_all module=comment_repo status=ok count={}",
            comments.len()
        );
        Ok(())
    }

    fn update_comment(&self, comment: &mut Comment) -> RepoResult<()> {
        let id = persisted_comment_id(comment)?;
        validate_for_write(self.conn, comment)?;

        let Some((created_at, updated_at)) = update_row(self.conn, id, comment)? else {
            return Err(RepoError::CommentNotFound(id));
        };
        comment.mark_persisted(id, created_at, updated_at);
        Ok(())
    }

    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COMMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_comment_row(row)?));
        }
        Ok(None)
    }

    fn exists(&self, id: CommentId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn delete_comment(&self, id: CommentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::CommentNotFound(id));
        }
        Ok(())
    }

    fn count_comments(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM comments;", [], |row| row.get(0))?;
        count_to_u64(count, "comments")
    }

    fn count_by_entry(&self, entry_id: EntryId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE entry_id = ?1;",
            [entry_id],
            |row| row.get(0),
        )?;
        count_to_u64(count, "comments")
    }

    fn find_by_entry(&self, entry_id: EntryId) -> RepoResult<Vec<Comment>> {
        load_comments_of_entry(self.conn, entry_id)
    }

    fn replace_for_entry(
        &self,
        entry_id: EntryId,
        comments: &mut [Comment],
    ) -> RepoResult<Vec<Comment>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !entry_exists(&tx, entry_id)? {
            return Err(RepoError::EntryNotFound(entry_id));
        }

        // Work on copies so a failed replace leaves callers' records untouched.
        let mut staged = comments.to_vec();
        for comment in staged.iter_mut() {
            if comment.is_destroyed() {
                return Err(destroyed_comment(comment));
            }
            comment.set_entry_id(Some(entry_id));
            validate_for_write(&tx, comment)?;
        }

        let kept: HashSet<CommentId> = staged
            .iter()
            .filter(|comment| comment.is_persisted())
            .filter_map(Comment::id)
            .collect();
        let mut removed: Vec<Comment> = load_comments_of_entry(&tx, entry_id)?
            .into_iter()
            .filter(|comment| comment.id().map_or(true, |id| !kept.contains(&id)))
            .collect();
        for comment in &removed {
            tx.execute("DELETE FROM comments WHERE id = ?1;", [comment.id()])?;
        }

        for comment in staged.iter_mut() {
            match (comment.state(), comment.id()) {
                (RecordState::Persisted, Some(id)) => {
                    let Some((created_at, updated_at)) = update_row(&tx, id, comment)? else {
                        return Err(RepoError::CommentNotFound(id));
                    };
                    comment.mark_persisted(id, created_at, updated_at);
                }
                _ => {
                    let (id, created_at, updated_at) = insert_row(&tx, comment)?;
                    comment.mark_persisted(id, created_at, updated_at);
                }
            }
        }
        tx.commit()?;

        comments.clone_from_slice(&staged);
        for comment in removed.iter_mut() {
            comment.mark_destroyed();
        }
        info!(
            "event=comment_replace module=comment_repo status=ok entry_id={} count={} removed={}",
            entry_id,
            comments.len(),
            removed.len()
        );
        Ok(removed)
    }

    fn delete_by_entry(&self, entry_id: EntryId) -> RepoResult<usize> {
        let removed = delete_comments_of_entry(self.conn, entry_id)?;
        info!(
            "event=comment_delete_by_entry module=comment_repo status=ok entry_id={entry_id} removed={removed}"
        );
        Ok(removed)
    }
}

/// Deletes all comments of one entry on `conn`, which may be a transaction.
pub(crate) fn delete_comments_of_entry(conn: &Connection, entry_id: EntryId) -> RepoResult<usize> {
    let removed = conn.execute("DELETE FROM comments WHERE entry_id = ?1;", [entry_id])?;
    Ok(removed)
}

fn load_comments_of_entry(conn: &Connection, entry_id: EntryId) -> RepoResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "{COMMENT_SELECT_SQL} WHERE entry_id = ?1 ORDER BY id ASC;"
    ))?;
    let mut rows = stmt.query([entry_id])?;
    let mut comments = Vec::new();
    while let Some(row) = rows.next()? {
        comments.push(parse_comment_row(row)?);
    }
    Ok(comments)
}

/// Field checks plus the parent lookup that needs storage.
fn validate_for_write(conn: &Connection, comment: &Comment) -> RepoResult<()> {
    let mut errors = comment.validate();
    if let Some(entry_id) = comment.entry_id() {
        if !entry_exists(conn, entry_id)? {
            errors.add("entry", MUST_EXIST);
        }
    }
    errors.into_result()?;
    Ok(())
}

fn insert_row(conn: &Connection, comment: &Comment) -> RepoResult<(CommentId, i64, i64)> {
    let row = conn.query_row(
        "INSERT INTO comments (text, entry_id)
         VALUES (?1, ?2)
         RETURNING id, created_at, updated_at;",
        params![comment.text.as_deref(), comment.entry_id()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    Ok(row)
}

fn update_row(
    conn: &Connection,
    id: CommentId,
    comment: &Comment,
) -> RepoResult<Option<(i64, i64)>> {
    let stamps = conn
        .query_row(
            "UPDATE comments
             SET
                text = ?2,
                entry_id = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
             RETURNING created_at, updated_at;",
            params![id, comment.text.as_deref(), comment.entry_id()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(stamps)
}

fn ensure_transient(comment: &Comment) -> RepoResult<()> {
    match comment.state() {
        RecordState::Transient => Ok(()),
        RecordState::Persisted => Err(RepoError::InvalidState(
            "insert expects a transient comment".to_string(),
        )),
        RecordState::Destroyed => Err(destroyed_comment(comment)),
    }
}

fn persisted_comment_id(comment: &Comment) -> RepoResult<CommentId> {
    match (comment.state(), comment.id()) {
        (RecordState::Persisted, Some(id)) => Ok(id),
        (RecordState::Destroyed, _) => Err(destroyed_comment(comment)),
        _ => Err(RepoError::InvalidState(
            "comment has not been saved yet".to_string(),
        )),
    }
}

fn destroyed_comment(comment: &Comment) -> RepoError {
    RepoError::Destroyed {
        table: "comments",
        id: comment.id().unwrap_or_default(),
    }
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let id: CommentId = row.get("id")?;
    let text: String = row.get("text")?;
    if text.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "blank text in comments.text for comment {id}"
        )));
    }

    Ok(Comment {
        id: Some(id),
        text: Some(text),
        entry_id: Some(row.get("entry_id")?),
        created_at: Some(row.get("created_at")?),
        updated_at: Some(row.get("updated_at")?),
        state: RecordState::Persisted,
    })
}
