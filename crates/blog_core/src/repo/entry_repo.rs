//! Entry repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `entries`.
//! - Destroy an entry together with all of its comments atomically.
//!
//! # Invariants
//! - Write paths run `Entry::validate()` before SQL mutations.
//! - `delete_entry` never leaves comments behind for the removed entry.

use crate::db::DbError;
use crate::model::comment::CommentId;
use crate::model::entry::{Entry, EntryId};
use crate::model::validation::ValidationErrors;
use crate::model::RecordState;
use crate::repo::comment_repo::delete_comments_of_entry;
use crate::repo::ensure_table_ready;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    title,
    body,
    text,
    blog_id,
    created_at,
    updated_at
FROM entries";

const ENTRY_COLUMNS: &[&str] = &[
    "id",
    "title",
    "body",
    "text",
    "blog_id",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by entry and comment persistence.
#[derive(Debug)]
pub enum RepoError {
    /// One or more fields failed validation; nothing was written.
    Validation(ValidationErrors),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    EntryNotFound(EntryId),
    CommentNotFound(CommentId),
    /// The in-memory record was already destroyed.
    Destroyed { table: &'static str, id: i64 },
    /// The operation expects a record in a different lifecycle state.
    InvalidState(String),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::CommentNotFound(id) => write!(f, "comment not found: {id}"),
            Self::Destroyed { table, id } => write!(f, "record {table}#{id} was destroyed"),
            Self::InvalidState(message) => write!(f, "invalid record state: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for RepoError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for entry CRUD.
pub trait EntryRepository {
    /// Inserts a transient entry and marks it persisted.
    fn create_entry(&self, entry: &mut Entry) -> RepoResult<EntryId>;
    /// Writes a persisted entry's fields and refreshes `updated_at`.
    fn update_entry(&self, entry: &mut Entry) -> RepoResult<()>;
    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>>;
    /// Lists entries in creation order.
    fn list_entries(&self) -> RepoResult<Vec<Entry>>;
    fn count_entries(&self) -> RepoResult<u64>;
    /// Deletes one entry and its comments in one transaction.
    ///
    /// Returns the number of comments removed with it.
    fn delete_entry(&self, id: EntryId) -> RepoResult<usize>;
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "entries", ENTRY_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create_entry(&self, entry: &mut Entry) -> RepoResult<EntryId> {
        match entry.state() {
            RecordState::Transient => {}
            RecordState::Persisted => {
                return Err(RepoError::InvalidState(
                    "create_entry expects a transient entry".to_string(),
                ))
            }
            RecordState::Destroyed => return Err(destroyed_entry(entry)),
        }
        entry.validate().into_result()?;

        let (id, created_at, updated_at): (EntryId, i64, i64) = self.conn.query_row(
            "INSERT INTO entries (title, body, text, blog_id)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, created_at, updated_at;",
            params![
                entry.title.as_deref(),
                entry.body.as_deref(),
                entry.text.as_deref(),
                entry.blog_id,
            ],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        entry.mark_persisted(id, created_at, updated_at);
        info!("event=entry_create module=entry_repo status=ok entry_id={id}");
        Ok(id)
    }

    fn update_entry(&self, entry: &mut Entry) -> RepoResult<()> {
        let id = persisted_entry_id(entry)?;
        entry.validate().into_result()?;

        let stamps: Option<(i64, i64)> = self
            .conn
            .query_row(
                "UPDATE entries
                 SET
                    title = ?2,
                    body = ?3,
                    text = ?4,
                    blog_id = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1
                 RETURNING created_at, updated_at;",
                params![
                    id,
                    entry.title.as_deref(),
                    entry.body.as_deref(),
                    entry.text.as_deref(),
                    entry.blog_id,
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((created_at, updated_at)) = stamps else {
            return Err(RepoError::EntryNotFound(id));
        };
        entry.mark_persisted(id, created_at, updated_at);
        Ok(())
    }

    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }
        Ok(None)
    }

    fn list_entries(&self) -> RepoResult<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn count_entries(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries;", [], |row| row.get(0))?;
        count_to_u64(count, "entries")
    }

    fn delete_entry(&self, id: EntryId) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !entry_exists(&tx, id)? {
            return Err(RepoError::EntryNotFound(id));
        }

        let removed_comments = delete_comments_of_entry(&tx, id)?;
        tx.execute("DELETE FROM entries WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!(
            "event=entry_delete module=entry_repo status=ok entry_id={id} comments_removed={removed_comments}"
        );
        Ok(removed_comments)
    }
}

/// Whether a row with `id` exists in `entries`.
pub(crate) fn entry_exists(conn: &Connection, id: EntryId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entries WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn count_to_u64(count: i64, table: &str) -> RepoResult<u64> {
    u64::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}` in {table}")))
}

fn persisted_entry_id(entry: &Entry) -> RepoResult<EntryId> {
    match (entry.state(), entry.id()) {
        (RecordState::Persisted, Some(id)) => Ok(id),
        (RecordState::Destroyed, _) => Err(destroyed_entry(entry)),
        _ => Err(RepoError::InvalidState(
            "entry has not been saved yet".to_string(),
        )),
    }
}

fn destroyed_entry(entry: &Entry) -> RepoError {
    RepoError::Destroyed {
        table: "entries",
        id: entry.id().unwrap_or_default(),
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<Entry> {
    Ok(Entry {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        body: row.get("body")?,
        text: row.get("text")?,
        blog_id: row.get("blog_id")?,
        created_at: Some(row.get("created_at")?),
        updated_at: Some(row.get("updated_at")?),
        state: RecordState::Persisted,
    })
}
