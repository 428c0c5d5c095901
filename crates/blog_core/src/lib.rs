//! Data layer for a small blog: entries that own ordered comments.
//!
//! Entries and comments live in SQLite. Repositories own the SQL and the
//! association bookkeeping; services expose the collection operations
//! (`comments`, create-through, append, build, replace, cascade destroy).

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{DatabaseLocation, StoreConfig, StoreError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::collection::CommentCollection;
pub use model::comment::{Comment, CommentId};
pub use model::entry::{Entry, EntryId};
pub use model::validation::{FieldError, ValidationErrors};
pub use model::RecordState;
pub use repo::comment_repo::{CommentRepository, SqliteCommentRepository};
pub use repo::entry_repo::{EntryRepository, RepoError, RepoResult, SqliteEntryRepository};
pub use service::comment_service::CommentService;
pub use service::entry_service::{EntryService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
