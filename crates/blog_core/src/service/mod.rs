//! Use-case services over the entry/comment repositories.
//!
//! # Responsibility
//! - Expose the entry-owns-comments collection operations.
//! - Dispatch save to insert or update from the record's lifecycle state.
//! - Keep callers decoupled from SQL and transaction details.

pub mod comment_service;
pub mod entry_service;
