//! SQLite blob store for content-fingerprinted files.
//!
//! This crate owns the fixed `files` table: every ingested file is stored in
//! full (as a BLOB) next to its display name, an optional MIME type, its size
//! and two digests of its content.
//!
//! # Architecture
//! - [`hash`]: the two content digests (MD5 for quick duplicate signalling,
//!   SHA-256 as the integrity/identity signal). Column names in the schema
//!   are kept as `md5_hash`/`sha256_hash` for compatibility with existing
//!   database files.
//! - [`Database`]: connection pool management and schema bootstrap.
//! - [`Repository`]: transactional insert/list/fetch/rename/delete.
//! - [`ingest`]: reading files from disk into the repository.

mod db;
pub mod error;
pub mod hash;
pub mod ingest;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::hash::{Digests, hash};
pub use crate::models::{FileRecord, FileSummary, StoredFile};
pub use crate::repo::Repository;

/// Name of the fixed table managed by this crate.
pub const FILES_TABLE: &str = "files";
