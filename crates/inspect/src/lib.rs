//! Browse and edit arbitrary SQLite files.
//!
//! Unlike `stash-store`, nothing here assumes a schema: tables and views are
//! discovered at open time and every identifier that ends up in a statement
//! comes from that discovery.
//!
//! # Architecture
//! - [`Catalog`]: tables, views, columns and how each table's rows are
//!   addressed.
//! - [`Inspector`]: one open file; paged reads, counts, single-cell updates
//!   and primary-key lookups.
//! - [`ActiveDatabase`]: the one file currently selected, shared between
//!   consumers.
//! - [`Value`] / [`Row`]: dynamically-typed results, serializable to JSON
//!   (BLOBs as base64).

mod catalog;
pub mod error;
mod inspector;
mod slot;
mod value;

pub use crate::catalog::{Catalog, ColumnInfo, TableDescriptor, TableKind};
pub use crate::inspector::Inspector;
pub use crate::slot::ActiveDatabase;
pub use crate::value::{ROW_ID_KEY, Row, Value, ValueKind};
