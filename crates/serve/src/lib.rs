//! Read-only HTTP lookups against the active database.
//!
//! [`QueryServer`] exposes one route, `GET /{table}/{id}`, which returns the
//! row whose primary key (or rowid, if the table declares none) equals `id`:
//!
//! - `200` with the row as a JSON object (BLOBs as base64 strings),
//! - `404` with `{"error": "Not found"}` if no such row exists,
//! - `500` with `{"error": "<message>"}` if no database is open, the table
//!   does not exist, or SQLite rejects the lookup.
//!
//! Every request is published as a [`RequestEvent`] to subscribers of
//! [`QueryServer::subscribe`].
//!
//! # Security
//!
//! The server is unauthenticated and listens on all interfaces. Anyone who
//! can reach the port can read any row of any table in the selected file.
//! Only run it on a trusted local network.

pub mod error;
mod handlers;
mod observer;
mod server;

pub use crate::observer::{RequestEvent, RequestLog};
pub use crate::server::QueryServer;
