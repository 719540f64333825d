//! # veil-store
//!
//! Durable message storage for the Veil engine, backed by SQLite.
//!
//! The crate exposes two layers: a synchronous [`Database`] handle wrapping a
//! single `rusqlite::Connection` with typed query helpers, and the
//! concurrency-aware [`MessageStore`] that pairs a mutex-guarded writer
//! connection with an independent reader so list queries never wait behind
//! the insert/delete critical section.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod store;
pub mod threads;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::StoredMessage;
pub use store::MessageStore;
pub use threads::Thread;
