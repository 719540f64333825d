//! Concurrency-aware facade over the message database.
//!
//! Writes (insert/delete) go through a single mutex-guarded connection: the
//! duplicate-id check and the row write happen atomically inside that
//! exclusive section, backed by the primary key on `message_id`.  Reads use a
//! second connection with its own lock, so list queries wait only on each
//! other and never on the write gate; WAL mode gives the reader a consistent
//! snapshot.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use veil_shared::{Address, MessageId, RoomId};

use crate::database::Database;
use crate::error::Result;
use crate::models::StoredMessage;

/// Shared handle to the message store.
pub struct MessageStore {
    writer: Mutex<Database>,
    reader: Mutex<Database>,
}

impl MessageStore {
    /// Open (or create) the store at the given path with separate writer and
    /// reader connections.
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Database::open_at(path)?;
        let reader = Database::open_at(path)?;
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    pub(crate) fn writer(&self) -> MutexGuard<'_, Database> {
        // A poisoned lock only means another thread panicked mid-query; the
        // connection itself is still usable.
        self.writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn reader(&self) -> MutexGuard<'_, Database> {
        self.reader
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Write path (exclusive section)
    // ------------------------------------------------------------------

    /// Insert a message.  Exactly one insert per id ever succeeds; a
    /// duplicate returns [`crate::StoreError::DuplicateId`] without touching
    /// the existing row.
    pub fn insert(&self, message: &StoredMessage) -> Result<()> {
        let db = self.writer();
        db.insert_message(message)?;
        tracing::debug!(id = %message.id, kind = message.kind.as_str(), "message stored");
        Ok(())
    }

    /// Remove a message.  Returns `true` if a row existed; removing an
    /// absent id is a normal `false`, never an error.
    pub fn remove(&self, id: &MessageId) -> Result<bool> {
        let db = self.writer();
        let removed = db.delete_message(id)?;
        if removed {
            tracing::debug!(id = %id, "message removed");
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    /// Point read by message id.
    pub fn get(&self, id: &MessageId) -> Result<StoredMessage> {
        self.reader().get_message(id)
    }

    /// Direct-thread page between two addresses; see
    /// [`Database::list_direct_messages`].
    pub fn list_direct(
        &self,
        a: &Address,
        b: &Address,
        before: Option<i64>,
        limit: u32,
    ) -> Result<Vec<StoredMessage>> {
        self.reader()
            .list_direct_messages(a, b, before.unwrap_or(i64::MAX), limit)
    }

    /// Room page; see [`Database::list_room_messages`].
    pub fn list_room(&self, room: &RoomId, offset: u32, limit: u32) -> Result<Vec<StoredMessage>> {
        self.reader().list_room_messages(room, offset, limit)
    }

    /// Number of messages in a room.
    pub fn count_room(&self, room: &RoomId) -> Result<u64> {
        self.reader().count_room_messages(room)
    }
}
