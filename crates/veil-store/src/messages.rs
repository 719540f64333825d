//! Query helpers for [`StoredMessage`] rows.

use chrono::{DateTime, Utc};
use rusqlite::params;
use veil_shared::{Address, MerkleRoot, MessageId, MessageKind, RoomId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::StoredMessage;

const COLUMNS: &str = "message_id, kind, sender_address, sender_pubkey, sender_hash, \
     timestamp, rln_proof, rln_root, receiver_address, receiver_pubkey, receiver_room, \
     ciphertext, content, reference, attachment, inserted_at";

impl Database {
    /// Insert a message row.  A primary-key collision on `message_id` maps to
    /// [`StoreError::DuplicateId`]; the existing row is left untouched.
    pub fn insert_message(&self, message: &StoredMessage) -> Result<()> {
        let res = self.conn().execute(
            "INSERT INTO messages (message_id, kind, sender_address, sender_pubkey, sender_hash,
                 timestamp, rln_proof, rln_root, receiver_address, receiver_pubkey, receiver_room,
                 ciphertext, content, reference, attachment, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                message.id.as_str(),
                message.kind.as_str(),
                message.sender_address.as_ref().map(|a| a.as_str()),
                message.sender_pubkey,
                message.sender_hash,
                message.timestamp,
                message.proof_serialized,
                message.proof_root.map(|r| r.to_hex()),
                message.receiver_address.as_ref().map(|a| a.as_str()),
                message.receiver_pubkey,
                message.receiver_room.as_ref().map(|r| r.as_str()),
                message.ciphertext,
                message.content,
                message.reference.as_ref().map(|r| r.as_str()),
                message.attachment,
                message.inserted_at.to_rfc3339(),
            ],
        );

        match res {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateId(message.id.0.clone()))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Delete a message by id.  Returns `true` if a row was deleted; deleting
    /// an absent id is a normal outcome, not an error.
    pub fn delete_message(&self, id: &MessageId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM messages WHERE message_id = ?1",
            params![id.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Fetch a single message by id.
    pub fn get_message(&self, id: &MessageId) -> Result<StoredMessage> {
        self.conn()
            .query_row(
                &format!("SELECT {COLUMNS} FROM messages WHERE message_id = ?1"),
                params![id.as_str()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List direct messages between two addresses, strictly descending by
    /// timestamp, restricted to `timestamp < before`.
    ///
    /// The timestamp of the last returned row is the cursor for the next page.
    pub fn list_direct_messages(
        &self,
        a: &Address,
        b: &Address,
        before: i64,
        limit: u32,
    ) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COLUMNS} FROM messages
             WHERE (
                 (sender_address = ?1 AND receiver_address = ?2)
                 OR
                 (sender_address = ?2 AND receiver_address = ?1)
             ) AND timestamp < ?3
             ORDER BY timestamp DESC
             LIMIT ?4"
        ))?;

        let rows = stmt.query_map(
            params![a.as_str(), b.as_str(), before, limit],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// List room messages, descending by timestamp, offset/limit paginated.
    pub fn list_room_messages(
        &self,
        room: &RoomId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<StoredMessage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COLUMNS} FROM messages
             WHERE receiver_room = ?1
             ORDER BY timestamp DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![room.as_str(), limit, offset], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Count messages in a room.
    pub fn count_room_messages(&self, room: &RoomId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE receiver_room = ?1",
            params![room.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`StoredMessage`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let id: String = row.get(0)?;
    let kind_str: String = row.get(1)?;
    let sender_address: Option<String> = row.get(2)?;
    let sender_pubkey: Option<String> = row.get(3)?;
    let sender_hash: Option<String> = row.get(4)?;
    let timestamp: i64 = row.get(5)?;
    let proof_serialized: Option<Vec<u8>> = row.get(6)?;
    let proof_root_hex: Option<String> = row.get(7)?;
    let receiver_address: Option<String> = row.get(8)?;
    let receiver_pubkey: Option<String> = row.get(9)?;
    let receiver_room: Option<String> = row.get(10)?;
    let ciphertext: Option<String> = row.get(11)?;
    let content: Option<String> = row.get(12)?;
    let reference: Option<String> = row.get(13)?;
    let attachment: Option<String> = row.get(14)?;
    let inserted_str: String = row.get(15)?;

    let kind = MessageKind::from_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown message kind: {kind_str}").into(),
        )
    })?;

    let proof_root = proof_root_hex
        .map(|hex| MerkleRoot::from_hex(&hex))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let inserted_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&inserted_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(15, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(StoredMessage {
        id: MessageId(id),
        kind,
        sender_address: sender_address.map(Address),
        sender_pubkey,
        sender_hash,
        timestamp,
        proof_serialized,
        proof_root,
        receiver_address: receiver_address.map(Address),
        receiver_pubkey,
        receiver_room: receiver_room.map(RoomId),
        ciphertext,
        content,
        reference: reference.map(MessageId),
        attachment,
        inserted_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn direct_row(id: &str, from: &str, to: &str, ts: i64) -> StoredMessage {
        StoredMessage {
            id: MessageId(id.into()),
            kind: MessageKind::Direct,
            sender_address: Some(Address(from.into())),
            sender_pubkey: None,
            sender_hash: None,
            timestamp: ts,
            proof_serialized: None,
            proof_root: None,
            receiver_address: Some(Address(to.into())),
            receiver_pubkey: None,
            receiver_room: None,
            ciphertext: Some("aabb".into()),
            content: None,
            reference: None,
            attachment: None,
            inserted_at: Utc::now(),
        }
    }

    fn room_row(id: &str, room: &str, ts: i64) -> StoredMessage {
        StoredMessage {
            id: MessageId(id.into()),
            kind: MessageKind::PublicRoom,
            sender_address: None,
            sender_pubkey: None,
            sender_hash: Some("set".into()),
            timestamp: ts,
            proof_serialized: Some(vec![1, 2, 3]),
            proof_root: Some(MerkleRoot([5; 32])),
            receiver_address: None,
            receiver_pubkey: None,
            receiver_room: Some(RoomId(room.into())),
            ciphertext: None,
            content: Some("hello".into()),
            reference: None,
            attachment: None,
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let row = room_row("m-1", "general", 100);
        db.insert_message(&row).unwrap();

        let fetched = db.get_message(&MessageId("m-1".into())).unwrap();
        assert_eq!(fetched.id, row.id);
        assert_eq!(fetched.kind, MessageKind::PublicRoom);
        assert_eq!(fetched.proof_serialized, Some(vec![1, 2, 3]));
        assert_eq!(fetched.proof_root, Some(MerkleRoot([5; 32])));
        assert_eq!(fetched.content.as_deref(), Some("hello"));
    }

    #[test]
    fn duplicate_id_is_rejected_and_first_row_kept() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&room_row("m-1", "general", 100)).unwrap();

        let second = room_row("m-1", "other", 200);
        let err = db.insert_message(&second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "m-1"));

        let kept = db.get_message(&MessageId("m-1".into())).unwrap();
        assert_eq!(kept.receiver_room, Some(RoomId("general".into())));
        assert_eq!(kept.timestamp, 100);
    }

    #[test]
    fn delete_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message(&room_row("m-1", "general", 100)).unwrap();

        let id = MessageId("m-1".into());
        assert!(db.delete_message(&id).unwrap());
        assert!(!db.delete_message(&id).unwrap());
        assert!(!db.delete_message(&MessageId("never".into())).unwrap());
    }

    #[test]
    fn direct_pagination_is_descending_with_cursor() {
        let db = Database::open_in_memory().unwrap();
        for (i, ts) in [100, 200, 300].iter().enumerate() {
            db.insert_message(&direct_row(&format!("m-{i}"), "0xa", "0xb", *ts))
                .unwrap();
        }
        // Both directions count.
        db.insert_message(&direct_row("m-back", "0xb", "0xa", 250))
            .unwrap();
        // Unrelated pair must not leak in.
        db.insert_message(&direct_row("m-other", "0xa", "0xc", 260))
            .unwrap();

        let a = Address("0xa".into());
        let b = Address("0xb".into());

        let page = db.list_direct_messages(&a, &b, 300, 2).unwrap();
        let ts: Vec<i64> = page.iter().map(|m| m.timestamp).collect();
        assert_eq!(ts, vec![250, 200]);

        let next = db
            .list_direct_messages(&a, &b, page[page.len() - 1].timestamp, 2)
            .unwrap();
        let ts: Vec<i64> = next.iter().map(|m| m.timestamp).collect();
        assert_eq!(ts, vec![100]);
    }

    #[test]
    fn corrupted_root_column_surfaces_as_sqlite_error() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO messages (message_id, kind, timestamp, rln_root, content, inserted_at)
                 VALUES ('m-bad', 'PUBLIC_ROOM', 100, 'not-hex', 'hi', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let err = db.get_message(&MessageId("m-bad".into())).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn room_pagination_offset_limit() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..25 {
            db.insert_message(&room_row(&format!("m-{i}"), "general", 1000 + i))
                .unwrap();
        }

        let room = RoomId("general".into());
        let page = db.list_room_messages(&room, 20, 20).unwrap();
        assert_eq!(page.len(), 5);

        let ts: Vec<i64> = page.iter().map(|m| m.timestamp).collect();
        assert_eq!(ts, vec![1004, 1003, 1002, 1001, 1000]);

        assert_eq!(db.count_room_messages(&room).unwrap(), 25);
    }
}
