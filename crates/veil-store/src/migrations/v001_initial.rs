//! v001 -- Initial schema creation.
//!
//! Creates the `messages` table.  The primary key on `message_id` is what
//! makes the duplicate-id check and the write a single atomic step inside the
//! writer's exclusive section.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    message_id       TEXT PRIMARY KEY NOT NULL,  -- caller-generated, globally unique
    kind             TEXT NOT NULL,              -- DIRECT / PUBLIC_ROOM / PRIVATE_ROOM
    sender_address   TEXT,
    sender_pubkey    TEXT,
    sender_hash      TEXT,                       -- anonymity-set hash for anonymous senders
    timestamp        INTEGER NOT NULL,           -- ms since Unix epoch, author-supplied
    rln_proof        BLOB,                       -- opaque serialized proof
    rln_root         TEXT,                       -- hex merkle root the proof was bound to
    receiver_address TEXT,
    receiver_pubkey  TEXT,
    receiver_room    TEXT,
    ciphertext       TEXT,
    content          TEXT,
    reference        TEXT,                       -- reply-to message id
    attachment       TEXT,
    inserted_at      TEXT NOT NULL               -- RFC-3339, server clock
);

CREATE INDEX IF NOT EXISTS idx_messages_sender   ON messages(sender_address);
CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_address);
CREATE INDEX IF NOT EXISTS idx_messages_room_ts  ON messages(receiver_room, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_messages_root     ON messages(rln_root);
CREATE INDEX IF NOT EXISTS idx_messages_ts       ON messages(timestamp DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
