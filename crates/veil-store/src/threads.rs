//! Derived direct-conversation threads.
//!
//! There is no stored "chats" table; the set of counterparts is recomputed
//! from message history on every call, so it can never drift from the log.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use veil_shared::{Address, Directory};

use crate::error::Result;
use crate::store::MessageStore;

/// One direct-conversation counterpart for an identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thread {
    pub counterpart: Address,
    /// Encryption key from the directory service, when the counterpart is
    /// known to it.
    pub counterpart_pubkey: Option<String>,
}

impl MessageStore {
    /// Every address this identity has exchanged direct messages with,
    /// decorated with the directory's public key for each counterpart.
    ///
    /// The union is distinct: multiple messages per counterpart collapse to
    /// one thread.
    pub fn threads_for(
        &self,
        address: &Address,
        directory: &dyn Directory,
    ) -> Result<Vec<Thread>> {
        let db = self.reader();
        let mut stmt = db.conn().prepare(
            "SELECT receiver_address FROM messages
                 WHERE sender_address = ?1 AND receiver_address IS NOT NULL
             UNION
             SELECT sender_address FROM messages
                 WHERE receiver_address = ?1 AND sender_address IS NOT NULL",
        )?;

        let rows = stmt.query_map(params![address.as_str()], |row| row.get::<_, String>(0))?;

        let mut threads = Vec::new();
        for row in rows {
            let counterpart = Address(row?);
            let counterpart_pubkey = directory.public_key_of(&counterpart);
            threads.push(Thread {
                counterpart,
                counterpart_pubkey,
            });
        }
        Ok(threads)
    }
}
