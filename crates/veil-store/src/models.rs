//! Persisted row model for chat messages.
//!
//! [`StoredMessage`] is the flattened form of the wire envelope: the proof's
//! serialized bytes and root survive persistence (the original public signals
//! are consumed during admission and not stored), and the store stamps each
//! row with its own insertion time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use veil_shared::{Address, ChatMessage, MerkleRoot, MessageId, MessageKind, Receiver, RoomId};

/// A chat message as it sits in the `messages` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub sender_address: Option<Address>,
    pub sender_pubkey: Option<String>,
    pub sender_hash: Option<String>,
    /// Author-supplied wall clock, milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub proof_serialized: Option<Vec<u8>>,
    pub proof_root: Option<MerkleRoot>,
    pub receiver_address: Option<Address>,
    pub receiver_pubkey: Option<String>,
    pub receiver_room: Option<RoomId>,
    pub ciphertext: Option<String>,
    pub content: Option<String>,
    pub reference: Option<MessageId>,
    pub attachment: Option<String>,
    /// Server clock at insert time.
    pub inserted_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Flatten a validated wire envelope into its row form.
    pub fn from_envelope(message: &ChatMessage) -> Self {
        let (receiver_address, receiver_pubkey, receiver_room) = match &message.receiver {
            Receiver::User { address, pubkey } => {
                (Some(address.clone()), pubkey.clone(), None)
            }
            Receiver::Room { room_id } => (None, None, Some(room_id.clone())),
        };

        Self {
            id: message.id.clone(),
            kind: message.kind,
            sender_address: message.sender.address.clone(),
            sender_pubkey: message.sender.pubkey.clone(),
            sender_hash: message.sender.anonymity_set_hash.clone(),
            timestamp: message.timestamp,
            proof_serialized: message.proof.as_ref().map(|p| p.serialized.clone()),
            proof_root: message.proof.as_ref().map(|p| p.signals.root),
            receiver_address,
            receiver_pubkey,
            receiver_room,
            ciphertext: message.payload.ciphertext.clone(),
            content: message.payload.content.clone(),
            reference: message.reference.clone(),
            attachment: message.attachment.clone(),
            inserted_at: Utc::now(),
        }
    }
}
