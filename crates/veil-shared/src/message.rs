//! The chat message envelope and its structural validation.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::proof::RlnProof;
use crate::types::{Address, MessageId, RoomId};

/// Message kind.  Determines which sender/receiver fields are required.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Direct,
    PublicRoom,
    PrivateRoom,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "DIRECT",
            Self::PublicRoom => "PUBLIC_ROOM",
            Self::PrivateRoom => "PRIVATE_ROOM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DIRECT" => Some(Self::Direct),
            "PUBLIC_ROOM" => Some(Self::PublicRoom),
            "PRIVATE_ROOM" => Some(Self::PrivateRoom),
            _ => None,
        }
    }
}

/// Sender identification.  At most one of the identifying fields is set:
/// a named sender carries `address` (optionally with an ECDH `pubkey`), an
/// anonymous sender carries only the hash of its anonymity set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sender {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymity_set_hash: Option<String>,
}

impl Sender {
    pub fn named(address: Address) -> Self {
        Self {
            address: Some(address),
            ..Self::default()
        }
    }

    pub fn anonymous(anonymity_set_hash: String) -> Self {
        Self {
            anonymity_set_hash: Some(anonymity_set_hash),
            ..Self::default()
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.address.is_none()
    }
}

/// Receiver of a message: a user for direct messages, a room otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Receiver {
    User {
        address: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        pubkey: Option<String>,
    },
    Room { room_id: RoomId },
}

/// Message payload.  Exactly one arm is set: pre-encrypted `ciphertext`
/// (opaque to the engine) or plaintext `content`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Payload {
    pub fn ciphertext(ct: impl Into<String>) -> Self {
        Self {
            ciphertext: Some(ct.into()),
            content: None,
        }
    }

    pub fn plaintext(content: impl Into<String>) -> Self {
        Self {
            ciphertext: None,
            content: Some(content.into()),
        }
    }
}

/// A single chat message as submitted at the boundary.
///
/// Never updated in place once accepted; the only lifecycle transitions are
/// insert and (optional) delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub sender: Sender,
    /// Author-supplied wall clock, milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<RlnProof>,
    pub receiver: Receiver,
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl ChatMessage {
    /// Check that the fields required for this message's kind are present.
    ///
    /// This is the synchronous validation step of admission; a message that
    /// fails here is rejected before any proof or storage work happens.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.0.is_empty() {
            return Err(ValidationError::EmptyMessageId);
        }
        if self.timestamp <= 0 {
            return Err(ValidationError::InvalidTimestamp(self.timestamp));
        }

        match (&self.payload.ciphertext, &self.payload.content) {
            (None, None) => return Err(ValidationError::EmptyPayload),
            (Some(_), Some(_)) => return Err(ValidationError::AmbiguousPayload),
            _ => {}
        }

        if self.sender.address.is_some() && self.sender.anonymity_set_hash.is_some() {
            return Err(ValidationError::AmbiguousSender);
        }

        match self.kind {
            MessageKind::Direct => {
                if !matches!(self.receiver, Receiver::User { .. }) {
                    return Err(ValidationError::MissingReceiverAddress);
                }
                if self.sender.address.is_none() && self.sender.anonymity_set_hash.is_none() {
                    return Err(ValidationError::MissingSender);
                }
            }
            MessageKind::PublicRoom | MessageKind::PrivateRoom => {
                if !matches!(self.receiver, Receiver::Room { .. }) {
                    return Err(ValidationError::MissingRoomId);
                }
            }
        }

        Ok(())
    }

    /// The room this message targets, if it is a room message.
    pub fn room_id(&self) -> Option<&RoomId> {
        match &self.receiver {
            Receiver::Room { room_id } => Some(room_id),
            Receiver::User { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_message() -> ChatMessage {
        ChatMessage {
            id: MessageId("m-1".into()),
            kind: MessageKind::Direct,
            sender: Sender::named(Address("0xaaa".into())),
            timestamp: 1_700_000_000_000,
            proof: None,
            receiver: Receiver::User {
                address: Address("0xbbb".into()),
                pubkey: None,
            },
            payload: Payload::ciphertext("deadbeef"),
            reference: None,
            attachment: None,
        }
    }

    #[test]
    fn valid_direct_message() {
        assert!(direct_message().validate().is_ok());
    }

    #[test]
    fn direct_requires_user_receiver() {
        let mut msg = direct_message();
        msg.receiver = Receiver::Room {
            room_id: RoomId("general".into()),
        };
        assert_eq!(
            msg.validate(),
            Err(ValidationError::MissingReceiverAddress)
        );
    }

    #[test]
    fn room_requires_room_receiver() {
        let mut msg = direct_message();
        msg.kind = MessageKind::PublicRoom;
        assert_eq!(msg.validate(), Err(ValidationError::MissingRoomId));
    }

    #[test]
    fn payload_must_have_exactly_one_arm() {
        let mut msg = direct_message();
        msg.payload = Payload::default();
        assert_eq!(msg.validate(), Err(ValidationError::EmptyPayload));

        msg.payload = Payload {
            ciphertext: Some("aa".into()),
            content: Some("hi".into()),
        };
        assert_eq!(msg.validate(), Err(ValidationError::AmbiguousPayload));
    }

    #[test]
    fn sender_cannot_be_both_named_and_anonymous() {
        let mut msg = direct_message();
        msg.sender.anonymity_set_hash = Some("hash".into());
        assert_eq!(msg.validate(), Err(ValidationError::AmbiguousSender));
    }

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            MessageKind::Direct,
            MessageKind::PublicRoom,
            MessageKind::PrivateRoom,
        ] {
            assert_eq!(MessageKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::from_str("GROUP"), None);
    }

    #[test]
    fn envelope_json_uses_screaming_kinds() {
        let json = serde_json::to_value(direct_message()).unwrap();
        assert_eq!(json["kind"], "DIRECT");
    }
}
