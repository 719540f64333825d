use thiserror::Error;

/// Structural validation failures for an inbound message.
///
/// These are rejected synchronously at the boundary, never stored and never
/// retried by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message id must not be empty")]
    EmptyMessageId,

    #[error("Timestamp must be a positive millisecond value, got {0}")]
    InvalidTimestamp(i64),

    #[error("Direct message requires a receiver address")]
    MissingReceiverAddress,

    #[error("Room message requires a room id")]
    MissingRoomId,

    #[error("Direct message requires a sender address or anonymity-set hash")]
    MissingSender,

    #[error("Sender carries both an address and an anonymity-set hash")]
    AmbiguousSender,

    #[error("Payload has neither ciphertext nor content")]
    EmptyPayload,

    #[error("Payload has both ciphertext and content")]
    AmbiguousPayload,
}
