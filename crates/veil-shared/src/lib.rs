//! # veil-shared
//!
//! Domain types shared by every Veil crate: the chat message envelope and its
//! structural validation, rate-limiting proof material, and the traits the
//! engine expects its external cryptographic and directory collaborators to
//! implement.

pub mod external;
pub mod message;
pub mod proof;
pub mod types;

mod error;

pub use error::ValidationError;
pub use external::{Directory, ProofVerifier, SecretRecovery};
pub use message::{ChatMessage, MessageKind, Payload, Receiver, Sender};
pub use proof::{ProofSignals, RlnProof, ShareRecord};
pub use types::{Address, Epoch, IdentityCommitment, MerkleRoot, MessageId, Nullifier, RoomId, Share};
