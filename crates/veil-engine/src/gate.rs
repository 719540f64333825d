//! Admission pipeline for inbound messages.
//!
//! [`ProofGate::admit`] runs the full decision chain: structural validation,
//! proof-presence policy, merkle-root freshness, epoch plausibility, external
//! cryptographic verification, nullifier consumption, and finally the
//! exclusive store insert.  Nothing here retries; every retry is the
//! caller's, and at-most-once semantics per message id keep retries safe.

use std::sync::Arc;

use veil_shared::{
    ChatMessage, Epoch, Nullifier, ProofVerifier, ShareRecord, ValidationError,
};
use veil_store::{MessageStore, StoreError, StoredMessage};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::nullifier::{EpochNullifierTracker, SlotDecision};
use crate::registry::IdentityRegistry;

/// Why a message was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// A required field for the message's kind is missing or contradictory.
    Malformed(ValidationError),
    /// The deployment requires proofs and the message carries none.
    MissingProof,
    /// The proof's root fell out of the acceptance window; the client should
    /// re-fetch the current root and re-prove.
    StaleRoot,
    /// The proof's claimed epoch is too far from the server clock.
    EpochOutOfRange,
    /// Cryptographic verification failed.
    InvalidProof,
    /// Exact resubmission of an already-consumed slot.  Benign from a
    /// retrying sender's perspective, but never stored twice.
    Replay,
    /// A message with this id already exists; the client retries with a
    /// fresh id.
    DuplicateId,
}

/// The two witnessed shares of a double-signaling identity, ready for
/// secret recovery by an external `SecretRecovery` implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleSignalEvidence {
    pub epoch: Epoch,
    pub nullifier: Nullifier,
    pub first: ShareRecord,
    pub second: ShareRecord,
}

/// Outcome of admitting one message.
#[derive(Debug)]
pub enum Admission {
    /// Message passed every check and is durably stored.
    Accepted(StoredMessage),
    /// Message was dropped; the reason says whether the sender should retry.
    Rejected(RejectReason),
    /// Abuse detected: the same slot was used with conflicting shares.  A
    /// successful detection outcome, not a pipeline failure; the message is
    /// still dropped.
    Flagged(DoubleSignalEvidence),
}

/// Validates incoming messages against the registry and tracker state and
/// hands accepted ones to the store.
pub struct ProofGate {
    config: EngineConfig,
    registry: Arc<IdentityRegistry>,
    tracker: Arc<EpochNullifierTracker>,
    store: Arc<MessageStore>,
    verifier: Arc<dyn ProofVerifier>,
}

impl ProofGate {
    pub fn new(
        config: EngineConfig,
        registry: Arc<IdentityRegistry>,
        tracker: Arc<EpochNullifierTracker>,
        store: Arc<MessageStore>,
        verifier: Arc<dyn ProofVerifier>,
    ) -> Self {
        Self {
            config,
            registry,
            tracker,
            store,
            verifier,
        }
    }

    /// Run the full admission pipeline for one message.
    ///
    /// Admission outcomes (rejections, flags) come back as `Ok`; only
    /// storage-engine faults surface as `Err`.
    pub fn admit(&self, message: &ChatMessage) -> Result<Admission> {
        if let Err(e) = message.validate() {
            tracing::debug!(id = %message.id, error = %e, "message failed validation");
            return Ok(Admission::Rejected(RejectReason::Malformed(e)));
        }

        let proof = match &message.proof {
            Some(proof) => proof,
            None => {
                if self.config.require_proofs {
                    tracing::debug!(id = %message.id, "message without required proof");
                    return Ok(Admission::Rejected(RejectReason::MissingProof));
                }
                return self.store_message(message);
            }
        };

        if !self.registry.is_recent_root(&proof.signals.root) {
            tracing::debug!(
                id = %message.id,
                root = %proof.signals.root,
                "proof bound to stale root"
            );
            return Ok(Admission::Rejected(RejectReason::StaleRoot));
        }

        let now = self.config.current_epoch();
        if epoch_distance(proof.signals.epoch, now) > self.config.epoch_skew {
            tracing::debug!(
                id = %message.id,
                claimed = proof.signals.epoch.0,
                current = now.0,
                "proof epoch outside skew window"
            );
            return Ok(Admission::Rejected(RejectReason::EpochOutOfRange));
        }

        if !self.verifier.verify(proof) {
            tracing::debug!(id = %message.id, "proof failed verification");
            return Ok(Admission::Rejected(RejectReason::InvalidProof));
        }

        match self
            .tracker
            .try_consume(proof.signals.epoch, proof.signals.nullifier, proof.share())
        {
            SlotDecision::Accepted => self.store_message(message),
            SlotDecision::Replayed => {
                tracing::debug!(id = %message.id, "slot replayed, dropping duplicate");
                Ok(Admission::Rejected(RejectReason::Replay))
            }
            SlotDecision::DoubleSignal { first, second } => {
                Ok(Admission::Flagged(DoubleSignalEvidence {
                    epoch: proof.signals.epoch,
                    nullifier: proof.signals.nullifier,
                    first,
                    second,
                }))
            }
        }
    }

    fn store_message(&self, message: &ChatMessage) -> Result<Admission> {
        let row = StoredMessage::from_envelope(message);
        match self.store.insert(&row) {
            Ok(()) => Ok(Admission::Accepted(row)),
            Err(StoreError::DuplicateId(id)) => {
                tracing::debug!(id = %id, "duplicate message id");
                Ok(Admission::Rejected(RejectReason::DuplicateId))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn epoch_distance(a: Epoch, b: Epoch) -> u64 {
    a.0.abs_diff(b.0)
}
