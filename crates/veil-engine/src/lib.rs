//! # veil-engine
//!
//! The anonymous rate-limited messaging engine.
//!
//! A message arriving at the boundary flows through [`ProofGate::admit`]:
//! structural validation, merkle-root freshness against the
//! [`IdentityRegistry`], external cryptographic verification, and nullifier
//! bookkeeping in the [`EpochNullifierTracker`].  Accepted messages land in
//! the `veil-store` message store; a reused slot with a conflicting share is
//! flagged with the two witnessed shares so the caller can recover the
//! offender's secret key out of band.

pub mod config;
pub mod gate;
pub mod nullifier;
pub mod registry;

mod error;

pub use config::EngineConfig;
pub use error::EngineError;
pub use gate::{Admission, DoubleSignalEvidence, ProofGate, RejectReason};
pub use nullifier::{spawn_eviction_task, EpochNullifierTracker, SlotDecision};
pub use registry::{IdentityRegistry, LeafIndex};
