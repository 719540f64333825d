//! Traits implemented by external collaborators.
//!
//! The engine consumes, and must not reimplement, the cryptographic and
//! directory services behind these traits.

use crate::proof::{RlnProof, ShareRecord};
use crate::types::Address;

/// Cryptographic verification of a serialized rate-limiting proof against its
/// public signals.
///
/// Implementors should take care that verification time does not depend on
/// validity; the engine treats the result as a plain boolean.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &RlnProof) -> bool;
}

/// Secret-sharing interpolation over two witnessed shares of the same slot.
///
/// The engine only supplies the two shares; recovering the offending
/// identity's secret key is the implementor's job.
pub trait SecretRecovery: Send + Sync {
    fn recover(&self, first: &ShareRecord, second: &ShareRecord) -> [u8; 32];
}

/// Address-to-public-key lookup used to decorate the derived thread list.
pub trait Directory: Send + Sync {
    fn public_key_of(&self, address: &Address) -> Option<String>;
}
