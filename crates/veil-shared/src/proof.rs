//! Rate-limiting proof material carried by a message.
//!
//! The proof itself is an opaque byte string produced by an external prover;
//! the engine only inspects the public signals alongside it.  Cryptographic
//! verification of the serialized proof against those signals is delegated to
//! a [`crate::ProofVerifier`] implementation.

use serde::{Deserialize, Serialize};

use crate::types::{Epoch, MerkleRoot, Nullifier, Share};

/// Public inputs the proof commits to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofSignals {
    /// Merkle root of the identity set the prover claims membership in.
    pub root: MerkleRoot,
    /// Rate-limit epoch the proof was generated for.
    pub epoch: Epoch,
    /// Per-epoch, per-identity slot token.
    pub nullifier: Nullifier,
    /// x coordinate of the secret share (hash of the message body).
    pub x_share: Share,
    /// y coordinate of the secret share (polynomial evaluation at x).
    pub y_share: Share,
}

/// A secret share point witnessed for one `(epoch, nullifier)` slot.
///
/// Two distinct records for the same slot are enough to interpolate the
/// offending identity's secret key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareRecord {
    pub x: Share,
    pub y: Share,
}

/// Serialized rate-limiting proof plus its public signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RlnProof {
    /// Opaque proof bytes, base64 on the wire.
    #[serde(with = "b64")]
    pub serialized: Vec<u8>,
    pub signals: ProofSignals,
}

impl RlnProof {
    /// The share point this proof reveals for its slot.
    pub fn share(&self) -> ShareRecord {
        ShareRecord {
            x: self.signals.x_share,
            y: self.signals.y_share,
        }
    }
}

mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof() -> RlnProof {
        RlnProof {
            serialized: vec![1, 2, 3, 4],
            signals: ProofSignals {
                root: MerkleRoot([7; 32]),
                epoch: Epoch(42),
                nullifier: Nullifier([9; 32]),
                x_share: Share([1; 32]),
                y_share: Share([2; 32]),
            },
        }
    }

    #[test]
    fn proof_json_round_trip() {
        let proof = sample_proof();
        let json = serde_json::to_string(&proof).unwrap();
        let restored: RlnProof = serde_json::from_str(&json).unwrap();
        assert_eq!(proof, restored);
    }

    #[test]
    fn serialized_bytes_are_base64_on_the_wire() {
        let json = serde_json::to_value(sample_proof()).unwrap();
        assert_eq!(json["serialized"], "AQIDBA==");
    }

    #[test]
    fn share_extraction() {
        let share = sample_proof().share();
        assert_eq!(share.x, Share([1; 32]));
        assert_eq!(share.y, Share([2; 32]));
    }
}
