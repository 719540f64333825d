//! Registered identity set and its merkle-root history.
//!
//! Commitments occupy append-only leaf positions; removal tombstones the
//! leaf instead of compacting, so leaf indices handed out at registration
//! stay stable.  Every mutation recomputes the root and appends it to a
//! bounded history; a proof is acceptable as long as the root it was
//! generated against is still inside that window.
//!
//! Node hashing uses BLAKE3.  The ZK-circuit-facing hash of the proof system
//! lives behind the external verifier and is none of the registry's business.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use veil_shared::{IdentityCommitment, MerkleRoot};

use crate::error::{EngineError, Result};

/// Stable position of a commitment in the identity set.
pub type LeafIndex = usize;

/// Domain-separated leaf hash for a removed identity.
const TOMBSTONE_DOMAIN: &[u8] = b"veil.registry.tombstone.v1";

/// Hash of a padding leaf (positions beyond the last registered identity).
const EMPTY_LEAF: [u8; 32] = [0u8; 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Active(IdentityCommitment),
    Tombstone,
}

struct RegistryInner {
    leaves: Vec<Leaf>,
    positions: HashMap<IdentityCommitment, LeafIndex>,
    /// Most recent root last.  Bounded to the configured history length.
    roots: VecDeque<MerkleRoot>,
}

/// Tracks registered identity commitments and the sequence of merkle roots
/// produced as the set changes.
///
/// One writer role (registration events), many readers; the interior lock
/// guarantees readers always observe a complete, never torn, root.
pub struct IdentityRegistry {
    inner: RwLock<RegistryInner>,
    root_history: usize,
}

impl IdentityRegistry {
    /// Create an empty registry keeping the last `root_history` roots
    /// acceptable.
    pub fn new(root_history: usize) -> Self {
        let mut roots = VecDeque::with_capacity(root_history.max(1));
        roots.push_back(compute_root(&[]));
        Self {
            inner: RwLock::new(RegistryInner {
                leaves: Vec::new(),
                positions: HashMap::new(),
                roots,
            }),
            root_history: root_history.max(1),
        }
    }

    /// Append a commitment to the identity set and publish the new root.
    pub fn register(&self, commitment: IdentityCommitment) -> Result<LeafIndex> {
        let mut inner = self.write();

        if inner.positions.contains_key(&commitment) {
            return Err(EngineError::DuplicateCommitment(commitment.to_hex()));
        }

        let index = inner.leaves.len();
        inner.leaves.push(Leaf::Active(commitment));
        inner.positions.insert(commitment, index);

        let root = compute_root(&inner.leaves);
        push_root(&mut inner.roots, root, self.root_history);

        tracing::info!(leaf = index, root = %root, "identity registered");
        Ok(index)
    }

    /// Tombstone a commitment's leaf and publish the new root.  The leaf
    /// index is never reused.
    pub fn remove(&self, commitment: &IdentityCommitment) -> Result<()> {
        let mut inner = self.write();

        let index = inner
            .positions
            .remove(commitment)
            .ok_or_else(|| EngineError::UnknownCommitment(commitment.to_hex()))?;
        inner.leaves[index] = Leaf::Tombstone;

        let root = compute_root(&inner.leaves);
        push_root(&mut inner.roots, root, self.root_history);

        tracing::info!(leaf = index, root = %root, "identity removed");
        Ok(())
    }

    /// The root of the current identity set.
    pub fn current_root(&self) -> MerkleRoot {
        let inner = self.read();
        // The deque is seeded with the empty-set root and never drained.
        *inner.roots.back().unwrap_or(&MerkleRoot(EMPTY_LEAF))
    }

    /// Whether `root` is within the acceptable history window.
    pub fn is_recent_root(&self, root: &MerkleRoot) -> bool {
        self.read().roots.iter().any(|r| r == root)
    }

    /// Leaf index of a registered commitment, if present.
    pub fn position_of(&self, commitment: &IdentityCommitment) -> Option<LeafIndex> {
        self.read().positions.get(commitment).copied()
    }

    /// Number of active (non-tombstoned) identities.
    pub fn active_count(&self) -> usize {
        self.read().positions.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn push_root(roots: &mut VecDeque<MerkleRoot>, root: MerkleRoot, history: usize) {
    if roots.len() == history {
        roots.pop_front();
    }
    roots.push_back(root);
}

fn leaf_hash(leaf: &Leaf) -> [u8; 32] {
    match leaf {
        Leaf::Active(commitment) => *blake3::hash(&commitment.0).as_bytes(),
        Leaf::Tombstone => *blake3::hash(TOMBSTONE_DOMAIN).as_bytes(),
    }
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// Compute the root over the current leaves, padded to the next power of two
/// with empty leaves.  Built bottom-up, one level at a time.
fn compute_root(leaves: &[Leaf]) -> MerkleRoot {
    if leaves.is_empty() {
        return MerkleRoot(EMPTY_LEAF);
    }

    let padded = leaves.len().next_power_of_two();
    let mut level: Vec<[u8; 32]> = Vec::with_capacity(padded);
    level.extend(leaves.iter().map(leaf_hash));
    level.resize(padded, EMPTY_LEAF);

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }

    MerkleRoot(level[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commitment(byte: u8) -> IdentityCommitment {
        IdentityCommitment([byte; 32])
    }

    #[test]
    fn register_assigns_sequential_leaf_indices() {
        let registry = IdentityRegistry::new(10);
        assert_eq!(registry.register(commitment(1)).unwrap(), 0);
        assert_eq!(registry.register(commitment(2)).unwrap(), 1);
        assert_eq!(registry.register(commitment(3)).unwrap(), 2);
        assert_eq!(registry.active_count(), 3);
    }

    #[test]
    fn duplicate_commitment_is_rejected() {
        let registry = IdentityRegistry::new(10);
        registry.register(commitment(1)).unwrap();
        assert!(matches!(
            registry.register(commitment(1)),
            Err(EngineError::DuplicateCommitment(_))
        ));
        // Registry unchanged by the failed attempt.
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn each_registration_changes_the_root() {
        let registry = IdentityRegistry::new(10);
        let empty = registry.current_root();
        registry.register(commitment(1)).unwrap();
        let one = registry.current_root();
        registry.register(commitment(2)).unwrap();
        let two = registry.current_root();

        assert_ne!(empty, one);
        assert_ne!(one, two);
    }

    #[test]
    fn root_freshness_window_evicts_oldest() {
        // History of 2: only the two most recent roots are acceptable.
        let registry = IdentityRegistry::new(2);
        registry.register(commitment(1)).unwrap();
        let first = registry.current_root();
        registry.register(commitment(2)).unwrap();
        let second = registry.current_root();
        assert!(registry.is_recent_root(&first));
        assert!(registry.is_recent_root(&second));

        registry.register(commitment(3)).unwrap();
        assert!(!registry.is_recent_root(&first));
        assert!(registry.is_recent_root(&second));
        assert!(registry.is_recent_root(&registry.current_root()));
    }

    #[test]
    fn removal_tombstones_without_shifting_indices() {
        let registry = IdentityRegistry::new(10);
        registry.register(commitment(1)).unwrap();
        registry.register(commitment(2)).unwrap();
        registry.register(commitment(3)).unwrap();
        let before = registry.current_root();

        registry.remove(&commitment(2)).unwrap();
        assert_ne!(registry.current_root(), before);
        assert_eq!(registry.active_count(), 2);

        // Neighbours keep their positions.
        assert_eq!(registry.position_of(&commitment(1)), Some(0));
        assert_eq!(registry.position_of(&commitment(3)), Some(2));
        assert_eq!(registry.position_of(&commitment(2)), None);
    }

    #[test]
    fn removing_unknown_commitment_fails() {
        let registry = IdentityRegistry::new(10);
        assert!(matches!(
            registry.remove(&commitment(9)),
            Err(EngineError::UnknownCommitment(_))
        ));
    }

    #[test]
    fn root_depends_on_leaf_order() {
        let a = IdentityRegistry::new(10);
        a.register(commitment(1)).unwrap();
        a.register(commitment(2)).unwrap();

        let b = IdentityRegistry::new(10);
        b.register(commitment(2)).unwrap();
        b.register(commitment(1)).unwrap();

        assert_ne!(a.current_root(), b.current_root());
    }
}
