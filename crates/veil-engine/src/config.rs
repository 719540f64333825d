//! Engine configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the engine can run with zero
//! configuration for local development.

use chrono::Utc;
use veil_shared::Epoch;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of one rate-limit epoch in milliseconds.
    /// Env: `VEIL_EPOCH_LENGTH_MS`
    /// Default: `10000`
    pub epoch_length_ms: u64,

    /// How many merkle roots stay acceptable for proof verification.  Bounds
    /// how long a stale proof remains valid, trading replay-window length
    /// against re-proving cost for clients.
    /// Env: `VEIL_ROOT_HISTORY`
    /// Default: `10`
    pub root_history: usize,

    /// How many past epochs of nullifier records are retained before
    /// eviction.
    /// Env: `VEIL_RETENTION_EPOCHS`
    /// Default: `5`
    pub retention_epochs: u64,

    /// Maximum distance (in epochs, either direction) between a proof's
    /// claimed epoch and the server clock.
    /// Env: `VEIL_EPOCH_SKEW`
    /// Default: `1`
    pub epoch_skew: u64,

    /// Whether messages must carry a rate-limiting proof to be admitted.
    /// Env: `VEIL_REQUIRE_PROOFS` (true/false)
    /// Default: `true`
    pub require_proofs: bool,

    /// Number of lock shards in the nullifier tracker.
    /// Env: `VEIL_NULLIFIER_SHARDS`
    /// Default: `16`
    pub nullifier_shards: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epoch_length_ms: 10_000,
            root_history: 10,
            retention_epochs: 5,
            epoch_skew: 1,
            require_proofs: true,
            nullifier_shards: 16,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VEIL_EPOCH_LENGTH_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.epoch_length_ms = ms,
                _ => tracing::warn!(value = %val, "Invalid VEIL_EPOCH_LENGTH_MS, using default"),
            }
        }

        if let Ok(val) = std::env::var("VEIL_ROOT_HISTORY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.root_history = n,
                _ => tracing::warn!(value = %val, "Invalid VEIL_ROOT_HISTORY, using default"),
            }
        }

        if let Ok(val) = std::env::var("VEIL_RETENTION_EPOCHS") {
            match val.parse::<u64>() {
                Ok(n) => config.retention_epochs = n,
                _ => tracing::warn!(value = %val, "Invalid VEIL_RETENTION_EPOCHS, using default"),
            }
        }

        if let Ok(val) = std::env::var("VEIL_EPOCH_SKEW") {
            match val.parse::<u64>() {
                Ok(n) => config.epoch_skew = n,
                _ => tracing::warn!(value = %val, "Invalid VEIL_EPOCH_SKEW, using default"),
            }
        }

        if let Ok(val) = std::env::var("VEIL_REQUIRE_PROOFS") {
            config.require_proofs = val != "false" && val != "0";
        }

        if let Ok(val) = std::env::var("VEIL_NULLIFIER_SHARDS") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.nullifier_shards = n,
                _ => tracing::warn!(value = %val, "Invalid VEIL_NULLIFIER_SHARDS, using default"),
            }
        }

        config
    }

    /// Epoch containing the given wall-clock instant (ms since Unix epoch).
    pub fn epoch_at(&self, now_ms: i64) -> Epoch {
        Epoch(now_ms.max(0) as u64 / self.epoch_length_ms)
    }

    /// Epoch containing the current wall-clock instant.
    pub fn current_epoch(&self) -> Epoch {
        self.epoch_at(Utc::now().timestamp_millis())
    }
}
