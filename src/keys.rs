//! Key derivation and ownership.
//!
//! This module owns two responsibilities:
//! 1. Deriving rung keys from an ancestor key by iterated SHA-256.
//! 2. Holding derived key material in a type that is opaque and zeroised on
//!    drop.
//!
//! This is one of exactly two modules permitted to import `ring` directly
//! (the other is `crypto`).
//!
//! ## Derivation structure
//!
//! ```text
//! root key       = SHA-256(seed)
//! key at rung r  = SHA-256^(max_rung - r)(key at max_rung)
//! ```
//!
//! The hash is one-way, so a node can reach every rung below its own but
//! none above it. Two nodes holding the same key at the same rung derive
//! identical descendants without ever talking to each other.

use std::fmt;

use ring::digest::{self, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::LineageError;

/// Size of a lineage key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Bytes of the key digest shown by [`LineageKey::fingerprint`].
const FINGERPRINT_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Lineage key
// ---------------------------------------------------------------------------

/// The key held by one node of a lineage.
///
/// - Not `Clone`. New keys only come out of [`hash_seed`] or [`derive`].
/// - Zeroised on drop.
/// - Raw bytes go only to the configured codec; `Debug` prints the
///   fingerprint only.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct LineageKey {
    bytes: [u8; KEY_LEN],
}

impl LineageKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Borrow the raw key bytes for the token codec and the cache.
    ///
    /// `pub(crate)`: callers outside the crate only see the fingerprint.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// A short hex digest of the key, safe to log.
    ///
    /// Equal fingerprints mean equal keys; the fingerprint reveals nothing
    /// usable about the key itself.
    pub fn fingerprint(&self) -> String {
        let digest = sha256(&self.bytes);
        digest[..FINGERPRINT_LEN]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

// Not constant-time. Only used to compare derivation results.
impl PartialEq for LineageKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for LineageKey {}

impl fmt::Debug for LineageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LineageKey").field(&self.fingerprint()).finish()
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

fn sha256(data: &[u8]) -> [u8; KEY_LEN] {
    let digest = digest::digest(&SHA256, data);
    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(digest.as_ref());
    out
}

/// Hash an arbitrary seed into a root key.
///
/// The seed may be any length, including empty.
pub(crate) fn hash_seed(seed: &[u8]) -> LineageKey {
    LineageKey::from_bytes(sha256(seed))
}

/// Apply SHA-256 to `key` exactly `steps` times.
///
/// `steps == 0` returns a key equal to `key`. The caller is responsible for
/// computing `steps` from a rung that does not exceed its own max rung.
pub(crate) fn derive(key: &LineageKey, steps: u64) -> LineageKey {
    let mut current = Zeroizing::new(*key.as_bytes());
    for _ in 0..steps {
        let next = sha256(&current[..]);
        *current = next;
    }
    LineageKey::from_bytes(*current)
}

/// Generate a fresh 256-bit root secret.
///
/// Callers with an existing secret pass it straight to
/// [`Lineage::new`](crate::Lineage::new) instead. The returned buffer is
/// zeroised when dropped.
pub fn generate_root_secret() -> Result<Zeroizing<[u8; KEY_LEN]>, LineageError> {
    let rng = SystemRandom::new();
    let mut secret = Zeroizing::new([0u8; KEY_LEN]);
    rng.fill(&mut secret[..])
        .map_err(|_| LineageError::RandomnessFailure)?;
    Ok(secret)
}
