//! Lineage nodes: derivation, caching, and rung-routed encryption.
//!
//! A `Lineage` holds one key and the rung it sits at. Every rung at or below
//! that one is reachable by hashing forward; nothing above it is. Encryption
//! and decryption at a lower rung are routed to the cached descendant that
//! owns that rung, so a root and any sublineage it hands out produce and
//! accept exactly the same tokens.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::audit::{self, AuditEvent, SharedAuditLog};
use crate::crypto::{FernetCodec, TokenCodec, FIXED_IV, FIXED_TIMESTAMP};
use crate::envelope::TaggedCiphertext;
use crate::error::LineageError;
use crate::keys::{self, LineageKey, KEY_LEN};
use crate::Rung;

/// Construction options shared by a root and every node derived from it.
#[derive(Clone)]
pub struct LineageOptions {
    /// Seals and opens tokens. Defaults to [`FernetCodec`].
    pub codec: Arc<dyn TokenCodec>,
    /// Receives one record per derivation, encryption and decryption.
    /// `None` disables auditing. The in-memory log is unbounded; drain it
    /// with [`AuditLog::take_records`](crate::audit::AuditLog::take_records).
    pub audit: Option<SharedAuditLog>,
}

impl Default for LineageOptions {
    fn default() -> Self {
        Self {
            codec: Arc::new(FernetCodec),
            audit: None,
        }
    }
}

impl fmt::Debug for LineageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineageOptions")
            .field("audit", &self.audit.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Copy of a derived key used as a cache index; wiped when the entry drops.
#[derive(PartialEq, Eq, Hash, Zeroize, ZeroizeOnDrop)]
struct CacheKey([u8; KEY_LEN]);

/// Derived-key bytes to the node built from them.
///
/// Lookup and insert happen under one lock, so concurrent first requests
/// for the same rung end up sharing a single node.
#[derive(Default)]
struct LineageCache {
    nodes: Mutex<HashMap<CacheKey, Arc<Lineage>>>,
}

impl LineageCache {
    /// Return the node for `key`, building it with `build` on a miss.
    /// The flag is true when this call inserted the node.
    fn get_or_insert_with(
        &self,
        key: LineageKey,
        build: impl FnOnce(LineageKey) -> Lineage,
    ) -> (Arc<Lineage>, bool) {
        let mut nodes = self.nodes.lock().unwrap_or_else(PoisonError::into_inner);
        match nodes.entry(CacheKey(*key.as_bytes())) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let node = Arc::new(build(key));
                entry.insert(Arc::clone(&node));
                (node, true)
            }
        }
    }

    fn len(&self) -> usize {
        self.nodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ---------------------------------------------------------------------------
// Lineage
// ---------------------------------------------------------------------------

/// One node of a hash-derived key tree.
pub struct Lineage {
    key: LineageKey,
    max_rung: Rung,
    cache: LineageCache,
    codec: Arc<dyn TokenCodec>,
    audit: Option<SharedAuditLog>,
}

impl Lineage {
    /// Build a root lineage: the key is SHA-256 of `seed`.
    pub fn new(seed: &[u8], max_rung: Rung) -> Self {
        Self::with_options(seed, max_rung, LineageOptions::default())
    }

    /// Build a root lineage with a custom codec or audit log.
    pub fn with_options(seed: &[u8], max_rung: Rung, options: LineageOptions) -> Self {
        Self::from_key(keys::hash_seed(seed), max_rung, options.codec, options.audit)
    }

    fn from_key(
        key: LineageKey,
        max_rung: Rung,
        codec: Arc<dyn TokenCodec>,
        audit: Option<SharedAuditLog>,
    ) -> Self {
        Self {
            key,
            max_rung,
            cache: LineageCache::default(),
            codec,
            audit,
        }
    }

    /// The rung this node was built at; no descendant can sit higher.
    pub fn max_rung(&self) -> Rung {
        self.max_rung
    }

    /// A short digest of this node's key, safe to log. Nodes at the same
    /// rung of the same lineage share a fingerprint.
    pub fn fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    /// Number of descendants this node has materialised so far.
    pub fn cached_sublineages(&self) -> usize {
        self.cache.len()
    }

    /// The descendant at `rung`.
    ///
    /// Its key is this key hashed `max_rung - rung` times. Repeated calls for
    /// the same rung return the same node. Fails with
    /// [`LineageError::InvalidRung`] if `rung` is above this node's max rung.
    pub fn sublineage(&self, rung: Rung) -> Result<Arc<Lineage>, LineageError> {
        if rung > self.max_rung {
            self.record(AuditEvent::AscentRejected, rung);
            return Err(LineageError::InvalidRung {
                requested: rung,
                max_rung: self.max_rung,
            });
        }

        let derived = keys::derive(&self.key, self.max_rung - rung);
        let (node, inserted) = self.cache.get_or_insert_with(derived, |key| {
            Self::from_key(key, rung, Arc::clone(&self.codec), self.audit.clone())
        });

        if inserted {
            self.record(AuditEvent::Derived, rung);
        }
        Ok(node)
    }

    /// Encrypt `data` at this node's own rung.
    pub fn encrypt(&self, data: &[u8]) -> Result<TaggedCiphertext, LineageError> {
        self.encrypt_at(data, self.max_rung)
    }

    /// Encrypt `data` under the key for `rung`.
    ///
    /// The result is byte-identical to what the sublineage at `rung` would
    /// produce for the same data.
    pub fn encrypt_at(&self, data: &[u8], rung: Rung) -> Result<TaggedCiphertext, LineageError> {
        if rung != self.max_rung {
            return self.sublineage(rung)?.encrypt(data);
        }

        let token = self
            .codec
            .seal(self.key.as_bytes(), data, FIXED_TIMESTAMP, &FIXED_IV)?;
        self.record(AuditEvent::Encrypted, rung);
        Ok(TaggedCiphertext::new(self.max_rung, token))
    }

    /// Decrypt a tagged ciphertext sealed at this node's rung or any rung
    /// below it.
    pub fn decrypt(&self, tagged: &TaggedCiphertext) -> Result<Vec<u8>, LineageError> {
        if tagged.rung() != self.max_rung {
            return self.sublineage(tagged.rung())?.decrypt(tagged);
        }

        match self.codec.open(self.key.as_bytes(), tagged.payload()) {
            Ok(plaintext) => {
                self.record(AuditEvent::Decrypted, tagged.rung());
                Ok(plaintext)
            }
            Err(err) => {
                self.record(AuditEvent::DecryptRejected, tagged.rung());
                Err(err)
            }
        }
    }

    /// Parse a `"<rung>/<token>"` envelope and decrypt it.
    pub fn decrypt_envelope(&self, envelope: &[u8]) -> Result<Vec<u8>, LineageError> {
        let tagged = TaggedCiphertext::from_bytes(envelope)?;
        self.decrypt(&tagged)
    }

    fn record(&self, event: AuditEvent, rung: Rung) {
        audit::record(self.audit.as_ref(), event, self.max_rung, rung);
    }
}

impl fmt::Debug for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lineage")
            .field("max_rung", &self.max_rung)
            .field("fingerprint", &self.fingerprint())
            .field("cached_sublineages", &self.cached_sublineages())
            .finish()
    }
}
