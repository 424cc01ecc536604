//! # hashlineage
//!
//! Deterministic, hash-chained key lineages.
//!
//! A lineage is a tree of symmetric keys rooted in one secret and indexed by
//! an integer rung. The key at rung `r` is the root key hashed
//! `max_rung - r` more times, so any node can derive every rung beneath it
//! and none above it. Encryption uses a fixed IV and timestamp: the same
//! plaintext at the same rung always yields the same ciphertext, whether it
//! is sealed by the root or by a sublineage handed out earlier. That
//! determinism is deliberate; this scheme trades semantic security for
//! reproducibility.
//!
//! ## Public API
//!
//! The public surface is intentionally narrow: [`Lineage`] and its options,
//! [`TaggedCiphertext`], the translator types, the codec trait, the audit
//! log, and [`LineageError`]. Key bytes are handed only to the
//! [`TokenCodec`](crypto::TokenCodec) configured through [`LineageOptions`];
//! no other public API exposes them.

// Module declarations.
pub mod audit;
pub mod crypto;
pub mod envelope;
pub mod error;
pub(crate) mod keys;
pub mod lineage;
pub mod translate;

/// Generational depth in a lineage. Lower rungs sit more hash steps away
/// from the root.
pub type Rung = u64;

pub use envelope::TaggedCiphertext;
pub use error::LineageError;
pub use keys::{generate_root_secret, KEY_LEN};
pub use lineage::{Lineage, LineageOptions};
pub use translate::{DayOrdinal, RungTranslator, TranslatedLineage, UnixHours};
