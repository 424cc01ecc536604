//! Error types for hashlineage.
//!
//! Every variant is a distinct failure mode of the lineage. None of them is
//! transient: there is no I/O on the encrypt/decrypt path, so nothing here is
//! ever retried. Messages carry rungs and parse context only, never key
//! material or plaintext.

use std::fmt;

use crate::Rung;

/// The single error type for all hashlineage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageError {
    /// A rung above the node's max rung was requested. Lineages only descend.
    InvalidRung {
        /// The rung the caller asked for.
        requested: Rung,
        /// The max rung of the node that rejected it.
        max_rung: Rung,
    },

    /// The token failed authentication, was malformed, or was sealed under a
    /// different key.
    DecryptionFailure,

    /// The cipher rejected the plaintext.
    EncryptionFailure,

    /// Key material of the wrong length reached the cipher.
    InvalidKey,

    /// The system's random number generator failed to produce bytes.
    RandomnessFailure,

    /// A wire envelope was missing its delimiter or carried a rung that is
    /// not an unsigned decimal integer.
    MalformedEnvelope(String),

    /// A domain object fell outside the translator's declared domain.
    Translation(String),
}

impl fmt::Display for LineageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRung {
                requested,
                max_rung,
            } => write!(
                f,
                "invalid rung: {} exceeds max rung {}",
                requested, max_rung
            ),
            Self::DecryptionFailure => write!(f, "decryption failed"),
            Self::EncryptionFailure => write!(f, "encryption failed"),
            Self::InvalidKey => write!(f, "invalid key"),
            Self::RandomnessFailure => write!(f, "randomness source failed"),
            Self::MalformedEnvelope(reason) => write!(f, "malformed envelope: {}", reason),
            Self::Translation(reason) => write!(f, "rung translation failed: {}", reason),
        }
    }
}

impl std::error::Error for LineageError {}
