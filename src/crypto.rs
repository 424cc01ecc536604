//! Low-level cryptographic operations.
//!
//! This module is one of exactly two places in the crate that import `ring`
//! directly (the other is `keys`). Lineages seal and open tokens exclusively
//! through the [`TokenCodec`] trait defined here.
//!
//! The default codec produces standard Fernet tokens:
//! - **Cipher**: AES-128-CBC with PKCS#7 padding
//! - **MAC**: HMAC-SHA256 over everything before the tag
//! - **Key split**: first 16 bytes sign, last 16 bytes encrypt
//! - **Encoding**: URL-safe base64 with padding
//!
//! Unlike a stock Fernet implementation, the IV and timestamp are supplied
//! by the caller. Lineages always pass [`FIXED_IV`] and [`FIXED_TIMESTAMP`];
//! that is what makes equal plaintexts at equal rungs seal to equal tokens.

use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::hmac;

use crate::error::LineageError;
use crate::keys::KEY_LEN;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Fernet version marker, the first byte of every decoded token.
pub const VERSION: u8 = 0x80;

/// Size of the CBC initialisation vector in bytes.
pub const IV_LEN: usize = 16;

/// The IV every lineage seals with: sixteen ASCII `'0'` bytes.
pub const FIXED_IV: [u8; IV_LEN] = [b'0'; IV_LEN];

/// The timestamp every lineage seals with.
pub const FIXED_TIMESTAMP: u64 = 0;

const TIMESTAMP_LEN: usize = 8;
const BLOCK_LEN: usize = 16;
const TAG_LEN: usize = 32;
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;

/// Authenticated symmetric encryption with caller-chosen IV and timestamp.
///
/// Implementations must be deterministic in `(key, plaintext, timestamp, iv)`
/// and must only emit bytes from an alphabet that excludes `/`, since tokens
/// travel inside the `"<rung>/<token>"` envelope.
pub trait TokenCodec: Send + Sync {
    /// Seal `plaintext` under `key` with the given timestamp and IV.
    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        plaintext: &[u8],
        timestamp: u64,
        iv: &[u8; IV_LEN],
    ) -> Result<Vec<u8>, LineageError>;

    /// Authenticate and open a token sealed by [`seal`](Self::seal).
    ///
    /// Any failure (bad encoding, bad tag, wrong key, bad padding) is
    /// reported as [`LineageError::DecryptionFailure`]. The caller receives no
    /// partial plaintext.
    fn open(&self, key: &[u8; KEY_LEN], token: &[u8]) -> Result<Vec<u8>, LineageError>;
}

/// Fernet token codec.
///
/// # Layout of the decoded token
/// ```text
/// [ 0x80 ][ timestamp (8, BE) ][ iv (16) ][ AES-128-CBC ciphertext ][ HMAC-SHA256 (32) ]
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FernetCodec;

fn split_key(key: &[u8; KEY_LEN]) -> (hmac::Key, &[u8]) {
    let (signing, encryption) = key.split_at(KEY_LEN / 2);
    (hmac::Key::new(hmac::HMAC_SHA256, signing), encryption)
}

impl TokenCodec for FernetCodec {
    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        plaintext: &[u8],
        timestamp: u64,
        iv: &[u8; IV_LEN],
    ) -> Result<Vec<u8>, LineageError> {
        let (signing_key, encryption_key) = split_key(key);

        let ciphertext = Aes128CbcEnc::new_from_slices(encryption_key, iv)
            .map_err(|_| LineageError::InvalidKey)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + TAG_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(iv);
        token.extend_from_slice(&ciphertext);

        let tag = hmac::sign(&signing_key, &token);
        token.extend_from_slice(tag.as_ref());

        Ok(URL_SAFE.encode(&token).into_bytes())
    }

    fn open(&self, key: &[u8; KEY_LEN], token: &[u8]) -> Result<Vec<u8>, LineageError> {
        let raw = URL_SAFE
            .decode(token)
            .map_err(|_| LineageError::DecryptionFailure)?;

        if raw.len() < HEADER_LEN + BLOCK_LEN + TAG_LEN || raw[0] != VERSION {
            return Err(LineageError::DecryptionFailure);
        }

        let (signing_key, encryption_key) = split_key(key);
        let (signed, tag) = raw.split_at(raw.len() - TAG_LEN);

        // Constant-time comparison inside ring.
        hmac::verify(&signing_key, signed, tag).map_err(|_| LineageError::DecryptionFailure)?;

        let iv = &signed[1 + TIMESTAMP_LEN..HEADER_LEN];
        let ciphertext = &signed[HEADER_LEN..];

        Aes128CbcDec::new_from_slices(encryption_key, iv)
            .map_err(|_| LineageError::InvalidKey)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| LineageError::DecryptionFailure)
    }
}
