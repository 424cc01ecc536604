//! Rung-tagged ciphertext and its wire form.
//!
//! A token alone does not say which key sealed it. The envelope prefixes the
//! rung so any lineage at or above that rung can find the matching
//! descendant:
//!
//! ```text
//! <rung as ASCII decimal>/<token bytes>
//! ```
//!
//! Parsing splits on the first `/` only. The Fernet alphabet (URL-safe
//! base64) never contains `/`; a codec with a different alphabet would need a
//! different envelope.

use std::fmt;
use std::str::FromStr;

use crate::error::LineageError;
use crate::Rung;

/// Separates the rung from the token on the wire.
pub const DELIMITER: u8 = b'/';

/// A token paired with the rung of the key that sealed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaggedCiphertext {
    rung: Rung,
    payload: Vec<u8>,
}

impl TaggedCiphertext {
    pub fn new(rung: Rung, payload: Vec<u8>) -> Self {
        Self { rung, payload }
    }

    /// The rung whose key sealed the payload.
    pub fn rung(&self) -> Rung {
        self.rung
    }

    /// The opaque token bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Serialize to `"<rung>/<token>"`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let rung = self.rung.to_string();
        let mut out = Vec::with_capacity(rung.len() + 1 + self.payload.len());
        out.extend_from_slice(rung.as_bytes());
        out.push(DELIMITER);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse the wire form produced by [`to_bytes`](Self::to_bytes).
    ///
    /// The rung must be a non-empty run of ASCII digits that fits a `u64`.
    /// Everything after the first delimiter is the payload, untouched.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LineageError> {
        let split = bytes
            .iter()
            .position(|&b| b == DELIMITER)
            .ok_or_else(|| LineageError::MalformedEnvelope("missing delimiter".into()))?;

        let (rung_bytes, rest) = bytes.split_at(split);
        let rung = parse_rung(rung_bytes)?;

        Ok(Self {
            rung,
            payload: rest[1..].to_vec(),
        })
    }
}

fn parse_rung(digits: &[u8]) -> Result<Rung, LineageError> {
    if digits.is_empty() {
        return Err(LineageError::MalformedEnvelope("empty rung".into()));
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(LineageError::MalformedEnvelope(
            "rung is not a decimal integer".into(),
        ));
    }
    // All ASCII digits, so this is valid UTF-8; only overflow can fail.
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<Rung>().ok())
        .ok_or_else(|| LineageError::MalformedEnvelope("rung out of range".into()))
}

/// Text form of the envelope. Assumes a text token, as the Fernet codec
/// emits; bytes that are not UTF-8 are replaced, so use
/// [`to_bytes`](TaggedCiphertext::to_bytes) for a lossless wire form.
impl fmt::Display for TaggedCiphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.rung,
            DELIMITER as char,
            String::from_utf8_lossy(&self.payload)
        )
    }
}

impl FromStr for TaggedCiphertext {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form() {
        let tagged = TaggedCiphertext::new(738894, b"gAAAA-_=".to_vec());
        assert_eq!(tagged.to_bytes(), b"738894/gAAAA-_=".to_vec());
        assert_eq!(tagged.to_string(), "738894/gAAAA-_=");
    }

    #[test]
    fn test_splits_on_first_delimiter_only() {
        let parsed = TaggedCiphertext::from_bytes(b"5/abc/def").unwrap();
        assert_eq!(parsed.rung(), 5);
        assert_eq!(parsed.payload(), b"abc/def");
    }

    #[test]
    fn test_binary_payload_survives_byte_form() {
        let tagged = TaggedCiphertext::new(3, vec![0xff, 0xfe, b'/', 0x00]);
        let parsed = TaggedCiphertext::from_bytes(&tagged.to_bytes()).unwrap();
        assert_eq!(parsed, tagged);
        // The text form is only for text tokens.
        assert_ne!(tagged.to_string().parse::<TaggedCiphertext>().unwrap(), tagged);
    }

    #[test]
    fn test_empty_payload_and_leading_zeros() {
        let parsed: TaggedCiphertext = "007/".parse().unwrap();
        assert_eq!(parsed.rung(), 7);
        assert!(parsed.payload().is_empty());
    }

    #[test]
    fn test_rejects_malformed_envelopes() {
        for bad in [
            "no delimiter",
            "/token",
            "-1/token",
            "+1/token",
            " 1/token",
            "1a/token",
            "99999999999999999999999/token",
        ] {
            assert!(
                matches!(
                    TaggedCiphertext::from_bytes(bad.as_bytes()),
                    Err(LineageError::MalformedEnvelope(_))
                ),
                "accepted {:?}",
                bad
            );
        }
    }
}
