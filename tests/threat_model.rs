use hashlineage::{Lineage, LineageError, TaggedCiphertext};

#[test]
fn test_foreign_secret_cannot_decrypt() {
    // Same rung, different root secret: the tag must fail.
    let ours = Lineage::new(b"ours", 20);
    let theirs = Lineage::new(b"theirs", 20);

    let sealed = theirs.encrypt_at(b"private", 10).unwrap();
    assert_eq!(ours.decrypt(&sealed), Err(LineageError::DecryptionFailure));
}

#[test]
fn test_retagged_ciphertext_is_rejected() {
    // Moving a token to another rung points it at the wrong key.
    let lineage = Lineage::new(b"seed", 20);
    let sealed = lineage.encrypt_at(b"pinned to 10", 10).unwrap();
    let moved = TaggedCiphertext::new(9, sealed.payload().to_vec());

    assert_eq!(lineage.decrypt(&moved), Err(LineageError::DecryptionFailure));
}

#[test]
fn test_tampered_token_is_rejected() {
    let lineage = Lineage::new(b"seed", 20);
    let sealed = lineage.encrypt(b"do not touch").unwrap();

    let mut payload = sealed.payload().to_vec();
    // Swap one base64 character for another valid one.
    let idx = payload.len() / 2;
    payload[idx] = if payload[idx] == b'A' { b'B' } else { b'A' };
    let tampered = TaggedCiphertext::new(sealed.rung(), payload);

    assert_eq!(lineage.decrypt(&tampered), Err(LineageError::DecryptionFailure));
}

#[test]
fn test_descendant_keys_reveal_nothing_upward() {
    // A holder of rung 5 gets a different key from rung 6 and can only go down.
    let root = Lineage::new(b"seed", 6);
    let five = root.sublineage(5).unwrap();
    assert_ne!(five.fingerprint(), root.fingerprint());
    assert!(five.sublineage(6).is_err());
}
