use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use core_logic::{DecodedKeypair, KeyDecoder, KeySource, WalletError};
use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};

fn fixed_key(byte: u8) -> DecodedKeypair {
    DecodedKeypair::from_signing_key(SigningKey::from_bytes(&[byte; 32]), KeySource::Base58)
}

fn keypair_bytes(keypair: &DecodedKeypair) -> Vec<u8> {
    bs58::decode(keypair.to_base58_secret()).into_vec().unwrap()
}

#[test]
fn test_decode_base58_secret() {
    let original = fixed_key(1);
    let decoded = KeyDecoder::strict()
        .decode(&original.to_base58_secret())
        .unwrap();

    assert_eq!(decoded.address(), original.address());
    assert_eq!(decoded.source(), KeySource::Base58);
}

#[test]
fn test_decode_ignores_surrounding_whitespace() {
    let original = fixed_key(2);
    let secret = format!("  {}\n", original.to_base58_secret());
    let decoded = KeyDecoder::strict().decode(&secret).unwrap();
    assert_eq!(decoded.address(), original.address());
}

#[test]
fn test_decode_base64_secret() {
    let original = fixed_key(3);
    let secret = STANDARD.encode(keypair_bytes(&original));
    let decoded = KeyDecoder::strict().decode(&secret).unwrap();

    assert_eq!(decoded.address(), original.address());
    assert_eq!(decoded.source(), KeySource::Base64);
}

#[test]
fn test_decode_base64_without_padding() {
    let original = fixed_key(4);
    let secret = STANDARD.encode(keypair_bytes(&original));
    let unpadded = secret.trim_end_matches('=');
    assert_ne!(unpadded.len() % 4, 0);

    let decoded = KeyDecoder::strict().decode(unpadded).unwrap();
    assert_eq!(decoded.address(), original.address());
    assert_eq!(decoded.source(), KeySource::Base64Padded);
}

#[test]
fn test_decode_base64_88_byte_blob_uses_first_64() {
    let original = fixed_key(5);
    let mut blob = keypair_bytes(&original);
    blob.extend_from_slice(&[0xAB; 24]);
    assert_eq!(blob.len(), 88);

    let decoded = KeyDecoder::strict()
        .decode(&STANDARD.encode(&blob))
        .unwrap();
    assert_eq!(decoded.address(), original.address());
}

#[test]
fn test_decode_hex_with_and_without_prefix() {
    let original = fixed_key(6);
    let digits = hex::encode(keypair_bytes(&original));

    for secret in [digits.clone(), format!("0x{}", digits)] {
        let decoded = KeyDecoder::strict().decode(&secret).unwrap();
        assert_eq!(decoded.address(), original.address());
        assert_eq!(decoded.source(), KeySource::Hex);
    }
}

#[test]
fn test_strict_rejects_garbage() {
    let err = KeyDecoder::strict().decode("not-a-real-key").unwrap_err();
    assert_eq!(err, WalletError::KeyFormat);
}

#[test]
fn test_strict_rejects_seed_only_key() {
    let seed = bs58::encode([9u8; 32]).into_string();
    assert!(KeyDecoder::strict().decode(&seed).is_err());
}

#[test]
fn test_empty_key_is_always_an_error() {
    assert_eq!(
        KeyDecoder::permissive().decode("   ").unwrap_err(),
        WalletError::EmptyKey
    );
    assert_eq!(
        KeyDecoder::strict().decode("").unwrap_err(),
        WalletError::EmptyKey
    );
}

#[test]
fn test_permissive_falls_back_to_derived_seed() {
    let decoded = KeyDecoder::permissive().decode("not-a-real-key").unwrap();
    assert_eq!(decoded.source(), KeySource::DerivedSeed);
    assert!(decoded.source().is_derived());
}

#[test]
fn test_decode_is_deterministic() {
    let decoder = KeyDecoder::permissive();
    let original = fixed_key(8);

    for secret in [
        "not-a-real-key".to_string(),
        original.to_base58_secret(),
        "zzzz".to_string(),
    ] {
        let first = decoder.decode(&secret).unwrap();
        let second = decoder.decode(&secret).unwrap();
        assert_eq!(first.address(), second.address());
    }
}

#[test]
fn test_permissive_derives_before_hex() {
    let original = fixed_key(10);
    let digits = hex::encode(keypair_bytes(&original));

    let decoded = KeyDecoder::permissive().decode(&digits).unwrap();

    let seed: [u8; 32] = Sha256::digest(digits.as_bytes()).into();
    let legacy = SigningKey::from_bytes(&seed);
    assert_eq!(decoded.source(), KeySource::DerivedSeed);
    assert_eq!(
        decoded.address(),
        bs58::encode(legacy.verifying_key().as_bytes()).into_string()
    );
    assert_ne!(decoded.address(), original.address());

    let strict = KeyDecoder::strict().decode(&digits).unwrap();
    assert_eq!(strict.address(), original.address());
    assert_eq!(strict.source(), KeySource::Hex);
}

#[test]
fn test_permissive_keeps_base58_and_base64() {
    let original = fixed_key(11);
    let decoder = KeyDecoder::permissive();

    let from_base58 = decoder.decode(&original.to_base58_secret()).unwrap();
    assert_eq!(from_base58.address(), original.address());
    assert_eq!(from_base58.source(), KeySource::Base58);

    let from_base64 = decoder
        .decode(&STANDARD.encode(keypair_bytes(&original)))
        .unwrap();
    assert_eq!(from_base64.address(), original.address());
    assert_eq!(from_base64.source(), KeySource::Base64);
}

#[test]
fn test_generated_key_round_trips() {
    let generated = DecodedKeypair::generate();
    let decoded = KeyDecoder::strict()
        .decode(&generated.to_base58_secret())
        .unwrap();
    assert_eq!(decoded.address(), generated.address());
}
