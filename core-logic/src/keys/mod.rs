//! # Key Decoding
//!
//! Turns a private key string of unknown encoding into an ed25519 signing
//! keypair. Wallets arrive from many export tools, so decoding walks an
//! ordered list of stages (base58, base64, hex) and takes the first one that
//! yields a consistent 64-byte keypair.
//!
//! Under [`DecodePolicy::Permissive`] the derived-seed stage runs right after
//! base64 and again after hex, as the legacy tool did. It derives a keypair
//! from the SHA-256 of the input and always succeeds, so hex keys resolve to
//! the derived wallet there. That keypair is NOT a decoding of the input, it
//! is a different wallet, so every use of it is logged at WARN.

use crate::error::WalletError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, KEYPAIR_LENGTH};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, warn, Level};
use zeroize::{Zeroize, Zeroizing};

/// Length of a Solana public key.
pub const PUBKEY_LENGTH: usize = 32;

const TRUNCATABLE_LENGTH: usize = 88;
const MIN_PADDABLE_LENGTH: usize = 32;

/// Whether the hash-derived fallback may stand in for an undecodable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    #[default]
    Strict,
    Permissive,
}

/// Which decoding stage produced a keypair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Base58,
    Base64,
    Base64Padded,
    Hex,
    DerivedSeed,
}

impl KeySource {
    /// True when the keypair was derived rather than decoded.
    pub fn is_derived(&self) -> bool {
        matches!(self, KeySource::DerivedSeed)
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeySource::Base58 => "base58",
            KeySource::Base64 => "base64",
            KeySource::Base64Padded => "base64 (padded)",
            KeySource::Hex => "hex",
            KeySource::DerivedSeed => "sha256-derived seed",
        };
        f.write_str(name)
    }
}

/// A signing keypair together with its base58 address.
#[derive(Clone)]
pub struct DecodedKeypair {
    signing_key: SigningKey,
    address: String,
    source: KeySource,
}

impl DecodedKeypair {
    pub fn from_signing_key(signing_key: SigningKey, source: KeySource) -> Self {
        let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        Self {
            signing_key,
            address,
            source,
        }
    }

    /// Fresh random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing_key, KeySource::Base58)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    /// Base58 of the 64 keypair bytes, the format wallets are exported in.
    pub fn to_base58_secret(&self) -> String {
        let bytes = self.keypair_bytes();
        bs58::encode(&bytes[..]).into_string()
    }

    /// Secret half followed by public half, wiped on drop.
    pub fn keypair_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LENGTH]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl fmt::Debug for DecodedKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedKeypair")
            .field("address", &self.address)
            .field("source", &self.source)
            .field("signing_key", &"***REDACTED***")
            .finish()
    }
}

type StageFn = fn(&str) -> Option<(SigningKey, KeySource)>;

struct Stage {
    name: &'static str,
    attempt: StageFn,
}

const BASE58_STAGE: Stage = Stage {
    name: "base58",
    attempt: decode_base58,
};

const BASE64_STAGE: Stage = Stage {
    name: "base64",
    attempt: decode_base64,
};

const HEX_STAGE: Stage = Stage {
    name: "hex",
    attempt: decode_hex,
};

const DERIVED_STAGE: Stage = Stage {
    name: "derived-seed",
    attempt: derive_from_seed,
};

static STRICT_STAGES: [Stage; 3] = [BASE58_STAGE, BASE64_STAGE, HEX_STAGE];

static PERMISSIVE_STAGES: [Stage; 5] = [
    BASE58_STAGE,
    BASE64_STAGE,
    DERIVED_STAGE,
    HEX_STAGE,
    DERIVED_STAGE,
];

/// Multi-format private key decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDecoder {
    policy: DecodePolicy,
}

impl KeyDecoder {
    pub fn new(policy: DecodePolicy) -> Self {
        Self { policy }
    }

    pub fn strict() -> Self {
        Self::new(DecodePolicy::Strict)
    }

    pub fn permissive() -> Self {
        Self::new(DecodePolicy::Permissive)
    }

    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// Decodes `secret`, trying each stage in order.
    ///
    /// Pure and deterministic: the same input always yields the same address.
    pub fn decode(&self, secret: &str) -> Result<DecodedKeypair, WalletError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(WalletError::EmptyKey);
        }

        let stages: &[Stage] = match self.policy {
            DecodePolicy::Strict => &STRICT_STAGES,
            DecodePolicy::Permissive => &PERMISSIVE_STAGES,
        };

        for stage in stages {
            match (stage.attempt)(secret) {
                Some((signing_key, source)) => {
                    let keypair = DecodedKeypair::from_signing_key(signing_key, source);
                    if source.is_derived() {
                        warn!(
                            "Private key matched no known encoding; using derived wallet {} which is NOT the original key",
                            keypair.address()
                        );
                    } else {
                        debug!("Decoded key for {} via {}", keypair.address(), source);
                    }
                    return Ok(keypair);
                }
                None => debug!("Key decoding stage '{}' failed", stage.name),
            }
        }

        Err(WalletError::KeyFormat)
    }
}

/// Validates a base58 public key and returns its bytes.
pub fn parse_public_key(address: &str) -> Result<[u8; PUBKEY_LENGTH], WalletError> {
    let bytes = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| WalletError::InvalidPublicKey {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::InvalidPublicKey {
            address: address.to_string(),
            reason: format!("expected {} bytes, got {}", PUBKEY_LENGTH, bytes.len()),
        })
}

/// Builds a signing key from exactly 64 bytes whose public half matches the
/// secret half.
fn construct(bytes: &[u8]) -> Option<SigningKey> {
    let array: &[u8; KEYPAIR_LENGTH] = bytes.try_into().ok()?;
    SigningKey::from_keypair_bytes(array).ok()
}

fn construct_normalized(bytes: &[u8], encoding: &str, allow_truncate: bool) -> Option<SigningKey> {
    if let Some(key) = construct(bytes) {
        return Some(key);
    }
    report_length(encoding, bytes.len());
    let normalized = normalize_length(bytes, allow_truncate)?;
    construct(&normalized)
}

fn normalize_length(bytes: &[u8], allow_truncate: bool) -> Option<Zeroizing<Vec<u8>>> {
    match bytes.len() {
        TRUNCATABLE_LENGTH if allow_truncate => {
            Some(Zeroizing::new(bytes[..KEYPAIR_LENGTH].to_vec()))
        }
        len if (MIN_PADDABLE_LENGTH..KEYPAIR_LENGTH).contains(&len) => Some(pad_cyclic(bytes)),
        _ => None,
    }
}

/// Lengths that could be a mangled keypair warn; anything longer is just
/// another encoding passing through this stage.
fn length_log_level(len: usize) -> Option<Level> {
    match len {
        KEYPAIR_LENGTH => None,
        len if len > KEYPAIR_LENGTH => Some(Level::DEBUG),
        _ => Some(Level::WARN),
    }
}

fn report_length(encoding: &str, len: usize) {
    match length_log_level(len) {
        Some(Level::WARN) => warn!(
            "Decoded {} key has unusual length: {} bytes (expected {})",
            encoding, len, KEYPAIR_LENGTH
        ),
        Some(_) => debug!(
            "Decoded {} key has {} bytes, not a keypair (expected {})",
            encoding, len, KEYPAIR_LENGTH
        ),
        None => {}
    }
}

/// Right-pads to 64 bytes by repeating the existing bytes from the start.
pub(crate) fn pad_cyclic(bytes: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(KEYPAIR_LENGTH));
    out.extend_from_slice(bytes);
    if bytes.is_empty() {
        return out;
    }
    for i in bytes.len()..KEYPAIR_LENGTH {
        out.push(bytes[i % bytes.len()]);
    }
    out
}

fn decode_base58(secret: &str) -> Option<(SigningKey, KeySource)> {
    let bytes = Zeroizing::new(bs58::decode(secret).into_vec().ok()?);
    report_length("base58", bytes.len());
    construct(&bytes).map(|key| (key, KeySource::Base58))
}

fn decode_base64(secret: &str) -> Option<(SigningKey, KeySource)> {
    if let Ok(bytes) = STANDARD.decode(secret) {
        let bytes = Zeroizing::new(bytes);
        if let Some(key) = construct_normalized(&bytes, "base64", true) {
            return Some((key, KeySource::Base64));
        }
    }

    let padded = Zeroizing::new(pad_base64(secret)?);
    let bytes = Zeroizing::new(STANDARD.decode(padded.as_bytes()).ok()?);
    construct_normalized(&bytes, "base64", true).map(|key| (key, KeySource::Base64Padded))
}

/// Appends `=` until the length is a multiple of 4; `None` when nothing
/// would change.
fn pad_base64(secret: &str) -> Option<String> {
    if secret.len() % 4 == 0 {
        return None;
    }
    let mut padded = secret.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    Some(padded)
}

fn decode_hex(secret: &str) -> Option<(SigningKey, KeySource)> {
    let digits = secret.strip_prefix("0x").unwrap_or(secret);
    let bytes = Zeroizing::new(hex::decode(digits).ok()?);
    construct_normalized(&bytes, "hex", false).map(|key| (key, KeySource::Hex))
}

fn derive_from_seed(secret: &str) -> Option<(SigningKey, KeySource)> {
    let digest = Sha256::digest(secret.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    let signing_key = SigningKey::from_bytes(&seed);
    seed.zeroize();
    Some((signing_key, KeySource::DerivedSeed))
}
