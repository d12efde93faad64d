use crate::error::WalletError;
use crate::keys::{parse_public_key, DecodePolicy, KeyDecoder};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const MIN_GENERATE_COUNT: usize = 1;
pub const MAX_GENERATE_COUNT: usize = 100;

/// A wallet as stored in `wallets.json` and passed to batch runs.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WalletCredential {
    pub public_key: String,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}

impl WalletCredential {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            balance: None,
        }
    }

    /// First `len` characters of the address followed by `...`.
    pub fn short_address(&self, len: usize) -> String {
        shorten(&self.public_key, len)
    }
}

impl fmt::Debug for WalletCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredential")
            .field("public_key", &self.public_key)
            .field("private_key", &"***REDACTED***")
            .field("balance", &self.balance)
            .finish()
    }
}

/// Loosely shaped wallet entry from an import file or request body.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub balance: Option<f64>,
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("public_key", &self.public_key)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

/// Why a wallet was rejected. The secret itself is never carried here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidWalletFlags {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing_required_fields: bool,
    pub invalid_public_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_error: Option<String>,
    pub invalid_private_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_error: Option<String>,
    pub key_mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidWallet {
    pub public_key: String,
    pub errors: InvalidWalletFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub wallets: Vec<WalletCredential>,
    pub invalid: Vec<InvalidWallet>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.wallets.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub validated: Vec<WalletCredential>,
    pub invalid: Vec<InvalidWallet>,
    pub stats: ValidationStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub total: usize,
}

pub fn shorten(value: &str, len: usize) -> String {
    let head: String = value.chars().take(len).collect();
    format!("{}...", head)
}

/// Creates `count` fresh wallets with base58 encoded 64-byte secrets.
pub fn generate_wallets(count: usize) -> Result<Vec<WalletCredential>, WalletError> {
    if !(MIN_GENERATE_COUNT..=MAX_GENERATE_COUNT).contains(&count) {
        return Err(WalletError::InvalidCount {
            count,
            min: MIN_GENERATE_COUNT,
            max: MAX_GENERATE_COUNT,
        });
    }

    Ok((0..count)
        .map(|_| {
            let keypair = crate::keys::DecodedKeypair::generate();
            WalletCredential::new(keypair.address(), keypair.to_base58_secret())
        })
        .collect())
}

struct KeyCheck {
    public_key_ok: bool,
    public_key_error: Option<String>,
    derived_address: Option<String>,
    private_key_error: Option<String>,
}

fn check_record(public_key: &str, private_key: &str, decoder: &KeyDecoder) -> KeyCheck {
    let public_key_error = parse_public_key(public_key).err().map(|e| e.to_string());
    let (derived_address, private_key_error) = match decoder.decode(private_key) {
        Ok(keypair) => (Some(keypair.address().to_string()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    KeyCheck {
        public_key_ok: public_key_error.is_none(),
        public_key_error,
        derived_address,
        private_key_error,
    }
}

fn missing_fields(record: &WalletRecord) -> InvalidWallet {
    InvalidWallet {
        public_key: record
            .public_key
            .clone()
            .unwrap_or_else(|| "missing".to_string()),
        errors: InvalidWalletFlags {
            missing_required_fields: true,
            ..Default::default()
        },
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Accepts every record whose private key decodes. When the supplied
/// address disagrees with the key, the derived address wins.
pub fn import_wallets(records: &[WalletRecord], policy: DecodePolicy) -> ImportReport {
    let decoder = KeyDecoder::new(policy);
    let mut wallets = Vec::new();
    let mut invalid = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let (Some(public_key), Some(private_key)) =
            (present(&record.public_key), present(&record.private_key))
        else {
            warn!("Wallet {} is missing required fields", i + 1);
            invalid.push(missing_fields(record));
            continue;
        };

        let check = check_record(public_key, private_key, &decoder);
        match check.derived_address {
            Some(derived) => {
                if derived != public_key {
                    warn!(
                        "Wallet {}: supplied address {} does not match key, using derived {}",
                        i + 1,
                        public_key,
                        derived
                    );
                }
                let mut wallet = WalletCredential::new(derived, private_key);
                wallet.balance = Some(record.balance.unwrap_or(0.0));
                wallets.push(wallet);
            }
            None => {
                warn!("Wallet {}: invalid private key", i + 1);
                invalid.push(InvalidWallet {
                    public_key: public_key.to_string(),
                    errors: InvalidWalletFlags {
                        missing_required_fields: false,
                        invalid_public_key: !check.public_key_ok,
                        public_key_error: check.public_key_error,
                        invalid_private_key: true,
                        private_key_error: check.private_key_error,
                        key_mismatch: false,
                        mismatch_error: None,
                    },
                });
            }
        }
    }

    info!(
        "Import summary: {} processed, {} imported, {} invalid",
        records.len(),
        wallets.len(),
        invalid.len()
    );

    ImportReport { wallets, invalid }
}

/// Strict check: valid address, decodable key, and the two agree.
pub fn validate_wallets(records: &[WalletRecord], policy: DecodePolicy) -> ValidationReport {
    let decoder = KeyDecoder::new(policy);
    let mut validated = Vec::new();
    let mut invalid = Vec::new();

    for record in records {
        let (Some(public_key), Some(private_key)) =
            (present(&record.public_key), present(&record.private_key))
        else {
            invalid.push(missing_fields(record));
            continue;
        };

        let check = check_record(public_key, private_key, &decoder);
        let private_key_ok = check.derived_address.is_some();
        let mismatch = match check.derived_address.as_deref() {
            Some(derived) if check.public_key_ok && derived != public_key => {
                Some(WalletError::AddressMismatch {
                    expected: public_key.to_string(),
                    actual: derived.to_string(),
                })
            }
            _ => None,
        };

        if check.public_key_ok && private_key_ok && mismatch.is_none() {
            validated.push(WalletCredential::new(public_key, private_key));
        } else {
            invalid.push(InvalidWallet {
                public_key: public_key.to_string(),
                errors: InvalidWalletFlags {
                    missing_required_fields: false,
                    invalid_public_key: !check.public_key_ok,
                    public_key_error: check.public_key_error,
                    invalid_private_key: !private_key_ok,
                    private_key_error: check.private_key_error,
                    key_mismatch: mismatch.is_some(),
                    mismatch_error: mismatch.map(|e| e.to_string()),
                },
            });
        }
    }

    let stats = ValidationStats {
        total: records.len(),
        valid: validated.len(),
        invalid: invalid.len(),
    };
    ValidationReport {
        validated,
        invalid,
        stats,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WalletFile {
    Wrapped { wallets: Vec<WalletCredential> },
    Bare(Vec<WalletCredential>),
}

#[derive(Serialize)]
struct WalletFileRef<'a> {
    wallets: &'a [WalletCredential],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Wrapped { wallets: Vec<WalletRecord> },
    Bare(Vec<WalletRecord>),
}

/// Reads loosely shaped wallet records (`{"wallets": [...]}` or a bare array).
pub fn read_wallet_records(path: &Path) -> Result<Vec<WalletRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read wallet file {:?}", path))?;
    let parsed: RecordFile = serde_json::from_str(&content)
        .with_context(|| format!("Invalid wallet JSON in {:?}", path))?;
    Ok(match parsed {
        RecordFile::Wrapped { wallets } => wallets,
        RecordFile::Bare(wallets) => wallets,
    })
}

/// Plaintext JSON wallet file.
#[derive(Debug, Clone)]
pub struct WalletStore {
    path: PathBuf,
}

impl WalletStore {
    pub const DEFAULT_FILE: &'static str = "wallets.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns an empty list when the file does not exist yet.
    pub fn load(&self) -> Result<Vec<WalletCredential>> {
        if !self.path.exists() {
            info!("[WalletStore] {:?} not found, starting empty", self.path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read wallet store {:?}", self.path))?;
        let parsed: WalletFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid wallet JSON in {:?}", self.path))?;

        let wallets = match parsed {
            WalletFile::Wrapped { wallets } => wallets,
            WalletFile::Bare(wallets) => wallets,
        };
        info!(
            "[WalletStore] Loaded {} wallets from {:?}",
            wallets.len(),
            self.path
        );
        Ok(wallets)
    }

    pub fn save(&self, wallets: &[WalletCredential]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&WalletFileRef { wallets })?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write wallet store {:?}", self.path))?;
        Ok(())
    }

    /// Adds `incoming` to the store, replacing entries with the same address.
    pub fn merge(&self, incoming: &[WalletCredential]) -> Result<MergeSummary> {
        let mut wallets = self.load()?;
        let mut added = 0;
        let mut updated = 0;

        for wallet in incoming {
            match wallets
                .iter_mut()
                .find(|w| w.public_key == wallet.public_key)
            {
                Some(existing) => {
                    existing.private_key = wallet.private_key.clone();
                    if wallet.balance.is_some() {
                        existing.balance = wallet.balance;
                    }
                    updated += 1;
                }
                None => {
                    wallets.push(wallet.clone());
                    added += 1;
                }
            }
        }

        self.save(&wallets)?;
        Ok(MergeSummary {
            added,
            updated,
            total: wallets.len(),
        })
    }
}
