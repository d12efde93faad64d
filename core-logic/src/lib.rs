//! # Core Logic - Shared Batch Automation Primitives
//!
//! This crate holds everything a batch run needs that does not talk to the
//! network: key decoding, delay scheduling, the sequential batch runner and
//! the wallet file.
//!
//! ## Modules
//!
//! - [`config`] - Delay configuration and lenient overrides
//! - [`error`] - Typed error handling with thiserror
//! - [`keys`] - Multi-format private key decoding
//! - [`traits`] - The operation executor seam
//! - [`utils`] - Runner, scheduler, wallet store and logger

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod error;
pub mod keys;
pub mod traits;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::{
    DelayConfig, DelayOverrides, DelayRange, OperationDelay, OperationOverride, RangeOverride,
};
pub use error::{ConfigError, NetworkError, OperationError, WalletError};
pub use keys::{parse_public_key, DecodePolicy, DecodedKeypair, KeyDecoder, KeySource};
pub use traits::{OperationExecutor, OperationReceipt, OperationResult};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    generate_wallets, import_wallets, read_wallet_records, setup_logger, shorten,
    validate_wallets, AttemptRecord, BatchRequest, BatchResult, BatchRunner, DelayScheduler,
    ImportReport, InvalidWallet, InvalidWalletFlags, MergeSummary, ValidationReport,
    ValidationStats, WalletCredential, WalletRecord, WalletStore, MAX_GENERATE_COUNT,
    MIN_GENERATE_COUNT, RESULT_TARGET,
};
