//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

// Internal modules - not part of public API
pub(crate) mod delay;
pub(crate) mod logger;
pub(crate) mod runner;
pub(crate) mod wallet_manager;

// Selective exports - only public utilities
pub use delay::DelayScheduler;
pub use logger::{setup_logger, RESULT_TARGET};
pub use runner::{AttemptRecord, BatchRequest, BatchResult, BatchRunner};
pub use wallet_manager::{
    generate_wallets, import_wallets, read_wallet_records, shorten, validate_wallets,
    ImportReport, InvalidWallet, InvalidWalletFlags, MergeSummary, ValidationReport,
    ValidationStats, WalletCredential, WalletRecord, WalletStore, MAX_GENERATE_COUNT,
    MIN_GENERATE_COUNT,
};
