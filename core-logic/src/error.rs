//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Configuration and input validation errors.
///
/// Raised before a batch starts; a batch never fails with one of these
/// once it is running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid delay range for '{field}': min {min}ms > max {max}ms")]
    InvalidDelayRange { field: String, min: u64, max: u64 },

    #[error("No {what} provided")]
    EmptyInput { what: String },
}

/// Wallet and key handling errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("Private key is required")]
    EmptyKey,

    #[error("Private key is neither valid base58, base64, nor hex format")]
    KeyFormat,

    #[error("Invalid public key '{address}': {reason}")]
    InvalidPublicKey { address: String, reason: String },

    #[error("Wallet address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: String, actual: String },

    #[error("Wallet count must be between {min} and {max}, got {count}")]
    InvalidCount { count: usize, min: usize, max: usize },
}

/// Network and remote API errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("HTTP error {status_code} from {endpoint}: {body}")]
    HttpError {
        status_code: u16,
        endpoint: String,
        body: String,
    },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("RPC error {code} from {method}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
}

/// Failure of a single (wallet, target) operation.
///
/// Executors map every failure, including unexpected ones, onto this type so
/// the batch runner can isolate it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Signing failed: {reason}")]
    Signing { reason: String },

    #[error("Transaction {signature} not confirmed: {reason}")]
    Unconfirmed { signature: String, reason: String },

    #[error("{message}")]
    Unexpected { message: String },
}

impl OperationError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        OperationError::Unexpected {
            message: message.into(),
        }
    }
}
