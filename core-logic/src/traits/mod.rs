use crate::error::OperationError;
use crate::keys::DecodedKeypair;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an executor hands back for one successful operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReceipt {
    /// Display-safe one-line description. Never contains key material.
    pub summary: String,
    /// Opaque executor payload (API response, transaction signature, ...).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl OperationReceipt {
    pub fn new(summary: impl Into<String>, payload: Value) -> Self {
        Self {
            summary: summary.into(),
            payload,
        }
    }
}

pub type OperationResult = Result<OperationReceipt, OperationError>;

/// Performs one unit of work for a (wallet, target) pair.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    /// Short name used in logs ("like", "buy").
    fn name(&self) -> &str;

    /// Executes the operation. Every failure must come back as an
    /// `OperationError`; the batch runner isolates it.
    async fn execute(&self, keypair: &DecodedKeypair, target: &str) -> OperationResult;
}

