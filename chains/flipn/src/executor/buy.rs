use crate::api::FlipnClient;
use crate::rpc::SolanaRpc;
use crate::transaction::{decode_transaction, prepare_message, sign_message, to_signer};
use async_trait::async_trait;
use core_logic::{
    shorten, ConfigError, DecodedKeypair, OperationExecutor, OperationReceipt, OperationResult,
};
use serde_json::json;
use solana_sdk::signature::Signer;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Validated buy amount and slippage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyParams {
    sol_amount: f64,
    slippage_percent: f64,
}

impl BuyParams {
    /// `sol_amount` must be positive and `slippage_percent` in `(0, 100]`.
    pub fn new(sol_amount: f64, slippage_percent: f64) -> Result<Self, ConfigError> {
        if !sol_amount.is_finite() || sol_amount <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "sol_amount".to_string(),
                reason: format!("must be greater than 0, got {}", sol_amount),
            });
        }
        if !(slippage_percent > 0.0 && slippage_percent <= 100.0) {
            return Err(ConfigError::InvalidValue {
                field: "slippage".to_string(),
                reason: format!("must be in (0, 100], got {}", slippage_percent),
            });
        }
        Ok(Self {
            sol_amount,
            slippage_percent,
        })
    }

    pub fn sol_amount(&self) -> f64 {
        self.sol_amount
    }

    pub fn slippage_percent(&self) -> f64 {
        self.slippage_percent
    }

    /// Lowest acceptable token output for an estimate.
    pub fn minimum_tokens(&self, estimate: f64) -> f64 {
        estimate * (1.0 - self.slippage_percent / 100.0)
    }
}

/// Estimate, fetch the buy transaction, re-pay and sign it with the wallet,
/// submit, confirm.
pub struct BuyExecutor {
    client: Arc<FlipnClient>,
    rpc: Arc<SolanaRpc>,
    params: BuyParams,
    confirm_timeout: Duration,
}

impl BuyExecutor {
    pub fn new(
        client: Arc<FlipnClient>,
        rpc: Arc<SolanaRpc>,
        params: BuyParams,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            client,
            rpc,
            params,
            confirm_timeout,
        }
    }
}

#[async_trait]
impl OperationExecutor for BuyExecutor {
    fn name(&self) -> &str {
        "buy"
    }

    async fn execute(&self, keypair: &DecodedKeypair, target: &str) -> OperationResult {
        let owner = keypair.address();
        let sol_amount = self.params.sol_amount();

        let estimate = self.client.estimate(owner, target, sol_amount).await?;
        let minimum = self.params.minimum_tokens(estimate);
        info!(
            "Estimate for {} SOL of {}: {} tokens (min {:.4} at {}% slippage)",
            sol_amount,
            shorten(target, 10),
            estimate,
            minimum,
            self.params.slippage_percent()
        );

        let encoded = self
            .client
            .buy_transaction(owner, target, sol_amount)
            .await?;
        let transaction = decode_transaction(&encoded)?;
        let signer = to_signer(keypair)?;

        let blockhash = self.rpc.get_latest_blockhash().await?;
        let message = prepare_message(transaction.message, &signer.pubkey(), blockhash)?;
        let signed = sign_message(message, &signer)?;

        let signature = self.rpc.send_transaction(&signed).await?;
        self.rpc
            .confirm_transaction(&signature, self.confirm_timeout)
            .await?;
        let signature = signature.to_string();

        Ok(OperationReceipt::new(
            format!(
                "Wallet {} bought {} (Signature: {})",
                shorten(owner, 10),
                shorten(target, 10),
                shorten(&signature, 10)
            ),
            json!({
                "signature": signature,
                "solAmount": sol_amount,
                "estimatedAmount": estimate,
                "minimumTokens": minimum,
            }),
        ))
    }
}
