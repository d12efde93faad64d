use core_logic::{NetworkError, OperationError};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Maps a client failure onto the network error the batch reports.
fn rpc_error(method: &str, timeout: Duration, e: ClientError) -> NetworkError {
    match e.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
            NetworkError::Rpc {
                method: method.to_string(),
                code: *code,
                message: message.clone(),
            }
        }
        ClientErrorKind::Reqwest(inner) if inner.is_timeout() => NetworkError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
            endpoint: method.to_string(),
        },
        ClientErrorKind::Reqwest(inner) => NetworkError::ConnectionFailed {
            endpoint: method.to_string(),
            reason: inner.to_string(),
        },
        _ => NetworkError::InvalidResponse {
            endpoint: method.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Solana RPC access for balances and buy submission, at `confirmed`
/// commitment.
pub struct SolanaRpc {
    client: RpcClient,
    timeout: Duration,
}

impl std::fmt::Debug for SolanaRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpc")
            .field("url", &self.client.url())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SolanaRpc {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            url.to_string(),
            timeout,
            CommitmentConfig::confirmed(),
        );
        Self { client, timeout }
    }

    /// Balance in lamports.
    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64, NetworkError> {
        self.client
            .get_balance(address)
            .await
            .map_err(|e| rpc_error("getBalance", self.timeout, e))
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash, NetworkError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| rpc_error("getLatestBlockhash", self.timeout, e))
    }

    /// Submits a signed transaction without preflight.
    pub async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, NetworkError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            ..Default::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| rpc_error("sendTransaction", self.timeout, e))
    }

    /// Polls until the signature is confirmed, fails on chain, or `timeout`
    /// elapses.
    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
    ) -> Result<(), OperationError> {
        let started = Instant::now();

        loop {
            match self
                .client
                .get_signature_status_with_commitment(signature, CommitmentConfig::confirmed())
                .await
            {
                Ok(Some(Ok(()))) => {
                    debug!("Transaction {} confirmed", signature);
                    return Ok(());
                }
                Ok(Some(Err(err))) => {
                    return Err(OperationError::Unconfirmed {
                        signature: signature.to_string(),
                        reason: format!("transaction failed: {}", err),
                    });
                }
                Ok(None) => debug!("Transaction {} not yet confirmed", signature),
                Err(e) => warn!("Status check for {} failed: {}", signature, e),
            }

            if started.elapsed() >= timeout {
                return Err(OperationError::Unconfirmed {
                    signature: signature.to_string(),
                    reason: format!("not confirmed within {}s", timeout.as_secs()),
                });
            }
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}
