use crate::config::DelayConfig;
use crate::error::ConfigError;
use crate::keys::{DecodedKeypair, KeyDecoder};
use crate::traits::{OperationExecutor, OperationReceipt};
use crate::utils::delay::DelayScheduler;
use crate::utils::wallet_manager::WalletCredential;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, error, info, warn, Instrument};

/// Outcome of one (wallet, target) attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub wallet: String,
    pub target: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated summary of a batch run.
///
/// `errors` holds exactly one entry per failure, so
/// `errors.len() == failed` always.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success: u64,
    pub failed: u64,
    pub errors: Vec<String>,
    pub details: Vec<AttemptRecord>,
}

impl BatchResult {
    pub fn total(&self) -> u64 {
        self.success + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            (self.success as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    fn record_success(&mut self, wallet: &str, target: &str, receipt: OperationReceipt) {
        self.success += 1;
        self.details.push(AttemptRecord {
            wallet: wallet.to_string(),
            target: target.to_string(),
            success: true,
            result: Some(receipt),
            error: None,
        });
    }

    fn record_failure(&mut self, wallet: &str, target: &str, message: String) {
        self.failed += 1;
        self.errors.push(message.clone());
        self.details.push(AttemptRecord {
            wallet: wallet.to_string(),
            target: target.to_string(),
            success: false,
            result: None,
            error: Some(message),
        });
    }

    fn record_wallet_failure(&mut self, message: String) {
        self.failed += 1;
        self.errors.push(message);
    }
}

/// Validated input for one batch run.
#[derive(Debug, Clone)]
pub struct BatchRequest<'a> {
    wallets: &'a [WalletCredential],
    targets: &'a [String],
    delays: DelayConfig,
}

impl<'a> BatchRequest<'a> {
    /// Rejects empty wallet or target lists, blank targets and invalid
    /// delay ranges before any work starts.
    pub fn new(
        wallets: &'a [WalletCredential],
        targets: &'a [String],
        delays: DelayConfig,
    ) -> Result<Self, ConfigError> {
        if wallets.is_empty() {
            return Err(ConfigError::EmptyInput {
                what: "wallets".to_string(),
            });
        }
        if targets.is_empty() {
            return Err(ConfigError::EmptyInput {
                what: "target tokens".to_string(),
            });
        }
        if let Some(pos) = targets.iter().position(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: format!("targets[{}]", pos),
                reason: "target identifier is empty".to_string(),
            });
        }
        delays.validate()?;

        Ok(Self {
            wallets,
            targets,
            delays,
        })
    }

    pub fn wallets(&self) -> &[WalletCredential] {
        self.wallets
    }

    pub fn targets(&self) -> &[String] {
        self.targets
    }

    pub fn delays(&self) -> &DelayConfig {
        &self.delays
    }
}

/// Sequential wallets x targets orchestrator shared by every batch kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRunner {
    decoder: KeyDecoder,
}

impl BatchRunner {
    pub fn new(decoder: KeyDecoder) -> Self {
        Self { decoder }
    }

    /// Runs every (wallet, target) pair in input order and returns the
    /// summary. Per-item failures are recorded, never propagated.
    pub async fn run<E>(&self, request: &BatchRequest<'_>, executor: &E) -> BatchResult
    where
        E: OperationExecutor + ?Sized,
    {
        let scheduler = DelayScheduler::new(request.delays);
        let mut result = BatchResult::default();
        let start_time = Instant::now();

        info!(
            "Starting batch {}: {} wallets x {} targets",
            executor.name(),
            request.wallets.len(),
            request.targets.len()
        );

        for (i, wallet) in request.wallets.iter().enumerate() {
            if i > 0 {
                let delay = scheduler.between_wallets();
                debug!("Waiting {:?} before next wallet...", delay);
                sleep(delay).await;
            }

            let span = tracing::info_span!("wallet", wallet_id = format!("{:03}", i + 1));
            self.run_wallet(wallet, request.targets, &scheduler, executor, &mut result)
                .instrument(span)
                .await;
        }

        info!(
            "Batch {} complete in {:.1}s | Success: {} | Failed: {} | Success Rate: {:.2}%",
            executor.name(),
            start_time.elapsed().as_secs_f64(),
            result.success,
            result.failed,
            result.success_rate()
        );

        result
    }

    async fn run_wallet<E>(
        &self,
        wallet: &WalletCredential,
        targets: &[String],
        scheduler: &DelayScheduler,
        executor: &E,
        result: &mut BatchResult,
    ) where
        E: OperationExecutor + ?Sized,
    {
        let keypair = match self.decoder.decode(&wallet.private_key) {
            Ok(keypair) => keypair,
            Err(e) => {
                let message = format!("Failed to process wallet {}: {}", wallet.public_key, e);
                error!(target: "batch_result", "{}", message);
                result.record_wallet_failure(message);
                return;
            }
        };
        warn_on_mismatch(wallet, &keypair);

        for (j, target) in targets.iter().enumerate() {
            if j > 0 {
                let delay = scheduler.between_operations();
                debug!("Waiting {:?} before next {}...", delay, executor.name());
                sleep(delay).await;
            }

            let started = Instant::now();
            match executor.execute(&keypair, target).await {
                Ok(receipt) => {
                    info!(
                        target: "batch_result",
                        "Success [{}] {} in {:.1}s",
                        executor.name(),
                        receipt.summary,
                        started.elapsed().as_secs_f64()
                    );
                    result.record_success(&wallet.public_key, target, receipt);
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        target: "batch_result",
                        "Failed [{}] wallet {} target {}: {} in {:.1}s",
                        executor.name(),
                        wallet.short_address(10),
                        target,
                        message,
                        started.elapsed().as_secs_f64()
                    );
                    result.record_failure(&wallet.public_key, target, message);
                }
            }
        }
    }
}

fn warn_on_mismatch(wallet: &WalletCredential, keypair: &DecodedKeypair) {
    if keypair.address() != wallet.public_key {
        warn!(
            "Wallet {} decodes to address {} (via {})",
            wallet.public_key,
            keypair.address(),
            keypair.source()
        );
    }
}
