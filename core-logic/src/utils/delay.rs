//! # Core Logic - Delay Scheduling
//!
//! Wait durations inserted between wallets and between operations of one
//! wallet. Ranges are validated when the [`DelayConfig`] is built, so the
//! scheduler itself never fails.

use crate::config::{DelayConfig, DelayRange, OperationDelay};
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct DelayScheduler {
    config: DelayConfig,
}

impl DelayScheduler {
    pub fn new(config: DelayConfig) -> Self {
        Self { config }
    }

    /// Uniformly random wait in `[wallet.min, wallet.max]`.
    pub fn between_wallets(&self) -> Duration {
        Duration::from_millis(sample(&self.config.wallet, &mut rand::thread_rng()))
    }

    /// The fixed wait when configured, otherwise uniformly random in the
    /// operation range.
    pub fn between_operations(&self) -> Duration {
        match &self.config.operation {
            OperationDelay::Fixed(ms) => Duration::from_millis(*ms),
            OperationDelay::Range(range) => {
                Duration::from_millis(sample(range, &mut rand::thread_rng()))
            }
        }
    }
}

fn sample<R: Rng>(range: &DelayRange, rng: &mut R) -> u64 {
    if range.min_ms >= range.max_ms {
        return range.min_ms;
    }
    rng.gen_range(range.min_ms..=range.max_ms)
}
