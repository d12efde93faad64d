use crate::api::FlipnClient;
use async_trait::async_trait;
use core_logic::{shorten, DecodedKeypair, OperationExecutor, OperationReceipt, OperationResult};
use std::sync::Arc;
use tracing::debug;

/// Likes one project per (wallet, target) pair. Authenticates per call.
pub struct LikeExecutor {
    client: Arc<FlipnClient>,
}

impl LikeExecutor {
    pub fn new(client: Arc<FlipnClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OperationExecutor for LikeExecutor {
    fn name(&self) -> &str {
        "like"
    }

    async fn execute(&self, keypair: &DecodedKeypair, target: &str) -> OperationResult {
        let token = self.client.authenticate(keypair).await?;
        debug!("Liking {} as {}", target, keypair.address());

        let response = self.client.like_project(&token, target).await?;
        Ok(OperationReceipt::new(
            format!(
                "Wallet {} liked {}",
                shorten(keypair.address(), 10),
                shorten(target, 10)
            ),
            response,
        ))
    }
}
