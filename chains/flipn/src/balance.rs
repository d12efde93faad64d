use crate::rpc::{lamports_to_sol, SolanaRpc};
use core_logic::{parse_public_key, WalletCredential};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::warn;

/// SOL balance of one wallet, or why it could not be read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Queries balances one by one. A bad address only fails its own entry.
pub async fn fetch_balances(rpc: &SolanaRpc, wallets: &[WalletCredential]) -> Vec<BalanceEntry> {
    let mut entries = Vec::with_capacity(wallets.len());

    for wallet in wallets {
        let public_key = wallet.public_key.clone();
        let outcome = match parse_public_key(&public_key) {
            Err(e) => Err(e.to_string()),
            Ok(bytes) => rpc
                .get_balance(&Pubkey::new_from_array(bytes))
                .await
                .map(lamports_to_sol)
                .map_err(|e| e.to_string()),
        };

        let entry = match outcome {
            Ok(sol) => BalanceEntry {
                public_key,
                balance: Some(sol),
                error: None,
            },
            Err(error) => {
                warn!("Balance lookup failed for {}: {}", public_key, error);
                BalanceEntry {
                    public_key,
                    balance: None,
                    error: Some(error),
                }
            }
        };
        entries.push(entry);
    }

    entries
}

/// Copies fetched balances onto the matching wallets. Returns how many changed.
pub fn apply_balances(wallets: &mut [WalletCredential], entries: &[BalanceEntry]) -> usize {
    let mut updated = 0;
    for entry in entries {
        let Some(balance) = entry.balance else {
            continue;
        };
        if let Some(wallet) = wallets.iter_mut().find(|w| w.public_key == entry.public_key) {
            wallet.balance = Some(balance);
            updated += 1;
        }
    }
    updated
}
