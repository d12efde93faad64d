//! FlipN batch automation: API client, Solana RPC, transaction signing and
//! the like/buy executors driven by `core_logic::BatchRunner`.

pub mod api;
pub mod balance;
pub mod config;
pub mod executor;
pub mod rpc;
pub mod transaction;

pub use api::{FlipnClient, ProjectPage};
pub use config::FlipnConfig;
pub use executor::{BuyExecutor, BuyParams, LikeExecutor};
pub use rpc::SolanaRpc;
