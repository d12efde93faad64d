//! Batch operations run by `core_logic::BatchRunner`.

pub mod buy;
pub mod like;

pub use buy::{BuyExecutor, BuyParams};
pub use like::LikeExecutor;
