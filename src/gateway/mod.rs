//! Execution Gateway and Price Oracle
//!
//! The order book and strategies never talk to a chain directly. Everything that
//! touches a wallet or a liquidity pool goes through these two traits:
//!
//! - [`ExecutionGateway`] - swaps, token balances and router quotes
//! - [`PriceOracle`] - the live stable/trade conversion rate
//!
//! The [`paper`] module provides in-process implementations of both, used by the
//! `dex_bot` binary and by the tests.

pub mod paper;

use async_trait::async_trait;

use crate::errors::Result;
use crate::order::{Order, Token};

pub use paper::{PaperExchange, ReplayPriceFeed};

/// Result of a real swap
#[derive(Debug, Clone, PartialEq)]
pub struct SwapReceipt {
    /// Realized amount of `order.token_out()`
    pub filled_amount: f64,
    /// Opaque execution reference (e.g. transaction hash)
    pub reference: String,
}

/// Swap execution and wallet queries
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Approve and swap `order.amount_in()` of `order.token_in()` into `order.token_out()`
    async fn swap(&self, order: &Order) -> Result<SwapReceipt>;

    /// Wallet balance of `token`
    async fn get_token_balance(&self, token: Token) -> Result<f64>;

    /// Expected output of swapping `amount_in` of `token_in`, before slippage
    async fn quote_amount_out(&self, token_in: Token, amount_in: f64) -> Result<f64>;
}

/// Source of the current conversion rate (stable per trade token)
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_current_price(&self) -> Result<f64>;
}
