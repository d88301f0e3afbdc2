//! Strategy trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::order::{Order, OrderBook};

/// Strategy interface for trading logic
///
/// A strategy reacts to price ticks and to fills of orders it registered in the
/// [`OrderBook`]. It never owns orders itself: follow-up orders go into the book,
/// immediate market actions go through [`OrderBook::execute_order`].
///
/// # Lifecycle
///
/// 1. The bot loop calls `init` once with the first observed price
/// 2. On every tick where the price changed, the loop liquidates the book and calls
///    `order_liquidated` for each filled order, in fill order
/// 3. Then the loop calls `price_update`
#[async_trait]
pub trait Strategy: Send + Sync {
    /// One-time setup before the first tick
    async fn init(&mut self, book: &mut OrderBook, price: f64) -> Result<()>;

    /// Called once per tick with a changed price
    async fn price_update(&mut self, _book: &mut OrderBook, _price: f64, _price_change: f64) -> Result<()> {
        Ok(())
    }

    /// Called once per order removed from the book by a liquidation
    async fn order_liquidated(&mut self, _book: &mut OrderBook, _order: &Order) -> Result<()> {
        Ok(())
    }

    /// Strategy name, used for logging
    fn name(&self) -> &str {
        "unnamed_strategy"
    }

    /// Snapshot of the strategy's state and performance
    fn status(&self) -> StrategyStatus {
        StrategyStatus::new(self.name())
    }
}

/// Strategy state snapshot, logged by the bot loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyStatus {
    pub name: String,
    /// Realized profit in stable token
    pub realized_profit: f64,
    /// Completed trades (fills or round trips, depending on the strategy)
    pub trades: u32,
    /// Strategy specific fields
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub custom: serde_json::Value,
}

impl StrategyStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_profit(mut self, realized_profit: f64) -> Self {
        self.realized_profit = realized_profit;
        self
    }

    pub fn with_trades(mut self, trades: u32) -> Self {
        self.trades = trades;
        self
    }

    pub fn with_custom(mut self, custom: serde_json::Value) -> Self {
        self.custom = custom;
        self
    }
}
