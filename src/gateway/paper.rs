//! Paper trading gateway and replayed price feed
//!
//! `PaperExchange` keeps stable/trade balances in memory and fills swaps at the
//! current price minus a fee. `ReplayPriceFeed` cycles through a fixed price path
//! and publishes every price it returns to the exchange it was built for, so both
//! sides always agree on the conversion rate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use super::{ExecutionGateway, PriceOracle, SwapReceipt};
use crate::errors::{Error, Result};
use crate::order::{Order, OrderId, Token};

/// Convert `amount_in` of `token_in` at `price` (stable per trade)
fn convert(token_in: Token, amount_in: f64, price: f64) -> f64 {
    match token_in {
        Token::Stable => amount_in / price,
        Token::Trade => amount_in * price,
    }
}

/// In-memory exchange with simulated balances
pub struct PaperExchange {
    price: Arc<Mutex<f64>>,
    balances: Mutex<HashMap<Token, f64>>,
    fee_percent: f64,
    executed: Mutex<Vec<OrderId>>,
    next_ref: AtomicU64,
    should_fail: Mutex<bool>,
}

impl PaperExchange {
    pub fn new(price: f64, stable_balance: f64, trade_balance: f64) -> Self {
        let balances = HashMap::from([(Token::Stable, stable_balance), (Token::Trade, trade_balance)]);
        Self {
            price: Arc::new(Mutex::new(price)),
            balances: Mutex::new(balances),
            fee_percent: 0.0,
            executed: Mutex::new(Vec::new()),
            next_ref: AtomicU64::new(1),
            should_fail: Mutex::new(false),
        }
    }

    /// Builder: charge `fee_percent` of the output on every swap
    pub fn with_fee(mut self, fee_percent: f64) -> Self {
        self.fee_percent = fee_percent;
        self
    }

    /// Shared price cell, written by [`ReplayPriceFeed`]
    pub fn price_handle(&self) -> Arc<Mutex<f64>> {
        self.price.clone()
    }

    pub async fn set_price(&self, price: f64) {
        *self.price.lock().await = price;
    }

    pub async fn set_balance(&self, token: Token, amount: f64) {
        self.balances.lock().await.insert(token, amount);
    }

    pub async fn balance(&self, token: Token) -> f64 {
        self.balances.lock().await.get(&token).copied().unwrap_or(0.0)
    }

    pub async fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock().await = fail;
    }

    /// Ids of the orders swapped so far, in execution order
    pub async fn executed_orders(&self) -> Vec<OrderId> {
        self.executed.lock().await.clone()
    }

    fn apply_fee(&self, amount: f64) -> f64 {
        amount * (1.0 - self.fee_percent / 100.0)
    }

    async fn current_price(&self) -> Result<f64> {
        let price = *self.price.lock().await;
        if price <= 0.0 {
            return Err(Error::Gateway(format!("No valid price to trade at: {}", price)));
        }
        Ok(price)
    }
}

#[async_trait]
impl ExecutionGateway for PaperExchange {
    async fn swap(&self, order: &Order) -> Result<SwapReceipt> {
        if *self.should_fail.lock().await {
            return Err(Error::Gateway("Paper exchange failure".into()));
        }

        let price = self.current_price().await?;
        let mut balances = self.balances.lock().await;

        let available = balances.get(&order.token_in()).copied().unwrap_or(0.0);
        if order.amount_in() > available {
            return Err(Error::InsufficientBalance {
                token: format!("{:?}", order.token_in()),
                required: order.amount_in(),
                available,
            });
        }

        let filled_amount = self.apply_fee(convert(order.token_in(), order.amount_in(), price));
        *balances.entry(order.token_in()).or_insert(0.0) -= order.amount_in();
        *balances.entry(order.token_out()).or_insert(0.0) += filled_amount;
        drop(balances);

        self.executed.lock().await.push(order.id());
        let n = self.next_ref.fetch_add(1, Ordering::SeqCst);
        debug!("Paper swap #{} for order {} at {}", n, order.id(), price);

        Ok(SwapReceipt {
            filled_amount,
            reference: format!("0x{:064x}", n),
        })
    }

    async fn get_token_balance(&self, token: Token) -> Result<f64> {
        Ok(self.balance(token).await)
    }

    async fn quote_amount_out(&self, token_in: Token, amount_in: f64) -> Result<f64> {
        let price = self.current_price().await?;
        Ok(self.apply_fee(convert(token_in, amount_in, price)))
    }
}

/// Price oracle replaying a fixed path, wrapping around at the end
pub struct ReplayPriceFeed {
    prices: Vec<f64>,
    cursor: AtomicUsize,
    decimals: u32,
    published: Option<Arc<Mutex<f64>>>,
}

impl ReplayPriceFeed {
    /// `decimals` is the stable token precision every price is rounded to
    pub fn new(prices: Vec<f64>, decimals: u32) -> Result<Self> {
        if prices.is_empty() {
            return Err(Error::InvalidConfig("price path cannot be empty".into()));
        }
        if prices.iter().any(|p| *p <= 0.0 || !p.is_finite()) {
            return Err(Error::InvalidConfig("price path must only contain positive prices".into()));
        }
        Ok(Self {
            prices,
            cursor: AtomicUsize::new(0),
            decimals,
            published: None,
        })
    }

    /// Builder: publish every returned price to `exchange`
    pub fn publishing_to(mut self, exchange: &PaperExchange) -> Self {
        self.published = Some(exchange.price_handle());
        self
    }

    fn round(&self, price: f64) -> f64 {
        let factor = 10f64.powi(self.decimals as i32);
        (price * factor).round() / factor
    }
}

#[async_trait]
impl PriceOracle for ReplayPriceFeed {
    async fn get_current_price(&self) -> Result<f64> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.prices.len();
        let price = self.round(self.prices[index]);
        if let Some(cell) = &self.published {
            *cell.lock().await = price;
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderSide;

    #[tokio::test]
    async fn test_swap_moves_balances() {
        let exchange = PaperExchange::new(2.0, 100.0, 0.0);
        let order = Order::new(1, OrderSide::Buy, 50.0, None, None);

        let receipt = exchange.swap(&order).await.unwrap();
        assert!((receipt.filled_amount - 25.0).abs() < 1e-9);
        assert!(receipt.reference.starts_with("0x"));
        assert!((exchange.balance(Token::Stable).await - 50.0).abs() < 1e-9);
        assert!((exchange.balance(Token::Trade).await - 25.0).abs() < 1e-9);
        assert_eq!(exchange.executed_orders().await, vec![1]);
    }

    #[tokio::test]
    async fn test_swap_rejects_overdraw() {
        let exchange = PaperExchange::new(2.0, 10.0, 0.0);
        let order = Order::new(1, OrderSide::Buy, 50.0, None, None);

        let err = exchange.swap(&order).await.unwrap_err();
        assert!(err.is_insufficient_balance());
        assert!((exchange.balance(Token::Stable).await - 10.0).abs() < 1e-9);
        assert!(exchange.executed_orders().await.is_empty());
    }

    #[tokio::test]
    async fn test_fee_applies_to_quote_and_swap() {
        let exchange = PaperExchange::new(2.0, 0.0, 10.0).with_fee(1.0);
        let quote = exchange.quote_amount_out(Token::Trade, 10.0).await.unwrap();
        assert!((quote - 19.8).abs() < 1e-9);

        let order = Order::new(1, OrderSide::Sell, 10.0, None, None);
        let receipt = exchange.swap(&order).await.unwrap();
        assert!((receipt.filled_amount - quote).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let exchange = PaperExchange::new(2.0, 100.0, 0.0);
        exchange.set_should_fail(true).await;
        let order = Order::new(1, OrderSide::Buy, 10.0, None, None);
        assert!(matches!(exchange.swap(&order).await, Err(Error::Gateway(_))));
    }

    #[tokio::test]
    async fn test_replay_feed_cycles_and_publishes() {
        let exchange = PaperExchange::new(0.0, 0.0, 0.0);
        let feed = ReplayPriceFeed::new(vec![1.234, 1.5], 2)
            .unwrap()
            .publishing_to(&exchange);

        assert!((feed.get_current_price().await.unwrap() - 1.23).abs() < 1e-12);
        assert!((*exchange.price_handle().lock().await - 1.23).abs() < 1e-12);
        assert!((feed.get_current_price().await.unwrap() - 1.5).abs() < 1e-12);
        assert!((feed.get_current_price().await.unwrap() - 1.23).abs() < 1e-12);
    }

    #[test]
    fn test_replay_feed_rejects_bad_path() {
        assert!(ReplayPriceFeed::new(vec![], 2).is_err());
        assert!(ReplayPriceFeed::new(vec![1.0, -1.0], 2).is_err());
    }
}
