//! Scalping - buy after a drop from the running high, sell once the round trip pays

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Strategy, StrategyFactory, StrategyStatus};
use crate::errors::{Error, Result};
use crate::order::{OrderBook, OrderSide, Token};

fn default_slippage() -> f64 {
    0.5
}

/// Scalping parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalpingConfig {
    /// Maximum number of entries
    #[serde(alias = "maxTrades")]
    pub max_trades: u32,
    /// Stable token spent per entry
    #[serde(alias = "buyPower")]
    pub buy_power: f64,
    /// Percent drop below the running high that triggers an entry
    #[serde(alias = "dropBeforeBuy")]
    pub drop_before_buy: f64,
    /// Percent tolerated between quoted and minimum accepted sell output
    #[serde(default = "default_slippage")]
    pub slippage: f64,
}

impl ScalpingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.buy_power > 0.0) {
            return Err(Error::InvalidConfig("buy_power must be positive".into()));
        }
        if !(self.drop_before_buy >= 0.0) {
            return Err(Error::InvalidConfig("drop_before_buy cannot be negative".into()));
        }
        if !(0.0..100.0).contains(&self.slippage) {
            return Err(Error::InvalidConfig("slippage must be in [0, 100)".into()));
        }
        Ok(())
    }
}

/// What the strategy is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalpingState {
    /// Flat, waiting for the entry drop
    Buy,
    /// Holding, waiting for a profitable exit
    Sell,
}

pub struct Scalping {
    config: ScalpingConfig,
    state: ScalpingState,
    high: f64,
    low: f64,
    trades: u32,
    buy_price: Option<f64>,
    /// Trade token bought by the last entry
    holding: f64,
    realized_profit: f64,
}

impl Scalping {
    pub fn new(config: ScalpingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: ScalpingState::Buy,
            high: 0.0,
            low: 0.0,
            trades: 0,
            buy_price: None,
            holding: 0.0,
            realized_profit: 0.0,
        })
    }

    pub fn state(&self) -> ScalpingState {
        self.state
    }

    pub fn trades(&self) -> u32 {
        self.trades
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    fn track_extremes(&mut self, price: f64) {
        if price > self.high {
            self.high = price;
            info!(
                "New high reached, low is {} which is a difference of {:.3}%",
                self.low,
                (self.high - self.low) / self.high * 100.0
            );
        } else if price < self.low {
            self.low = price;
            info!(
                "New low reached, high is {} which is a difference of {:.3}%",
                self.high,
                (self.high - self.low) / self.high * 100.0
            );
        }
    }

    async fn try_enter(&mut self, book: &mut OrderBook, price: f64) -> Result<()> {
        let target = self.high - self.high * self.config.drop_before_buy / 100.0;
        debug!("Current price is {} away from price target {}", price - target, target);

        if price >= target || self.trades >= self.config.max_trades {
            return Ok(());
        }

        let mut order = book.create_order(OrderSide::Buy, self.config.buy_power, None, None);
        book.execute_order(&mut order, price).await?;

        self.trades += 1;
        self.buy_price = Some(price);
        self.holding = order.amount_out().unwrap_or(0.0);
        self.state = ScalpingState::Sell;
        info!("Buy price is {} ({}/{} trades)", price, self.trades, self.config.max_trades);
        Ok(())
    }

    async fn try_exit(&mut self, book: &mut OrderBook, price: f64) -> Result<()> {
        let amount = if book.is_simulation() {
            self.holding
        } else {
            book.token_balance(Token::Trade).await?
        };
        if amount <= 0.0 {
            return Ok(());
        }

        let quoted = book.quote_amount_out(Token::Trade, amount, price).await?;
        let min_out = quoted * (1.0 - self.config.slippage / 100.0);
        debug!(
            "Min out would be {} which is {} away from buy power",
            min_out,
            self.config.buy_power - min_out
        );

        if min_out <= self.config.buy_power {
            return Ok(());
        }

        let mut order = book.create_order(OrderSide::Sell, amount, None, None);
        book.execute_order(&mut order, price).await?;

        let profit = order.amount_out().unwrap_or(0.0) - self.config.buy_power;
        self.realized_profit += profit;
        self.holding = 0.0;
        self.state = ScalpingState::Buy;
        info!(
            target: "profit",
            "Made {} profit with order {} (bought at {:?}, sold at {})",
            book.pair().format_amount(Token::Stable, profit),
            order.id(),
            self.buy_price,
            price
        );
        Ok(())
    }
}

#[async_trait]
impl Strategy for Scalping {
    async fn init(&mut self, _book: &mut OrderBook, price: f64) -> Result<()> {
        self.high = price;
        self.low = price;
        Ok(())
    }

    async fn price_update(&mut self, book: &mut OrderBook, price: f64, _price_change: f64) -> Result<()> {
        self.track_extremes(price);

        match self.state {
            ScalpingState::Buy => self.try_enter(book, price).await,
            ScalpingState::Sell => self.try_exit(book, price).await,
        }
    }

    fn name(&self) -> &str {
        "scalping"
    }

    fn status(&self) -> StrategyStatus {
        StrategyStatus::new(self.name())
            .with_profit(self.realized_profit)
            .with_trades(self.trades)
            .with_custom(json!({
                "state": self.state,
                "high": self.high,
                "low": self.low,
                "buy_price": self.buy_price,
                "max_trades": self.config.max_trades,
            }))
    }
}

pub struct ScalpingFactory;

impl StrategyFactory for ScalpingFactory {
    fn create(&self, params: HashMap<String, Value>) -> Result<Box<dyn Strategy>> {
        let config: ScalpingConfig = serde_json::from_value(Value::Object(params.into_iter().collect()))?;
        Ok(Box::new(Scalping::new(config)?))
    }
}
