//! Grid trading - a self-sustaining chain of limit orders over a fixed price range
//!
//! The range `[min, max]` is split into `grid_count` equal-width grids. At start the
//! strategy buys enough trade token to cover every grid above the current price and
//! places one limit SELL per grid above and one limit BUY per grid below. Every
//! filled limit SELL spawns a BUY one grid lower, every filled limit BUY spawns a
//! SELL one grid higher, so the grid stays populated as long as price stays in range.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Strategy, StrategyFactory, StrategyStatus};
use crate::errors::{Error, Result};
use crate::order::{Order, OrderBook, OrderSide, Token};

/// Price range covered by the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Grid trading parameters
///
/// Exactly one of `grid_margin` (grid width as percent of the range midpoint) or
/// `grid_count` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridTradingConfig {
    /// Subtract already held trade token from the initial buy
    #[serde(default)]
    pub rebalance: bool,
    pub range: PriceRange,
    #[serde(default, alias = "gridMargin")]
    pub grid_margin: Option<f64>,
    #[serde(default, alias = "gridCount")]
    pub grid_count: Option<u32>,
    /// Stable token committed to the whole grid
    #[serde(alias = "totalBuyPower")]
    pub total_buy_power: f64,
}

impl GridTradingConfig {
    pub fn validate(&self) -> Result<()> {
        let PriceRange { min, max } = self.range;
        if !(min > 0.0) {
            return Err(Error::InvalidConfig("range.min must be positive".into()));
        }
        if !(max > min) {
            return Err(Error::InvalidConfig("range.max must be greater than range.min".into()));
        }
        if !(self.total_buy_power > 0.0) {
            return Err(Error::InvalidConfig("total_buy_power must be positive".into()));
        }
        match (self.grid_margin, self.grid_count) {
            (Some(margin), None) if margin > 0.0 => Ok(()),
            (Some(_), None) => Err(Error::InvalidConfig("grid_margin must be positive".into())),
            (None, Some(count)) if count >= 1 => Ok(()),
            (None, Some(_)) => Err(Error::InvalidConfig("grid_count must be at least 1".into())),
            _ => Err(Error::InvalidConfig(
                "exactly one of grid_margin or grid_count must be set".into(),
            )),
        }
    }
}

/// Grid count and width derived from the configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub min: f64,
    pub max: f64,
    pub grid_count: u32,
    pub grid_width: f64,
}

impl GridGeometry {
    /// Derive the geometry; `config` must be valid
    ///
    /// With a margin the width is first estimated from the range midpoint, then
    /// recomputed so that `grid_count` grids tile the range exactly.
    pub fn from_config(config: &GridTradingConfig) -> Self {
        let PriceRange { min, max } = config.range;
        let grid_count = match (config.grid_count, config.grid_margin) {
            (Some(count), _) => count,
            (None, Some(margin)) => {
                let estimated_width = (min + max) / 2.0 * margin / 100.0;
                ((max - min) / estimated_width).ceil() as u32
            }
            (None, None) => 1,
        }
        .max(1);

        Self {
            min,
            max,
            grid_count,
            grid_width: (max - min) / grid_count as f64,
        }
    }

    /// Index of the grid containing `price`, clamped to `[0, grid_count]`
    pub fn current_grid(&self, price: f64) -> u32 {
        let grid = ((price - self.min) / self.grid_width).floor();
        if grid < 0.0 {
            warn!("Price {} is below the first grid", price);
            return 0;
        }
        if grid > self.grid_count as f64 {
            warn!("Price {} is above the last grid", price);
            return self.grid_count;
        }
        grid as u32
    }

    /// Lower bound price of `grid`
    pub fn grid_price(&self, grid: u32) -> f64 {
        self.min + grid as f64 * self.grid_width
    }
}

pub struct GridTrading {
    rebalance: bool,
    geometry: GridGeometry,
    buy_power_per_grid: f64,
    realized_profit: f64,
    filled_orders: u32,
    init_grid: Option<u32>,
}

impl GridTrading {
    pub fn new(config: GridTradingConfig) -> Result<Self> {
        config.validate()?;
        let geometry = GridGeometry::from_config(&config);
        Ok(Self {
            rebalance: config.rebalance,
            geometry,
            buy_power_per_grid: config.total_buy_power / geometry.grid_count as f64,
            realized_profit: 0.0,
            filled_orders: 0,
            init_grid: None,
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn buy_power_per_grid(&self) -> f64 {
        self.buy_power_per_grid
    }

    pub fn realized_profit(&self) -> f64 {
        self.realized_profit
    }
}

#[async_trait]
impl Strategy for GridTrading {
    async fn init(&mut self, book: &mut OrderBook, price: f64) -> Result<()> {
        let geometry = self.geometry;
        let pair = book.pair().clone();
        let decimals = pair.stable_decimals as usize;
        info!(
            "Created {} grids with size of {:.*} {} ({:.3}% - {:.3}%) and buy power per grid of {:.*} {}",
            geometry.grid_count,
            decimals,
            geometry.grid_width,
            pair.stable_symbol,
            geometry.grid_width / geometry.max * 100.0,
            geometry.grid_width / geometry.min * 100.0,
            decimals,
            self.buy_power_per_grid,
            pair.stable_symbol,
        );

        let current = geometry.current_grid(price);
        self.init_grid = Some(current);
        let sell_grids = geometry.grid_count - current;
        let total_amount = sell_grids as f64 * self.buy_power_per_grid;

        let held = if self.rebalance {
            book.token_balance(Token::Trade).await?
        } else {
            0.0
        };
        let amount = (total_amount - held * price).max(0.0);
        // trade token already in the wallet that the sells above may use
        let covered_by_holdings = (total_amount - amount) / price;

        let mut bought = 0.0;
        let mut reference = None;
        if amount > 0.0 {
            let mut order = book.create_order(OrderSide::Buy, amount, None, None);
            book.execute_order(&mut order, price).await?;
            bought = order.amount_out().unwrap_or(0.0);
            reference = Some(order.id());
        }

        if sell_grids > 0 {
            let per_grid = (bought + covered_by_holdings) / sell_grids as f64;
            if per_grid > 0.0 {
                for grid in current + 1..=geometry.grid_count {
                    let sell = book.create_order(OrderSide::Sell, per_grid, Some(geometry.grid_price(grid)), reference);
                    book.add_order(sell);
                }
            }
        }

        for grid in (0..current).rev() {
            let buy = book.create_order(OrderSide::Buy, self.buy_power_per_grid, Some(geometry.grid_price(grid)), None);
            book.add_order(buy);
        }

        Ok(())
    }

    async fn order_liquidated(&mut self, book: &mut OrderBook, order: &Order) -> Result<()> {
        self.filled_orders += 1;
        let width = self.geometry.grid_width;

        match order.side() {
            OrderSide::Sell => {
                let profit = order.amount_out().unwrap_or(0.0) - self.buy_power_per_grid;
                self.realized_profit += profit;
                info!(
                    target: "profit",
                    "Made {} profit with order {}",
                    book.pair().format_amount(Token::Stable, profit),
                    order.id()
                );
                if let Some(limit) = order.limit_price() {
                    let buy = book.create_order(OrderSide::Buy, self.buy_power_per_grid, Some(limit - width), None);
                    book.add_order(buy);
                }
            }
            OrderSide::Buy => {
                if let (Some(limit), Some(amount_out)) = (order.limit_price(), order.amount_out()) {
                    let sell = book.create_order(OrderSide::Sell, amount_out, Some(limit + width), Some(order.id()));
                    book.add_order(sell);
                }
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "grid_trading"
    }

    fn status(&self) -> StrategyStatus {
        StrategyStatus::new(self.name())
            .with_profit(self.realized_profit)
            .with_trades(self.filled_orders)
            .with_custom(json!({
                "min": self.geometry.min,
                "max": self.geometry.max,
                "grid_count": self.geometry.grid_count,
                "grid_width": self.geometry.grid_width,
                "buy_power_per_grid": self.buy_power_per_grid,
                "init_grid": self.init_grid,
            }))
    }
}

pub struct GridTradingFactory;

impl StrategyFactory for GridTradingFactory {
    fn create(&self, params: HashMap<String, Value>) -> Result<Box<dyn Strategy>> {
        let config: GridTradingConfig = serde_json::from_value(Value::Object(params.into_iter().collect()))?;
        Ok(Box::new(GridTrading::new(config)?))
    }
}
