//! Order book - holds open conditional orders and executes them as price moves

use std::sync::Arc;

use log::{error, info, warn};

use super::types::{FillRecord, Order, OrderId, OrderSide, Token, TokenPair};
use crate::errors::{Error, Result};
use crate::gateway::ExecutionGateway;

/// Working set of open orders plus the execution path for fills
///
/// The book is the only place that assigns order ids, removes open orders or
/// writes fill results. It is owned by the bot loop, one tick at a time.
pub struct OrderBook {
    open_orders: Vec<Order>,
    gateway: Arc<dyn ExecutionGateway>,
    pair: TokenPair,
    simulation: bool,
    next_id: OrderId,
}

impl OrderBook {
    /// Create an empty book
    ///
    /// In `simulation` mode fills are computed arithmetically and the gateway is
    /// only used for balance queries.
    pub fn new(gateway: Arc<dyn ExecutionGateway>, pair: TokenPair, simulation: bool) -> Self {
        Self {
            open_orders: Vec::new(),
            gateway,
            pair,
            simulation,
            next_id: 1,
        }
    }

    pub fn pair(&self) -> &TokenPair {
        &self.pair
    }

    pub fn is_simulation(&self) -> bool {
        self.simulation
    }

    /// Open orders in insertion order
    pub fn open_orders(&self) -> &[Order] {
        &self.open_orders
    }

    pub fn len(&self) -> usize {
        self.open_orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_orders.is_empty()
    }

    /// Create a new order with the next id. The order is not registered.
    pub fn create_order(
        &mut self,
        side: OrderSide,
        amount_in: f64,
        limit_price: Option<f64>,
        reference: Option<OrderId>,
    ) -> Order {
        let id = self.next_id;
        self.next_id += 1;
        let order = Order::new(id, side, amount_in, limit_price, reference);
        info!("Created order {}", order.describe(&self.pair));
        order
    }

    /// Register an order in the open set
    pub fn add_order(&mut self, order: Order) {
        self.open_orders.push(order);
    }

    /// Execute one order regardless of its limit
    ///
    /// Real executions first check the wallet balance of `token_in`; a shortfall
    /// returns [`Error::InsufficientBalance`] and the order stays unfilled. The
    /// order is not removed from any set.
    pub async fn execute_order(&self, order: &mut Order, price: f64) -> Result<()> {
        if self.simulation {
            let amount_out = match order.token_out() {
                Token::Trade => order.amount_in() / price,
                Token::Stable => order.amount_in() * price,
            };
            order.fill(amount_out, None);
        } else {
            let available = self.gateway.get_token_balance(order.token_in()).await?;
            if available < order.amount_in() {
                return Err(Error::InsufficientBalance {
                    token: self.pair.symbol(order.token_in()).to_string(),
                    required: order.amount_in(),
                    available,
                });
            }
            let receipt = self.gateway.swap(order).await?;
            order.fill(receipt.filled_amount, Some(receipt.reference));
        }

        self.log_fill(order, price);
        Ok(())
    }

    /// Execute and remove every open order eligible at `price`
    ///
    /// Eligible BUY orders run first, then eligible SELL orders, each group in
    /// insertion order. Executions are strictly sequential. An order whose
    /// execution fails stays open; after a failure other than an insufficient
    /// balance no further orders are executed this round.
    pub async fn liquidate_orders(&mut self, price: f64) -> Vec<Order> {
        let eligible = self.eligible_order_ids(price);
        let mut filled = Vec::with_capacity(eligible.len());

        for id in eligible {
            let Some(index) = self.open_orders.iter().position(|o| o.id() == id) else {
                continue;
            };

            let mut order = self.open_orders.remove(index);
            match self.execute_order(&mut order, price).await {
                Ok(()) => filled.push(order),
                Err(e) if e.is_insufficient_balance() => {
                    warn!("Keeping order {} open: {}", order.id(), e);
                    self.open_orders.insert(index, order);
                }
                Err(e) => {
                    error!("Execution of order {} failed: {}", order.id(), e);
                    self.open_orders.insert(index, order);
                    break;
                }
            }
        }

        filled
    }

    /// Wallet balance of `token` as reported by the gateway
    pub async fn token_balance(&self, token: Token) -> Result<f64> {
        self.gateway.get_token_balance(token).await
    }

    /// Expected output of swapping `amount_in` of `token_in` at `price`
    ///
    /// Uses the gateway quote for real execution and plain conversion in simulation.
    pub async fn quote_amount_out(&self, token_in: Token, amount_in: f64, price: f64) -> Result<f64> {
        if self.simulation {
            return Ok(match token_in {
                Token::Stable => amount_in / price,
                Token::Trade => amount_in * price,
            });
        }
        self.gateway.quote_amount_out(token_in, amount_in).await
    }

    fn eligible_order_ids(&self, price: f64) -> Vec<OrderId> {
        let buys = self
            .open_orders
            .iter()
            .filter(|o| o.side() == OrderSide::Buy && o.is_eligible(price));
        let sells = self
            .open_orders
            .iter()
            .filter(|o| o.side() == OrderSide::Sell && o.is_eligible(price));
        buys.chain(sells).map(|o| o.id()).collect()
    }

    fn log_fill(&self, order: &Order, price: f64) {
        if let Some(record) = FillRecord::from_order(order, price, &self.pair) {
            match serde_json::to_string(&record) {
                Ok(line) => info!(target: "fills", "{}", line),
                Err(e) => warn!("Could not serialize fill of order {}: {}", order.id(), e),
            }
        }
    }
}
