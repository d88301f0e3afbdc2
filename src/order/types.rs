//! Core data types for orders

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Process-unique order identifier, assigned by the [`OrderBook`](super::OrderBook)
pub type OrderId = u64;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Token consumed by an order on this side
    pub fn token_in(&self) -> Token {
        match self {
            OrderSide::Buy => Token::Stable,
            OrderSide::Sell => Token::Trade,
        }
    }

    /// Token produced by an order on this side
    pub fn token_out(&self) -> Token {
        self.token_in().other()
    }
}

/// One of the two tokens of the traded pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    /// Quote token (e.g. USDC)
    Stable,
    /// Traded token (e.g. WMATIC)
    Trade,
}

impl Token {
    pub fn other(&self) -> Self {
        match self {
            Token::Stable => Token::Trade,
            Token::Trade => Token::Stable,
        }
    }
}

/// Symbols and decimals of the stable/trade pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub stable_symbol: String,
    pub stable_decimals: u32,
    pub trade_symbol: String,
    pub trade_decimals: u32,
}

impl TokenPair {
    pub fn new(
        stable_symbol: impl Into<String>,
        stable_decimals: u32,
        trade_symbol: impl Into<String>,
        trade_decimals: u32,
    ) -> Self {
        Self {
            stable_symbol: stable_symbol.into(),
            stable_decimals,
            trade_symbol: trade_symbol.into(),
            trade_decimals,
        }
    }

    pub fn symbol(&self, token: Token) -> &str {
        match token {
            Token::Stable => &self.stable_symbol,
            Token::Trade => &self.trade_symbol,
        }
    }

    pub fn decimals(&self, token: Token) -> u32 {
        match token {
            Token::Stable => self.stable_decimals,
            Token::Trade => self.trade_decimals,
        }
    }

    /// Round a price (stable per trade) to the stable token's precision
    pub fn round_price(&self, price: f64) -> f64 {
        let factor = 10f64.powi(self.stable_decimals as i32);
        (price * factor).round() / factor
    }

    /// Format an amount of `token` with its decimals and symbol
    pub fn format_amount(&self, token: Token, amount: f64) -> String {
        format!(
            "{:.*} {}",
            self.decimals(token) as usize,
            amount,
            self.symbol(token)
        )
    }
}

impl Default for TokenPair {
    fn default() -> Self {
        Self::new("USDC", 6, "WMATIC", 18)
    }
}

/// A trade intent plus its eventual fill
///
/// Orders are created through [`OrderBook::create_order`](super::OrderBook::create_order),
/// which assigns the id. `amount_out` and `execution_ref` are written only by the
/// order book when the order is filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    side: OrderSide,
    amount_in: f64,
    limit_price: Option<f64>,
    reference: Option<OrderId>,
    amount_out: Option<f64>,
    execution_ref: Option<String>,
}

impl Order {
    /// Create a new order
    ///
    /// `amount_in` must be positive; this is a caller precondition and is not checked
    /// outside debug builds.
    pub(crate) fn new(
        id: OrderId,
        side: OrderSide,
        amount_in: f64,
        limit_price: Option<f64>,
        reference: Option<OrderId>,
    ) -> Self {
        debug_assert!(amount_in > 0.0, "amount_in must be greater than 0");
        Self {
            id,
            side,
            amount_in,
            limit_price,
            reference,
            amount_out: None,
            execution_ref: None,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn token_in(&self) -> Token {
        self.side.token_in()
    }

    pub fn token_out(&self) -> Token {
        self.side.token_out()
    }

    pub fn amount_in(&self) -> f64 {
        self.amount_in
    }

    /// Limit price; `None` means a market order
    pub fn limit_price(&self) -> Option<f64> {
        self.limit_price
    }

    /// Id of the order whose fill produced or funds this one
    pub fn reference(&self) -> Option<OrderId> {
        self.reference
    }

    /// Realized output, set once the order is filled
    pub fn amount_out(&self) -> Option<f64> {
        self.amount_out
    }

    /// Transaction reference of a real fill; `None` for simulated fills
    pub fn execution_ref(&self) -> Option<&str> {
        self.execution_ref.as_deref()
    }

    pub fn is_market(&self) -> bool {
        self.limit_price.is_none()
    }

    pub fn is_filled(&self) -> bool {
        self.amount_out.is_some()
    }

    /// Matching rule: market orders are always eligible, a BUY is eligible at or below
    /// its limit and a SELL at or above it.
    pub fn is_eligible(&self, price: f64) -> bool {
        match (self.side, self.limit_price) {
            (_, None) => true,
            (OrderSide::Buy, Some(limit)) => price <= limit,
            (OrderSide::Sell, Some(limit)) => price >= limit,
        }
    }

    pub(crate) fn fill(&mut self, amount_out: f64, execution_ref: Option<String>) {
        debug_assert!(self.amount_out.is_none(), "order {} filled twice", self.id);
        self.amount_out = Some(amount_out);
        self.execution_ref = execution_ref;
    }

    /// Human readable description, e.g. `Nr 3: Sell 10.5 WMATIC @limit: 1.20 USDC. Ref Order: 1`
    pub fn describe(&self, pair: &TokenPair) -> String {
        let amount_in = pair.format_amount(self.token_in(), self.amount_in);
        let action = match self.side {
            OrderSide::Sell => format!("Sell {}", amount_in),
            OrderSide::Buy => format!("Buy {} for {}", pair.symbol(self.token_out()), amount_in),
        };
        let kind = match self.limit_price {
            None => "market".to_string(),
            Some(limit) => format!(
                "limit: {:.*} {}",
                pair.stable_decimals as usize, limit, pair.stable_symbol
            ),
        };
        match self.reference {
            Some(reference) => format!("Nr {}: {} @{}. Ref Order: {}", self.id, action, kind, reference),
            None => format!("Nr {}: {} @{}.", self.id, action, kind),
        }
    }
}

/// Observability record emitted once per fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
    pub order_id: OrderId,
    pub side: OrderSide,
    pub amount_in: f64,
    pub token_in: String,
    pub amount_out: f64,
    pub token_out: String,
    pub price: f64,
    /// Transaction reference, or `"simulation"` for simulated fills
    pub reference: String,
    pub time: String,
}

impl FillRecord {
    /// Build the record for a filled order; `None` if the order is not filled yet
    pub fn from_order(order: &Order, price: f64, pair: &TokenPair) -> Option<Self> {
        let amount_out = order.amount_out()?;
        Some(Self {
            order_id: order.id(),
            side: order.side(),
            amount_in: order.amount_in(),
            token_in: pair.symbol(order.token_in()).to_string(),
            amount_out,
            token_out: pair.symbol(order.token_out()).to_string(),
            price,
            reference: order
                .execution_ref()
                .unwrap_or("simulation")
                .to_string(),
            time: Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_follow_side() {
        let buy = Order::new(1, OrderSide::Buy, 100.0, None, None);
        assert_eq!(buy.token_in(), Token::Stable);
        assert_eq!(buy.token_out(), Token::Trade);

        let sell = Order::new(2, OrderSide::Sell, 5.0, Some(2.0), Some(1));
        assert_eq!(sell.token_in(), Token::Trade);
        assert_eq!(sell.token_out(), Token::Stable);
        assert_eq!(sell.reference(), Some(1));
    }

    #[test]
    fn test_matching_rule() {
        let market = Order::new(1, OrderSide::Sell, 1.0, None, None);
        assert!(market.is_eligible(0.01));
        assert!(market.is_eligible(1000.0));

        let buy = Order::new(2, OrderSide::Buy, 10.0, Some(1.5), None);
        assert!(buy.is_eligible(1.5));
        assert!(buy.is_eligible(1.2));
        assert!(!buy.is_eligible(1.51));

        let sell = Order::new(3, OrderSide::Sell, 10.0, Some(1.5), None);
        assert!(sell.is_eligible(1.5));
        assert!(sell.is_eligible(1.8));
        assert!(!sell.is_eligible(1.49));
    }

    #[test]
    fn test_fill_sets_output_once() {
        let mut order = Order::new(1, OrderSide::Buy, 100.0, None, None);
        assert!(!order.is_filled());
        assert!(order.amount_out().is_none());

        order.fill(66.0, Some("0xabc".to_string()));
        assert!(order.is_filled());
        assert_eq!(order.amount_out(), Some(66.0));
        assert_eq!(order.execution_ref(), Some("0xabc"));
    }

    #[test]
    fn test_describe() {
        let pair = TokenPair::new("USDC", 2, "WMATIC", 3);

        let buy = Order::new(4, OrderSide::Buy, 10.0, None, None);
        assert_eq!(buy.describe(&pair), "Nr 4: Buy WMATIC for 10.00 USDC @market.");

        let sell = Order::new(5, OrderSide::Sell, 2.5, Some(1.2), Some(4));
        assert_eq!(
            sell.describe(&pair),
            "Nr 5: Sell 2.500 WMATIC @limit: 1.20 USDC. Ref Order: 4"
        );
    }

    #[test]
    fn test_fill_record() {
        let pair = TokenPair::default();
        let mut order = Order::new(7, OrderSide::Sell, 2.0, None, None);
        assert!(FillRecord::from_order(&order, 1.5, &pair).is_none());

        order.fill(3.0, None);
        let record = FillRecord::from_order(&order, 1.5, &pair).unwrap();
        assert_eq!(record.order_id, 7);
        assert_eq!(record.token_in, "WMATIC");
        assert_eq!(record.token_out, "USDC");
        assert_eq!(record.reference, "simulation");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["side"], "SELL");
    }

    #[test]
    fn test_round_price() {
        let pair = TokenPair::new("USDC", 2, "WMATIC", 18);
        assert!((pair.round_price(1.23456) - 1.23).abs() < 1e-12);
        assert!((pair.round_price(1.235001) - 1.24).abs() < 1e-12);
    }
}
