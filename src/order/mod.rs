//! Orders and the order book
//!
//! An [`Order`] is a trade intent on the single stable/trade pair. Orders without a
//! limit are market orders and fill on the next liquidation; orders with a limit
//! wait in the [`OrderBook`] until price crosses it in their favour.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dex_trading_bot::gateway::PaperExchange;
//! use dex_trading_bot::order::{OrderBook, OrderSide, TokenPair};
//!
//! # tokio_test_block_on(async {
//! let exchange = Arc::new(PaperExchange::new(1.5, 1_000.0, 0.0));
//! let mut book = OrderBook::new(exchange, TokenPair::default(), true);
//!
//! let order = book.create_order(OrderSide::Buy, 100.0, Some(1.4), None);
//! book.add_order(order);
//!
//! assert!(book.liquidate_orders(1.5).await.is_empty());
//! let filled = book.liquidate_orders(1.4).await;
//! assert_eq!(filled.len(), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

mod book;
mod types;

pub use book::OrderBook;
pub use types::{FillRecord, Order, OrderId, OrderSide, Token, TokenPair};
