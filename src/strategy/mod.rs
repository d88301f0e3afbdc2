//! Strategy Interface Module
//!
//! Strategies turn price ticks and fills into orders. They hold their own state
//! and act on the market only through the [`OrderBook`](crate::order::OrderBook)
//! they are handed on every call, so the bot loop stays the single owner of both.
//!
//! Two strategies ship with the crate:
//!
//! - [`GridTrading`]: a ladder of limit orders between a min and max price, every
//!   filled level is re-armed on the opposite side one grid away
//! - [`Scalping`]: buys after a drop from the running high and sells once the
//!   position can be closed above the amount spent
//!
//! # Example
//!
//! ```ignore
//! let registry = StrategyRegistry::with_defaults();
//! let mut strategy = registry.create_strategy("scalping", params)?;
//!
//! strategy.init(&mut book, price).await?;
//! for order in book.liquidate_orders(next_price).await {
//!     strategy.order_liquidated(&mut book, &order).await?;
//! }
//! strategy.price_update(&mut book, next_price, next_price - price).await?;
//! ```

pub mod grid;
pub mod registry;
pub mod scalping;
mod traits;

pub use grid::{GridGeometry, GridTrading, GridTradingConfig, PriceRange};
pub use registry::{StrategyFactory, StrategyRegistry};
pub use scalping::{Scalping, ScalpingConfig, ScalpingState};
pub use traits::{Strategy, StrategyStatus};
