//! Bot runner - the tick loop driving the order book and the strategy

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::Settings;
use crate::errors::Result;
use crate::gateway::{ExecutionGateway, PaperExchange, PriceOracle, ReplayPriceFeed};
use crate::order::{OrderBook, Token};
use crate::strategy::{Strategy, StrategyRegistry};

/// Single owner of the order book and the strategy
///
/// One tick runs to completion before the next one starts, so neither needs locking.
pub struct BotRunner {
    book: OrderBook,
    strategy: Box<dyn Strategy>,
    oracle: Arc<dyn PriceOracle>,
    refresh: Duration,
    last_price: Option<f64>,
}

impl BotRunner {
    pub fn new(
        book: OrderBook,
        strategy: Box<dyn Strategy>,
        oracle: Arc<dyn PriceOracle>,
        refresh: Duration,
    ) -> Self {
        Self {
            book,
            strategy,
            oracle,
            refresh,
            last_price: None,
        }
    }

    /// Wire a runner on the paper engine from loaded settings
    pub fn from_settings(settings: &Settings, registry: &StrategyRegistry) -> Result<Self> {
        let paper = &settings.paper;
        let exchange = Arc::new(
            PaperExchange::new(0.0, paper.initial_stable, paper.initial_trade).with_fee(paper.fee_percent),
        );
        let oracle = ReplayPriceFeed::new(paper.prices.clone(), settings.pair.stable_decimals)?
            .publishing_to(&exchange);

        let strategy = registry.create_strategy(&settings.strategy.type_name, settings.strategy.params.clone())?;
        info!(
            "Strategy '{}' created for {}/{} (simulation: {})",
            strategy.name(),
            settings.pair.trade_symbol,
            settings.pair.stable_symbol,
            settings.mode.simulation
        );

        let gateway: Arc<dyn ExecutionGateway> = exchange;
        let book = OrderBook::new(gateway, settings.pair.clone(), settings.mode.simulation);
        Ok(Self::new(
            book,
            strategy,
            Arc::new(oracle),
            Duration::from_millis(settings.runner.refresh_ms),
        ))
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    /// Await the first price and let the strategy set itself up
    pub async fn init(&mut self) -> Result<()> {
        let price = self.oracle.get_current_price().await?;
        info!("Initial price is {}", price);
        self.strategy.init(&mut self.book, price).await?;
        self.last_price = Some(price);
        self.log_balances().await;
        Ok(())
    }

    /// Run one tick, returns the number of filled orders
    ///
    /// Nothing happens when the price did not change since the last tick.
    pub async fn tick(&mut self) -> Result<usize> {
        let price = self.oracle.get_current_price().await?;
        let change = match self.last_price {
            Some(last) if last == price => return Ok(0),
            Some(last) => price - last,
            None => 0.0,
        };
        debug!("Price changed by {} to {}", change, price);
        self.last_price = Some(price);

        let filled = self.book.liquidate_orders(price).await;
        for order in &filled {
            self.strategy.order_liquidated(&mut self.book, order).await?;
        }
        self.strategy.price_update(&mut self.book, price, change).await?;

        if !filled.is_empty() {
            match serde_json::to_string(&self.strategy.status()) {
                Ok(status) => info!("{} order(s) filled, status: {}", filled.len(), status),
                Err(e) => warn!("Could not serialize strategy status: {}", e),
            }
        }
        Ok(filled.len())
    }

    /// Initialise, then tick every `refresh` until Ctrl-C
    pub async fn run(mut self) -> Result<()> {
        self.init().await?;
        info!(
            "Bot started with strategy '{}', refreshing every {:?}",
            self.strategy.name(),
            self.refresh
        );

        loop {
            if let Err(e) = self.tick().await {
                error!("Tick failed: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.refresh) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.log_balances().await;
        info!("Final status: {:?}", self.strategy.status());
        Ok(())
    }

    async fn log_balances(&self) {
        let pair = self.book.pair();
        match (
            self.book.token_balance(Token::Stable).await,
            self.book.token_balance(Token::Trade).await,
        ) {
            (Ok(stable), Ok(trade)) => info!(
                "Balances: {} / {}",
                pair.format_amount(Token::Stable, stable),
                pair.format_amount(Token::Trade, trade)
            ),
            (Err(e), _) | (_, Err(e)) => warn!("Could not read balances: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::order::TokenPair;
    use crate::strategy::{GridTrading, GridTradingConfig, PriceRange};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn grid() -> Box<dyn Strategy> {
        Box::new(
            GridTrading::new(GridTradingConfig {
                rebalance: false,
                range: PriceRange { min: 1.0, max: 2.0 },
                grid_margin: None,
                grid_count: Some(4),
                total_buy_power: 100.0,
            })
            .unwrap(),
        )
    }

    fn runner(prices: Vec<f64>, simulation: bool) -> (BotRunner, Arc<PaperExchange>) {
        let exchange = Arc::new(PaperExchange::new(0.0, 1_000.0, 0.0));
        let oracle = ReplayPriceFeed::new(prices, 6).unwrap().publishing_to(&exchange);
        let book = OrderBook::new(exchange.clone(), TokenPair::default(), simulation);
        let runner = BotRunner::new(book, grid(), Arc::new(oracle), Duration::from_millis(1));
        (runner, exchange)
    }

    #[tokio::test]
    async fn test_init_uses_first_price() {
        let (mut runner, _) = runner(vec![1.6, 1.75], true);
        runner.init().await.unwrap();
        assert_eq!(runner.last_price(), Some(1.6));
        assert_eq!(runner.book().len(), 4);
    }

    #[tokio::test]
    async fn test_unchanged_price_is_skipped() {
        let (mut runner, _) = runner(vec![1.6, 1.6, 1.75], true);
        runner.init().await.unwrap();
        assert_eq!(runner.tick().await.unwrap(), 0);
        assert_eq!(runner.tick().await.unwrap(), 1);
        assert_eq!(runner.strategy().status().trades, 1);
        assert_eq!(runner.book().len(), 4);
    }

    #[tokio::test]
    async fn test_real_fills_move_paper_balances() {
        let (mut runner, exchange) = runner(vec![1.6, 1.75, 1.5, 1.75], false);
        runner.init().await.unwrap();
        let after_init = exchange.balance(Token::Stable).await;
        assert!((after_init - 950.0).abs() < 1e-9);

        for _ in 0..3 {
            assert_eq!(runner.tick().await.unwrap(), 1);
        }
        assert!(exchange.balance(Token::Stable).await > after_init);
        assert!(runner.strategy().status().realized_profit > 0.0);
        assert_eq!(exchange.executed_orders().await.len(), 4);
    }

    struct FailingOracle {
        failed: AtomicBool,
    }

    #[async_trait]
    impl PriceOracle for FailingOracle {
        async fn get_current_price(&self) -> Result<f64> {
            if self.failed.swap(true, Ordering::SeqCst) {
                Err(Error::Oracle("node unreachable".into()))
            } else {
                Ok(1.6)
            }
        }
    }

    #[tokio::test]
    async fn test_oracle_failure_fails_the_tick_only() {
        let exchange = Arc::new(PaperExchange::new(1.6, 1_000.0, 0.0));
        let book = OrderBook::new(exchange, TokenPair::default(), true);
        let oracle = Arc::new(FailingOracle {
            failed: AtomicBool::new(false),
        });
        let mut runner = BotRunner::new(book, grid(), oracle, Duration::from_millis(1));

        runner.init().await.unwrap();
        assert!(matches!(runner.tick().await, Err(Error::Oracle(_))));
        assert_eq!(runner.last_price(), Some(1.6));
        assert_eq!(runner.book().len(), 4);
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings::from_toml(
            r#"
            [strategy]
            type = "scalping"
            params = { max_trades = 2, buy_power = 10.0, drop_before_buy = 1.0 }

            [paper]
            prices = [1.0, 0.98]
            "#,
        )
        .unwrap();
        let runner = BotRunner::from_settings(&settings, &StrategyRegistry::with_defaults()).unwrap();
        assert_eq!(runner.strategy().name(), "scalping");
        assert!(runner.book().is_simulation());

        let mut empty = settings.clone();
        empty.paper.prices.clear();
        assert!(matches!(
            BotRunner::from_settings(&empty, &StrategyRegistry::with_defaults()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
