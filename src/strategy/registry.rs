use std::collections::HashMap;

use serde_json::Value;

use super::grid::GridTradingFactory;
use super::scalping::ScalpingFactory;
use super::Strategy;
use crate::errors::{Error, Result};

/// Factory trait for creating strategies
pub trait StrategyFactory: Send + Sync {
    /// Create a new strategy instance from its configuration parameters
    fn create(&self, params: HashMap<String, Value>) -> Result<Box<dyn Strategy>>;
}

/// Registry for strategy factories
pub struct StrategyRegistry {
    factories: HashMap<String, Box<dyn StrategyFactory>>,
}

impl StrategyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in `grid_trading` and `scalping` strategies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("grid_trading", GridTradingFactory);
        registry.register("scalping", ScalpingFactory);
        registry
    }

    /// Register a strategy factory
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: StrategyFactory + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Create a strategy by name
    pub fn create_strategy(&self, name: &str, params: HashMap<String, Value>) -> Result<Box<dyn Strategy>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownStrategy(name.to_string()))?;
        factory.create(params)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_unknown_strategy() {
        let registry = StrategyRegistry::with_defaults();
        let err = registry.create_strategy("martingale", HashMap::new()).err().unwrap();
        assert!(matches!(err, Error::UnknownStrategy(name) if name == "martingale"));
    }

    #[test]
    fn test_create_defaults() {
        let registry = StrategyRegistry::default();

        let grid = registry
            .create_strategy(
                "grid_trading",
                params(json!({
                    "range": { "min": 1.0, "max": 2.0 },
                    "grid_margin": 10.0,
                    "total_buy_power": 100.0
                })),
            )
            .unwrap();
        assert_eq!(grid.name(), "grid_trading");

        let scalping = registry
            .create_strategy(
                "scalping",
                params(json!({ "max_trades": 3, "buy_power": 10.0, "drop_before_buy": 2.0 })),
            )
            .unwrap();
        assert_eq!(scalping.name(), "scalping");
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let registry = StrategyRegistry::with_defaults();
        let result = registry.create_strategy(
            "grid_trading",
            params(json!({ "range": { "min": 2.0, "max": 1.0 }, "grid_count": 4, "total_buy_power": 10.0 })),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));

        let result = registry.create_strategy("scalping", params(json!({ "buy_power": "lots" })));
        assert!(matches!(result, Err(Error::JsonParse(_))));
    }
}
