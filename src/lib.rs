pub mod config;
pub mod errors;
pub mod gateway;
pub mod order;
pub mod runner;
pub mod strategy;

pub use errors::{Error, Result};
pub use runner::BotRunner;
