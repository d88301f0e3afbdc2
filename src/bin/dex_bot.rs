//! DEX trading bot binary
//!
//! Runs a grid trading or scalping strategy against the paper engine.
//!
//! ```bash
//! cargo run --bin dex_bot -- config.toml
//! ```
//!
//! Any setting can be overridden from the environment or a `.env` file, e.g.
//! `APP_RUNNER__REFRESH_MS=1000` or `APP_MODE__SIMULATION=false`.

use log::{error, info};

use dex_trading_bot::config::Settings;
use dex_trading_bot::strategy::StrategyRegistry;
use dex_trading_bot::BotRunner;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    if !std::path::Path::new(&config_path).exists() {
        eprintln!("Config file '{}' not found. Please create one.", config_path);
        std::process::exit(1);
    }

    let settings = match Settings::new(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log.level.as_str())).init();
    match dotenv {
        Ok(path) => info!("Loaded environment from: {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let runner = match BotRunner::from_settings(&settings, &StrategyRegistry::with_defaults()) {
        Ok(runner) => runner,
        Err(e) => {
            error!("Failed to set up bot: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runner.run().await {
        error!("Bot execution error: {}", e);
        std::process::exit(1);
    }
}
