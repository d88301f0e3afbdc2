use thiserror::Error;

/// Errors raised by the order book, strategies, gateways and bot loop
#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient {token} balance: required {required}, available {available}")]
    InsufficientBalance {
        token: String,
        required: f64,
        available: f64,
    },

    #[error("Execution gateway error: {0}")]
    Gateway(String),

    #[error("Price oracle error: {0}")]
    Oracle(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown strategy type: {0}")]
    UnknownStrategy(String),

    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonParse(err.to_string())
    }
}

impl Error {
    /// Whether the error only blocks a single execution and the order may be retried later
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, Error::InsufficientBalance { .. })
    }
}

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;
