use settlement_engine::{SettlementError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No key service is configured. Set STL_TRANSIT_ADDR to the server that holds the transit key.")]
    NoKeyService,
    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidValue { name: &'static str, value: String, reason: String },
    #[error("{0} must be set for this command")]
    MissingValue(&'static str),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid configuration. {0}")]
    Config(#[from] ConfigError),
    #[error("Could not open the settlement database. {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Settlement(#[from] SettlementError),
    #[error("Invalid argument. {0}")]
    InvalidArgument(String),
    #[error("Could not format the result. {0}")]
    Output(#[from] serde_json::Error),
}
