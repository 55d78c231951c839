//! Error types shared across the Strand crates.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address {address}: {reason}")] Malformed { address: String, reason: String },
    #[error("address {address} is not valid for {network}")]
    WrongNetwork { address: String, network: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config source: {0}")] Source(String),
    #[error("invalid {field}: {reason}")] InvalidField { field: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error("coin source: {0}")] CoinSource(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Source(e.to_string())
    }
}
