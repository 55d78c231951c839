//! Engine configuration loaded from a TOML file and `STRAND__*` environment
//! variables.
//!
//! Every override is optional; missing values resolve to the conventions in
//! [`NetworkParams::new`]. Example file:
//!
//! ```toml
//! network = "testnet"
//! script_kind = "native-segwit"
//! dust_threshold = 330
//!
//! [sizes]
//! overhead_weight = 42
//! input_weight = 272
//! output_weight = 124
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;
use crate::network::{Network, NetworkParams, ScriptKind, TxSizeParams};

/// Prefix for environment overrides, e.g. `STRAND__NETWORK=regtest`.
pub const ENV_PREFIX: &str = "STRAND";

/// Raw, partially-specified engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub script_kind: ScriptKind,
    pub purpose: Option<u32>,
    pub coin_type: Option<u32>,
    pub dust_threshold: Option<u64>,
    pub sizes: Option<TxSizeParams>,
}

impl EngineConfig {
    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!("loading engine config from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse configuration from a TOML string, ignoring the environment.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Fill defaults and validate.
    pub fn resolve(&self) -> Result<NetworkParams, ConfigError> {
        let defaults = NetworkParams::new(self.network, self.script_kind);
        let params = NetworkParams {
            purpose: self.purpose.unwrap_or(defaults.purpose),
            coin_type: self.coin_type.unwrap_or(defaults.coin_type),
            dust_threshold: self.dust_threshold.unwrap_or(defaults.dust_threshold),
            sizes: self.sizes.unwrap_or(defaults.sizes),
            ..defaults
        };
        params.validate()?;
        Ok(params)
    }
}
