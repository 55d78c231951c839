//! Networks, script kinds and the per-network constants the engine consumes.
//!
//! [`NetworkParams`] is the single bundle of configuration that flows into
//! account derivation, fee estimation and transaction building. It is
//! resolved once by the hosting application (see
//! [`EngineConfig`](crate::config::EngineConfig)) and never hardcoded per call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::error::ConfigError;

/// Network identifier determining address encoding and default coin type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet (`bc1...`).
    #[default]
    Mainnet,
    /// Public test network (`tb1...`).
    Testnet,
    /// Signet (`tb1...`).
    Signet,
    /// Local regression-test network (`bcrt1...`).
    Regtest,
}

impl Network {
    /// The equivalent `bitcoin` crate network.
    pub fn to_bitcoin(self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Signet => bitcoin::Network::Signet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }

    /// SLIP-44 coin type used when the configuration does not override it.
    pub fn default_coin_type(self) -> u32 {
        match self {
            Network::Mainnet => COIN_TYPE_MAINNET,
            _ => COIN_TYPE_TESTNET,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            other => Err(ConfigError::InvalidField {
                field: "network",
                reason: format!("unknown network {other:?}"),
            }),
        }
    }
}

/// Locking script family produced by an account's address chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptKind {
    /// P2PKH, BIP-44.
    Legacy,
    /// P2SH-wrapped P2WPKH, BIP-49.
    NestedSegwit,
    /// Native P2WPKH, BIP-84.
    #[default]
    NativeSegwit,
    /// Key-path-only P2TR, BIP-86.
    Taproot,
}

impl ScriptKind {
    /// BIP-43 purpose value conventionally paired with this script kind.
    pub fn purpose(self) -> u32 {
        match self {
            ScriptKind::Legacy => PURPOSE_LEGACY,
            ScriptKind::NestedSegwit => PURPOSE_NESTED_SEGWIT,
            ScriptKind::NativeSegwit => PURPOSE_NATIVE_SEGWIT,
            ScriptKind::Taproot => PURPOSE_TAPROOT,
        }
    }

    /// Smallest output value relay policy accepts for this script kind.
    pub fn default_dust_threshold(self) -> u64 {
        match self {
            ScriptKind::Legacy => DUST_P2PKH,
            ScriptKind::NestedSegwit => DUST_P2SH_P2WPKH,
            ScriptKind::NativeSegwit => DUST_P2WPKH,
            ScriptKind::Taproot => DUST_P2TR,
        }
    }

    /// Pre-signature size constants for spending and creating this script kind.
    pub fn default_sizes(self) -> TxSizeParams {
        match self {
            ScriptKind::Legacy => TxSizeParams {
                overhead_weight: OVERHEAD_WEIGHT_LEGACY,
                input_weight: INPUT_WEIGHT_P2PKH,
                output_weight: OUTPUT_WEIGHT_P2PKH,
            },
            ScriptKind::NestedSegwit => TxSizeParams {
                overhead_weight: OVERHEAD_WEIGHT_SEGWIT,
                input_weight: INPUT_WEIGHT_P2SH_P2WPKH,
                output_weight: OUTPUT_WEIGHT_P2SH,
            },
            ScriptKind::NativeSegwit => TxSizeParams {
                overhead_weight: OVERHEAD_WEIGHT_SEGWIT,
                input_weight: INPUT_WEIGHT_P2WPKH,
                output_weight: OUTPUT_WEIGHT_P2WPKH,
            },
            ScriptKind::Taproot => TxSizeParams {
                overhead_weight: OVERHEAD_WEIGHT_SEGWIT,
                input_weight: INPUT_WEIGHT_P2TR,
                output_weight: OUTPUT_WEIGHT_P2TR,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScriptKind::Legacy => "legacy",
            ScriptKind::NestedSegwit => "nested-segwit",
            ScriptKind::NativeSegwit => "native-segwit",
            ScriptKind::Taproot => "taproot",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "p2pkh" => Ok(ScriptKind::Legacy),
            "nested-segwit" | "p2sh-p2wpkh" => Ok(ScriptKind::NestedSegwit),
            "native-segwit" | "p2wpkh" => Ok(ScriptKind::NativeSegwit),
            "taproot" | "p2tr" => Ok(ScriptKind::Taproot),
            other => Err(ConfigError::InvalidField {
                field: "script_kind",
                reason: format!("unknown script kind {other:?}"),
            }),
        }
    }
}

/// Structural size constants used for pre-signature fee estimation.
///
/// Expressed in weight units so segwit discounts stay exact; the virtual
/// size of a transaction is `ceil(weight / 4)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSizeParams {
    /// Version, locktime, counts and (for segwit) marker + flag.
    pub overhead_weight: u64,
    /// One fully-signed input of the account's script kind.
    pub input_weight: u64,
    /// One output paying to the account's script kind.
    pub output_weight: u64,
}

impl Default for TxSizeParams {
    fn default() -> Self {
        ScriptKind::default().default_sizes()
    }
}

impl TxSizeParams {
    /// Reject constants that would make every estimate collapse to zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sizes.overhead_weight", self.overhead_weight),
            ("sizes.input_weight", self.input_weight),
            ("sizes.output_weight", self.output_weight),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidField {
                    field,
                    reason: "must be non-zero".into(),
                });
            }
        }
        Ok(())
    }
}

/// Per-network constants consumed by derivation, estimation and building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub network: Network,
    pub script_kind: ScriptKind,
    /// BIP-43 purpose, the first (hardened) path component.
    pub purpose: u32,
    /// SLIP-44 coin type, the second (hardened) path component.
    pub coin_type: u32,
    /// Change below this value is folded into the fee.
    pub dust_threshold: u64,
    pub sizes: TxSizeParams,
}

impl NetworkParams {
    /// Conventional parameters for a network and script kind.
    pub fn new(network: Network, script_kind: ScriptKind) -> Self {
        Self {
            network,
            script_kind,
            purpose: script_kind.purpose(),
            coin_type: network.default_coin_type(),
            dust_threshold: script_kind.default_dust_threshold(),
            sizes: script_kind.default_sizes(),
        }
    }

    /// Check that the path components fit in hardened derivation and that the
    /// size constants are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.purpose >= HARDENED_OFFSET {
            return Err(ConfigError::InvalidField {
                field: "purpose",
                reason: format!("{} must be below 2^31", self.purpose),
            });
        }
        if self.coin_type >= HARDENED_OFFSET {
            return Err(ConfigError::InvalidField {
                field: "coin_type",
                reason: format!("{} must be below 2^31", self.coin_type),
            });
        }
        self.sizes.validate()
    }

    pub fn bitcoin_network(&self) -> bitcoin::Network {
        self.network.to_bitcoin()
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::new(Network::default(), ScriptKind::default())
    }
}
