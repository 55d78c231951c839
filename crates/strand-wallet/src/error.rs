//! Wallet error types.

use bitcoin::OutPoint;
use strand_core::error::{AddressError, ConfigError, CoreError};
use thiserror::Error;

use crate::ownership::NotOwnedReason;

/// Errors that can occur in derivation, validation and building.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Malformed derivation path or an index outside the normal range.
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// BIP-32 derivation failure other than path syntax.
    #[error("key derivation: {0}")]
    KeyDerivation(String),

    /// A coin failed ownership validation against the account.
    #[error("coin {outpoint} does not belong to this account: {reason}")]
    ForeignCoin {
        /// The offending coin.
        outpoint: OutPoint,
        /// Why re-derivation rejected it.
        reason: NotOwnedReason,
    },

    /// Insufficient funds to cover the amount plus fees.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Validated input total in satoshis.
        have: u64,
        /// Amount plus estimated fee in satoshis.
        need: u64,
    },

    /// Destination address is malformed or for another network.
    #[error("invalid destination: {0}")]
    InvalidDestination(#[from] AddressError),

    /// Fee rate is not positive.
    #[error("invalid fee rate: {0}")]
    InvalidFeeRate(String),

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// No coins were offered for selection.
    #[error("no coins available")]
    NoCoins,

    /// Bad network parameters.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error reported by a coin source collaborator.
    #[error("coin source: {0}")]
    CoinSource(String),

    /// PSBT assembly failure.
    #[error("psbt: {0}")]
    Psbt(String),
}

impl From<CoreError> for WalletError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Address(a) => WalletError::InvalidDestination(a),
            CoreError::Config(c) => WalletError::Config(c),
            CoreError::CoinSource(s) => WalletError::CoinSource(s),
        }
    }
}

impl From<bitcoin::bip32::Error> for WalletError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        use bitcoin::bip32::Error as Bip32Error;
        match e {
            Bip32Error::InvalidChildNumber(_)
            | Bip32Error::InvalidChildNumberFormat
            | Bip32Error::InvalidDerivationPathFormat => WalletError::InvalidPath(e.to_string()),
            other => WalletError::KeyDerivation(other.to_string()),
        }
    }
}
