//! Core value types: fee rates, address chains, account identity and the
//! caller-supplied coins the engine validates and spends.

use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint};
use bitcoin::{OutPoint, ScriptBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{EXTERNAL_CHAIN, FEE_RATE_SCALE, INTERNAL_CHAIN};
use crate::network::Network;

/// Fee rate in satoshis per 1000 virtual bytes.
///
/// Kept per-kvB so fractional sat/vB rates remain exact integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FeeRate(u64);

impl FeeRate {
    pub const ZERO: FeeRate = FeeRate(0);

    pub fn from_sat_per_kvb(sat_per_kvb: u64) -> Self {
        Self(sat_per_kvb)
    }

    /// Saturates rather than wrapping for absurd inputs.
    pub fn from_sat_per_vb(sat_per_vb: u64) -> Self {
        Self(sat_per_vb.saturating_mul(FEE_RATE_SCALE))
    }

    pub fn sat_per_kvb(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Fee for a transaction of `vsize` virtual bytes, rounded up.
    pub fn fee_for_vsize(&self, vsize: u64) -> u64 {
        let scale = FEE_RATE_SCALE as u128;
        let fee = (vsize as u128 * self.0 as u128).div_ceil(scale);
        u64::try_from(fee).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:03} sat/vB",
            self.0 / FEE_RATE_SCALE,
            self.0 % FEE_RATE_SCALE
        )
    }
}

/// One of the two address chains under an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Receiving addresses (`.../0/i`).
    External,
    /// Change addresses (`.../1/i`).
    Internal,
}

impl Chain {
    /// Path component for this chain.
    pub fn index(self) -> u32 {
        match self {
            Chain::External => EXTERNAL_CHAIN,
            Chain::Internal => INTERNAL_CHAIN,
        }
    }

    /// Look up a chain from its path component. Anything but 0 or 1 is `None`.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            EXTERNAL_CHAIN => Some(Chain::External),
            INTERNAL_CHAIN => Some(Chain::Internal),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::External => f.write_str("external"),
            Chain::Internal => f.write_str("internal"),
        }
    }
}

/// Identity of a derived account.
///
/// Two accounts are the same owner only when every field matches; in
/// particular the master fingerprint separates accounts from different seeds
/// even when their paths are identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId {
    pub network: Network,
    pub purpose: u32,
    pub coin_type: u32,
    pub account_index: u32,
    pub master_fingerprint: Fingerprint,
}

impl AccountId {
    /// `m/purpose'/coin_type'/account'`.
    pub fn base_path(&self) -> DerivationPath {
        DerivationPath::from(vec![
            ChildNumber::Hardened { index: self.purpose },
            ChildNumber::Hardened { index: self.coin_type },
            ChildNumber::Hardened { index: self.account_index },
        ])
    }

    /// Full path of an address: `base/chain/index`.
    pub fn address_path(&self, chain: Chain, index: u32) -> DerivationPath {
        self.base_path().extend([
            ChildNumber::Normal { index: chain.index() },
            ChildNumber::Normal { index },
        ])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}'/{}'/{}']",
            self.master_fingerprint, self.purpose, self.coin_type, self.account_index
        )
    }
}

/// A spendable output paired with the derivation path the caller claims
/// produced its locking script.
///
/// Supplied by an external indexer; the engine verifies the claim before
/// spending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCoin {
    pub outpoint: OutPoint,
    /// Value in satoshis.
    pub value: u64,
    pub script_pubkey: ScriptBuf,
    /// Full claimed path, e.g. `m/84'/0'/0'/0/5`.
    pub path: DerivationPath,
    /// Master fingerprint the indexer attributes the coin to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_fingerprint: Option<Fingerprint>,
}

impl WalletCoin {
    pub fn new(
        outpoint: OutPoint,
        value: u64,
        script_pubkey: ScriptBuf,
        path: DerivationPath,
    ) -> Self {
        Self {
            outpoint,
            value,
            script_pubkey,
            path,
            master_fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.master_fingerprint = Some(fingerprint);
        self
    }
}
