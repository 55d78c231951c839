//! Trait interfaces for the collaborators around the engine.
//!
//! - [`CoinSource`] — chain indexer that reports candidate coins for an account

use crate::error::CoreError;
use crate::types::{AccountId, WalletCoin};

/// Read-only view of an external chain indexer.
///
/// Implementations report the coins they *believe* belong to an account,
/// each annotated with a claimed derivation path. The engine treats these
/// claims as untrusted and re-derives every address before spending.
pub trait CoinSource: Send + Sync {
    /// Candidate unspent coins for `account`.
    fn coins_for(&self, account: &AccountId) -> Result<Vec<WalletCoin>, CoreError>;
}

/// A fixed list of coins, handed out regardless of the account asked about.
///
/// Useful for callers that already hold a coin snapshot (e.g. a JSON export
/// from an indexer) and for tests.
#[derive(Clone, Debug, Default)]
pub struct StaticCoinSource {
    coins: Vec<WalletCoin>,
}

impl StaticCoinSource {
    pub fn new(coins: Vec<WalletCoin>) -> Self {
        Self { coins }
    }
}

impl CoinSource for StaticCoinSource {
    fn coins_for(&self, _account: &AccountId) -> Result<Vec<WalletCoin>, CoreError> {
        Ok(self.coins.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use bitcoin::bip32::{DerivationPath, Fingerprint};
    use bitcoin::hashes::Hash;
    use bitcoin::{OutPoint, ScriptBuf, Txid};
    use std::str::FromStr;

    #[test]
    fn static_source_returns_snapshot() {
        let coin = WalletCoin::new(
            OutPoint::new(Txid::from_byte_array([1; 32]), 0),
            5_000,
            ScriptBuf::new(),
            DerivationPath::from_str("m/84'/0'/0'/0/0").unwrap(),
        );
        let source = StaticCoinSource::new(vec![coin.clone()]);
        let id = AccountId {
            network: Network::Mainnet,
            purpose: 84,
            coin_type: 0,
            account_index: 0,
            master_fingerprint: Fingerprint::default(),
        };
        assert_eq!(source.coins_for(&id).unwrap(), vec![coin]);
    }
}
