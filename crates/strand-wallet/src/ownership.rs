//! Coin ownership validation.
//!
//! Coins arrive from an external indexer with a *claimed* derivation path.
//! The claim is never trusted: the validator checks that the path lies
//! directly under the account, re-derives the address at that path and
//! compares locking scripts byte-for-byte. Only then is a coin [`Owned`].
//!
//! [`Owned`]: Ownership::Owned

use std::fmt;
use tracing::warn;

use strand_core::types::{Chain, WalletCoin};

use crate::account::Account;
use crate::error::WalletError;

/// Why a coin was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotOwnedReason {
    /// The coin is attributed to a different seed.
    FingerprintMismatch,
    /// The claimed path is not `account/chain/index` for this account.
    PathOutsideAccount,
    /// The chain component is neither external (0) nor internal (1).
    UnknownChain,
    /// The address re-derived at the claimed path locks to a different script.
    ScriptMismatch,
}

impl fmt::Display for NotOwnedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotOwnedReason::FingerprintMismatch => "master fingerprint mismatch",
            NotOwnedReason::PathOutsideAccount => "path is outside the account",
            NotOwnedReason::UnknownChain => "unknown address chain",
            NotOwnedReason::ScriptMismatch => "locking script does not match the derived address",
        })
    }
}

/// Outcome of validating one coin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    Owned { chain: Chain, index: u32 },
    NotOwned(NotOwnedReason),
}

impl Ownership {
    pub fn is_owned(&self) -> bool {
        matches!(self, Ownership::Owned { .. })
    }
}

/// Coins split by ownership.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub owned: Vec<WalletCoin>,
    pub foreign: Vec<(WalletCoin, NotOwnedReason)>,
}

/// Validates coins against one account.
pub struct OwnershipValidator<'a> {
    account: &'a Account,
}

impl<'a> OwnershipValidator<'a> {
    pub fn new(account: &'a Account) -> Self {
        Self { account }
    }

    /// Decide whether `coin` belongs to the account.
    ///
    /// Errors only when re-derivation itself fails; a coin that simply is not
    /// ours is `Ok(Ownership::NotOwned(_))`.
    pub fn validate(&self, coin: &WalletCoin) -> Result<Ownership, WalletError> {
        if let Some(fp) = coin.master_fingerprint {
            if fp != self.account.master_fingerprint() {
                return Ok(Ownership::NotOwned(NotOwnedReason::FingerprintMismatch));
            }
        }

        let (chain, index) = match self.account.locate(&coin.path) {
            Ok(found) => found,
            Err(reason) => return Ok(Ownership::NotOwned(reason)),
        };

        let derived = self.account.chain(chain).get_address(index)?;
        if derived.script_pubkey() != coin.script_pubkey {
            return Ok(Ownership::NotOwned(NotOwnedReason::ScriptMismatch));
        }
        Ok(Ownership::Owned { chain, index })
    }

    /// Require every coin to be owned. The first failure becomes
    /// [`WalletError::ForeignCoin`].
    pub fn validate_all(&self, coins: &[WalletCoin]) -> Result<(), WalletError> {
        for coin in coins {
            if let Ownership::NotOwned(reason) = self.validate(coin)? {
                warn!("rejecting coin {} for {}: {reason}", coin.outpoint, self.account.id());
                return Err(WalletError::ForeignCoin {
                    outpoint: coin.outpoint,
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Split coins into owned and foreign, keeping input order within each.
    pub fn partition(&self, coins: Vec<WalletCoin>) -> Result<Partition, WalletError> {
        let mut out = Partition::default();
        for coin in coins {
            match self.validate(&coin)? {
                Ownership::Owned { .. } => out.owned.push(coin),
                Ownership::NotOwned(reason) => {
                    warn!(
                        "ignoring foreign coin {} for {}: {reason}",
                        coin.outpoint,
                        self.account.id()
                    );
                    out.foreign.push((coin, reason));
                }
            }
        }
        Ok(out)
    }
}
