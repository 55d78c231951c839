//! Wallet composition: accounts, owned coins and transaction creation.
//!
//! [`WalletProvider`] is the capability set a chain family offers to the
//! hosting application. [`Wallet`] is the UTXO implementation: it derives
//! accounts under one [`NetworkParams`], pulls candidate coins from a
//! [`CoinSource`] and filters them through the ownership validator.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use strand_core::constants::COIN;
use strand_core::network::NetworkParams;
use strand_core::traits::CoinSource;
use strand_core::types::{FeeRate, WalletCoin};

use crate::account::Account;
use crate::builder::{BuildRequest, TransactionBuilder, UnsignedTransaction};
use crate::error::WalletError;
use crate::ownership::{OwnershipValidator, Partition};

/// Balance summary over validated coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalletBalance {
    /// Total value of owned coins in satoshis.
    pub total: u64,
    /// Number of owned coins.
    pub coin_count: usize,
    /// Coins the source reported that failed ownership validation.
    pub foreign_count: usize,
}

impl WalletBalance {
    /// Summarize an ownership split without re-validating its coins.
    pub fn from_partition(split: &Partition) -> Result<Self, WalletError> {
        let total = split
            .owned
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(c.value))
            .ok_or_else(|| WalletError::InvalidAmount("balance overflows".into()))?;
        Ok(Self {
            total,
            coin_count: split.owned.len(),
            foreign_count: split.foreign.len(),
        })
    }

    /// Total formatted as whole coins with eight decimals (display only).
    pub fn total_btc(&self) -> String {
        format!("{}.{:08}", self.total / COIN, self.total % COIN)
    }
}

/// Operations a chain family provides to the hosting application.
pub trait WalletProvider: Send + Sync {
    type Account;
    type Coin;
    type Transaction;

    fn derive_account(
        &self,
        phrase: &str,
        passphrase: &str,
        index: u32,
    ) -> Result<Self::Account, WalletError>;

    /// Coins the account can prove it owns.
    fn list_owned_coins(&self, account: &Self::Account) -> Result<Vec<Self::Coin>, WalletError>;

    fn balance(&self, account: &Self::Account) -> Result<WalletBalance, WalletError>;

    fn build_transaction(
        &self,
        account: &Self::Account,
        coins: &[Self::Coin],
        destination: &str,
        amount: u64,
        fee_rate: FeeRate,
        change_index: u32,
    ) -> Result<Self::Transaction, WalletError>;
}

/// UTXO wallet provider.
pub struct Wallet {
    params: NetworkParams,
    builder: TransactionBuilder,
    source: Arc<dyn CoinSource>,
}

impl Wallet {
    pub fn new(params: NetworkParams, source: Arc<dyn CoinSource>) -> Result<Self, WalletError> {
        params.validate()?;
        Ok(Self {
            builder: TransactionBuilder::new(&params),
            params,
            source,
        })
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Pull candidate coins for `account` from `source` and split them by
    /// ownership. Foreign coins are logged, never silently discarded.
    pub fn spendable_from(
        source: &dyn CoinSource,
        account: &Account,
    ) -> Result<Partition, WalletError> {
        let candidates = source.coins_for(account.id())?;
        debug!("{} candidate coins for {}", candidates.len(), account.id());
        let split = OwnershipValidator::new(account).partition(candidates)?;
        if !split.foreign.is_empty() {
            warn!(
                "coin source reported {} coins not owned by {}",
                split.foreign.len(),
                account.id()
            );
        }
        Ok(split)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("params", &self.params).finish()
    }
}

impl WalletProvider for Wallet {
    type Account = Account;
    type Coin = WalletCoin;
    type Transaction = UnsignedTransaction;

    fn derive_account(
        &self,
        phrase: &str,
        passphrase: &str,
        index: u32,
    ) -> Result<Account, WalletError> {
        Account::from_mnemonic(phrase, passphrase, &self.params, index)
    }

    fn list_owned_coins(&self, account: &Account) -> Result<Vec<WalletCoin>, WalletError> {
        Ok(Self::spendable_from(self.source.as_ref(), account)?.owned)
    }

    fn balance(&self, account: &Account) -> Result<WalletBalance, WalletError> {
        let split = Self::spendable_from(self.source.as_ref(), account)?;
        WalletBalance::from_partition(&split)
    }

    fn build_transaction(
        &self,
        account: &Account,
        coins: &[WalletCoin],
        destination: &str,
        amount: u64,
        fee_rate: FeeRate,
        change_index: u32,
    ) -> Result<UnsignedTransaction, WalletError> {
        self.builder.build(&BuildRequest {
            account,
            coins,
            destination,
            amount,
            fee_rate,
            change_index,
        })
    }
}
