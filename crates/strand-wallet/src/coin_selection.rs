//! Largest-first coin selection.
//!
//! A helper for callers that want the wallet to pick inputs. The builder
//! itself always spends exactly the coins it is handed, so a selection is
//! only a suggestion: feed [`CoinSelection::selected`] back into
//! [`TransactionBuilder`](crate::builder::TransactionBuilder).

use strand_core::types::{FeeRate, WalletCoin};

use crate::error::WalletError;
use crate::fee::FeeEstimator;

/// Result of coin selection: which coins to spend and the fee/change breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected coins, largest first.
    pub selected: Vec<WalletCoin>,
    /// Total value of selected coins.
    pub total: u64,
    /// Fee the resulting transaction pays.
    pub fee: u64,
    /// Change returned to the wallet; zero when the residual was dust.
    pub change: u64,
}

/// Greedy selector that spends the largest coins first.
///
/// Sorting by value descending keeps the input count, and therefore the fee,
/// low. Ties are broken by outpoint so the result does not depend on the
/// order coins were reported in.
pub struct CoinSelector;

impl CoinSelector {
    /// Select coins covering `amount` plus the fee of a transaction with a
    /// destination and a change output.
    ///
    /// Uses the same funding rule as the builder, so a selection paying an
    /// address of the account's own kind builds successfully. A wider
    /// destination script costs more than estimated here.
    pub fn select(
        coins: &[WalletCoin],
        amount: u64,
        rate: FeeRate,
        estimator: &FeeEstimator,
        dust_threshold: u64,
    ) -> Result<CoinSelection, WalletError> {
        if coins.is_empty() {
            return Err(WalletError::NoCoins);
        }
        if amount == 0 {
            return Err(WalletError::InvalidAmount("amount must be non-zero".into()));
        }
        if rate.is_zero() {
            return Err(WalletError::InvalidFeeRate("fee rate must be positive".into()));
        }

        let mut sorted: Vec<&WalletCoin> = coins.iter().collect();
        sorted.sort_by(|a, b| b.value.cmp(&a.value).then(a.outpoint.cmp(&b.outpoint)));

        let mut selected = Vec::new();
        let mut total: u64 = 0;

        for coin in sorted {
            selected.push(coin.clone());
            total = total.saturating_add(coin.value);

            let fee = estimator.estimate(selected.len(), 2, rate);
            let needed = amount.saturating_add(fee);
            if total >= needed {
                let residual = total - needed;
                let (fee, change) = if residual < dust_threshold {
                    (total - amount, 0)
                } else {
                    (fee, residual)
                };
                return Ok(CoinSelection {
                    selected,
                    total,
                    fee,
                    change,
                });
            }
        }

        let fee = estimator.estimate(selected.len(), 2, rate);
        Err(WalletError::InsufficientFunds {
            have: total,
            need: amount.saturating_add(fee),
        })
    }
}
