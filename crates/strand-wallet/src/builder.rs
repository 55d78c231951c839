//! Unsigned transaction building.
//!
//! The builder spends exactly the coins it is given, in the order given,
//! after proving each one belongs to the account:
//! 1. Validate fee rate, amount, destination and change index
//! 2. Run every coin through the [`OwnershipValidator`]; any foreign coin
//!    aborts the whole build
//! 3. Size the fee for a destination plus a change output
//! 4. Fold dust change into the fee, otherwise pay it to the internal chain
//!
//! The result is handed to an external signer, either as a raw
//! [`Transaction`] or as a [`Psbt`] carrying the key origins it needs.

use bitcoin::absolute::LockTime;
use bitcoin::bip32::{ChildNumber, Fingerprint, KeySource};
use bitcoin::psbt::{Input as PsbtInput, Output as PsbtOutput, Psbt};
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use tracing::{debug, info, warn};

use strand_core::address::parse_address;
use strand_core::error::ConfigError;
use strand_core::network::{NetworkParams, ScriptKind};
use strand_core::types::{FeeRate, WalletCoin};

use crate::account::{Account, DerivedAddress};
use crate::error::WalletError;
use crate::fee::FeeEstimator;
use crate::ownership::{Ownership, OwnershipValidator};

/// One output of an unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Address,
    /// Value in satoshis.
    pub value: u64,
}

impl TxOutput {
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }
}

/// Everything a build needs.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub account: &'a Account,
    /// Coins to spend, all of them, in this order.
    pub coins: &'a [WalletCoin],
    pub destination: &'a str,
    /// Satoshis paid to `destination`.
    pub amount: u64,
    pub fee_rate: FeeRate,
    /// Index on the internal chain that receives change.
    pub change_index: u32,
}

/// An unsigned transaction: validated inputs, `[destination, change?]`
/// outputs and the fee they imply.
///
/// Immutable once built. `input_total() == output_total() + fee()` always
/// holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    inputs: Vec<WalletCoin>,
    input_keys: Vec<DerivedAddress>,
    outputs: Vec<TxOutput>,
    fee: u64,
    fee_rate: FeeRate,
    vsize_estimate: u64,
    change: Option<DerivedAddress>,
    script_kind: ScriptKind,
    master_fingerprint: Fingerprint,
}

impl UnsignedTransaction {
    pub fn inputs(&self) -> &[WalletCoin] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Estimated virtual size once signed.
    pub fn vsize_estimate(&self) -> u64 {
        self.vsize_estimate
    }

    pub fn master_fingerprint(&self) -> Fingerprint {
        self.master_fingerprint
    }

    pub fn destination_output(&self) -> &TxOutput {
        &self.outputs[0]
    }

    /// The change address, when change was paid.
    pub fn change(&self) -> Option<&DerivedAddress> {
        self.change.as_ref()
    }

    pub fn change_output(&self) -> Option<&TxOutput> {
        self.change.as_ref().and_then(|_| self.outputs.get(1))
    }

    pub fn input_total(&self) -> u64 {
        self.inputs.iter().map(|c| c.value).sum()
    }

    pub fn output_total(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Version 2 transaction with RBF-signalling inputs and no signatures.
    pub fn to_transaction(&self) -> Transaction {
        let input = self
            .inputs
            .iter()
            .map(|coin| TxIn {
                previous_output: coin.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            })
            .collect();
        let output = self
            .outputs
            .iter()
            .map(|o| TxOut {
                value: Amount::from_sat(o.value),
                script_pubkey: o.script_pubkey(),
            })
            .collect();
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input,
            output,
        }
    }

    /// PSBT for an external signer.
    ///
    /// Every input carries its key origin (master fingerprint and full path)
    /// and, for segwit kinds, its `witness_utxo`. Legacy inputs need the full
    /// previous transaction, which the engine never sees, so the signer must
    /// add `non_witness_utxo` itself. The change output carries its origin too.
    pub fn to_psbt(&self) -> Result<Psbt, WalletError> {
        let mut psbt = Psbt::from_unsigned_tx(self.to_transaction())
            .map_err(|e| WalletError::Psbt(e.to_string()))?;

        let signing = self.inputs.iter().zip(&self.input_keys);
        for (input, (coin, key)) in psbt.inputs.iter_mut().zip(signing) {
            if self.script_kind != ScriptKind::Legacy {
                input.witness_utxo = Some(TxOut {
                    value: Amount::from_sat(coin.value),
                    script_pubkey: coin.script_pubkey.clone(),
                });
            }
            annotate_input(input, key, self.script_kind, self.master_fingerprint);
        }

        if let (Some(change), Some(output)) = (&self.change, psbt.outputs.get_mut(1)) {
            annotate_output(output, change, self.script_kind, self.master_fingerprint);
        }

        Ok(psbt)
    }
}

fn key_source(key: &DerivedAddress, fingerprint: Fingerprint) -> KeySource {
    (fingerprint, key.path.clone())
}

fn nested_redeem_script(key: &DerivedAddress) -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&key.public_key.wpubkey_hash())
}

fn annotate_input(
    input: &mut PsbtInput,
    key: &DerivedAddress,
    kind: ScriptKind,
    fingerprint: Fingerprint,
) {
    match kind {
        ScriptKind::Taproot => {
            let (x_only, _) = key.public_key.0.x_only_public_key();
            input.tap_internal_key = Some(x_only);
            input.tap_key_origins.insert(x_only, (Vec::new(), key_source(key, fingerprint)));
        }
        ScriptKind::NestedSegwit => {
            input.redeem_script = Some(nested_redeem_script(key));
            input.bip32_derivation.insert(key.public_key.0, key_source(key, fingerprint));
        }
        ScriptKind::Legacy | ScriptKind::NativeSegwit => {
            input.bip32_derivation.insert(key.public_key.0, key_source(key, fingerprint));
        }
    }
}

fn annotate_output(
    output: &mut PsbtOutput,
    key: &DerivedAddress,
    kind: ScriptKind,
    fingerprint: Fingerprint,
) {
    match kind {
        ScriptKind::Taproot => {
            let (x_only, _) = key.public_key.0.x_only_public_key();
            output.tap_internal_key = Some(x_only);
            output.tap_key_origins.insert(x_only, (Vec::new(), key_source(key, fingerprint)));
        }
        ScriptKind::NestedSegwit => {
            output.redeem_script = Some(nested_redeem_script(key));
            output.bip32_derivation.insert(key.public_key.0, key_source(key, fingerprint));
        }
        ScriptKind::Legacy | ScriptKind::NativeSegwit => {
            output.bip32_derivation.insert(key.public_key.0, key_source(key, fingerprint));
        }
    }
}

/// Builds unsigned transactions under one set of network parameters.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    params: NetworkParams,
    estimator: FeeEstimator,
}

impl TransactionBuilder {
    pub fn new(params: &NetworkParams) -> Self {
        Self {
            params: params.clone(),
            estimator: FeeEstimator::from_params(params),
        }
    }

    pub fn estimator(&self) -> &FeeEstimator {
        &self.estimator
    }

    /// Build an unsigned transaction. Atomic: on any error nothing is
    /// returned.
    pub fn build(&self, req: &BuildRequest<'_>) -> Result<UnsignedTransaction, WalletError> {
        if req.fee_rate.is_zero() {
            return Err(WalletError::InvalidFeeRate(format!("{} must be positive", req.fee_rate)));
        }
        if req.amount == 0 {
            return Err(WalletError::InvalidAmount("amount must be non-zero".into()));
        }
        let account = req.account;
        check_account_params(account, &self.params)?;
        let destination = parse_address(req.destination, self.params.network)?;
        let destination_script = destination.script_pubkey();
        ChildNumber::from_normal_idx(req.change_index)?;

        // Ownership gate.
        let validator = OwnershipValidator::new(account);
        let mut input_keys = Vec::with_capacity(req.coins.len());
        for coin in req.coins {
            match validator.validate(coin)? {
                Ownership::Owned { chain, index } => {
                    input_keys.push(account.chain(chain).get_address(index)?)
                }
                Ownership::NotOwned(reason) => {
                    warn!(
                        "build aborted, coin {} does not belong to {}: {reason}",
                        coin.outpoint,
                        account.id()
                    );
                    return Err(WalletError::ForeignCoin {
                        outpoint: coin.outpoint,
                        reason,
                    });
                }
            }
        }

        let total = req
            .coins
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(c.value))
            .ok_or_else(|| WalletError::InvalidAmount("input total overflows".into()))?;
        if total < req.amount {
            return Err(WalletError::InsufficientFunds {
                have: total,
                need: req.amount,
            });
        }

        let n_inputs = req.coins.len();
        let fee_with_change =
            self.estimator
                .estimate_payment(n_inputs, &destination_script, true, req.fee_rate);
        let need = req.amount.saturating_add(fee_with_change);
        if total < need {
            return Err(WalletError::InsufficientFunds { have: total, need });
        }

        let mut outputs = vec![TxOutput {
            address: destination,
            value: req.amount,
        }];
        let residual = total - need;
        let (fee, change, vsize_estimate) = if residual < self.params.dust_threshold {
            debug!(
                "change {residual} below dust threshold {}, paying it as fee",
                self.params.dust_threshold
            );
            let vsize = self.estimator.payment_vsize(n_inputs, &destination_script, false);
            (total - req.amount, None, vsize)
        } else {
            let change = account.internal().get_address(req.change_index)?;
            outputs.push(TxOutput {
                address: change.address.clone(),
                value: residual,
            });
            let vsize = self.estimator.payment_vsize(n_inputs, &destination_script, true);
            (fee_with_change, Some(change), vsize)
        };

        let tx = UnsignedTransaction {
            inputs: req.coins.to_vec(),
            input_keys,
            outputs,
            fee,
            fee_rate: req.fee_rate,
            vsize_estimate,
            change,
            script_kind: self.params.script_kind,
            master_fingerprint: account.master_fingerprint(),
        };
        info!(
            "built tx for {}: {} inputs, {} outputs, amount={} fee={} ({})",
            account.id(),
            tx.inputs.len(),
            tx.outputs.len(),
            req.amount,
            tx.fee,
            req.fee_rate
        );
        Ok(tx)
    }
}

/// The builder sizes, annotates and derives change with its own parameters,
/// so they must be exactly the ones the account was derived under.
fn check_account_params(account: &Account, params: &NetworkParams) -> Result<(), WalletError> {
    let theirs = account.params();
    if theirs == params {
        return Ok(());
    }
    let field = if theirs.network != params.network {
        "network"
    } else if theirs.script_kind != params.script_kind {
        "script_kind"
    } else {
        "params"
    };
    Err(WalletError::Config(ConfigError::InvalidField {
        field,
        reason: format!(
            "account {} uses {} {}, builder uses {} {}",
            account.id(),
            theirs.network,
            theirs.script_kind,
            params.network,
            params.script_kind
        ),
    }))
}

/// Build with the account's own network parameters.
pub fn build_transaction(
    account: &Account,
    coins: &[WalletCoin],
    destination: &str,
    amount: u64,
    fee_rate: FeeRate,
    change_index: u32,
) -> Result<UnsignedTransaction, WalletError> {
    TransactionBuilder::new(account.params()).build(&BuildRequest {
        account,
        coins,
        destination,
        amount,
        fee_rate,
        change_index,
    })
}

/// Outpoints of a built transaction's inputs, in spend order.
pub fn spent_outpoints(tx: &UnsignedTransaction) -> Vec<OutPoint> {
    tx.inputs.iter().map(|c| c.outpoint).collect()
}
