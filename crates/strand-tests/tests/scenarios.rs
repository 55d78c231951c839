//! End-to-end wallet scenarios.
//!
//! Each test derives accounts from a mnemonic, fabricates indexer-style coin
//! reports and drives the builder or the provider the way a hosting
//! application would.

use std::sync::Arc;

use bitcoin::bip32::DerivationPath;
use strand_core::constants::COIN;
use strand_core::network::{Network, NetworkParams, ScriptKind};
use strand_core::traits::StaticCoinSource;
use strand_core::types::{Chain, FeeRate, WalletCoin};
use strand_tests::helpers::*;
use strand_wallet::{
    build_transaction, Account, CoinSelector, FeeEstimator, NotOwnedReason, Wallet, WalletError,
    WalletProvider,
};

fn rate() -> FeeRate {
    FeeRate::from_sat_per_vb(10)
}

/// Account A owns external 0 and 1 (0.02 total), sends 0.01 to its own
/// external 5 and takes change on internal 0.
#[test]
fn send_between_own_addresses() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let coins = vec![
        coin_at(&a, Chain::External, 0, 1_200_000, 1),
        coin_at(&a, Chain::External, 1, 800_000, 2),
    ];
    assert_eq!(coins.iter().map(|c| c.value).sum::<u64>(), 2 * COIN / 100);

    let dest = receive_address(&a, 5);
    let tx = build_transaction(&a, &coins, &dest, COIN / 100, rate(), 0).unwrap();

    assert_eq!(tx.inputs(), &coins[..]);
    assert_eq!(tx.destination_output().value, COIN / 100);
    assert_eq!(tx.destination_output().address.to_string(), dest);
    let change = tx.change().unwrap();
    assert_eq!((change.chain, change.index), (Chain::Internal, 0));
    assert_eq!(
        change.address.to_string(),
        "bc1q8c6fshw2dlwun7ekn9qwf37cu2rn755upcp6el"
    );
    assert_eq!(tx.input_total(), tx.output_total() + tx.fee());
}

/// Same request, but the second coin belongs to another mnemonic's account
/// while claiming a path under account A.
#[test]
fn coin_from_other_mnemonic_is_refused() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let b = account(MNEMONIC_B, ScriptKind::NativeSegwit);
    let foreign = coin_at(&b, Chain::External, 1, 800_000, 2);
    let coins = vec![coin_at(&a, Chain::External, 0, 1_200_000, 1), foreign.clone()];

    let to = receive_address(&a, 5);
    let err = build_transaction(&a, &coins, &to, COIN / 100, rate(), 0).unwrap_err();
    assert!(
        matches!(err, WalletError::ForeignCoin { outpoint, .. } if outpoint == foreign.outpoint),
        "{err:?}"
    );
    assert!(err.to_string().contains("does not belong to this account"));
}

#[test]
fn one_bad_coin_fails_everything() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let b = account(MNEMONIC_B, ScriptKind::NativeSegwit);
    let mut coins: Vec<WalletCoin> = (0..6)
        .map(|i| coin_at(&a, Chain::External, i, 500_000, i as u8))
        .collect();
    coins.insert(3, coin_at(&b, Chain::Internal, 0, 1_000, 99));

    // Plenty of owned value; the foreign coin still poisons the call.
    let to = receive_address(&a, 40);
    let err = build_transaction(&a, &coins, &to, 100_000, rate(), 0).unwrap_err();
    assert!(matches!(err, WalletError::ForeignCoin { .. }));
}

#[test]
fn mislabeled_path_is_refused() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let mut coin = coin_at(&a, Chain::External, 0, 100_000, 1);
    coin.path = "m/84'/0'/0'/1/0".parse::<DerivationPath>().unwrap();
    let to = receive_address(&a, 5);
    let err = build_transaction(&a, &[coin], &to, 10_000, rate(), 0).unwrap_err();
    assert!(matches!(
        err,
        WalletError::ForeignCoin {
            reason: NotOwnedReason::ScriptMismatch,
            ..
        }
    ));
}

#[test]
fn same_seed_other_account_is_foreign() {
    let a0 = account_on(MNEMONIC_A, Network::Mainnet, ScriptKind::NativeSegwit, 0);
    let a1 = account_on(MNEMONIC_A, Network::Mainnet, ScriptKind::NativeSegwit, 1);
    let coin = coin_at(&a1, Chain::External, 0, 100_000, 1);
    let to = receive_address(&a0, 5);
    let err = build_transaction(&a0, &[coin], &to, 10_000, rate(), 0).unwrap_err();
    assert!(matches!(
        err,
        WalletError::ForeignCoin {
            reason: NotOwnedReason::PathOutsideAccount,
            ..
        }
    ));
}

#[test]
fn dust_residual_becomes_fee() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let est = FeeEstimator::default();
    // 2-in 2-out fee is 2_090; leave 100 sats over.
    let total = 1_000_000 + est.estimate(2, 2, rate()) + 100;
    let coins = vec![
        coin_at(&a, Chain::External, 0, total - 400_000, 1),
        coin_at(&a, Chain::External, 1, 400_000, 2),
    ];
    let tx = build_transaction(&a, &coins, &receive_address(&a, 5), 1_000_000, rate(), 0).unwrap();

    assert_eq!(tx.outputs().len(), 1);
    assert!(tx.change().is_none());
    assert_eq!(tx.fee(), total - 1_000_000);
    assert_eq!(tx.fee(), 2_190);
    // Still pays at least the no-change estimate.
    assert!(tx.fee() >= est.estimate(2, 1, rate()));
}

#[test]
fn sending_to_foreign_address_is_fine() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let b = account(MNEMONIC_B, ScriptKind::NativeSegwit);
    let coins = vec![coin_at(&a, Chain::External, 0, 200_000, 1)];
    let tx = build_transaction(&a, &coins, &receive_address(&b, 0), 50_000, rate(), 7).unwrap();
    assert_eq!(tx.change().unwrap().index, 7);
}

/// A native-segwit account paying a taproot address is charged for the
/// wider output, so the signed transaction still meets the rate.
#[test]
fn paying_taproot_from_native_segwit() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let b = account(MNEMONIC_B, ScriptKind::Taproot);
    let coins = vec![
        coin_at(&a, Chain::External, 0, 1_200_000, 1),
        coin_at(&a, Chain::External, 1, 800_000, 2),
    ];
    let dest = receive_address(&b, 0);
    let tx = build_transaction(&a, &coins, &dest, COIN / 100, rate(), 0).unwrap();

    assert_eq!(tx.vsize_estimate(), 221);
    assert_eq!(tx.fee(), 2_210);
    assert!(tx.fee() > FeeEstimator::default().estimate(2, 2, rate()));
    assert_eq!(tx.input_total(), tx.output_total() + tx.fee());
    assert!(tx.destination_output().script_pubkey().is_p2tr());
    assert!(tx.change_output().unwrap().script_pubkey().is_p2wpkh());
}

/// A wallet configured for taproot refuses to build for an account derived
/// under native-segwit parameters.
#[test]
fn wallet_refuses_account_with_other_params() {
    let wallet = Wallet::new(
        NetworkParams::new(Network::Mainnet, ScriptKind::Taproot),
        Arc::new(StaticCoinSource::default()),
    )
    .unwrap();
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let coins = vec![coin_at(&a, Chain::External, 0, 500_000, 1)];
    let err = wallet
        .build_transaction(&a, &coins, &receive_address(&a, 5), 100_000, rate(), 0)
        .unwrap_err();
    assert!(matches!(err, WalletError::Config(_)), "{err:?}");
}

#[test]
fn testnet_account_rejects_mainnet_destination() {
    let t = account_on(MNEMONIC_A, Network::Testnet, ScriptKind::NativeSegwit, 0);
    let coins = vec![coin_at(&t, Chain::External, 0, 200_000, 1)];
    let err = build_transaction(
        &t,
        &coins,
        "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu",
        50_000,
        rate(),
        0,
    )
    .unwrap_err();
    assert!(matches!(err, WalletError::InvalidDestination(_)));
}

#[test]
fn selection_feeds_builder() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let coins: Vec<_> = [30_000, 250_000, 5_000, 120_000]
        .iter()
        .enumerate()
        .map(|(i, v)| coin_at(&a, Chain::External, i as u32, *v, i as u8))
        .collect();
    let params = a.params().clone();
    let est = FeeEstimator::from_params(&params);

    let sel = CoinSelector::select(&coins, 300_000, rate(), &est, params.dust_threshold).unwrap();
    assert_eq!(sel.selected.len(), 2);

    let to = receive_address(&a, 9);
    let tx = build_transaction(&a, &sel.selected, &to, 300_000, rate(), 1).unwrap();
    assert_eq!(tx.fee(), sel.fee);
    assert_eq!(tx.change_output().map(|o| o.value).unwrap_or(0), sel.change);
}

#[test]
fn provider_filters_indexer_report() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let b = account(MNEMONIC_B, ScriptKind::NativeSegwit);
    let report = vec![
        coin_at(&a, Chain::External, 0, 70_000, 1),
        coin_at(&b, Chain::External, 0, 9_000_000, 2),
        coin_at(&a, Chain::Internal, 3, 30_000, 3),
    ];
    let source = Arc::new(StaticCoinSource::new(report));
    let wallet = Wallet::new(NetworkParams::default(), source).unwrap();
    let acct = wallet.derive_account(MNEMONIC_A, "", 0).unwrap();

    let balance = wallet.balance(&acct).unwrap();
    assert_eq!(balance.total, 100_000);
    assert_eq!(balance.coin_count, 2);
    assert_eq!(balance.foreign_count, 1);

    let owned = wallet.list_owned_coins(&acct).unwrap();
    let to = receive_address(&acct, 2);
    let tx = wallet
        .build_transaction(&acct, &owned, &to, 60_000, FeeRate::from_sat_per_vb(2), 1)
        .unwrap();
    assert_eq!(tx.inputs().len(), 2);
}

/// Coin reports travel as JSON between the indexer and the engine.
#[test]
fn coin_report_json_roundtrip() {
    let a = account(MNEMONIC_A, ScriptKind::NativeSegwit);
    let coin =
        coin_at(&a, Chain::External, 4, 12_345, 7).with_fingerprint(a.master_fingerprint());
    let json = serde_json::to_string(&vec![coin.clone()]).unwrap();
    let back: Vec<WalletCoin> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, vec![coin]);
    let to = receive_address(&a, 5);
    let rate = FeeRate::from_sat_per_vb(1);
    assert!(build_transaction(&a, &back, &to, 5_000, rate, 0).is_ok());
}

#[test]
fn watch_only_account_builds_identically() {
    let full = account(MNEMONIC_A, ScriptKind::Taproot);
    let watch =
        Account::from_xpub(full.xpub(), full.master_fingerprint(), full.params(), 0).unwrap();
    let coins = vec![coin_at(&full, Chain::External, 0, 500_000, 1)];
    let dest = receive_address(&full, 3);
    let t1 = build_transaction(&full, &coins, &dest, 100_000, rate(), 2).unwrap();
    let t2 = build_transaction(&watch, &coins, &dest, 100_000, rate(), 2).unwrap();
    assert_eq!(t1, t2);
    assert_eq!(t1.to_psbt().unwrap(), t2.to_psbt().unwrap());
}
