//! Configuration files flowing into derivation and building.

use std::io::Write;

use strand_core::config::EngineConfig;
use strand_core::network::{Network, ScriptKind};
use strand_core::types::{Chain, FeeRate};
use strand_tests::helpers::*;
use strand_wallet::{build_transaction, Account, FeeEstimator};

fn write_config(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[test]
fn regtest_taproot_from_file() {
    let file = write_config("network = \"regtest\"\nscript_kind = \"taproot\"\n");
    let params = EngineConfig::load(Some(file.path())).unwrap().resolve().unwrap();
    assert_eq!(params.network, Network::Regtest);
    assert_eq!(params.script_kind, ScriptKind::Taproot);

    let acct = Account::from_mnemonic(MNEMONIC_A, "", &params, 0).unwrap();
    let addr = acct.external().get_address(0).unwrap();
    assert!(addr.address.to_string().starts_with("bcrt1p"));
    assert_eq!(addr.path.to_string(), "86'/1'/0'/0/0");
}

#[test]
fn configured_dust_threshold_drives_change() {
    let file = write_config("dust_threshold = 5000\n");
    let params = EngineConfig::load(Some(file.path())).unwrap().resolve().unwrap();
    assert_eq!(params.dust_threshold, 5_000);

    let acct = Account::from_mnemonic(MNEMONIC_A, "", &params, 0).unwrap();
    let rate = FeeRate::from_sat_per_vb(1);
    let fee = FeeEstimator::from_params(&params).estimate(1, 2, rate);
    // 4_000 sats of change would be kept at the default threshold.
    let coin = coin_at(&acct, Chain::External, 0, 100_000 + fee + 4_000, 1);
    let to = receive_address(&acct, 1);
    let tx = build_transaction(&acct, &[coin], &to, 100_000, rate, 0).unwrap();
    assert!(tx.change().is_none());
    assert_eq!(tx.fee(), fee + 4_000);
}

#[test]
fn configured_sizes_drive_fee() {
    let file =
        write_config("[sizes]\noverhead_weight = 44\ninput_weight = 400\noutput_weight = 200\n");
    let params = EngineConfig::load(Some(file.path())).unwrap().resolve().unwrap();
    let acct = Account::from_mnemonic(MNEMONIC_A, "", &params, 0).unwrap();
    let coin = coin_at(&acct, Chain::External, 0, 1_000_000, 1);
    let to = receive_address(&acct, 1);
    let rate = FeeRate::from_sat_per_vb(1);
    let tx = build_transaction(&acct, &[coin], &to, 100_000, rate, 0).unwrap();
    // (44 + 400 + 2 * 200) / 4 = 211 vB
    assert_eq!(tx.fee(), 211);
}

#[test]
fn coin_type_override_moves_the_account() {
    let file = write_config("network = \"testnet\"\ncoin_type = 0\n");
    let params = EngineConfig::load(Some(file.path())).unwrap().resolve().unwrap();
    let acct = Account::from_mnemonic(MNEMONIC_A, "", &params, 0).unwrap();
    let addr = acct.external().get_address(0).unwrap();
    assert_eq!(addr.path.to_string(), "84'/0'/0'/0/0");
    assert!(addr.address.to_string().starts_with("tb1q"));
}

#[test]
fn invalid_override_is_rejected() {
    let file = write_config("purpose = 2147483648\n");
    let cfg = EngineConfig::load(Some(file.path())).unwrap();
    assert!(cfg.resolve().is_err());
}
