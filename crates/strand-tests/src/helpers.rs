//! Shared fixtures for the integration tests.

use bitcoin::hashes::Hash;
use bitcoin::{OutPoint, Txid};
use strand_core::network::{Network, NetworkParams, ScriptKind};
use strand_core::types::{Chain, WalletCoin};
use strand_wallet::Account;

/// BIP-39 reference mnemonic used by the BIP-44/49/84/86 vectors.
pub const MNEMONIC_A: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// An unrelated valid mnemonic (BIP-39 vector for entropy `7f7f...7f`).
pub const MNEMONIC_B: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";

/// Mainnet account 0 for `phrase` with the given script kind.
pub fn account(phrase: &str, kind: ScriptKind) -> Account {
    account_on(phrase, Network::Mainnet, kind, 0)
}

pub fn account_on(phrase: &str, network: Network, kind: ScriptKind, index: u32) -> Account {
    Account::from_mnemonic(phrase, "", &NetworkParams::new(network, kind), index).unwrap()
}

/// Deterministic outpoint distinct per `(tag, vout)`.
pub fn outpoint(tag: u8, vout: u32) -> OutPoint {
    OutPoint::new(Txid::from_byte_array([tag; 32]), vout)
}

/// A coin paying `value` to `account`'s address at `(chain, index)`, labeled
/// with that address's true path.
pub fn coin_at(account: &Account, chain: Chain, index: u32, value: u64, tag: u8) -> WalletCoin {
    let addr = account.chain(chain).get_address(index).unwrap();
    WalletCoin::new(outpoint(tag, index), value, addr.script_pubkey(), addr.path)
}

/// Encoded external address at `index`.
pub fn receive_address(account: &Account, index: u32) -> String {
    account.external().get_address(index).unwrap().address.to_string()
}
