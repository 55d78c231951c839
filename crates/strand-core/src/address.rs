//! Address encoding and destination parsing.
//!
//! Encoding maps a compressed public key to the locking script family of the
//! account ([`ScriptKind`]); parsing accepts any standard address but insists
//! that it belongs to the configured [`Network`].

use bitcoin::address::NetworkUnchecked;
use bitcoin::secp256k1::{Secp256k1, Verification};
use bitcoin::{Address, CompressedPublicKey};

use crate::error::AddressError;
use crate::network::{Network, ScriptKind};

/// Encode the address of `public_key` for a script kind and network.
pub fn encode_address<C: Verification>(
    secp: &Secp256k1<C>,
    public_key: &CompressedPublicKey,
    kind: ScriptKind,
    network: Network,
) -> Address {
    let net = network.to_bitcoin();
    match kind {
        ScriptKind::Legacy => Address::p2pkh(public_key.pubkey_hash(), net),
        ScriptKind::NestedSegwit => Address::p2shwpkh(public_key, net),
        ScriptKind::NativeSegwit => Address::p2wpkh(public_key, net),
        ScriptKind::Taproot => {
            let (internal_key, _parity) = public_key.0.x_only_public_key();
            Address::p2tr(secp, internal_key, None, net)
        }
    }
}

/// Parse a destination address and check it against `network`.
///
/// Testnet and signet share an encoding, so an address valid for one is
/// accepted for the other.
pub fn parse_address(s: &str, network: Network) -> Result<Address, AddressError> {
    let trimmed = s.trim();
    let unchecked: Address<NetworkUnchecked> =
        trimmed.parse().map_err(|e: bitcoin::address::ParseError| AddressError::Malformed {
            address: trimmed.to_string(),
            reason: e.to_string(),
        })?;
    unchecked
        .require_network(network.to_bitcoin())
        .map_err(|_| AddressError::WrongNetwork {
            address: trimmed.to_string(),
            network: network.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // Public key of m/84'/0'/0'/0/0 for the all-"abandon" test mnemonic (BIP-84).
    const BIP84_PUBKEY: &str = "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c";

    fn pubkey() -> CompressedPublicKey {
        CompressedPublicKey::from_str(BIP84_PUBKEY).unwrap()
    }

    #[test]
    fn native_segwit_matches_bip84_vector() {
        let secp = Secp256k1::verification_only();
        let addr = encode_address(&secp, &pubkey(), ScriptKind::NativeSegwit, Network::Mainnet);
        assert_eq!(addr.to_string(), "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
    }

    #[test]
    fn kinds_produce_distinct_prefixes() {
        let secp = Secp256k1::verification_only();
        let pk = pubkey();
        let mainnet = |kind| encode_address(&secp, &pk, kind, Network::Mainnet).to_string();
        let legacy = mainnet(ScriptKind::Legacy);
        let nested = mainnet(ScriptKind::NestedSegwit);
        let taproot = mainnet(ScriptKind::Taproot);
        assert!(legacy.starts_with('1'));
        assert!(nested.starts_with('3'));
        assert!(taproot.starts_with("bc1p"));
    }

    #[test]
    fn testnet_encoding() {
        let secp = Secp256k1::verification_only();
        let addr = encode_address(&secp, &pubkey(), ScriptKind::NativeSegwit, Network::Testnet);
        assert!(addr.to_string().starts_with("tb1q"));
        let regtest = encode_address(&secp, &pubkey(), ScriptKind::NativeSegwit, Network::Regtest);
        assert!(regtest.to_string().starts_with("bcrt1q"));
    }

    #[test]
    fn parse_accepts_matching_network() {
        let padded = " bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu ";
        let addr = parse_address(padded, Network::Mainnet).unwrap();
        assert_eq!(addr.to_string(), "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
    }

    #[test]
    fn parse_rejects_wrong_network() {
        let err = parse_address("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu", Network::Testnet)
            .unwrap_err();
        assert!(matches!(err, AddressError::WrongNetwork { .. }));
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_address("not-an-address", Network::Mainnet).unwrap_err();
        assert!(matches!(err, AddressError::Malformed { .. }));
    }

    #[test]
    fn parse_rejects_bad_checksum() {
        let err = parse_address("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyv", Network::Mainnet)
            .unwrap_err();
        assert!(matches!(err, AddressError::Malformed { .. }));
    }
}
