//! Engine constants. All monetary values in satoshis (1 BTC = 10^8 sats).
//!
//! Everything here is a *default*: the hosting application may override the
//! derivation purpose, coin type, dust threshold and size constants through
//! [`EngineConfig`](crate::config::EngineConfig).

pub const COIN: u64 = 100_000_000;

/// First hardened BIP-32 child index. Normal indices must stay below this.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Chain component of the derivation path for receiving addresses.
pub const EXTERNAL_CHAIN: u32 = 0;

/// Chain component of the derivation path for change addresses.
pub const INTERNAL_CHAIN: u32 = 1;

// --- BIP-43 purpose values ---

/// BIP-44 purpose (P2PKH).
pub const PURPOSE_LEGACY: u32 = 44;
/// BIP-49 purpose (P2SH-wrapped P2WPKH).
pub const PURPOSE_NESTED_SEGWIT: u32 = 49;
/// BIP-84 purpose (native P2WPKH).
pub const PURPOSE_NATIVE_SEGWIT: u32 = 84;
/// BIP-86 purpose (single-key P2TR).
pub const PURPOSE_TAPROOT: u32 = 86;

// --- SLIP-44 coin types ---

/// Coin type for Bitcoin mainnet.
pub const COIN_TYPE_MAINNET: u32 = 0;
/// Coin type shared by every test network.
pub const COIN_TYPE_TESTNET: u32 = 1;

// --- Dust thresholds (Bitcoin Core policy at the 3 sat/vB dust relay fee) ---

pub const DUST_P2PKH: u64 = 546;
pub const DUST_P2SH_P2WPKH: u64 = 540;
pub const DUST_P2WPKH: u64 = 294;
pub const DUST_P2TR: u64 = 330;

// --- Pre-signature size estimates in weight units ---
//
// Overhead covers version, locktime and the in/out counts, plus the segwit
// marker and flag where the spend carries a witness. Input weights assume a
// 72-byte DER signature (the worst case) so the estimate never undershoots
// the signed transaction.

pub const OVERHEAD_WEIGHT_LEGACY: u64 = 40;
pub const OVERHEAD_WEIGHT_SEGWIT: u64 = 42;

pub const INPUT_WEIGHT_P2PKH: u64 = 592;
pub const INPUT_WEIGHT_P2SH_P2WPKH: u64 = 364;
pub const INPUT_WEIGHT_P2WPKH: u64 = 272;
pub const INPUT_WEIGHT_P2TR: u64 = 230;

pub const OUTPUT_WEIGHT_P2PKH: u64 = 136;
pub const OUTPUT_WEIGHT_P2SH: u64 = 128;
pub const OUTPUT_WEIGHT_P2WPKH: u64 = 124;
pub const OUTPUT_WEIGHT_P2TR: u64 = 172;

/// Weight units per virtual byte.
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// Fee rates are carried per 1000 virtual bytes.
pub const FEE_RATE_SCALE: u64 = 1_000;
