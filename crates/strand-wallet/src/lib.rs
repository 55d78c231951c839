//! # strand-wallet — HD accounts and unsigned transaction building.
//!
//! Derives BIP-32 accounts from a BIP-39 mnemonic, proves ownership of
//! indexer-reported coins by re-deriving their addresses, and builds
//! unsigned transactions with fee-rate-aware change for an external signer.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`mnemonic`] — BIP-39 parsing, generation and seed stretching
//! - [`keys`] — Seed, KeyTree, KeyNode
//! - [`account`] — Accounts and their external/internal address chains
//! - [`ownership`] — Coin ownership validation
//! - [`fee`] — Pre-signature fee estimation
//! - [`coin_selection`] — Largest-first coin selection
//! - [`builder`] — Unsigned transaction and PSBT construction
//! - [`wallet`] — Provider trait and the UTXO wallet

pub mod account;
pub mod builder;
pub mod coin_selection;
pub mod error;
pub mod fee;
pub mod keys;
pub mod mnemonic;
pub mod ownership;
pub mod wallet;

// Re-exports for convenient access
pub use account::{Account, AddressChain, DerivedAddress};
pub use builder::{
    build_transaction, BuildRequest, TransactionBuilder, TxOutput, UnsignedTransaction,
};
pub use coin_selection::{CoinSelection, CoinSelector};
pub use error::WalletError;
pub use fee::FeeEstimator;
pub use keys::{parse_path, KeyNode, KeyTree, Seed};
pub use mnemonic::{generate_mnemonic, mnemonic_to_seed, parse_mnemonic};
pub use ownership::{NotOwnedReason, Ownership, OwnershipValidator, Partition};
pub use wallet::{Wallet, WalletBalance, WalletProvider};
