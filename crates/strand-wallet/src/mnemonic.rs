//! BIP-39 mnemonic parsing, generation and seed stretching.

use bip39::{Language, Mnemonic};

use crate::error::WalletError;
use crate::keys::Seed;

/// Word counts BIP-39 defines.
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Parse a BIP-39 mnemonic phrase.
///
/// Normalizes whitespace and converts to lowercase before parsing.
pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, WalletError> {
    let normalized = phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    Mnemonic::parse_in(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Stretch a mnemonic and optional passphrase into the 64-byte BIP-39 seed.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
    let m = parse_mnemonic(phrase)?;
    Ok(Seed::from_bytes(m.to_seed(passphrase)))
}

/// Generate a fresh English mnemonic with `word_count` words from the OS RNG.
pub fn generate_mnemonic(word_count: usize) -> Result<String, WalletError> {
    use rand::RngCore;
    use zeroize::Zeroize;

    if !VALID_WORD_COUNTS.contains(&word_count) {
        return Err(WalletError::InvalidMnemonic(format!(
            "word count must be one of {VALID_WORD_COUNTS:?}, got {word_count}"
        )));
    }
    let mut entropy = [0u8; 32];
    let len = word_count / 3 * 4;
    rand::rngs::OsRng.fill_bytes(&mut entropy[..len]);
    let m = Mnemonic::from_entropy_in(Language::English, &entropy[..len])
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()));
    entropy.zeroize();
    Ok(m?.to_string())
}
