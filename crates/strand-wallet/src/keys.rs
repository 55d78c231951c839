//! Seed management and BIP-32 hierarchical key derivation.
//!
//! A [`KeyTree`] holds the master extended private key for one
//! (mnemonic, passphrase) pair. Nodes are derived from it on request; private
//! key material never leaves this crate, and only public keys and addresses
//! are exposed to callers.

use bitcoin::bip32::{DerivationPath, Fingerprint, Xpriv, Xpub};
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::CompressedPublicKey;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use strand_core::network::Network;

use crate::error::WalletError;
use crate::mnemonic::mnemonic_to_seed;

/// A 64-byte BIP-39 seed.
///
/// Secret material is zeroized on drop to prevent leaking key material
/// in freed memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 64],
}

impl Seed {
    /// Create a seed from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self { bytes: self.bytes }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Parse a textual derivation path such as `m/84'/0'/0'/1/7` or `m/84h/0h/0h`.
///
/// Fails with [`WalletError::InvalidPath`] only for malformed syntax
/// (including normal indices of 2^31 and above, which cannot be written).
pub fn parse_path(path: &str) -> Result<DerivationPath, WalletError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidPath("empty path".into()));
    }
    DerivationPath::from_str(trimmed)
        .map_err(|e| WalletError::InvalidPath(format!("{trimmed}: {e}")))
}

/// Master node of a BIP-32 key tree.
pub struct KeyTree {
    master: Xpriv,
    fingerprint: Fingerprint,
    network: Network,
    secp: Secp256k1<All>,
}

impl KeyTree {
    /// Build the tree from a BIP-39 seed.
    pub fn from_seed(seed: &Seed, network: Network) -> Result<Self, WalletError> {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(network.to_bitcoin(), seed.as_bytes())?;
        let fingerprint = master.fingerprint(&secp);
        debug!("key tree ready: fingerprint={fingerprint} network={network}");
        Ok(Self {
            master,
            fingerprint,
            network,
            secp,
        })
    }

    /// Build the tree from a mnemonic and optional passphrase.
    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        network: Network,
    ) -> Result<Self, WalletError> {
        let seed = mnemonic_to_seed(phrase, passphrase)?;
        Self::from_seed(&seed, network)
    }

    /// Fingerprint of the master public key; identifies the seed publicly.
    pub fn master_fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn master_xpub(&self) -> Xpub {
        Xpub::from_priv(&self.secp, &self.master)
    }

    /// Derive the node at a textual path.
    pub fn derive(&self, path: &str) -> Result<KeyNode, WalletError> {
        let path = parse_path(path)?;
        self.derive_path(&path)
    }

    /// Derive the node at `path`.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<KeyNode, WalletError> {
        let xpriv = self.master.derive_priv(&self.secp, path)?;
        let xpub = Xpub::from_priv(&self.secp, &xpriv);
        Ok(KeyNode {
            path: path.clone(),
            xpriv,
            xpub,
            master_fingerprint: self.fingerprint,
        })
    }
}

impl Drop for KeyTree {
    fn drop(&mut self) {
        self.master.private_key.non_secure_erase();
    }
}

impl fmt::Debug for KeyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTree")
            .field("fingerprint", &self.fingerprint)
            .field("network", &self.network)
            .finish()
    }
}

/// A derived node: extended key pair plus the path that produced it.
pub struct KeyNode {
    path: DerivationPath,
    xpriv: Xpriv,
    xpub: Xpub,
    master_fingerprint: Fingerprint,
}

impl KeyNode {
    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    pub fn xpub(&self) -> Xpub {
        self.xpub
    }

    pub fn public_key(&self) -> CompressedPublicKey {
        self.xpub.to_pub()
    }

    /// Fingerprint of this node's own public key.
    pub fn fingerprint(&self) -> Fingerprint {
        self.xpub.fingerprint()
    }

    pub fn master_fingerprint(&self) -> Fingerprint {
        self.master_fingerprint
    }

    pub fn depth(&self) -> u8 {
        self.xpub.depth
    }
}

impl Drop for KeyNode {
    fn drop(&mut self) {
        self.xpriv.private_key.non_secure_erase();
    }
}

impl fmt::Debug for KeyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyNode")
            .field("path", &self.path)
            .field("xpub", &self.xpub)
            .finish()
    }
}
