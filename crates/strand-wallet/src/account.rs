//! Accounts and their two deterministic address chains.
//!
//! An [`Account`] is the subtree at `m/purpose'/coin_type'/account'`. It keeps
//! only the account-level extended public key; every address below it is a
//! pure function of that key, the chain and the index, so accounts derived
//! from a mnemonic and watch-only accounts built from an xpub behave
//! identically.

use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint, Xpub};
use bitcoin::secp256k1::{Secp256k1, VerifyOnly};
use bitcoin::{Address, CompressedPublicKey, ScriptBuf};
use dashmap::DashMap;
use std::fmt;
use tracing::{debug, info};

use strand_core::address::encode_address;
use strand_core::constants::HARDENED_OFFSET;
use strand_core::network::{Network, NetworkParams, ScriptKind};
use strand_core::types::{AccountId, Chain};

use crate::error::WalletError;
use crate::keys::KeyTree;
use crate::ownership::NotOwnedReason;

/// An address produced by an [`AddressChain`], with the full path that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedAddress {
    pub chain: Chain,
    pub index: u32,
    /// Full path from the master key, e.g. `m/84'/0'/0'/1/3`.
    pub path: DerivationPath,
    pub address: Address,
    pub public_key: CompressedPublicKey,
}

impl DerivedAddress {
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }
}

/// One chain (`external` or `internal`) of an account.
///
/// Addresses are derived lazily and memoized per index. Concurrent callers
/// asking for the same index may both derive it; the results are identical,
/// so whichever insert lands last is as good as the first.
pub struct AddressChain {
    chain: Chain,
    account: AccountId,
    script_kind: ScriptKind,
    network: Network,
    chain_xpub: Xpub,
    secp: Secp256k1<VerifyOnly>,
    cache: DashMap<u32, DerivedAddress>,
}

impl AddressChain {
    fn new(
        chain: Chain,
        account: AccountId,
        account_xpub: &Xpub,
        script_kind: ScriptKind,
        secp: Secp256k1<VerifyOnly>,
    ) -> Result<Self, WalletError> {
        let chain_xpub = account_xpub.ckd_pub(&secp, ChildNumber::Normal { index: chain.index() })?;
        Ok(Self {
            chain,
            network: account.network,
            account,
            script_kind,
            chain_xpub,
            secp,
            cache: DashMap::new(),
        })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// The address at `index`. Indices of 2^31 and above are not normal
    /// children and fail with [`WalletError::InvalidPath`].
    pub fn get_address(&self, index: u32) -> Result<DerivedAddress, WalletError> {
        if let Some(hit) = self.cache.get(&index) {
            return Ok(hit.clone());
        }

        let child = ChildNumber::from_normal_idx(index)?;
        let public_key = self.chain_xpub.ckd_pub(&self.secp, child)?.to_pub();
        let address = encode_address(&self.secp, &public_key, self.script_kind, self.network);
        let derived = DerivedAddress {
            chain: self.chain,
            index,
            path: self.account.address_path(self.chain, index),
            address,
            public_key,
        };
        debug!("derived {} {}/{index}: {}", self.account, self.chain.index(), derived.address);

        self.cache.insert(index, derived.clone());
        Ok(derived)
    }

    /// Number of memoized addresses.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl fmt::Debug for AddressChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressChain")
            .field("account", &self.account)
            .field("chain", &self.chain)
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// A derived account with its external (receiving) and internal (change)
/// address chains.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    params: NetworkParams,
    xpub: Xpub,
    external: AddressChain,
    internal: AddressChain,
}

impl Account {
    /// Derive account `index` from an existing key tree.
    pub fn derive(tree: &KeyTree, params: &NetworkParams, index: u32) -> Result<Self, WalletError> {
        params.validate()?;
        if index >= HARDENED_OFFSET {
            return Err(WalletError::InvalidPath(format!(
                "account index {index} must be below 2^31"
            )));
        }
        if tree.network() != params.network {
            return Err(WalletError::KeyDerivation(format!(
                "key tree is for {}, parameters are for {}",
                tree.network(),
                params.network
            )));
        }

        let id = account_id(params, index, tree.master_fingerprint());
        let node = tree.derive_path(&id.base_path())?;
        Self::from_xpub(node.xpub(), tree.master_fingerprint(), params, index)
    }

    /// Derive account `index` straight from a mnemonic. The key tree lives
    /// only for the duration of this call.
    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        params: &NetworkParams,
        index: u32,
    ) -> Result<Self, WalletError> {
        let tree = KeyTree::from_mnemonic(phrase, passphrase, params.network)?;
        Self::derive(&tree, params, index)
    }

    /// Build a watch-only account from its extended public key
    /// (the key at `m/purpose'/coin_type'/index'`).
    pub fn from_xpub(
        xpub: Xpub,
        master_fingerprint: Fingerprint,
        params: &NetworkParams,
        index: u32,
    ) -> Result<Self, WalletError> {
        params.validate()?;
        if index >= HARDENED_OFFSET {
            return Err(WalletError::InvalidPath(format!(
                "account index {index} must be below 2^31"
            )));
        }

        let id = account_id(params, index, master_fingerprint);
        let secp = Secp256k1::verification_only();
        let kind = params.script_kind;
        let external = AddressChain::new(Chain::External, id, &xpub, kind, secp.clone())?;
        let internal = AddressChain::new(Chain::Internal, id, &xpub, kind, secp)?;
        info!("account {id} ready ({})", params.script_kind);

        Ok(Self {
            id,
            params: params.clone(),
            xpub,
            external,
            internal,
        })
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Account-level extended public key.
    pub fn xpub(&self) -> Xpub {
        self.xpub
    }

    pub fn master_fingerprint(&self) -> Fingerprint {
        self.id.master_fingerprint
    }

    pub fn network(&self) -> Network {
        self.id.network
    }

    /// Receiving addresses.
    pub fn external(&self) -> &AddressChain {
        &self.external
    }

    /// Change addresses.
    pub fn internal(&self) -> &AddressChain {
        &self.internal
    }

    pub fn chain(&self, chain: Chain) -> &AddressChain {
        match chain {
            Chain::External => &self.external,
            Chain::Internal => &self.internal,
        }
    }

    /// `count` consecutive addresses of `chain` starting at `start`.
    pub fn derive_range(
        &self,
        chain: Chain,
        start: u32,
        count: u32,
    ) -> Result<Vec<DerivedAddress>, WalletError> {
        let end = start.checked_add(count).ok_or_else(|| {
            WalletError::InvalidPath(format!("range {start}+{count} overflows"))
        })?;
        let chain = self.chain(chain);
        (start..end).map(|i| chain.get_address(i)).collect()
    }

    /// Split a full path into its chain and index if it lies directly under
    /// this account.
    pub fn locate(&self, path: &DerivationPath) -> Result<(Chain, u32), NotOwnedReason> {
        let components: &[ChildNumber] = path.as_ref();
        let base = self.id.base_path();
        let base: &[ChildNumber] = base.as_ref();
        if components.len() != 5 || &components[..3] != base {
            return Err(NotOwnedReason::PathOutsideAccount);
        }
        let chain = match components[3] {
            ChildNumber::Normal { index } => {
                Chain::from_index(index).ok_or(NotOwnedReason::UnknownChain)?
            }
            ChildNumber::Hardened { .. } => return Err(NotOwnedReason::UnknownChain),
        };
        match components[4] {
            ChildNumber::Normal { index } => Ok((chain, index)),
            ChildNumber::Hardened { .. } => Err(NotOwnedReason::PathOutsideAccount),
        }
    }

    /// Resolve any full address path under this account.
    pub fn address_for_path(&self, path: &DerivationPath) -> Result<DerivedAddress, WalletError> {
        let (chain, index) = self.locate(path).map_err(|reason| {
            WalletError::InvalidPath(format!("{path} under {}: {reason}", self.id))
        })?;
        self.chain(chain).get_address(index)
    }
}

fn account_id(params: &NetworkParams, index: u32, master_fingerprint: Fingerprint) -> AccountId {
    AccountId {
        network: params.network,
        purpose: params.purpose,
        coin_type: params.coin_type,
        account_index: index,
        master_fingerprint,
    }
}
