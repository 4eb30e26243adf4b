//! BIP86 account contexts.
//!
//! A context is built once from a mnemonic/seed or from a base58 extended key and
//! answers key and address queries as pure functions of `(index, is_change)`.
//! Leaf keys of imported accounts are always `account/change/index`, two
//! non-hardened steps below the held node.

use std::fmt;

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::Bip86Error;
use crate::hd::{ChildNumber, DerivationPath, ExtendedKey, WalletMnemonic, BIP86_PURPOSE};
use crate::network::{KeyPrefix, Network};
use crate::taproot::p2tr_address;

const RECEIVE_CHAIN: u32 = 0;
const CHANGE_CHAIN: u32 = 1;

/// Configuration of a root (seed-backed) context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SeedOptions {
    /// Explicit network; takes precedence over `testnet`.
    pub network: Option<Network>,
    pub testnet: bool,
    /// SLIP-44 coin type for mainnet accounts. Testnet accounts always use 1.
    pub coin_type: Option<u32>,
}

impl SeedOptions {
    pub fn mainnet() -> Self {
        Self::default()
    }

    pub fn testnet() -> Self {
        Self {
            testnet: true,
            ..Self::default()
        }
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_coin_type(mut self, coin_type: u32) -> Self {
        self.coin_type = Some(coin_type);
        self
    }

    pub fn network(&self) -> Network {
        match (self.network, self.testnet) {
            (Some(network), _) => network,
            (None, true) => Network::Testnet,
            (None, false) => Network::Mainnet,
        }
    }

    pub fn coin_type(&self) -> u32 {
        if self.network().is_testnet() {
            Network::Testnet.coin_type()
        } else {
            self.coin_type.unwrap_or(Network::Mainnet.coin_type())
        }
    }
}

fn derive_leaf(
    account: &ExtendedKey,
    index: u32,
    is_change: bool,
) -> Result<ExtendedKey, Bip86Error> {
    let chain = ChildNumber::normal(if is_change { CHANGE_CHAIN } else { RECEIVE_CHAIN })?;
    let leaf = ChildNumber::normal(index)?;
    account.derive_child(chain)?.derive_child(leaf)
}

fn import_extended(encoded: &str, private: bool) -> Result<ExtendedKey, Bip86Error> {
    let prefix = KeyPrefix::parse(encoded)?;
    if prefix.is_private() != private {
        return Err(Bip86Error::UnsupportedKeyPrefix(encoded[..4].to_string()));
    }
    ExtendedKey::from_base58(encoded, prefix.network())
}

/// Root context holding a BIP39 seed.
pub struct SeedAccount {
    seed: Zeroizing<Vec<u8>>,
    network: Network,
    coin_type: u32,
}

impl SeedAccount {
    pub fn from_seed(seed: &[u8], options: &SeedOptions) -> Result<Self, Bip86Error> {
        let network = options.network();
        ExtendedKey::from_seed(seed, network)?;
        let coin_type = options.coin_type();
        debug!(%network, coin_type, "created seed account context");
        Ok(Self {
            seed: Zeroizing::new(seed.to_vec()),
            network,
            coin_type,
        })
    }

    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        options: &SeedOptions,
    ) -> Result<Self, Bip86Error> {
        let mnemonic = WalletMnemonic::from_phrase(phrase)?;
        let seed = mnemonic.seed(passphrase);
        Self::from_seed(seed.as_slice(), options)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn coin_type(&self) -> u32 {
        self.coin_type
    }

    pub fn master_key(&self) -> Result<ExtendedKey, Bip86Error> {
        ExtendedKey::from_seed(&self.seed, self.network)
    }

    pub fn root_private_key(&self) -> Result<String, Bip86Error> {
        Ok(self.master_key()?.to_base58())
    }

    pub fn root_public_key(&self) -> Result<String, Bip86Error> {
        Ok(self.master_key()?.neuter().to_base58())
    }

    /// The account node `m/purpose'/coin_type'/account'`.
    pub fn account_key(&self, account: u32, purpose: u32) -> Result<ExtendedKey, Bip86Error> {
        let path = DerivationPath::account(purpose, self.coin_type, account)?;
        debug!(%path, "deriving account key");
        self.master_key()?.derive_path(&path)
    }

    /// Base58 private key of BIP86 account `account`.
    pub fn derive_account(&self, account: u32) -> Result<String, Bip86Error> {
        self.derive_account_with_purpose(account, BIP86_PURPOSE)
    }

    pub fn derive_account_with_purpose(
        &self,
        account: u32,
        purpose: u32,
    ) -> Result<String, Bip86Error> {
        Ok(self.account_key(account, purpose)?.to_base58())
    }
}

impl fmt::Debug for SeedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedAccount")
            .field("network", &self.network)
            .field("coin_type", &self.coin_type)
            .finish_non_exhaustive()
    }
}

/// Account-level context imported from an `xprv`/`tprv` string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateAccount {
    key: ExtendedKey,
}

impl PrivateAccount {
    pub fn from_base58(xprv: &str) -> Result<Self, Bip86Error> {
        let key = import_extended(xprv, true)?;
        debug!(network = %key.network(), depth = key.depth(), "imported private account key");
        Ok(Self { key })
    }

    pub fn network(&self) -> Network {
        self.key.network()
    }

    pub fn account_key(&self) -> &ExtendedKey {
        &self.key
    }

    pub fn account_private_key(&self) -> String {
        self.key.to_base58()
    }

    pub fn account_public_key(&self) -> String {
        self.key.neuter().to_base58()
    }

    pub fn leaf_key(&self, index: u32, is_change: bool) -> Result<ExtendedKey, Bip86Error> {
        derive_leaf(&self.key, index, is_change)
    }

    /// WIF of the leaf private key.
    pub fn private_key(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        self.leaf_key(index, is_change)?.to_wif()
    }

    pub fn public_key(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        Ok(self.leaf_key(index, is_change)?.public_key().to_hex())
    }

    pub fn address(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        let leaf = self.leaf_key(index, is_change)?;
        p2tr_address(leaf.public_key(), self.network())
    }
}

/// Watch-only account context imported from an `xpub`/`tpub` string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicAccount {
    key: ExtendedKey,
}

impl PublicAccount {
    pub fn from_base58(xpub: &str) -> Result<Self, Bip86Error> {
        let key = import_extended(xpub, false)?;
        debug!(network = %key.network(), depth = key.depth(), "imported watch-only account key");
        Ok(Self { key })
    }

    pub fn network(&self) -> Network {
        self.key.network()
    }

    pub fn account_key(&self) -> &ExtendedKey {
        &self.key
    }

    pub fn account_public_key(&self) -> String {
        self.key.to_base58()
    }

    pub fn leaf_key(&self, index: u32, is_change: bool) -> Result<ExtendedKey, Bip86Error> {
        derive_leaf(&self.key, index, is_change)
    }

    pub fn public_key(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        Ok(self.leaf_key(index, is_change)?.public_key().to_hex())
    }

    pub fn address(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        let leaf = self.leaf_key(index, is_change)?;
        p2tr_address(leaf.public_key(), self.network())
    }
}

/// The three derivation contexts behind one dispatch surface.
#[derive(Debug)]
pub enum AccountContext {
    FromSeed(SeedAccount),
    FromPrivateExtendedKey(PrivateAccount),
    FromPublicExtendedKey(PublicAccount),
}

impl AccountContext {
    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        options: &SeedOptions,
    ) -> Result<Self, Bip86Error> {
        SeedAccount::from_mnemonic(phrase, passphrase, options).map(Self::FromSeed)
    }

    pub fn from_seed(seed: &[u8], options: &SeedOptions) -> Result<Self, Bip86Error> {
        SeedAccount::from_seed(seed, options).map(Self::FromSeed)
    }

    /// Chooses the private or watch-only context from the key's prefix.
    pub fn from_extended_key(encoded: &str) -> Result<Self, Bip86Error> {
        if KeyPrefix::parse(encoded)?.is_private() {
            PrivateAccount::from_base58(encoded).map(Self::FromPrivateExtendedKey)
        } else {
            PublicAccount::from_base58(encoded).map(Self::FromPublicExtendedKey)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::FromSeed(_) => "seed",
            Self::FromPrivateExtendedKey(_) => "private extended key",
            Self::FromPublicExtendedKey(_) => "public extended key",
        }
    }

    fn unsupported(&self, operation: &'static str) -> Bip86Error {
        Bip86Error::UnsupportedOperation {
            context: self.kind(),
            operation,
        }
    }

    pub fn network(&self) -> Network {
        match self {
            Self::FromSeed(account) => account.network(),
            Self::FromPrivateExtendedKey(account) => account.network(),
            Self::FromPublicExtendedKey(account) => account.network(),
        }
    }

    pub fn root_private_key(&self) -> Result<String, Bip86Error> {
        match self {
            Self::FromSeed(account) => account.root_private_key(),
            _ => Err(self.unsupported("root private key")),
        }
    }

    pub fn root_public_key(&self) -> Result<String, Bip86Error> {
        match self {
            Self::FromSeed(account) => account.root_public_key(),
            _ => Err(self.unsupported("root public key")),
        }
    }

    pub fn derive_account(&self, account: u32) -> Result<String, Bip86Error> {
        match self {
            Self::FromSeed(seed) => seed.derive_account(account),
            _ => Err(self.unsupported("account derivation")),
        }
    }

    pub fn account_private_key(&self) -> Result<String, Bip86Error> {
        match self {
            Self::FromPrivateExtendedKey(account) => Ok(account.account_private_key()),
            _ => Err(self.unsupported("account private key")),
        }
    }

    pub fn account_public_key(&self) -> Result<String, Bip86Error> {
        match self {
            Self::FromPrivateExtendedKey(account) => Ok(account.account_public_key()),
            Self::FromPublicExtendedKey(account) => Ok(account.account_public_key()),
            Self::FromSeed(_) => Err(self.unsupported("account public key")),
        }
    }

    pub fn private_key(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        match self {
            Self::FromPrivateExtendedKey(account) => account.private_key(index, is_change),
            _ => Err(self.unsupported("leaf private key")),
        }
    }

    pub fn public_key(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        match self {
            Self::FromPrivateExtendedKey(account) => account.public_key(index, is_change),
            Self::FromPublicExtendedKey(account) => account.public_key(index, is_change),
            Self::FromSeed(_) => Err(self.unsupported("leaf public key")),
        }
    }

    pub fn address(&self, index: u32, is_change: bool) -> Result<String, Bip86Error> {
        match self {
            Self::FromPrivateExtendedKey(account) => account.address(index, is_change),
            Self::FromPublicExtendedKey(account) => account.address(index, is_change),
            Self::FromSeed(_) => Err(self.unsupported("leaf address")),
        }
    }
}

impl From<SeedAccount> for AccountContext {
    fn from(account: SeedAccount) -> Self {
        Self::FromSeed(account)
    }
}

impl From<PrivateAccount> for AccountContext {
    fn from(account: PrivateAccount) -> Self {
        Self::FromPrivateExtendedKey(account)
    }
}

impl From<PublicAccount> for AccountContext {
    fn from(account: PublicAccount) -> Self {
        Self::FromPublicExtendedKey(account)
    }
}
