mod account;
pub mod bech32;
mod error;
mod hd;
mod network;
mod taproot;
mod types;
mod util;

pub use account::{AccountContext, PrivateAccount, PublicAccount, SeedAccount, SeedOptions};
pub use error::Bip86Error;
pub use hd::{
    ChildNumber, DerivationPath, ExtendedKey, WalletMnemonic, BIP86_PURPOSE, HARDENED_OFFSET,
};
pub use network::{KeyPrefix, Network, NetworkParams, MAINNET, TESTNET};
pub use taproot::{
    output_key_address, p2tr_address, tap_tweak, taproot_output_key, TAPROOT_WITNESS_VERSION,
};
pub use types::{PrivateKey, PublicKey};
pub use util::tagged_hash;

/// Generates a fresh English mnemonic with `word_count` words (12, 15, 18, 21 or 24).
#[cfg(feature = "rand")]
pub fn generate_mnemonic(word_count: usize) -> Result<String, Bip86Error> {
    Ok(WalletMnemonic::generate(word_count)?.phrase())
}

pub fn entropy_to_mnemonic(entropy: &[u8]) -> Result<String, Bip86Error> {
    Ok(WalletMnemonic::from_entropy(entropy)?.phrase())
}

/// Derives `path` from `seed` and returns the P2TR address of the resulting key.
pub fn derive_address(
    seed: &[u8],
    path: &DerivationPath,
    network: Network,
) -> Result<String, Bip86Error> {
    let key = ExtendedKey::from_seed(seed, network)?.derive_path(path)?;
    p2tr_address(key.public_key(), network)
}
