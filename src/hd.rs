use std::fmt;
use std::str::FromStr;

use bip39::{Language, Mnemonic};
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::Bip86Error;
use crate::network::Network;
use crate::types::{PrivateKey, PublicKey};
use crate::util::{decode_base58_check, encode_base58_check, hmac_sha512, ser32, split_digest};

const MASTER_KEY_DOMAIN: &[u8] = b"Bitcoin seed";
pub const HARDENED_OFFSET: u32 = 1 << 31;
pub const BIP86_PURPOSE: u32 = 86;
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;
const EXTENDED_KEY_LEN: usize = 78;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildNumber {
    index: u32,
    hardened: bool,
}

impl ChildNumber {
    pub fn normal(index: u32) -> Result<Self, Bip86Error> {
        if index >= HARDENED_OFFSET {
            return Err(Bip86Error::MalformedPath(format!(
                "normal child index {index} exceeds maximum"
            )));
        }
        Ok(Self {
            index,
            hardened: false,
        })
    }

    pub fn hardened(index: u32) -> Result<Self, Bip86Error> {
        if index >= HARDENED_OFFSET {
            return Err(Bip86Error::MalformedPath(format!(
                "hardened child index {index} exceeds maximum"
            )));
        }
        Ok(Self {
            index,
            hardened: true,
        })
    }

    /// Interprets a raw BIP32 index: the top bit selects hardened derivation.
    pub fn from_raw(value: u32) -> Self {
        Self {
            index: value & !HARDENED_OFFSET,
            hardened: value & HARDENED_OFFSET != 0,
        }
    }

    pub fn is_hardened(&self) -> bool {
        self.hardened
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn value(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// A root-relative derivation path such as `m/86'/0'/0'/0/0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    pub fn new(path: Vec<ChildNumber>) -> Self {
        Self(path)
    }

    pub fn master() -> Self {
        Self(Vec::new())
    }

    /// `m/purpose'/coin_type'/account'`.
    pub fn account(purpose: u32, coin_type: u32, account: u32) -> Result<Self, Bip86Error> {
        Ok(Self(vec![
            ChildNumber::hardened(purpose)?,
            ChildNumber::hardened(coin_type)?,
            ChildNumber::hardened(account)?,
        ]))
    }

    pub fn child(&self, child: ChildNumber) -> Self {
        let mut path = self.0.clone();
        path.push(child);
        Self(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChildNumber> {
        self.0.iter()
    }
}

impl IntoIterator for DerivationPath {
    type Item = ChildNumber;
    type IntoIter = std::vec::IntoIter<ChildNumber>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DerivationPath {
    type Item = &'a ChildNumber;
    type IntoIter = std::slice::Iter<'a, ChildNumber>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.0 {
            write!(f, "/{child}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = Bip86Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut components = s.trim().split('/');
        match components.next() {
            Some("m") | Some("M") => {}
            _ => {
                return Err(Bip86Error::MalformedPath(format!(
                    "`{s}` must start with `m`"
                )))
            }
        }
        components
            .map(parse_child)
            .collect::<Result<Vec<_>, _>>()
            .map(DerivationPath)
    }
}

fn parse_child(segment: &str) -> Result<ChildNumber, Bip86Error> {
    let hardened = segment.ends_with(['\'', 'h', 'H']);
    let digits = if hardened {
        &segment[..segment.len() - 1]
    } else {
        segment
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Bip86Error::MalformedPath(format!(
            "invalid path segment `{segment}`"
        )));
    }
    let index: u32 = digits
        .parse()
        .map_err(|_| Bip86Error::MalformedPath(format!("index `{digits}` is out of range")))?;
    if hardened {
        ChildNumber::hardened(index)
    } else {
        ChildNumber::normal(index)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DerivationPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DerivationPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// BIP39 mnemonic in the English wordlist; the seed source for root accounts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletMnemonic {
    inner: Mnemonic,
}

impl WalletMnemonic {
    pub fn from_phrase(phrase: &str) -> Result<Self, Bip86Error> {
        Ok(Self {
            inner: Mnemonic::parse_in_normalized(Language::English, phrase)?,
        })
    }

    pub fn from_entropy(entropy: &[u8]) -> Result<Self, Bip86Error> {
        Ok(Self {
            inner: Mnemonic::from_entropy_in(Language::English, entropy)?,
        })
    }

    #[cfg(feature = "rand")]
    pub fn generate(word_count: usize) -> Result<Self, Bip86Error> {
        Ok(Self {
            inner: Mnemonic::generate_in(Language::English, word_count)?,
        })
    }

    pub fn phrase(&self) -> String {
        self.inner.to_string()
    }

    pub fn seed(&self, passphrase: &str) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.inner.to_seed(passphrase))
    }
}

/// One node of a BIP32 tree. Public-only nodes carry no private key.
///
/// Values are immutable: derivation and neutering return new keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedKey {
    private_key: Option<PrivateKey>,
    public_key: PublicKey,
    chain_code: [u8; 32],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    network: Network,
}

impl ExtendedKey {
    pub fn from_seed(seed: &[u8], network: Network) -> Result<Self, Bip86Error> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(Bip86Error::InvalidSeed);
        }
        let digest = Zeroizing::new(hmac_sha512(MASTER_KEY_DOMAIN, seed)?);
        let (left, chain_code) = split_digest(&digest);
        let left = Zeroizing::new(left);
        let private_key =
            PrivateKey::from_bytes_be(*left, network).map_err(|_| Bip86Error::InvalidSeed)?;
        Ok(Self {
            public_key: private_key.public_key(),
            private_key: Some(private_key),
            chain_code,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
            network,
        })
    }

    pub fn from_mnemonic(
        phrase: &str,
        passphrase: &str,
        network: Network,
    ) -> Result<Self, Bip86Error> {
        let mnemonic = WalletMnemonic::from_phrase(phrase)?;
        let seed = mnemonic.seed(passphrase);
        Self::from_seed(seed.as_slice(), network)
    }

    pub fn is_private(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn child_number(&self) -> ChildNumber {
        ChildNumber::from_raw(self.child_number)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        self.public_key.fingerprint()
    }

    pub fn derive_child(&self, child: ChildNumber) -> Result<Self, Bip86Error> {
        let depth = self.depth.checked_add(1).ok_or(Bip86Error::DepthOverflow)?;

        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if child.is_hardened() {
            let private_key = self
                .private_key
                .as_ref()
                .ok_or(Bip86Error::HardenedDerivationRequiresPrivateKey)?;
            data.push(0);
            data.extend_from_slice(&private_key.to_be_bytes());
        } else {
            data.extend_from_slice(&self.public_key.to_bytes());
        }
        data.extend_from_slice(&ser32(child.value()));

        let digest = Zeroizing::new(hmac_sha512(&self.chain_code, &data)?);
        let (tweak, chain_code) = split_digest(&digest);
        let tweak = Zeroizing::new(tweak);

        let (private_key, public_key) = match &self.private_key {
            Some(parent) => {
                let child_key = parent.add_tweak(*tweak)?;
                (Some(child_key), child_key.public_key())
            }
            None => (None, self.public_key.add_exp_tweak(*tweak)?),
        };

        trace!(
            depth,
            index = child.index(),
            hardened = child.is_hardened(),
            private = private_key.is_some(),
            "derived child key"
        );

        Ok(Self {
            private_key,
            public_key,
            chain_code,
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number: child.value(),
            network: self.network,
        })
    }

    /// Walks a root-relative path; the receiver must be a master key.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, Bip86Error> {
        if self.depth != 0 {
            return Err(Bip86Error::MalformedPath(format!(
                "`{path}` is root-relative but the key is at depth {}",
                self.depth
            )));
        }
        path.iter()
            .try_fold(self.clone(), |current, child| current.derive_child(*child))
    }

    /// The same node with its private key removed.
    pub fn neuter(&self) -> Self {
        Self {
            private_key: None,
            ..self.clone()
        }
    }

    pub fn to_wif(&self) -> Result<String, Bip86Error> {
        self.private_key
            .as_ref()
            .map(PrivateKey::to_wif)
            .ok_or(Bip86Error::UnsupportedOperation {
                context: "public-only extended key",
                operation: "WIF export",
            })
    }

    pub fn to_base58(&self) -> String {
        let mut payload = Vec::with_capacity(EXTENDED_KEY_LEN);
        payload.extend_from_slice(&ser32(self.network.extended_version(self.is_private())));
        payload.push(self.depth);
        payload.extend_from_slice(&self.parent_fingerprint);
        payload.extend_from_slice(&ser32(self.child_number));
        payload.extend_from_slice(&self.chain_code);
        match &self.private_key {
            Some(private_key) => {
                payload.push(0);
                payload.extend_from_slice(&private_key.to_be_bytes());
            }
            None => payload.extend_from_slice(&self.public_key.to_bytes()),
        }
        let payload = Zeroizing::new(payload);
        encode_base58_check(&payload)
    }

    /// Decodes a base58 extended key that must belong to `network`.
    pub fn from_base58(encoded: &str, network: Network) -> Result<Self, Bip86Error> {
        let key: Self = encoded.parse()?;
        if key.network != network {
            return Err(Bip86Error::NetworkMismatch {
                expected: network.name(),
                found: key.network.name(),
            });
        }
        Ok(key)
    }
}

impl fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for ExtendedKey {
    type Err = Bip86Error;

    /// Decodes a base58 extended key, taking the network from its version bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = Zeroizing::new(decode_base58_check(s)?);
        parse_extended(&payload)
    }
}

fn parse_extended(payload: &[u8]) -> Result<ExtendedKey, Bip86Error> {
    if payload.len() != EXTENDED_KEY_LEN {
        return Err(Bip86Error::InvalidLength(format!(
            "extended key payload is {} bytes, expected {EXTENDED_KEY_LEN}",
            payload.len()
        )));
    }

    let version = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let (network, private) = Network::from_extended_version(version)?;
    let depth = payload[4];
    let mut parent_fingerprint = [0u8; 4];
    parent_fingerprint.copy_from_slice(&payload[5..9]);
    let child_number = u32::from_be_bytes([payload[9], payload[10], payload[11], payload[12]]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&payload[13..45]);
    let key_data = &payload[45..];

    if depth == 0 && (parent_fingerprint != [0u8; 4] || child_number != 0) {
        return Err(Bip86Error::InvalidKeyData(
            "master key must have zero parent fingerprint and child index".into(),
        ));
    }

    let (private_key, public_key) = if private {
        if key_data[0] != 0 {
            return Err(Bip86Error::InvalidKeyData(
                "extended private key is missing leading 0x00".into(),
            ));
        }
        let mut secret_bytes = Zeroizing::new([0u8; 32]);
        secret_bytes.copy_from_slice(&key_data[1..]);
        let private_key = PrivateKey::from_bytes_be(*secret_bytes, network)?;
        (Some(private_key), private_key.public_key())
    } else {
        (None, PublicKey::from_slice(key_data)?)
    };

    Ok(ExtendedKey {
        private_key,
        public_key,
        chain_code,
        depth,
        parent_fingerprint,
        child_number,
        network,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const VECTOR_ONE_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn vector_one_master() -> ExtendedKey {
        ExtendedKey::from_seed(&hex::decode(VECTOR_ONE_SEED).unwrap(), Network::Mainnet).unwrap()
    }

    #[test]
    fn mnemonic_from_zero_entropy() {
        let mnemonic = WalletMnemonic::from_entropy(&[0u8; 16]).unwrap();
        assert_eq!(mnemonic.phrase(), TEST_MNEMONIC);
        assert_eq!(WalletMnemonic::from_phrase(TEST_MNEMONIC).unwrap(), mnemonic);
        assert_eq!(mnemonic.seed("").len(), 64);
        assert!(matches!(
            WalletMnemonic::from_phrase("abandon abandon"),
            Err(Bip86Error::Mnemonic(_))
        ));
    }

    #[test]
    fn bip32_vector_one_master() {
        let master = vector_one_master();
        assert_eq!(
            master.to_base58(),
            "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi"
        );
        assert_eq!(
            master.neuter().to_base58(),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
    }

    #[test]
    fn bip32_vector_one_children() {
        let master = vector_one_master();
        let hardened: DerivationPath = "m/0H".parse().unwrap();
        let child = master.derive_path(&hardened).unwrap();
        assert_eq!(
            child.to_base58(),
            "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7"
        );
        assert_eq!(
            child.neuter().to_base58(),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );
        assert_eq!(child.parent_fingerprint(), master.fingerprint());
        assert_eq!(child.depth(), 1);

        let grandchild = child.derive_child(ChildNumber::normal(1).unwrap()).unwrap();
        assert_eq!(
            grandchild.to_base58(),
            "xprv9wTYmMFdV23N2TdNG573QoEsfRrWKQgWeibmLntzniatZvR9BmLnvSxqu53Kw1UmYPxLgboyZQaXwTCg8MSY3H2EU4pWcQDnRnrVA1xe8fs"
        );

        let public_grandchild = child
            .neuter()
            .derive_child(ChildNumber::normal(1).unwrap())
            .unwrap();
        assert!(!public_grandchild.is_private());
        assert_eq!(public_grandchild, grandchild.neuter());
        assert_eq!(
            public_grandchild.to_base58(),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
    }

    #[test]
    fn hardened_from_public_fails() {
        let public = vector_one_master().neuter();
        assert_eq!(
            public.derive_child(ChildNumber::hardened(0).unwrap()),
            Err(Bip86Error::HardenedDerivationRequiresPrivateKey)
        );
        assert_eq!(
            public.derive_child(ChildNumber::from_raw(HARDENED_OFFSET + 5)),
            Err(Bip86Error::HardenedDerivationRequiresPrivateKey)
        );
    }

    #[test]
    fn depth_overflow_is_reported() {
        let deep = ExtendedKey {
            depth: u8::MAX,
            ..vector_one_master()
        };
        assert_eq!(
            deep.derive_child(ChildNumber::normal(0).unwrap()),
            Err(Bip86Error::DepthOverflow)
        );
    }

    #[test]
    fn seed_length_is_checked() {
        assert_eq!(
            ExtendedKey::from_seed(&[1u8; 15], Network::Mainnet),
            Err(Bip86Error::InvalidSeed)
        );
        assert_eq!(
            ExtendedKey::from_seed(&[1u8; 65], Network::Mainnet),
            Err(Bip86Error::InvalidSeed)
        );
    }

    #[test]
    fn base58_round_trip_both_networks() {
        for network in Network::ALL {
            let master = ExtendedKey::from_mnemonic(TEST_MNEMONIC, "", network).unwrap();
            let account = master
                .derive_path(&DerivationPath::account(BIP86_PURPOSE, network.coin_type(), 0).unwrap())
                .unwrap();
            for key in [account.clone(), account.neuter()] {
                let encoded = key.to_base58();
                assert_eq!(ExtendedKey::from_base58(&encoded, network).unwrap(), key);
                assert_eq!(encoded.parse::<ExtendedKey>().unwrap(), key);
            }
        }
    }

    #[test]
    fn from_base58_enforces_network() {
        let master = vector_one_master();
        assert_eq!(
            ExtendedKey::from_base58(&master.to_base58(), Network::Testnet),
            Err(Bip86Error::NetworkMismatch {
                expected: "testnet",
                found: "mainnet",
            })
        );
    }

    #[test]
    fn master_with_parent_fingerprint_is_rejected() {
        let forged = ExtendedKey {
            parent_fingerprint: [1, 2, 3, 4],
            ..vector_one_master()
        };
        assert!(matches!(
            forged.to_base58().parse::<ExtendedKey>(),
            Err(Bip86Error::InvalidKeyData(_))
        ));
    }

    #[test]
    fn neuter_is_idempotent() {
        let master = vector_one_master();
        let neutered = master.neuter();
        assert_eq!(neutered.neuter(), neutered);
        assert_eq!(neutered.public_key(), master.public_key());
        assert!(neutered.to_wif().is_err());
    }

    #[test]
    fn path_parsing() {
        let path: DerivationPath = "m/86'/0'/0'/0/1".parse().unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.to_string(), "m/86'/0'/0'/0/1");
        assert_eq!("m".parse::<DerivationPath>().unwrap(), DerivationPath::master());
        assert_eq!(
            "m/86h/0H/0'".parse::<DerivationPath>().unwrap(),
            DerivationPath::account(86, 0, 0).unwrap()
        );

        for bad in ["86'/0'", "m/", "m//1", "m/x", "m/1''", "m/2147483648", "m/-1"] {
            assert!(
                matches!(bad.parse::<DerivationPath>(), Err(Bip86Error::MalformedPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn path_is_root_relative() {
        let child = vector_one_master()
            .derive_child(ChildNumber::normal(0).unwrap())
            .unwrap();
        let path: DerivationPath = "m/0".parse().unwrap();
        assert!(matches!(
            child.derive_path(&path),
            Err(Bip86Error::MalformedPath(_))
        ));
    }

    #[test]
    fn raw_child_numbers() {
        let hardened = ChildNumber::from_raw(HARDENED_OFFSET | 86);
        assert!(hardened.is_hardened());
        assert_eq!(hardened.index(), 86);
        assert_eq!(hardened.value(), HARDENED_OFFSET | 86);
        assert_eq!(hardened.to_string(), "86'");
        assert!(ChildNumber::normal(HARDENED_OFFSET).is_err());
    }
}
