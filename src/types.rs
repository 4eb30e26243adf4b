use std::fmt;

use secp256k1::{Scalar, XOnlyPublicKey, SECP256K1};

use crate::error::Bip86Error;
use crate::network::Network;
use crate::util::{decode_base58_check, encode_base58_check, hash160};

const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// A secp256k1 secret scalar tagged with the network it is exported for.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PrivateKey {
    inner: secp256k1::SecretKey,
    network: Network,
}

impl PrivateKey {
    pub fn from_bytes_be(bytes: [u8; 32], network: Network) -> Result<Self, Bip86Error> {
        let inner = secp256k1::SecretKey::from_slice(&bytes).map_err(|_| {
            Bip86Error::InvalidKeyData("scalar is zero or not below the curve order".into())
        })?;
        Ok(Self { inner, network })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.inner.secret_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.inner.public_key(SECP256K1))
    }

    /// `(self + tweak) mod n`, failing when the tweak is out of range or the sum is zero.
    pub(crate) fn add_tweak(&self, tweak: [u8; 32]) -> Result<Self, Bip86Error> {
        let scalar = Scalar::from_be_bytes(tweak).map_err(|_| Bip86Error::InvalidChildKey)?;
        let inner = self
            .inner
            .add_tweak(&scalar)
            .map_err(|_| Bip86Error::InvalidChildKey)?;
        Ok(Self {
            inner,
            network: self.network,
        })
    }

    /// Wallet Import Format, always flagged as compressed.
    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(self.network.params().wif_version);
        payload.extend_from_slice(&self.inner.secret_bytes());
        payload.push(WIF_COMPRESSED_FLAG);
        encode_base58_check(&payload)
    }

    pub fn from_wif(wif: &str) -> Result<Self, Bip86Error> {
        let payload = decode_base58_check(wif)?;
        if payload.len() != 34 || payload[33] != WIF_COMPRESSED_FLAG {
            return Err(Bip86Error::InvalidLength(
                "WIF must encode a compressed 32-byte key".into(),
            ));
        }
        let network = Network::from_wif_version(payload[0])?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload[1..33]);
        Self::from_bytes_be(bytes, network)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// A compressed secp256k1 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub(crate) secp256k1::PublicKey);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Bip86Error> {
        secp256k1::PublicKey::from_slice(bytes)
            .map(PublicKey)
            .map_err(|_| Bip86Error::InvalidKeyData("not a valid secp256k1 point".into()))
    }

    pub fn from_hex(encoded: &str) -> Result<Self, Bip86Error> {
        let bytes =
            hex::decode(encoded).map_err(|err| Bip86Error::InvalidKeyData(err.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; 33] {
        self.0.serialize()
    }

    /// Lowercase hex of the compressed encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The even-Y lift of this key, as used for Taproot internal keys.
    pub fn x_only(&self) -> XOnlyPublicKey {
        self.0.x_only_public_key().0
    }

    /// `self + tweak·G`, failing when the tweak is out of range or the sum is infinity.
    pub(crate) fn add_exp_tweak(&self, tweak: [u8; 32]) -> Result<Self, Bip86Error> {
        let scalar = Scalar::from_be_bytes(tweak).map_err(|_| Bip86Error::InvalidChildKey)?;
        self.0
            .add_exp_tweak(SECP256K1, &scalar)
            .map(PublicKey)
            .map_err(|_| Bip86Error::InvalidChildKey)
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        let hash = hash160(&self.to_bytes());
        let mut fingerprint = [0u8; 4];
        fingerprint.copy_from_slice(&hash[..4]);
        fingerprint
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
