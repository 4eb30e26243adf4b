use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Bip86Error {
    #[error("seed does not produce a valid master key")]
    InvalidSeed,
    #[error("extended key prefix `{0}` is not supported")]
    UnsupportedKeyPrefix(String),
    #[error("cannot derive hardened child from public key")]
    HardenedDerivationRequiresPrivateKey,
    #[error("derived child key is invalid; retry with the next index")]
    InvalidChildKey,
    #[error("derivation depth exceeds 255")]
    DepthOverflow,
    #[error("taproot tweak is not a valid scalar")]
    InvalidTweak,
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("malformed derivation path: {0}")]
    MalformedPath(String),
    #[error("invalid length: {0}")]
    InvalidLength(String),
    #[error("string mixes upper and lower case characters")]
    MixedCase,
    #[error("invalid human-readable part")]
    InvalidHrp,
    #[error("missing bech32 separator")]
    MissingSeparator,
    #[error("invalid padding in bit conversion")]
    InvalidPadding,
    #[error("value {0} does not fit the requested bit width")]
    InvalidWord(u8),
    #[error("bit width {0} is outside 1..=8")]
    InvalidBitWidth(u32),
    #[error("invalid witness program: {0}")]
    InvalidWitnessProgram(String),
    #[error("invalid key data: {0}")]
    InvalidKeyData(String),
    #[error("key belongs to {found} but {expected} was requested")]
    NetworkMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("base58 error: {0}")]
    Base58(String),
    #[error("mnemonic error: {0}")]
    Mnemonic(String),
    #[error("{context} account cannot provide {operation}")]
    UnsupportedOperation {
        context: &'static str,
        operation: &'static str,
    },
}

impl From<bip39::Error> for Bip86Error {
    fn from(err: bip39::Error) -> Self {
        Bip86Error::Mnemonic(err.to_string())
    }
}

impl From<bs58::decode::Error> for Bip86Error {
    fn from(err: bs58::decode::Error) -> Self {
        Bip86Error::Base58(err.to_string())
    }
}

impl From<hmac::digest::InvalidLength> for Bip86Error {
    fn from(_: hmac::digest::InvalidLength) -> Self {
        Bip86Error::InvalidLength("invalid HMAC key length".into())
    }
}

impl From<bech32::Error> for Bip86Error {
    fn from(err: bech32::Error) -> Self {
        match err {
            bech32::Error::InvalidChecksum => Bip86Error::ChecksumMismatch,
            bech32::Error::InvalidChar(c) => Bip86Error::InvalidCharacter(c),
            bech32::Error::MixedCase => Bip86Error::MixedCase,
            bech32::Error::MissingSeparator => Bip86Error::MissingSeparator,
            bech32::Error::InvalidLength => {
                Bip86Error::InvalidLength("bech32 part has an invalid length".into())
            }
            bech32::Error::InvalidPadding => Bip86Error::InvalidPadding,
            bech32::Error::InvalidData(word) => Bip86Error::InvalidWord(word),
        }
    }
}
