use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Bip86Error;

type HmacSha512 = Hmac<Sha512>;

const CHECKSUM_LEN: usize = 4;

pub fn hmac_sha512(key: &[u8], message: &[u8]) -> Result<[u8; 64], Bip86Error> {
    let mut mac = HmacSha512::new_from_slice(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

pub fn split_digest(digest: &[u8; 64]) -> ([u8; 32], [u8; 32]) {
    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&digest[..32]);
    right.copy_from_slice(&digest[32..]);
    (left, right)
}

pub fn ser32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// BIP340 tagged hash: `SHA256(SHA256(tag) || SHA256(tag) || msg)`.
pub fn tagged_hash(tag: &str, message: &[u8]) -> [u8; 32] {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    hasher.update(message);
    hasher.finalize().into()
}

pub fn encode_base58_check(payload: &[u8]) -> String {
    let checksum = double_sha256(payload);
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

pub fn decode_base58_check(encoded: &str) -> Result<Vec<u8>, Bip86Error> {
    let mut data = bs58::decode(encoded).into_vec()?;
    if data.len() < CHECKSUM_LEN {
        return Err(Bip86Error::InvalidLength(
            "base58check payload is shorter than its checksum".into(),
        ));
    }
    let payload_len = data.len() - CHECKSUM_LEN;
    let expected = double_sha256(&data[..payload_len]);
    if data[payload_len..] != expected[..CHECKSUM_LEN] {
        return Err(Bip86Error::ChecksumMismatch);
    }
    data.truncate(payload_len);
    Ok(data)
}
