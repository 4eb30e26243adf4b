//! Single-key Taproot outputs (BIP341 key path with no script tree, BIP86).

use secp256k1::{Scalar, XOnlyPublicKey, SECP256K1};

use crate::bech32::{self, Variant};
use crate::error::Bip86Error;
use crate::network::Network;
use crate::types::PublicKey;
use crate::util::tagged_hash;

const TAP_TWEAK_TAG: &str = "TapTweak";
pub const TAPROOT_WITNESS_VERSION: u8 = 1;

/// `TaggedHash("TapTweak", x(P))` for an internal key committing to no scripts.
pub fn tap_tweak(internal_key: &XOnlyPublicKey) -> [u8; 32] {
    tagged_hash(TAP_TWEAK_TAG, &internal_key.serialize())
}

/// Computes the x-only output key `Q = P + t·G` for a compressed internal key.
pub fn taproot_output_key(internal_key: &PublicKey) -> Result<[u8; 32], Bip86Error> {
    let internal = internal_key.x_only();
    let tweak =
        Scalar::from_be_bytes(tap_tweak(&internal)).map_err(|_| Bip86Error::InvalidTweak)?;
    let (output, _parity) = internal
        .add_tweak(SECP256K1, &tweak)
        .map_err(|_| Bip86Error::InvalidTweak)?;
    Ok(output.serialize())
}

/// Encodes an output key as a version 1 segwit address.
pub fn output_key_address(output_key: &[u8; 32], network: Network) -> Result<String, Bip86Error> {
    let mut words = Vec::with_capacity(53);
    words.push(TAPROOT_WITNESS_VERSION);
    words.extend(bech32::convert_bits(output_key, 8, 5, true)?);
    bech32::encode(Variant::Bech32m, network.hrp(), &words)
}

pub fn p2tr_address(internal_key: &PublicKey, network: Network) -> Result<String, Bip86Error> {
    let output_key = taproot_output_key(internal_key)?;
    output_key_address(&output_key, network)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERNAL_KEY: &str = "03cc8a4bc64d897bddc5fbc2f670f7a8ba0b386779106cf1223c6fc5d7cd6fc115";
    const OUTPUT_KEY: &str = "a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c";

    #[test]
    fn bip86_first_receiving_output_key() {
        let internal = PublicKey::from_hex(INTERNAL_KEY).unwrap();
        let output = taproot_output_key(&internal).unwrap();
        assert_eq!(hex::encode(output), OUTPUT_KEY);
        assert_eq!(
            p2tr_address(&internal, Network::Mainnet).unwrap(),
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
    }

    #[test]
    fn output_key_ignores_internal_parity() {
        let odd = PublicKey::from_hex(INTERNAL_KEY).unwrap();
        let even = PublicKey::from_hex(&format!("02{}", &INTERNAL_KEY[2..])).unwrap();
        assert_eq!(
            taproot_output_key(&odd).unwrap(),
            taproot_output_key(&even).unwrap()
        );
    }

    #[test]
    fn address_decodes_to_output_key() {
        let internal = PublicKey::from_hex(INTERNAL_KEY).unwrap();
        let address = p2tr_address(&internal, Network::Testnet).unwrap();
        assert!(address.starts_with("tb1p"));
        let (hrp, version, program) = bech32::decode_segwit_address(&address).unwrap();
        assert_eq!(hrp, "tb");
        assert_eq!(version, TAPROOT_WITNESS_VERSION);
        assert_eq!(hex::encode(program), OUTPUT_KEY);
    }
}
