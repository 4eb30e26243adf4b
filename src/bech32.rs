//! Bech32 and bech32m encoding (BIP173, BIP350).
//!
//! Checksums and the charset come from the `bech32` crate. This module adds the
//! 90-character ceiling, segwit witness-program rules and the mapping onto
//! [`Bip86Error`]. Data is handled as 5-bit words; use [`convert_bits`] to
//! regroup bytes.

use ::bech32::{u5, FromBase32, ToBase32};

pub use ::bech32::Variant;

use crate::error::Bip86Error;
use crate::network::Network;

const SEPARATOR: char = '1';
const CHECKSUM_LEN: usize = 6;
pub const MAX_LENGTH: usize = 90;

fn check_length(len: usize) -> Result<(), Bip86Error> {
    if len > MAX_LENGTH {
        return Err(Bip86Error::InvalidLength(format!(
            "{len} characters exceeds limit of {MAX_LENGTH}"
        )));
    }
    Ok(())
}

fn to_words(words: &[u8]) -> Result<Vec<u5>, Bip86Error> {
    words
        .iter()
        .map(|&word| u5::try_from_u8(word).map_err(Bip86Error::from))
        .collect()
}

fn witness_variant(version: u8) -> Variant {
    if version == 0 {
        Variant::Bech32
    } else {
        Variant::Bech32m
    }
}

pub fn encode(variant: Variant, hrp: &str, words: &[u8]) -> Result<String, Bip86Error> {
    if hrp.is_empty() {
        return Err(Bip86Error::InvalidHrp);
    }
    check_length(hrp.len() + 1 + words.len() + CHECKSUM_LEN)?;
    let words = to_words(words)?;
    Ok(::bech32::encode(hrp, words, variant)?)
}

/// Decodes any valid bech32 or bech32m string, reporting which checksum matched.
fn decode_any(encoded: &str) -> Result<(String, Vec<u5>, Variant), Bip86Error> {
    check_length(encoded.len())?;
    if encoded.rfind(SEPARATOR) == Some(0) {
        return Err(Bip86Error::InvalidHrp);
    }
    Ok(::bech32::decode(encoded)?)
}

/// Decodes `encoded`, requiring its checksum to match `variant`.
pub fn decode(variant: Variant, encoded: &str) -> Result<(String, Vec<u8>), Bip86Error> {
    let (hrp, words, found) = decode_any(encoded)?;
    if found != variant {
        return Err(Bip86Error::ChecksumMismatch);
    }
    Ok((hrp, words.into_iter().map(u5::to_u8).collect()))
}

/// Regroups `data` from `from_bits`-wide values into `to_bits`-wide values.
/// Both widths must lie in `1..=8`.
pub fn convert_bits(
    data: &[u8],
    from_bits: u32,
    to_bits: u32,
    pad: bool,
) -> Result<Vec<u8>, Bip86Error> {
    for width in [from_bits, to_bits] {
        if !(1..=8).contains(&width) {
            return Err(Bip86Error::InvalidBitWidth(width));
        }
    }
    Ok(::bech32::convert_bits(data, from_bits, to_bits, pad)?)
}

/// Encodes a segwit output: version 0 uses bech32, later versions bech32m.
pub fn encode_segwit_address(hrp: &str, version: u8, program: &[u8]) -> Result<String, Bip86Error> {
    validate_witness_program(version, program)?;
    let mut words = vec![u5::try_from_u8(version)?];
    words.extend(program.to_base32());
    check_length(hrp.len() + 1 + words.len() + CHECKSUM_LEN)?;
    Ok(::bech32::encode(hrp, words, witness_variant(version))?)
}

/// Decodes a `bc`/`tb` segwit address into `(hrp, witness version, witness program)`.
pub fn decode_segwit_address(encoded: &str) -> Result<(String, u8, Vec<u8>), Bip86Error> {
    let (hrp, words, variant) = decode_any(encoded)?;
    if !Network::ALL.iter().any(|network| network.hrp() == hrp) {
        return Err(Bip86Error::InvalidHrp);
    }

    let (version, program_words) = words
        .split_first()
        .ok_or_else(|| Bip86Error::InvalidWitnessProgram("missing witness version".into()))?;
    let version = version.to_u8();
    if variant != witness_variant(version) {
        return Err(Bip86Error::ChecksumMismatch);
    }

    let program = Vec::<u8>::from_base32(program_words)?;
    validate_witness_program(version, &program)?;
    Ok((hrp, version, program))
}

fn validate_witness_program(version: u8, program: &[u8]) -> Result<(), Bip86Error> {
    if version > 16 {
        return Err(Bip86Error::InvalidWitnessProgram(format!(
            "witness version {version} is above 16"
        )));
    }
    if !(2..=40).contains(&program.len()) {
        return Err(Bip86Error::InvalidWitnessProgram(format!(
            "program length {} is outside 2..=40",
            program.len()
        )));
    }
    if version == 0 && program.len() != 20 && program.len() != 32 {
        return Err(Bip86Error::InvalidWitnessProgram(
            "version 0 program must be 20 or 32 bytes".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONGEST_VALID: &str =
        "an84characterslonghumanreadablepartthatcontainsthenumber1andtheexcludedcharactersbio1569pvx";

    #[test]
    fn decodes_reference_strings() {
        let (hrp, words) = decode(Variant::Bech32m, "A1LQFN3A").unwrap();
        assert_eq!(hrp, "a");
        assert!(words.is_empty());

        let (hrp, words) = decode(Variant::Bech32, "A12UEL5L").unwrap();
        assert_eq!(hrp, "a");
        assert!(words.is_empty());

        let reencoded = encode(Variant::Bech32m, "a", &[]).unwrap();
        assert_eq!(reencoded, "a1lqfn3a");
    }

    #[test]
    fn variant_checksums_are_not_interchangeable() {
        assert_eq!(
            decode(Variant::Bech32, "a1lqfn3a"),
            Err(Bip86Error::ChecksumMismatch)
        );
        assert_eq!(
            decode(Variant::Bech32m, "a12uel5l"),
            Err(Bip86Error::ChecksumMismatch)
        );
    }

    #[test]
    fn malformed_and_tampered_are_distinct() {
        assert_eq!(
            decode(Variant::Bech32, "x1b4n0q5v"),
            Err(Bip86Error::InvalidCharacter('b'))
        );
        assert_eq!(
            decode(Variant::Bech32m, "a1lqfn3q"),
            Err(Bip86Error::ChecksumMismatch)
        );
        assert_eq!(decode(Variant::Bech32, "a12UEL5L"), Err(Bip86Error::MixedCase));
        assert_eq!(
            decode(Variant::Bech32, "pzry9x0s0muk"),
            Err(Bip86Error::MissingSeparator)
        );
        assert_eq!(
            decode(Variant::Bech32, "1pzry9x0s0muk"),
            Err(Bip86Error::InvalidHrp)
        );
        assert!(matches!(
            decode(Variant::Bech32, "li1dgmt3"),
            Err(Bip86Error::InvalidLength(_))
        ));
    }

    #[test]
    fn enforces_length_ceiling() {
        let words = vec![0u8; MAX_LENGTH];
        assert!(matches!(
            encode(Variant::Bech32m, "bc", &words),
            Err(Bip86Error::InvalidLength(_))
        ));
        assert_eq!(
            encode(Variant::Bech32m, "bc", &[32]),
            Err(Bip86Error::InvalidWord(32))
        );
    }

    #[test]
    fn decode_accepts_ninety_characters_and_rejects_more() {
        assert_eq!(LONGEST_VALID.len(), MAX_LENGTH);
        let (_, words) = decode(Variant::Bech32, LONGEST_VALID).unwrap();
        assert!(words.is_empty());

        let too_long = format!("a1{}", "q".repeat(MAX_LENGTH - 1));
        assert_eq!(too_long.len(), MAX_LENGTH + 1);
        assert!(matches!(
            decode(Variant::Bech32, &too_long),
            Err(Bip86Error::InvalidLength(_))
        ));
        assert!(matches!(
            decode_segwit_address(&too_long),
            Err(Bip86Error::InvalidLength(_))
        ));
    }

    #[test]
    fn taproot_generator_address() {
        let program =
            hex::decode("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap();
        let address = encode_segwit_address("bc", 1, &program).unwrap();
        assert_eq!(
            address,
            "bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqzk5jj0"
        );

        let (hrp, version, decoded) = decode_segwit_address(&address).unwrap();
        assert_eq!(hrp, "bc");
        assert_eq!(version, 1);
        assert_eq!(decoded, program);
    }

    #[test]
    fn rejects_invalid_segwit_addresses() {
        // Unknown human-readable part.
        assert_eq!(
            decode_segwit_address("tc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vq5zuyut"),
            Err(Bip86Error::InvalidHrp)
        );
        // Version 1 program under a bech32 checksum.
        assert_eq!(
            decode_segwit_address("bc1p0xlxvlhemja6c4dqv22uapctqupfhlxm9h8z3k2e72q4k9hcz7vqh2y7hd"),
            Err(Bip86Error::ChecksumMismatch)
        );
        // Version 0 program under a bech32m checksum.
        assert_eq!(
            decode_segwit_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kemeawh"),
            Err(Bip86Error::ChecksumMismatch)
        );
        // One-byte program.
        assert!(matches!(
            decode_segwit_address("bc1pw5dgrnzv"),
            Err(Bip86Error::InvalidWitnessProgram(_))
        ));
    }

    #[test]
    fn convert_bits_padding_rules() {
        let words = convert_bits(&[0xff], 8, 5, true).unwrap();
        assert_eq!(words, vec![31, 28]);
        assert_eq!(convert_bits(&words, 5, 8, false).unwrap(), vec![0xff]);
        assert_eq!(
            convert_bits(&[31, 29], 5, 8, false),
            Err(Bip86Error::InvalidPadding)
        );
        assert_eq!(
            convert_bits(&[40], 5, 8, true),
            Err(Bip86Error::InvalidWord(40))
        );
    }

    #[test]
    fn convert_bits_rejects_unsupported_widths() {
        assert_eq!(
            convert_bits(&[1], 8, 32, true),
            Err(Bip86Error::InvalidBitWidth(32))
        );
        assert_eq!(
            convert_bits(&[1], 8, 0, true),
            Err(Bip86Error::InvalidBitWidth(0))
        );
        assert_eq!(
            convert_bits(&[1], 9, 5, true),
            Err(Bip86Error::InvalidBitWidth(9))
        );
    }
}
