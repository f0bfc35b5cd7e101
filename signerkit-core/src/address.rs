//! Address and key codec.
//!
//! Derives ledger addresses from raw public keys in the three supported
//! schemes, computes shard groups, and compresses P-256 points extracted
//! from attestation credentials.

use p256::elliptic_curve::sec1::FromEncodedPoint;
use p256::{EncodedPoint, PublicKey};

use crate::account::KeyType;
use crate::error::SignerError;

/// Total number of shard groups in the protocol.
pub const TOTAL_NUMBER_OF_GROUPS: u8 = 4;

/// Version byte prefixed to legacy address payloads.
const LEGACY_VERSION_BYTE: u8 = 0x04;
/// Tag prefixed to the public key inside a legacy address payload.
const LEGACY_KEY_TAG: u8 = 0x02;
/// Tag byte of contract addresses.
const CONTRACT_ADDRESS_TAG: u8 = 0x03;
/// Address tag for groupless ed25519 accounts.
const GROUPLESS_ED25519_TAG: u8 = 0x05;
/// Address tag for groupless `WebAuthn` accounts.
const GROUPLESS_WEBAUTHN_TAG: u8 = 0x06;

/// Raw ed25519 public key length.
const ED25519_KEY_LEN: usize = 32;
/// Compressed SEC1 P-256 public key length.
const COMPRESSED_P256_KEY_LEN: usize = 33;

/// Derives the ledger-native address for `public_key` under `key_type`.
///
/// The legacy scheme appends a djb2 checksum and a `:group` suffix; the
/// groupless schemes are a bijective base58 encoding of the tagged key.
///
/// # Errors
///
/// Returns [`SignerError::Codec`] if the key length does not match the
/// scheme. Callers must not proceed with signing on failure.
pub fn derive_address(
    public_key: &[u8],
    key_type: KeyType,
) -> Result<String, SignerError> {
    match key_type {
        KeyType::Default => {
            expect_key_len(public_key, ED25519_KEY_LEN, key_type)?;
            let mut tagged = Vec::with_capacity(public_key.len() + 1);
            tagged.push(LEGACY_KEY_TAG);
            tagged.extend_from_slice(public_key);

            let checksum = djb2(&tagged);
            let mut bytes = Vec::with_capacity(tagged.len() + 5);
            bytes.push(LEGACY_VERSION_BYTE);
            bytes.extend_from_slice(&tagged);
            bytes.extend_from_slice(&checksum.to_be_bytes());

            let group = group_of(public_key)?;
            Ok(format!("{}:{group}", bs58::encode(bytes).into_string()))
        }
        KeyType::GrouplessEd25519 => {
            expect_key_len(public_key, ED25519_KEY_LEN, key_type)?;
            Ok(encode_tagged(GROUPLESS_ED25519_TAG, public_key))
        }
        KeyType::GrouplessWebauthn => {
            expect_key_len(public_key, COMPRESSED_P256_KEY_LEN, key_type)?;
            if public_key[0] != 0x02 && public_key[0] != 0x03 {
                return Err(SignerError::Codec(format!(
                    "invalid compressed key prefix 0x{:02x}",
                    public_key[0]
                )));
            }
            Ok(encode_tagged(GROUPLESS_WEBAUTHN_TAG, public_key))
        }
    }
}

/// Returns the shard group of `public_key`: its last byte modulo
/// [`TOTAL_NUMBER_OF_GROUPS`]. Only meaningful for [`KeyType::Default`]
/// accounts.
///
/// # Errors
///
/// Returns [`SignerError::Codec`] if the key is empty.
pub fn group_of(public_key: &[u8]) -> Result<u8, SignerError> {
    public_key
        .last()
        .map(|last| last % TOTAL_NUMBER_OF_GROUPS)
        .ok_or_else(|| SignerError::Codec("empty public key".to_string()))
}

/// Compresses a P-256 point given as separate 32-byte affine coordinates
/// into the 33-byte SEC1 form (`0x02`/`0x03` prefix + x-coordinate).
///
/// # Errors
///
/// Returns [`SignerError::Codec`] if a coordinate is not 32 bytes or the
/// point is not on the curve.
pub fn compress_point(x: &[u8], y: &[u8]) -> Result<[u8; 33], SignerError> {
    let x: [u8; 32] = x
        .try_into()
        .map_err(|_| SignerError::Codec(format!("x coordinate of {} bytes", x.len())))?;
    let y: [u8; 32] = y
        .try_into()
        .map_err(|_| SignerError::Codec(format!("y coordinate of {} bytes", y.len())))?;

    let point = EncodedPoint::from_affine_coordinates(&x.into(), &y.into(), true);
    if Option::<PublicKey>::from(PublicKey::from_encoded_point(&point)).is_none() {
        return Err(SignerError::Codec("point is not on the curve".to_string()));
    }
    point
        .as_bytes()
        .try_into()
        .map_err(|_| SignerError::Codec("unexpected compressed point length".to_string()))
}

/// Extracts the hex-encoded contract id from a contract address.
///
/// # Errors
///
/// Returns [`SignerError::Codec`] if the address is not base58 or does not
/// carry the contract tag.
pub fn contract_id_from_address(address: &str) -> Result<String, SignerError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|err| SignerError::Codec(format!("invalid base58 address: {err}")))?;
    match bytes.split_first() {
        Some((&CONTRACT_ADDRESS_TAG, id)) if !id.is_empty() => Ok(hex::encode(id)),
        _ => Err(SignerError::Codec(format!(
            "not a contract address: {address}"
        ))),
    }
}

fn encode_tagged(tag: u8, public_key: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(public_key.len() + 1);
    bytes.push(tag);
    bytes.extend_from_slice(public_key);
    bs58::encode(bytes).into_string()
}

fn expect_key_len(
    public_key: &[u8],
    expected: usize,
    key_type: KeyType,
) -> Result<(), SignerError> {
    if public_key.len() == expected {
        Ok(())
    } else {
        Err(SignerError::Codec(format!(
            "{key_type} key must be {expected} bytes, got {}",
            public_key.len()
        )))
    }
}

/// Multiplicative string hash (seed 5381, `h = h * 33 + byte`), truncated
/// to 32 bits and interpreted as signed.
fn djb2(bytes: &[u8]) -> i32 {
    let mut hash: u32 = 5381;
    for &byte in bytes {
        hash = hash
            .wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(u32::from(byte));
    }
    i32::from_be_bytes(hash.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // SEC1 test vector: the P-256 generator point.
    const GENERATOR_X: &str =
        "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296";
    const GENERATOR_Y: &str =
        "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5";

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(djb2(b""), 5381);
        assert_eq!(djb2(b"a"), 177_670);
    }

    #[test]
    fn test_legacy_address_has_group_suffix() {
        let key = [7u8; 32];
        let address = derive_address(&key, KeyType::Default).unwrap();
        let (encoded, group) = address.split_once(':').unwrap();
        assert_eq!(group, "3"); // 7 % 4
        // version byte + key tag survive the base58 round trip
        let bytes = bs58::decode(encoded).into_vec().unwrap();
        assert_eq!(bytes[0], 0x04);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(&bytes[2..34], &key);
    }

    #[test]
    fn test_groupless_addresses_are_bijective_with_the_key() {
        let key = [9u8; 32];
        let address = derive_address(&key, KeyType::GrouplessEd25519).unwrap();
        let bytes = bs58::decode(&address).into_vec().unwrap();
        assert_eq!(bytes[0], 0x05);
        assert_eq!(&bytes[1..], &key);
    }

    #[test]
    fn test_derive_address_is_deterministic_and_injective() {
        let mut seen = std::collections::HashSet::new();
        for i in 0..32u8 {
            let mut key = [0u8; 33];
            key[0] = 0x02;
            key[32] = i;
            let address = derive_address(&key, KeyType::GrouplessWebauthn).unwrap();
            assert_eq!(
                address,
                derive_address(&key, KeyType::GrouplessWebauthn).unwrap()
            );
            assert!(seen.insert(address));
        }
    }

    #[test]
    fn test_group_is_always_in_range() {
        for last in 0..=255u8 {
            let key = [0, 1, 2, last];
            assert!(group_of(&key).unwrap() < TOTAL_NUMBER_OF_GROUPS);
        }
        assert!(matches!(group_of(&[]), Err(SignerError::Codec(_))));
    }

    #[test]
    fn test_wrong_key_length_fails() {
        assert!(matches!(
            derive_address(&[1u8; 31], KeyType::Default),
            Err(SignerError::Codec(_))
        ));
        assert!(matches!(
            derive_address(&[1u8; 32], KeyType::GrouplessWebauthn),
            Err(SignerError::Codec(_))
        ));
    }

    #[test]
    fn test_compress_generator_point() {
        let x = hex::decode(GENERATOR_X).unwrap();
        let y = hex::decode(GENERATOR_Y).unwrap();
        let compressed = compress_point(&x, &y).unwrap();
        // y is odd, so the prefix is 0x03
        assert_eq!(compressed[0], 0x03);
        assert_eq!(hex::encode(&compressed[1..]), GENERATOR_X);
    }

    #[test]
    fn test_compress_point_rejects_off_curve() {
        let x = [1u8; 32];
        let y = [1u8; 32];
        assert!(matches!(
            compress_point(&x, &y),
            Err(SignerError::Codec(_))
        ));
    }

    #[test]
    fn test_contract_id_round_trip() {
        let contract_id = [0xABu8; 32];
        let mut bytes = vec![0x03];
        bytes.extend_from_slice(&contract_id);
        let address = bs58::encode(bytes).into_string();
        assert_eq!(
            contract_id_from_address(&address).unwrap(),
            hex::encode(contract_id)
        );
    }

    #[test]
    fn test_contract_id_rejects_non_contract_tags() {
        let address = bs58::encode([0x04u8, 1, 2, 3]).into_string();
        assert!(matches!(
            contract_id_from_address(&address),
            Err(SignerError::Codec(_))
        ));
    }
}
