//! `WebAuthn` ceremony types and the on-chain assertion payload codec.
//!
//! The ledger's `WebAuthn` verifier replays the assertion check on chain,
//! so the ceremony metadata (authenticator data plus the parts of the
//! client data JSON surrounding the challenge) travels with the signature,
//! packed into fixed 64-byte chunks. The challenge itself is omitted: the
//! verifier reconstructs it from the transaction id.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::Value;

use crate::address::compress_point;
use crate::error::SignerError;

/// Size of one assertion payload chunk and of a packed signature.
pub const CHUNK_LEN: usize = 64;

/// Byte offset of the credential-id length inside authenticator data:
/// rpIdHash (32) + flags (1) + counter (4) + AAGUID (16).
const CREDENTIAL_ID_LEN_OFFSET: usize = 53;

/// Marker preceding the challenge value in client data JSON.
const CHALLENGE_MARKER: &[u8] = b"\"challenge\":\"";

/// Inputs for a platform credential creation ceremony.
#[derive(Debug, Clone)]
pub struct CredentialCreationRequest {
    /// Relying-party display name.
    pub rp_name: String,
    /// User-visible wallet name.
    pub user_name: String,
    /// Random registration challenge.
    pub challenge: Vec<u8>,
}

/// Raw outputs of an assertion ceremony.
#[derive(Debug, Clone)]
pub struct Assertion {
    /// DER-encoded ECDSA signature.
    pub signature: Vec<u8>,
    /// Authenticator data covered by the signature.
    pub authenticator_data: Vec<u8>,
    /// Serialized client data JSON covered by the signature.
    pub client_data_json: Vec<u8>,
}

/// Credential extracted from an attestation object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredential {
    /// Opaque credential handle for later assertion ceremonies.
    pub credential_id: Vec<u8>,
    /// Compressed SEC1 P-256 public key.
    pub public_key: [u8; 33],
}

/// Platform credential interface.
///
/// Implementations bridge to whatever authenticator the host platform
/// offers. Ceremony failures and user cancellations surface as
/// [`SignerError::Ceremony`].
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    /// Runs a credential creation ceremony and returns the raw CBOR
    /// attestation object.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Ceremony`] if the ceremony fails or is
    /// cancelled.
    async fn create_credential(
        &self,
        request: &CredentialCreationRequest,
    ) -> Result<Vec<u8>, SignerError>;

    /// Runs an assertion ceremony over `challenge` with the credential
    /// identified by `credential_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Ceremony`] if the ceremony fails or is
    /// cancelled.
    async fn get_assertion(
        &self,
        challenge: &[u8],
        credential_id: &[u8],
    ) -> Result<Assertion, SignerError>;
}

/// Parses a CBOR attestation object and extracts the new credential.
///
/// Reads the `authData` entry, takes the credential id at the fixed
/// attested-credential-data offset, then decodes the trailing COSE key
/// (labels `-2`/`-3` for the affine coordinates) into compressed form.
///
/// # Errors
///
/// Returns [`SignerError::Codec`] if the CBOR shape, the authenticator
/// data layout, or the embedded point is invalid.
pub fn parse_attestation_object(bytes: &[u8]) -> Result<AttestedCredential, SignerError> {
    let value: Value = ciborium::de::from_reader(bytes)
        .map_err(|err| SignerError::Codec(format!("invalid attestation object: {err}")))?;
    let Value::Map(entries) = value else {
        return Err(SignerError::Codec(
            "attestation object is not a map".to_string(),
        ));
    };
    let auth_data = entries
        .iter()
        .find_map(|(key, val)| match (key, val) {
            (Value::Text(name), Value::Bytes(data)) if name == "authData" => {
                Some(data.as_slice())
            }
            _ => None,
        })
        .ok_or_else(|| SignerError::Codec("attestation object has no authData".to_string()))?;

    let len_bytes = auth_data
        .get(CREDENTIAL_ID_LEN_OFFSET..CREDENTIAL_ID_LEN_OFFSET + 2)
        .ok_or_else(|| SignerError::Codec("authenticator data too short".to_string()))?;
    let id_len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
    let id_start = CREDENTIAL_ID_LEN_OFFSET + 2;
    let credential_id = auth_data
        .get(id_start..id_start + id_len)
        .ok_or_else(|| SignerError::Codec("credential id out of bounds".to_string()))?;

    let cose: Value = ciborium::de::from_reader(&auth_data[id_start + id_len..])
        .map_err(|err| SignerError::Codec(format!("invalid cose key: {err}")))?;
    let Value::Map(cose_entries) = cose else {
        return Err(SignerError::Codec("cose key is not a map".to_string()));
    };
    let x = cose_field(&cose_entries, -2)?;
    let y = cose_field(&cose_entries, -3)?;

    Ok(AttestedCredential {
        credential_id: credential_id.to_vec(),
        public_key: compress_point(x, y)?,
    })
}

fn cose_field<'a>(entries: &'a [(Value, Value)], label: i128) -> Result<&'a [u8], SignerError> {
    entries
        .iter()
        .find_map(|(key, val)| match (key, val) {
            (Value::Integer(i), Value::Bytes(bytes)) if i128::from(*i) == label => {
                Some(bytes.as_slice())
            }
            _ => None,
        })
        .ok_or_else(|| SignerError::Codec(format!("cose key has no label {label}")))
}

/// Packs ceremony metadata into 64-byte chunks for on-chain replay.
///
/// The client data JSON is split around the challenge value; the
/// authenticator data, the prefix (through the opening quote) and the
/// suffix (from the closing quote) are emitted as length-prefixed byte
/// strings behind a 4-byte big-endian total length, then zero-padded to a
/// chunk boundary.
///
/// # Errors
///
/// Returns [`SignerError::Codec`] if the client data carries no challenge
/// field or a section exceeds the length encoding's range.
pub fn encode_assertion_payload(
    authenticator_data: &[u8],
    client_data_json: &[u8],
) -> Result<Vec<[u8; CHUNK_LEN]>, SignerError> {
    let (prefix, suffix) = split_client_data(client_data_json)?;

    let mut body = Vec::new();
    append_byte_string(&mut body, authenticator_data)?;
    append_byte_string(&mut body, prefix)?;
    append_byte_string(&mut body, suffix)?;

    let total = u32::try_from(body.len())
        .map_err(|_| SignerError::Codec("assertion payload too long".to_string()))?;
    let mut payload = Vec::with_capacity(4 + body.len());
    payload.extend_from_slice(&total.to_be_bytes());
    payload.extend_from_slice(&body);
    payload.resize(payload.len().div_ceil(CHUNK_LEN) * CHUNK_LEN, 0);

    Ok(payload
        .chunks_exact(CHUNK_LEN)
        .map(|chunk| {
            let mut out = [0u8; CHUNK_LEN];
            out.copy_from_slice(chunk);
            out
        })
        .collect())
}

/// Inverse of [`encode_assertion_payload`]: unpacks the chunks and
/// reinserts the base64url-encoded `challenge` into the client data JSON.
/// Returns `(authenticator_data, client_data_json)`.
///
/// # Errors
///
/// Returns [`SignerError::Codec`] if the chunks do not carry a
/// well-formed payload.
pub fn decode_assertion_payload(
    chunks: &[[u8; CHUNK_LEN]],
    challenge: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), SignerError> {
    let flat: Vec<u8> = chunks.iter().flatten().copied().collect();
    let header = flat
        .get(..4)
        .ok_or_else(|| SignerError::Codec("payload too short for header".to_string()))?;
    let total = usize::try_from(u32::from_be_bytes([
        header[0], header[1], header[2], header[3],
    ]))
    .map_err(|_| SignerError::Codec("payload length overflow".to_string()))?;
    let body = flat
        .get(4..4 + total)
        .ok_or_else(|| SignerError::Codec("payload shorter than its header".to_string()))?;

    let (authenticator_data, rest) = read_byte_string(body)?;
    let (prefix, rest) = read_byte_string(rest)?;
    let (suffix, rest) = read_byte_string(rest)?;
    if !rest.is_empty() {
        return Err(SignerError::Codec(
            "trailing bytes in assertion payload".to_string(),
        ));
    }

    let mut client_data = prefix.to_vec();
    client_data.extend_from_slice(URL_SAFE_NO_PAD.encode(challenge).as_bytes());
    client_data.extend_from_slice(suffix);
    Ok((authenticator_data.to_vec(), client_data))
}

fn split_client_data(client_data: &[u8]) -> Result<(&[u8], &[u8]), SignerError> {
    let start = client_data
        .windows(CHALLENGE_MARKER.len())
        .position(|window| window == CHALLENGE_MARKER)
        .ok_or_else(|| {
            SignerError::Codec("client data has no challenge field".to_string())
        })?;
    let value_start = start + CHALLENGE_MARKER.len();
    let quote = client_data[value_start..]
        .iter()
        .position(|&byte| byte == b'"')
        .ok_or_else(|| SignerError::Codec("unterminated challenge value".to_string()))?;
    Ok((
        &client_data[..value_start],
        &client_data[value_start + quote..],
    ))
}

fn append_byte_string(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), SignerError> {
    encode_compact_len(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn read_byte_string(buf: &[u8]) -> Result<(&[u8], &[u8]), SignerError> {
    let (len, consumed) = decode_compact_len(buf)?;
    buf[consumed..]
        .split_at_checked(len)
        .ok_or_else(|| SignerError::Codec("byte string out of bounds".to_string()))
}

/// Compact length prefix: the two top bits of the first byte select a
/// one, two or four byte big-endian encoding.
fn encode_compact_len(out: &mut Vec<u8>, len: usize) -> Result<(), SignerError> {
    let len = u32::try_from(len)
        .map_err(|_| SignerError::Codec("byte string too long".to_string()))?;
    match len {
        0..=0x3f => out.push(len.to_be_bytes()[3]),
        0x40..=0x3fff => {
            let tagged = 0x4000 | u16::try_from(len).map_err(|_| {
                SignerError::Codec("byte string too long".to_string())
            })?;
            out.extend_from_slice(&tagged.to_be_bytes());
        }
        0x4000..=0x3fff_ffff => {
            out.extend_from_slice(&(0x8000_0000 | len).to_be_bytes());
        }
        _ => {
            return Err(SignerError::Codec("byte string too long".to_string()));
        }
    }
    Ok(())
}

fn decode_compact_len(buf: &[u8]) -> Result<(usize, usize), SignerError> {
    let first = *buf
        .first()
        .ok_or_else(|| SignerError::Codec("missing length prefix".to_string()))?;
    match first >> 6 {
        0 => Ok((usize::from(first), 1)),
        1 => match buf {
            [_, second, ..] => Ok((
                usize::from(u16::from_be_bytes([first & 0x3f, *second])),
                2,
            )),
            _ => Err(SignerError::Codec("truncated length prefix".to_string())),
        },
        2 => match buf {
            [_, b1, b2, b3, ..] => {
                let value = u32::from_be_bytes([first & 0x3f, *b1, *b2, *b3]);
                let value = usize::try_from(value).map_err(|_| {
                    SignerError::Codec("length prefix overflow".to_string())
                })?;
                Ok((value, 4))
            }
            _ => Err(SignerError::Codec("truncated length prefix".to_string())),
        },
        _ => Err(SignerError::Codec("unsupported length mode".to_string())),
    }
}
