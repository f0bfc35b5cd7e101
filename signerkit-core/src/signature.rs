//! ECDSA signature canonicalizer.
//!
//! Platform authenticators return DER-encoded P-256 signatures. The
//! on-chain verifier accepts exactly one of the two valid encodings, so the
//! parsed `(r, s)` pair is normalized to canonical low-s form and emitted
//! as a fixed 64-byte `r ‖ s` concatenation.

use p256::elliptic_curve::scalar::IsHigh;
use p256::elliptic_curve::{Field, PrimeField};
use p256::Scalar;

use crate::error::SignerError;

/// Length of one encoded scalar.
const SCALAR_LEN: usize = 32;

/// Parses a DER-encoded ECDSA signature and returns the canonical low-s
/// 64-byte `r ‖ s` form.
///
/// A leading zero byte on either integer is stripped iff the following
/// byte has its high bit set (the ASN.1 non-negativity pad). If `s` lies
/// in the upper half of the curve order it is replaced by `n - s`.
/// Canonicalization is idempotent.
///
/// # Errors
///
/// Returns [`SignerError::SignatureFormat`] for malformed ASN.1, integers
/// longer than 32 bytes after stripping, or values that are not canonical
/// non-zero P-256 scalars. Over-long integers are never silently
/// truncated.
pub fn canonicalize_der_signature(der: &[u8]) -> Result<[u8; 64], SignerError> {
    let (r_bytes, s_bytes) = parse_der_sequence(der)?;
    let r = to_scalar(strip_leading_zero(r_bytes), "r")?;
    let s = to_scalar(strip_leading_zero(s_bytes), "s")?;
    let s = if bool::from(s.is_high()) { -s } else { s };

    let mut out = [0u8; 2 * SCALAR_LEN];
    out[..SCALAR_LEN].copy_from_slice(&r.to_repr());
    out[SCALAR_LEN..].copy_from_slice(&s.to_repr());
    Ok(out)
}

/// Splits a `SEQUENCE { INTEGER r, INTEGER s }` into the raw integer
/// contents. Only short-form lengths occur for P-256 signatures.
fn parse_der_sequence(der: &[u8]) -> Result<(&[u8], &[u8]), SignerError> {
    let body = match der {
        [0x30, len, body @ ..] if usize::from(*len) == body.len() => body,
        _ => {
            return Err(SignerError::SignatureFormat(
                "not a DER sequence".to_string(),
            ))
        }
    };
    let (r, rest) = read_der_integer(body)?;
    let (s, rest) = read_der_integer(rest)?;
    if rest.is_empty() {
        Ok((r, s))
    } else {
        Err(SignerError::SignatureFormat(
            "trailing bytes after signature".to_string(),
        ))
    }
}

fn read_der_integer(buf: &[u8]) -> Result<(&[u8], &[u8]), SignerError> {
    match buf {
        [0x02, len, rest @ ..]
            if usize::from(*len) >= 1 && usize::from(*len) <= rest.len() =>
        {
            Ok(rest.split_at(usize::from(*len)))
        }
        _ => Err(SignerError::SignatureFormat(
            "malformed DER integer".to_string(),
        )),
    }
}

/// Strips the ASN.1 non-negativity pad: a leading zero byte is removed
/// iff the following byte has its high bit set.
fn strip_leading_zero(bytes: &[u8]) -> &[u8] {
    match bytes {
        [0x00, second, ..] if second & 0x80 != 0 => &bytes[1..],
        _ => bytes,
    }
}

fn to_scalar(bytes: &[u8], name: &str) -> Result<Scalar, SignerError> {
    if bytes.len() > SCALAR_LEN {
        return Err(SignerError::SignatureFormat(format!(
            "{name} is {} bytes, exceeds scalar width",
            bytes.len()
        )));
    }
    let mut padded = [0u8; SCALAR_LEN];
    padded[SCALAR_LEN - bytes.len()..].copy_from_slice(bytes);

    let scalar = Option::<Scalar>::from(Scalar::from_repr(padded.into())).ok_or_else(
        || SignerError::SignatureFormat(format!("{name} exceeds the curve order")),
    )?;
    if bool::from(scalar.is_zero()) {
        return Err(SignerError::SignatureFormat(format!("{name} is zero")));
    }
    Ok(scalar)
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::{Signature, SigningKey};

    use super::*;

    /// P-256 curve order minus one (a high s value).
    const ORDER_MINUS_ONE: &str =
        "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632550";

    fn der_int(value: &[u8]) -> Vec<u8> {
        let mut out = vec![0x02];
        if value[0] & 0x80 == 0 {
            out.push(u8::try_from(value.len()).unwrap());
        } else {
            out.push(u8::try_from(value.len() + 1).unwrap());
            out.push(0x00);
        }
        out.extend_from_slice(value);
        out
    }

    fn der_sig(r: &[u8], s: &[u8]) -> Vec<u8> {
        let r = der_int(r);
        let s = der_int(s);
        let mut out = vec![0x30, u8::try_from(r.len() + s.len()).unwrap()];
        out.extend_from_slice(&r);
        out.extend_from_slice(&s);
        out
    }

    #[test]
    fn test_low_s_signature_is_unchanged() {
        let r = [0x11u8; 32];
        let s = [0x22u8; 32];
        let out = canonicalize_der_signature(&der_sig(&r, &s)).unwrap();
        assert_eq!(&out[..32], &r);
        assert_eq!(&out[32..], &s);
    }

    #[test]
    fn test_high_s_is_reflected_to_order_minus_s() {
        let r = [0x11u8; 32];
        let s_high = hex::decode(ORDER_MINUS_ONE).unwrap();
        let out = canonicalize_der_signature(&der_sig(&r, &s_high)).unwrap();
        // n - (n - 1) = 1
        let mut expected_s = [0u8; 32];
        expected_s[31] = 1;
        assert_eq!(&out[32..], &expected_s);
    }

    #[test]
    fn test_leading_zero_stripped_only_when_high_bit_set() {
        let mut r = [0u8; 32];
        r[0] = 0x80;
        let s = [0x22u8; 32];
        // der_int pads r with 0x00 because its high bit is set
        let out = canonicalize_der_signature(&der_sig(&r, &s)).unwrap();
        assert_eq!(out[0], 0x80);
    }

    #[test]
    fn test_oversized_integer_with_clear_high_bit_fails() {
        // A 33-byte INTEGER whose second byte has its high bit clear must
        // fail rather than be silently truncated.
        let mut raw = vec![0x00];
        raw.extend_from_slice(&[0x7fu8; 32]);
        let s = [0x22u8; 32];

        let mut der = vec![0x30, 0x02, 0x21];
        der.extend_from_slice(&raw);
        der.extend_from_slice(&der_int(&s));
        der[1] = u8::try_from(der.len() - 2).unwrap();

        assert!(matches!(
            canonicalize_der_signature(&der),
            Err(SignerError::SignatureFormat(_))
        ));
    }

    #[test]
    fn test_zero_scalar_fails() {
        let zero = [0x00u8];
        let s = [0x22u8; 32];
        assert!(matches!(
            canonicalize_der_signature(&der_sig(&zero, &s)),
            Err(SignerError::SignatureFormat(_))
        ));
    }

    #[test]
    fn test_matches_ecdsa_normalization_and_is_idempotent() {
        let key = SigningKey::from_bytes(&[42u8; 32].into()).unwrap();
        for message in [b"first".as_slice(), b"second", b"third"] {
            let signature: Signature = key.sign(message);
            let der = signature.to_der();

            let canonical = canonicalize_der_signature(der.as_bytes()).unwrap();
            let expected = signature.normalize_s().unwrap_or(signature);
            assert_eq!(canonical.as_slice(), expected.to_bytes().as_slice());

            // Re-canonicalizing the canonical form is a no-op.
            let again = canonicalize_der_signature(&der_sig(
                &canonical[..32],
                &canonical[32..],
            ))
            .unwrap();
            assert_eq!(again, canonical);
        }
    }

    #[test]
    fn test_garbage_input_fails() {
        assert!(canonicalize_der_signature(&[]).is_err());
        assert!(canonicalize_der_signature(&[0x30, 0x00]).is_err());
        assert!(canonicalize_der_signature(&[0x31, 0x02, 0x02, 0x01]).is_err());
    }
}
