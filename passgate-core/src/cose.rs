//! COSE public key codec.
//!
//! Enrolled credentials are persisted in the COSE encoding the authenticator
//! hands out (a compact CBOR key-parameter map). The signature primitive
//! wants structured key material instead, so this module converts between
//! the two. The supported algorithm families are the ones advertised in the
//! registration options: ES256 (COSE alg -7) and RS256 (COSE alg -257).

use aws_lc_rs::signature::{
    RsaPublicKeyComponents, UnparsedPublicKey, ECDSA_P256_SHA256_ASN1,
    RSA_PKCS1_2048_8192_SHA256,
};
use ciborium::Value;

use crate::error::{CodecError, VerificationError};

// COSE key common parameters (RFC 9052 / RFC 9053).
const LABEL_KTY: i64 = 1;
const LABEL_ALG: i64 = 3;
// EC2 parameters.
const LABEL_EC2_X: i64 = -2;
const LABEL_EC2_Y: i64 = -3;
// RSA parameters.
const LABEL_RSA_N: i64 = -1;
const LABEL_RSA_E: i64 = -2;

const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

pub const COSE_ALG_ES256: i64 = -7;
pub const COSE_ALG_RS256: i64 = -257;

/// A stored public key converted into the form the verifier requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierKey {
    /// ECDSA over P-256 with SHA-256; uncompressed SEC1 point `0x04 || x || y`.
    Es256 { point: Vec<u8> },
    /// RSASSA-PKCS1-v1_5 with SHA-256; modulus and public exponent.
    Rs256 { n: Vec<u8>, e: Vec<u8> },
}

impl VerifierKey {
    /// The COSE algorithm identifier this key verifies under.
    pub fn algorithm(&self) -> i64 {
        match self {
            VerifierKey::Es256 { .. } => COSE_ALG_ES256,
            VerifierKey::Rs256 { .. } => COSE_ALG_RS256,
        }
    }

    /// Verify `signature` over `message` with this key.
    ///
    /// Any failure — wrong key, damaged payload, damaged signature — is
    /// [`VerificationError::SignatureInvalid`]; the distinction is not
    /// observable and must not be.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), VerificationError> {
        match self {
            VerifierKey::Es256 { point } => {
                UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, point)
                    .verify(message, signature)
                    .map_err(|_| VerificationError::SignatureInvalid)
            }
            VerifierKey::Rs256 { n, e } => RsaPublicKeyComponents { n, e }
                .verify(&RSA_PKCS1_2048_8192_SHA256, message, signature)
                .map_err(|_| VerificationError::SignatureInvalid),
        }
    }
}

/// Convert a stored COSE key into the verifier's structured format.
pub fn decode_cose_key(cose_bytes: &[u8]) -> Result<VerifierKey, CodecError> {
    let value: Value = ciborium::from_reader(cose_bytes)
        .map_err(|_| CodecError::Malformed("COSE key is not valid CBOR"))?;
    decode_cose_value(&value)
}

/// Convert an already-parsed COSE key map.
pub(crate) fn decode_cose_value(value: &Value) -> Result<VerifierKey, CodecError> {
    let map = value
        .as_map()
        .ok_or(CodecError::Malformed("COSE key is not a CBOR map"))?;

    let kty = map_integer(map, LABEL_KTY)
        .ok_or(CodecError::Malformed("COSE key missing kty"))?;
    let alg = map_integer(map, LABEL_ALG)
        .ok_or(CodecError::Malformed("COSE key missing alg"))?;

    match (kty, alg) {
        (KTY_EC2, COSE_ALG_ES256) => {
            let x = map_bytes(map, LABEL_EC2_X)
                .ok_or(CodecError::Malformed("EC2 key missing x coordinate"))?;
            let y = map_bytes(map, LABEL_EC2_Y)
                .ok_or(CodecError::Malformed("EC2 key missing y coordinate"))?;
            if x.len() != 32 || y.len() != 32 {
                return Err(CodecError::Malformed("EC2 coordinate has wrong length"));
            }
            let mut point = Vec::with_capacity(65);
            point.push(0x04);
            point.extend_from_slice(x);
            point.extend_from_slice(y);
            Ok(VerifierKey::Es256 { point })
        }
        (KTY_RSA, COSE_ALG_RS256) => {
            let n = map_bytes(map, LABEL_RSA_N)
                .ok_or(CodecError::Malformed("RSA key missing modulus"))?;
            let e = map_bytes(map, LABEL_RSA_E)
                .ok_or(CodecError::Malformed("RSA key missing exponent"))?;
            if n.is_empty() || e.is_empty() {
                return Err(CodecError::Malformed("RSA key parameter is empty"));
            }
            Ok(VerifierKey::Rs256 {
                n: n.to_vec(),
                e: e.to_vec(),
            })
        }
        // kty/alg disagree, or an algorithm outside the advertised set.
        (KTY_EC2, other) | (KTY_RSA, other) => Err(CodecError::UnsupportedAlgorithm(other)),
        _ => Err(CodecError::UnsupportedAlgorithm(alg)),
    }
}

/// Extract the `alg` parameter without fully decoding the key.
pub fn cose_key_algorithm(cose_bytes: &[u8]) -> Result<i64, CodecError> {
    let value: Value = ciborium::from_reader(cose_bytes)
        .map_err(|_| CodecError::Malformed("COSE key is not valid CBOR"))?;
    let map = value
        .as_map()
        .ok_or(CodecError::Malformed("COSE key is not a CBOR map"))?;
    map_integer(map, LABEL_ALG).ok_or(CodecError::Malformed("COSE key missing alg"))
}

fn map_integer(map: &[(Value, Value)], label: i64) -> Option<i64> {
    map.iter()
        .find(|(k, _)| k.as_integer() == Some(label.into()))
        .and_then(|(_, v)| v.as_integer())
        .and_then(|i| i64::try_from(i).ok())
}

fn map_bytes(map: &[(Value, Value)], label: i64) -> Option<&[u8]> {
    map.iter()
        .find(|(k, _)| k.as_integer() == Some(label.into()))
        .and_then(|(_, v)| v.as_bytes())
        .map(|b| b.as_slice())
}
