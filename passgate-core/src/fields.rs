//! Client binary field normalization.
//!
//! Browsers and client shims serialize the binary parts of a ceremony
//! response in several shapes: base64/base64url strings, raw numeric
//! arrays, Node `Buffer` JSON (`{"type":"Buffer","data":[...]}`), or a
//! numeric-indexed object produced by spreading a `Uint8Array`. Rather than
//! probing types at runtime, the accepted shapes form a closed tagged enum;
//! anything else fails deserialization and the ceremony is rejected as
//! malformed before any verification work happens.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::VerificationError;

/// A client-supplied binary field in one of the accepted wire shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BinaryField {
    /// Base64 or base64url text, padded or not.
    Text(String),
    /// Raw byte array (`[1, 2, 3]`). Values outside 0..=255 are rejected
    /// by deserialization.
    Array(Vec<u8>),
    /// Node `Buffer` JSON form.
    Buffer {
        #[serde(rename = "type")]
        tag: String,
        data: Vec<u8>,
    },
    /// Numeric-indexed object (`{"0": 104, "1": 105}`).
    Indexed(BTreeMap<String, u8>),
}

impl BinaryField {
    /// Normalize to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, VerificationError> {
        match self {
            BinaryField::Text(s) => decode_any_base64(s)
                .ok_or(VerificationError::Malformed("field is not valid base64")),
            BinaryField::Array(bytes) => Ok(bytes.clone()),
            BinaryField::Buffer { tag, data } => {
                if tag == "Buffer" {
                    Ok(data.clone())
                } else {
                    Err(VerificationError::Malformed("unknown buffer tag"))
                }
            }
            BinaryField::Indexed(map) => {
                // Keys must be the contiguous indexes 0..len, each in its
                // canonical spelling. "00" or "+1" parse to the same number
                // as another key and would silently alias its position.
                let mut out = vec![0u8; map.len()];
                for (key, value) in map {
                    let index: usize = key
                        .parse()
                        .map_err(|_| VerificationError::Malformed("non-numeric index key"))?;
                    if *key != index.to_string() {
                        return Err(VerificationError::Malformed("non-canonical index key"));
                    }
                    if index >= out.len() {
                        return Err(VerificationError::Malformed("sparse indexed object"));
                    }
                    out[index] = *value;
                }
                Ok(out)
            }
        }
    }

    /// Decode and additionally base64url-encode, for stable credential ids.
    pub fn decode_base64url(&self) -> Result<String, VerificationError> {
        Ok(URL_SAFE_NO_PAD.encode(self.decode()?))
    }
}

/// Decode base64 text accepting both alphabets, padded or unpadded.
///
/// Clients are inconsistent here (the WebAuthn spec says base64url, older
/// shims send standard base64), so the canonical decoding accepts all four
/// combinations and yields identical bytes for equivalent encodings.
pub(crate) fn decode_any_base64(s: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s)
        .or_else(|_| URL_SAFE.decode(s))
        .or_else(|_| STANDARD_NO_PAD.decode(s))
        .or_else(|_| STANDARD.decode(s))
        .ok()
}
