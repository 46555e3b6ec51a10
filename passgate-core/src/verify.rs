//! Ceremony verification.
//!
//! Two ceremony variants share one structure: parse the client data, gate on
//! type / challenge / origin, gate on the RP-ID hash inside authenticator
//! data, then do the ceremony-specific work — extract the new credential
//! (registration) or verify the assertion signature (authentication). Every
//! gate is hard: the first failure aborts the ceremony and nothing after it
//! runs.

use aws_lc_rs::digest::{digest, SHA256};
use ciborium::Value;
use serde::Deserialize;

use crate::challenge::Challenge;
use crate::cose::{decode_cose_value, VerifierKey};
use crate::error::VerificationError;
use crate::fields::{decode_any_base64, BinaryField};

/// Client response to a registration (attestation) ceremony.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    pub id: BinaryField,
    #[serde(rename = "rawId")]
    pub raw_id: BinaryField,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: BinaryField,
    #[serde(rename = "attestationObject")]
    pub attestation_object: BinaryField,
}

/// Client response to an authentication (assertion) ceremony.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticationResponse {
    pub id: BinaryField,
    #[serde(rename = "rawId")]
    pub raw_id: BinaryField,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: BinaryField,
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: BinaryField,
    pub signature: BinaryField,
    #[serde(rename = "userHandle", default)]
    pub user_handle: Option<BinaryField>,
}

/// What a successful registration hands the caller to persist.
#[derive(Debug, Clone)]
pub struct RegistrationOutput {
    /// The new credential id (raw bytes).
    pub credential_id: Vec<u8>,
    /// COSE-encoded public key, canonically re-encoded.
    pub public_key: Vec<u8>,
    /// The authenticator's initial signature counter.
    pub initial_counter: u32,
    /// Whether the authenticator reported user verification.
    pub user_verified: bool,
    /// Attestation statement format, for audit records.
    pub attestation_format: String,
}

/// What a successful authentication hands the caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticationOutput {
    /// The authenticator-reported signature counter (may be zero when the
    /// authenticator implements none).
    pub counter: u32,
    /// Whether the authenticator reported user verification.
    pub user_verified: bool,
}

/// Client data JSON as the browser serializes it (WebAuthn §5.8.1).
#[derive(Debug, Deserialize)]
struct CollectedClientData {
    #[serde(rename = "type")]
    ceremony_type: String,
    challenge: String,
    origin: String,
}

/// Parsed authenticator data (WebAuthn §6.1).
#[derive(Debug)]
struct AuthenticatorData {
    rp_id_hash: [u8; 32],
    flags: u8,
    sign_count: u32,
    attested_credential: Option<AttestedCredential>,
}

#[derive(Debug)]
struct AttestedCredential {
    credential_id: Vec<u8>,
    /// COSE key, re-encoded so trailing extension bytes are not captured.
    public_key: Vec<u8>,
}

const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_USER_VERIFIED: u8 = 0x04;
const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;

impl AuthenticatorData {
    fn parse(bytes: &[u8]) -> Result<Self, VerificationError> {
        if bytes.len() < 37 {
            return Err(VerificationError::Malformed("authenticator data too short"));
        }
        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&bytes[..32]);
        let flags = bytes[32];
        let sign_count = u32::from_be_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]);

        let attested_credential = if flags & FLAG_ATTESTED_CREDENTIAL != 0 {
            // aaguid (16) + credential id length (2) follow the counter.
            if bytes.len() < 55 {
                return Err(VerificationError::Malformed(
                    "attested credential data truncated",
                ));
            }
            let cred_id_len = u16::from_be_bytes([bytes[53], bytes[54]]) as usize;
            let key_offset = 55 + cred_id_len;
            if bytes.len() < key_offset {
                return Err(VerificationError::Malformed(
                    "credential id extends past authenticator data",
                ));
            }
            let credential_id = bytes[55..key_offset].to_vec();

            // The COSE key is one CBOR value; extensions may follow it, so
            // parse and re-encode rather than keeping the raw tail.
            let key_value: Value = ciborium::from_reader(&bytes[key_offset..])
                .map_err(|_| VerificationError::Malformed("credential public key not CBOR"))?;
            let mut public_key = Vec::new();
            ciborium::into_writer(&key_value, &mut public_key)
                .map_err(|_| VerificationError::Malformed("credential public key not CBOR"))?;

            Some(AttestedCredential {
                credential_id,
                public_key,
            })
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
        })
    }

    fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }
}

/// Verifies attestation and assertion responses against injected
/// expectations. Stateless: one instance serves any number of concurrent
/// ceremonies.
pub struct CeremonyVerifier {
    origin: String,
    rp_id_hash: [u8; 32],
}

impl CeremonyVerifier {
    /// `rp_id` is the relying-party identifier (typically the domain);
    /// `origin` is the exact expected web origin, scheme included.
    pub fn new(rp_id: &str, origin: &str) -> Self {
        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(digest(&SHA256, rp_id.as_bytes()).as_ref());
        Self {
            origin: origin.to_string(),
            rp_id_hash,
        }
    }

    /// Verify a registration response against the expected challenge.
    ///
    /// On success the returned credential id, public key and initial counter
    /// are the values the caller persists for the new credential.
    pub fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected_challenge: &Challenge,
    ) -> Result<RegistrationOutput, VerificationError> {
        check_id_consistency(&response.id, &response.raw_id)?;

        let client_data_bytes = response.client_data_json.decode()?;
        self.check_client_data(&client_data_bytes, "webauthn.create", expected_challenge)?;

        let attestation_bytes = response.attestation_object.decode()?;
        let attestation = AttestationObject::parse(&attestation_bytes)?;

        let auth_data = AuthenticatorData::parse(&attestation.auth_data)?;
        if auth_data.rp_id_hash != self.rp_id_hash {
            return Err(VerificationError::RpIdMismatch);
        }
        if !auth_data.user_present() {
            return Err(VerificationError::Malformed("user present flag not set"));
        }

        let attested = auth_data
            .attested_credential
            .as_ref()
            .ok_or(VerificationError::Malformed(
                "no attested credential data in registration",
            ))?;

        // Attestation statement validation is best-effort: self-attestation
        // and "none" pass, but a statement that is present and fails its own
        // signature check aborts enrollment.
        attestation.check_statement(&attestation.auth_data, &client_data_bytes, attested)?;

        tracing::debug!(
            format = %attestation.fmt,
            counter = auth_data.sign_count,
            "registration response verified"
        );

        Ok(RegistrationOutput {
            credential_id: attested.credential_id.clone(),
            public_key: attested.public_key.clone(),
            initial_counter: auth_data.sign_count,
            user_verified: auth_data.user_verified(),
            attestation_format: attestation.fmt,
        })
    }

    /// Verify an authentication response against the expected challenge and
    /// the credential's stored (codec-converted) public key.
    pub fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected_challenge: &Challenge,
        public_key: &VerifierKey,
    ) -> Result<AuthenticationOutput, VerificationError> {
        check_id_consistency(&response.id, &response.raw_id)?;

        let client_data_bytes = response.client_data_json.decode()?;
        self.check_client_data(&client_data_bytes, "webauthn.get", expected_challenge)?;

        let auth_data_bytes = response.authenticator_data.decode()?;
        let auth_data = AuthenticatorData::parse(&auth_data_bytes)?;
        if auth_data.rp_id_hash != self.rp_id_hash {
            return Err(VerificationError::RpIdMismatch);
        }
        if !auth_data.user_present() {
            return Err(VerificationError::Malformed("user present flag not set"));
        }

        // The authenticator signed authenticatorData || SHA-256(clientDataJSON).
        let signature = response.signature.decode()?;
        let client_data_hash = digest(&SHA256, &client_data_bytes);
        let mut signed_payload = auth_data_bytes.clone();
        signed_payload.extend_from_slice(client_data_hash.as_ref());

        public_key.verify(&signed_payload, &signature)?;

        tracing::debug!(
            counter = auth_data.sign_count,
            user_verified = auth_data.user_verified(),
            "assertion signature verified"
        );

        Ok(AuthenticationOutput {
            counter: auth_data.sign_count,
            user_verified: auth_data.user_verified(),
        })
    }

    /// Gates 1–3: client data type, challenge equality, exact origin match.
    fn check_client_data(
        &self,
        client_data_bytes: &[u8],
        expected_type: &str,
        expected_challenge: &Challenge,
    ) -> Result<(), VerificationError> {
        let client_data: CollectedClientData = serde_json::from_slice(client_data_bytes)
            .map_err(|_| VerificationError::Malformed("client data is not valid JSON"))?;

        if client_data.ceremony_type != expected_type {
            return Err(VerificationError::TypeMismatch);
        }

        // Byte-exact comparison after canonical decoding. This binding of
        // the response to the issued challenge is the anti-forgery core of
        // the ceremony.
        let embedded = decode_any_base64(&client_data.challenge)
            .ok_or(VerificationError::Malformed("challenge is not base64"))?;
        if embedded != expected_challenge.as_bytes() {
            return Err(VerificationError::ChallengeMismatch);
        }

        // Exact match only. Substring or prefix matching here is the classic
        // origin-confusion bypass.
        if client_data.origin != self.origin {
            return Err(VerificationError::OriginMismatch);
        }

        Ok(())
    }
}

/// Parsed CBOR attestation object (WebAuthn §6.5).
#[derive(Debug)]
struct AttestationObject {
    fmt: String,
    auth_data: Vec<u8>,
    att_stmt: Vec<(Value, Value)>,
}

impl AttestationObject {
    fn parse(bytes: &[u8]) -> Result<Self, VerificationError> {
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|_| VerificationError::Malformed("attestation object is not CBOR"))?;
        let map = value
            .as_map()
            .ok_or(VerificationError::Malformed("attestation object is not a map"))?;

        let fmt = map_text_entry(map, "fmt")
            .ok_or(VerificationError::Malformed("attestation object missing fmt"))?
            .to_string();
        let auth_data = map_entry(map, "authData")
            .and_then(Value::as_bytes)
            .ok_or(VerificationError::Malformed(
                "attestation object missing authData",
            ))?
            .clone();
        let att_stmt = map_entry(map, "attStmt")
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            fmt,
            auth_data,
            att_stmt,
        })
    }

    /// Best-effort attestation statement check.
    ///
    /// - `none` / empty statements pass (self-asserted enrollment).
    /// - `packed` self-attestation (no certificate chain) is verified
    ///   against the credential's own public key; failure is fatal.
    /// - Statements carrying a certificate chain are accepted without chain
    ///   validation; trust-anchor policy lives outside this core.
    fn check_statement(
        &self,
        auth_data: &[u8],
        client_data_bytes: &[u8],
        attested: &AttestedCredential,
    ) -> Result<(), VerificationError> {
        if self.fmt == "none" || self.att_stmt.is_empty() {
            return Ok(());
        }

        if self.fmt != "packed" {
            tracing::debug!(format = %self.fmt, "attestation format accepted without validation");
            return Ok(());
        }

        if map_entry(&self.att_stmt, "x5c").is_some() {
            tracing::debug!("packed attestation with certificate chain; chain not validated");
            return Ok(());
        }

        // Packed self-attestation: the signature must verify under the
        // credential key itself, over authData || SHA-256(clientDataJSON).
        let sig = map_entry(&self.att_stmt, "sig")
            .and_then(Value::as_bytes)
            .ok_or(VerificationError::Malformed("packed attestation missing sig"))?;
        let alg = map_entry(&self.att_stmt, "alg")
            .and_then(Value::as_integer)
            .and_then(|i| i64::try_from(i).ok())
            .ok_or(VerificationError::Malformed("packed attestation missing alg"))?;

        let key_value: Value = ciborium::from_reader(attested.public_key.as_slice())
            .map_err(|_| VerificationError::Malformed("credential public key not CBOR"))?;
        let key = decode_cose_value(&key_value)?;
        if key.algorithm() != alg {
            return Err(VerificationError::SignatureInvalid);
        }

        let client_data_hash = digest(&SHA256, client_data_bytes);
        let mut signed_payload = auth_data.to_vec();
        signed_payload.extend_from_slice(client_data_hash.as_ref());
        key.verify(&signed_payload, sig)
    }
}

/// `id` must be the base64url form of `rawId`; after normalization the two
/// must be byte-identical.
fn check_id_consistency(id: &BinaryField, raw_id: &BinaryField) -> Result<(), VerificationError> {
    if id.decode()? != raw_id.decode()? {
        return Err(VerificationError::Malformed("id and rawId disagree"));
    }
    Ok(())
}

fn map_entry<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

fn map_text_entry<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a str> {
    map_entry(map, key).and_then(Value::as_text)
}
