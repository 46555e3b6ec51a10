//! End-to-end ceremony tests against a synthetic authenticator.
//!
//! These tests build real attestation and assertion payloads with a P-256
//! keypair and drive them through the full pipeline: registration
//! verification, credential persistence, key codec, assertion verification,
//! clone guard and the conditional store update.

use aws_lc_rs::digest::{digest, SHA256};
use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};
use chrono::Utc;
use ciborium::Value;

use passgate_core::{
    check_and_advance, decode_cose_key, AuthenticationResponse, BinaryField, CeremonyKind,
    CeremonyVerifier, Challenge, ChallengeIssuer, CloneError, CounterAdvance, CounterSource,
    Credential, CredentialStore, DeviceType, MemoryCredentialStore, RegistrationResponse,
    StoreError, StoredCounters, VerificationError,
};

const RP_ID: &str = "example.com";
const ORIGIN: &str = "https://example.com";

/// A fake platform authenticator holding one P-256 credential.
struct FakeAuthenticator {
    key_pair: EcdsaKeyPair,
    credential_id: Vec<u8>,
    rng: SystemRandom,
}

impl FakeAuthenticator {
    fn new() -> Self {
        Self {
            key_pair: EcdsaKeyPair::generate(&ECDSA_P256_SHA256_ASN1_SIGNING)
                .expect("P-256 keypair generation"),
            credential_id: b"test-credential-id-0001".to_vec(),
            rng: SystemRandom::new(),
        }
    }

    /// COSE EC2/ES256 key for the credential's public point.
    fn cose_public_key(&self) -> Vec<u8> {
        let point = self.key_pair.public_key().as_ref();
        assert_eq!(point.len(), 65);
        let map = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())), // kty: EC2
            (Value::Integer(3.into()), Value::Integer((-7).into())), // alg: ES256
            (Value::Integer((-1).into()), Value::Integer(1.into())), // crv: P-256
            (
                Value::Integer((-2).into()),
                Value::Bytes(point[1..33].to_vec()),
            ),
            (
                Value::Integer((-3).into()),
                Value::Bytes(point[33..65].to_vec()),
            ),
        ]);
        let mut out = Vec::new();
        ciborium::into_writer(&map, &mut out).unwrap();
        out
    }

    fn auth_data(&self, counter: u32, with_credential: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(digest(&SHA256, RP_ID.as_bytes()).as_ref());
        // UP | UV, plus AT when attested credential data follows.
        out.push(if with_credential { 0x45 } else { 0x05 });
        out.extend_from_slice(&counter.to_be_bytes());
        if with_credential {
            out.extend_from_slice(&[0u8; 16]); // aaguid
            out.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            out.extend_from_slice(&self.credential_id);
            out.extend_from_slice(&self.cose_public_key());
        }
        out
    }

    fn client_data(&self, ceremony_type: &str, challenge: &Challenge) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": ceremony_type,
            "challenge": challenge.to_base64url(),
            "origin": ORIGIN,
            "crossOrigin": false,
        }))
        .unwrap()
    }

    fn attestation_object(&self, auth_data: &[u8], att_stmt: Vec<(Value, Value)>) -> Vec<u8> {
        let map = Value::Map(vec![
            (
                Value::Text("fmt".into()),
                Value::Text(if att_stmt.is_empty() { "none" } else { "packed" }.into()),
            ),
            (Value::Text("attStmt".into()), Value::Map(att_stmt)),
            (Value::Text("authData".into()), Value::Bytes(auth_data.to_vec())),
        ]);
        let mut out = Vec::new();
        ciborium::into_writer(&map, &mut out).unwrap();
        out
    }

    fn register(&self, challenge: &Challenge) -> RegistrationResponse {
        let auth_data = self.auth_data(0, true);
        self.register_with(challenge, self.attestation_object(&auth_data, vec![]))
    }

    /// Registration with a packed self-attestation statement.
    fn register_self_attested(&self, challenge: &Challenge, valid: bool) -> RegistrationResponse {
        let auth_data = self.auth_data(0, true);
        let client_data = self.client_data("webauthn.create", challenge);
        let mut payload = auth_data.clone();
        payload.extend_from_slice(digest(&SHA256, &client_data).as_ref());
        let mut sig = self
            .key_pair
            .sign(&self.rng, &payload)
            .unwrap()
            .as_ref()
            .to_vec();
        if !valid {
            sig[8] ^= 0xFF;
        }
        let att_stmt = vec![
            (Value::Text("alg".into()), Value::Integer((-7).into())),
            (Value::Text("sig".into()), Value::Bytes(sig)),
        ];
        self.register_with(challenge, self.attestation_object(&auth_data, att_stmt))
    }

    fn register_with(
        &self,
        challenge: &Challenge,
        attestation_object: Vec<u8>,
    ) -> RegistrationResponse {
        RegistrationResponse {
            id: BinaryField::Array(self.credential_id.clone()),
            raw_id: BinaryField::Array(self.credential_id.clone()),
            client_data_json: BinaryField::Array(self.client_data("webauthn.create", challenge)),
            attestation_object: BinaryField::Array(attestation_object),
        }
    }

    fn assert(&self, challenge: &Challenge, counter: u32) -> AuthenticationResponse {
        let auth_data = self.auth_data(counter, false);
        let client_data = self.client_data("webauthn.get", challenge);
        let mut payload = auth_data.clone();
        payload.extend_from_slice(digest(&SHA256, &client_data).as_ref());
        let signature = self.key_pair.sign(&self.rng, &payload).unwrap();

        AuthenticationResponse {
            id: BinaryField::Array(self.credential_id.clone()),
            raw_id: BinaryField::Array(self.credential_id.clone()),
            client_data_json: BinaryField::Array(client_data),
            authenticator_data: BinaryField::Array(auth_data),
            signature: BinaryField::Array(signature.as_ref().to_vec()),
            user_handle: None,
        }
    }
}

fn verifier() -> CeremonyVerifier {
    CeremonyVerifier::new(RP_ID, ORIGIN)
}

fn challenge() -> Challenge {
    ChallengeIssuer::new().issue(CeremonyKind::Authentication)
}

#[test]
fn registration_extracts_credential() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let output = verifier().verify_registration(&authenticator.register(&c), &c).unwrap();

    assert_eq!(output.credential_id, authenticator.credential_id);
    assert_eq!(output.public_key, authenticator.cose_public_key());
    assert_eq!(output.initial_counter, 0);
    assert!(output.user_verified);
    assert_eq!(output.attestation_format, "none");
}

#[test]
fn registered_key_verifies_later_assertions() {
    // §8: the persisted key, run through the codec, verifies a legitimate
    // signature from the same authenticator.
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let registration = verifier()
        .verify_registration(&authenticator.register(&c), &c)
        .unwrap();

    let key = decode_cose_key(&registration.public_key).unwrap();
    let c2 = challenge();
    let output = verifier()
        .verify_authentication(&authenticator.assert(&c2, 1), &c2, &key)
        .unwrap();
    assert_eq!(output.counter, 1);
    assert!(output.user_verified);
}

#[test]
fn packed_self_attestation_verifies() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let output = verifier()
        .verify_registration(&authenticator.register_self_attested(&c, true), &c)
        .unwrap();
    assert_eq!(output.attestation_format, "packed");
}

#[test]
fn invalid_self_attestation_blocks_enrollment() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    assert_eq!(
        verifier()
            .verify_registration(&authenticator.register_self_attested(&c, false), &c)
            .unwrap_err(),
        VerificationError::SignatureInvalid
    );
}

#[test]
fn challenge_mismatch_is_rejected() {
    let authenticator = FakeAuthenticator::new();
    let issued = challenge();
    let other = challenge();
    assert_eq!(
        verifier()
            .verify_registration(&authenticator.register(&other), &issued)
            .unwrap_err(),
        VerificationError::ChallengeMismatch
    );
}

#[test]
fn wrong_ceremony_type_is_rejected() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let mut response = authenticator.register(&c);
    response.client_data_json =
        BinaryField::Array(authenticator.client_data("webauthn.get", &c));
    assert_eq!(
        verifier().verify_registration(&response, &c).unwrap_err(),
        VerificationError::TypeMismatch
    );
}

#[test]
fn foreign_origin_is_rejected() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    // Exact-match rule: a prefix-extended origin must not pass.
    let foreign = CeremonyVerifier::new(RP_ID, "https://example.com.evil.io");
    let key = decode_cose_key(&authenticator.cose_public_key()).unwrap();
    assert_eq!(
        foreign
            .verify_authentication(&authenticator.assert(&c, 1), &c, &key)
            .unwrap_err(),
        VerificationError::OriginMismatch
    );
}

#[test]
fn wrong_rp_id_is_rejected() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let other_rp = CeremonyVerifier::new("other.example.com", ORIGIN);
    assert_eq!(
        other_rp
            .verify_registration(&authenticator.register(&c), &c)
            .unwrap_err(),
        VerificationError::RpIdMismatch
    );
}

#[test]
fn tampered_signature_never_accepts() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let key = decode_cose_key(&authenticator.cose_public_key()).unwrap();

    let mut response = authenticator.assert(&c, 1);
    if let BinaryField::Array(sig) = &mut response.signature {
        sig[10] ^= 0x01;
    }
    assert_eq!(
        verifier()
            .verify_authentication(&response, &c, &key)
            .unwrap_err(),
        VerificationError::SignatureInvalid
    );
}

#[test]
fn tampered_authenticator_data_never_accepts() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let key = decode_cose_key(&authenticator.cose_public_key()).unwrap();

    let mut response = authenticator.assert(&c, 1);
    if let BinaryField::Array(data) = &mut response.authenticator_data {
        // Flip a counter byte: rpIdHash still matches, signature must fail.
        data[36] ^= 0x01;
    }
    assert_eq!(
        verifier()
            .verify_authentication(&response, &c, &key)
            .unwrap_err(),
        VerificationError::SignatureInvalid
    );
}

#[test]
fn tampered_client_data_never_accepts() {
    let authenticator = FakeAuthenticator::new();
    let c = challenge();
    let key = decode_cose_key(&authenticator.cose_public_key()).unwrap();

    let mut response = authenticator.assert(&c, 1);
    if let BinaryField::Array(data) = &mut response.client_data_json {
        // Flip a byte inside the challenge value: decodes to different
        // bytes, so the challenge gate fires before any signature work.
        let pos = data.len() - 30;
        data[pos] = if data[pos] == b'A' { b'B' } else { b'A' };
    }
    let err = verifier()
        .verify_authentication(&response, &c, &key)
        .unwrap_err();
    assert!(
        matches!(
            err,
            VerificationError::ChallengeMismatch
                | VerificationError::OriginMismatch
                | VerificationError::SignatureInvalid
                | VerificationError::Malformed(_)
        ),
        "tampering produced unexpected outcome: {err:?}"
    );
}

/// §8 concrete scenario: stored counter 5, assertion with counter 6 is
/// accepted and persisted; replaying the identical request is a clone.
#[tokio::test]
async fn full_flow_with_clone_detection() {
    let authenticator = FakeAuthenticator::new();
    let store = MemoryCredentialStore::new();
    let verifier = verifier();

    // Enroll.
    let c = challenge();
    let registration = verifier
        .verify_registration(&authenticator.register(&c), &c)
        .unwrap();
    let now = Utc::now();
    store
        .create(Credential {
            credential_id: registration.credential_id.clone(),
            owner_user_id: "user-1".into(),
            public_key: registration.public_key.clone(),
            counters: StoredCounters {
                sign_counter: 5,
                fallback_counter: 0,
            },
            device_type: DeviceType::Platform,
            created_at: now,
            last_used_at: now,
        })
        .await
        .unwrap();

    // Authenticate with counter 6.
    let c2 = challenge();
    let response = authenticator.assert(&c2, 6);
    let stored = store
        .find_by_credential_id(&registration.credential_id)
        .await
        .unwrap()
        .unwrap();
    let key = decode_cose_key(&stored.public_key).unwrap();
    let output = verifier
        .verify_authentication(&response, &c2, &key)
        .unwrap();
    assert_eq!(output.counter, 6);

    let advance = check_and_advance(
        &stored.counters,
        CounterSource::classify(output.counter, &stored.counters),
    )
    .unwrap();
    assert_eq!(advance, CounterAdvance::Hardware(6));
    store
        .advance_counter(&registration.credential_id, advance, Utc::now())
        .await
        .unwrap();

    // Replay: same signed assertion, counter still 6.
    let stored = store
        .find_by_credential_id(&registration.credential_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.counters.sign_counter, 6);
    let output = verifier
        .verify_authentication(&response, &c2, &key)
        .unwrap();
    assert_eq!(
        check_and_advance(
            &stored.counters,
            CounterSource::classify(output.counter, &stored.counters),
        )
        .unwrap_err(),
        CloneError::PossibleClone {
            stored: 6,
            reported: 6
        }
    );
}

/// Authenticators without a counter take the fallback path; replay of a
/// stale advance still loses at the store.
#[tokio::test]
async fn fallback_counter_flow() {
    let authenticator = FakeAuthenticator::new();
    let store = MemoryCredentialStore::new();

    let c = challenge();
    let registration = verifier()
        .verify_registration(&authenticator.register(&c), &c)
        .unwrap();
    let now = Utc::now();
    store
        .create(Credential {
            credential_id: registration.credential_id.clone(),
            owner_user_id: "user-1".into(),
            public_key: registration.public_key,
            counters: StoredCounters::default(),
            device_type: DeviceType::Platform,
            created_at: now,
            last_used_at: now,
        })
        .await
        .unwrap();

    let stored = store
        .find_by_credential_id(&registration.credential_id)
        .await
        .unwrap()
        .unwrap();
    let source = CounterSource::classify(0, &stored.counters);
    assert_eq!(source, CounterSource::FallbackOnly);
    let advance = check_and_advance(&stored.counters, source).unwrap();
    assert_eq!(advance, CounterAdvance::Fallback(1));
    store
        .advance_counter(&registration.credential_id, advance, Utc::now())
        .await
        .unwrap();

    // Applying the same advance again (a raced duplicate) conflicts.
    assert_eq!(
        store
            .advance_counter(&registration.credential_id, advance, Utc::now())
            .await
            .unwrap_err(),
        StoreError::Conflict
    );
}
