//! Ceremony API types
//!
//! The option documents handed to `navigator.credentials.create()` /
//! `.get()` and the verification result payloads. Field names follow the
//! WebAuthn wire format, hence the camelCase renames.

use serde::Serialize;
use utoipa::ToSchema;

/// Ceremony timeout advertised to the client (milliseconds).
pub const CEREMONY_TIMEOUT_MS: u64 = 60_000;

/// COSE algorithms advertised during registration: ES256 and RS256.
pub const ADVERTISED_ALGORITHMS: [i64; 2] = [-7, -257];

#[derive(Debug, Serialize, ToSchema)]
pub struct RelyingParty {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserEntity {
    /// Pending user id (base64url).
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub alg: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticatorSelection {
    #[serde(rename = "authenticatorAttachment")]
    pub authenticator_attachment: &'static str,
    #[serde(rename = "residentKey")]
    pub resident_key: &'static str,
    #[serde(rename = "requireResidentKey")]
    pub require_resident_key: bool,
    #[serde(rename = "userVerification")]
    pub user_verification: &'static str,
}

/// Options document for `navigator.credentials.create()`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationOptions {
    pub rp: RelyingParty,
    pub user: UserEntity,
    /// Base64url-encoded challenge.
    pub challenge: String,
    #[serde(rename = "pubKeyCredParams")]
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub timeout: u64,
    pub attestation: &'static str,
    #[serde(rename = "authenticatorSelection")]
    pub authenticator_selection: AuthenticatorSelection,
}

impl RegistrationOptions {
    pub fn new(rp_id: &str, rp_name: &str, user: UserEntity, challenge: String) -> Self {
        Self {
            rp: RelyingParty {
                name: rp_name.to_string(),
                id: rp_id.to_string(),
            },
            user,
            challenge,
            pub_key_cred_params: ADVERTISED_ALGORITHMS
                .iter()
                .map(|&alg| PubKeyCredParam {
                    type_: "public-key",
                    alg,
                })
                .collect(),
            timeout: CEREMONY_TIMEOUT_MS,
            attestation: "direct",
            authenticator_selection: AuthenticatorSelection {
                authenticator_attachment: "platform",
                resident_key: "required",
                require_resident_key: true,
                user_verification: "required",
            },
        }
    }
}

/// Credential descriptor for `allowCredentials`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub type_: &'static str,
    /// Base64url credential id.
    pub id: String,
}

/// Options document for `navigator.credentials.get()`.
///
/// `allowCredentials` stays empty: the flow is usernameless, the
/// authenticator picks the resident credential.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticationOptions {
    /// Base64url-encoded challenge.
    pub challenge: String,
    pub timeout: u64,
    #[serde(rename = "rpId")]
    pub rp_id: String,
    #[serde(rename = "allowCredentials")]
    pub allow_credentials: Vec<CredentialDescriptor>,
    #[serde(rename = "userVerification")]
    pub user_verification: &'static str,
}

impl AuthenticationOptions {
    pub fn new(rp_id: &str, challenge: String) -> Self {
        Self {
            challenge,
            timeout: CEREMONY_TIMEOUT_MS,
            rp_id: rp_id.to_string(),
            allow_credentials: Vec::new(),
            user_verification: "required",
        }
    }
}

/// Documentation shape for registration verify payloads.
///
/// The handler's binary fields also accept byte arrays, Node `Buffer`
/// JSON and indexed objects; the schema shows the canonical base64url
/// string form.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationVerifyRequest {
    pub id: String,
    #[serde(rename = "rawId")]
    pub raw_id: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    #[serde(rename = "attestationObject")]
    pub attestation_object: String,
}

/// Documentation shape for authentication verify payloads.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticationVerifyRequest {
    pub id: String,
    #[serde(rename = "rawId")]
    pub raw_id: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: String,
    pub signature: String,
    #[serde(rename = "userHandle")]
    pub user_handle: Option<String>,
}

/// Result payload for a completed registration.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationResult {
    pub success: bool,
    /// The enrolled credential id (base64url), for client bookkeeping.
    pub credential_id: String,
}

/// Result payload for a completed authentication.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthenticationResult {
    pub success: bool,
    pub message: &'static str,
}

/// Result payload for logout.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResult {
    pub success: bool,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_options_advertise_required_algorithms() {
        let options = RegistrationOptions::new(
            "localhost",
            "Passgate",
            UserEntity {
                id: "dXNlcg".into(),
                name: "user".into(),
                display_name: "user".into(),
            },
            "Y2hhbGxlbmdl".into(),
        );
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["pubKeyCredParams"][0]["alg"], -7);
        assert_eq!(json["pubKeyCredParams"][1]["alg"], -257);
        assert_eq!(json["attestation"], "direct");
        assert_eq!(json["authenticatorSelection"]["userVerification"], "required");
    }

    #[test]
    fn authentication_options_are_usernameless() {
        let options = AuthenticationOptions::new("localhost", "Y2hhbGxlbmdl".into());
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["allowCredentials"].as_array().unwrap().len(), 0);
        assert_eq!(json["rpId"], "localhost");
        assert_eq!(json["timeout"], 60_000);
    }
}
