//! Session management
//!
//! Sessions are HS256-signed JWTs held by the client in the `token` cookie.
//! No server-side session storage exists, so a token stays valid until its
//! `exp` (if it has one) regardless of logout.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::data::Credential;

/// `sub` value for sessions established with a shared secret
pub const SUBJECT_TYPE: &str = "token";

/// Scopes granted to every shared-secret session
pub const DEFAULT_SCOPES: [&str; 2] = ["read", "write"];

/// Why a session token was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session token has expired")]
    Expired,

    #[error("session token is malformed")]
    Malformed,

    #[error("session token signature is invalid")]
    InvalidSignature,

    #[error("session token is missing the `{0}` claim")]
    IncompleteClaim(&'static str),

    #[error("failed to encode session token: {0}")]
    Encode(String),
}

impl SessionError {
    /// Short label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::Expired => "expired",
            SessionError::Malformed => "malformed",
            SessionError::InvalidSignature => "invalid_signature",
            SessionError::IncompleteClaim(_) => "incomplete_claim",
            SessionError::Encode(_) => "encode",
        }
    }
}

/// Identity claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClaims {
    /// Subject type (always `"token"` for shared-secret logins)
    pub sub: String,
    /// Id of the credential that authenticated
    #[serde(rename = "id")]
    pub credential_id: i64,
    pub description: String,
    #[serde(rename = "isadmin")]
    pub is_admin: bool,
    pub scopes: Vec<String>,
    /// Issued-at (unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry (unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Unrecognized claims, preserved as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    /// Claims for a freshly verified credential, stamped with the current
    /// time. `exp` is only set when a max age is configured.
    pub fn for_credential(credential: &Credential, max_age: Option<i64>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: SUBJECT_TYPE.to_string(),
            credential_id: credential.id,
            description: credential.description.clone(),
            is_admin: credential.is_admin,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            iat: Some(now),
            exp: max_age.map(|secs| now + secs),
            extra: Map::new(),
        }
    }
}

/// Admin flag as found on the wire. Older tokens carry `0`/`1`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AdminFlag {
    Bool(bool),
    Int(i64),
}

impl From<AdminFlag> for bool {
    fn from(flag: AdminFlag) -> Self {
        match flag {
            AdminFlag::Bool(value) => value,
            AdminFlag::Int(value) => value != 0,
        }
    }
}

/// Wire form before required-claim checks
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<String>,
    id: Option<i64>,
    description: Option<String>,
    isadmin: Option<AdminFlag>,
    #[serde(default)]
    scopes: Vec<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawClaims> for SessionClaims {
    type Error = SessionError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            sub: raw.sub.unwrap_or_else(|| SUBJECT_TYPE.to_string()),
            credential_id: raw.id.ok_or(SessionError::IncompleteClaim("id"))?,
            description: raw
                .description
                .ok_or(SessionError::IncompleteClaim("description"))?,
            is_admin: raw
                .isadmin
                .ok_or(SessionError::IncompleteClaim("isadmin"))?
                .into(),
            scopes: raw.scopes,
            iat: raw.iat,
            exp: raw.exp,
            extra: raw.extra,
        })
    }
}

/// Issues and verifies session tokens with a symmetric key
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    max_age: Option<i64>,
}

impl SessionCodec {
    /// Create a codec signing with `secret`.
    ///
    /// `exp` is validated whenever a token carries one, but is not required.
    pub fn new(secret: &str, max_age: Option<i64>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            max_age,
        }
    }

    /// Configured session lifetime in seconds
    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// Claims for `credential` under this codec's lifetime policy.
    pub fn claims_for(&self, credential: &Credential) -> SessionClaims {
        SessionClaims::for_credential(credential, self.max_age)
    }

    /// Sign `claims` into a compact token.
    pub fn issue(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| SessionError::Encode(e.to_string()))
    }

    /// Verify signature and expiry, then check the required claims.
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = jsonwebtoken::decode::<RawClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|error| match error.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    SessionError::InvalidSignature
                }
                _ => SessionError::Malformed,
            })?;

        SessionClaims::try_from(data.claims)
    }
}
