//! Bearer token codec (HS256 JWT).
//!
//! - `extract` pulls the raw token out of `Authorization: Bearer <token>`
//! - `validate` checks structure, signature and expiry
//! - `decode_claims` turns a validated token into a `ClaimSet`
//!
//! Validation and decoding are separate steps so the gate can reject early and
//! report expiry separately from tampering.
use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::STANDARD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Claims carried by platform access tokens.
///
/// `sub` is the username. A token whose `sub` is missing or `null` still decodes;
/// the gate treats it as "no identity". `iat` and `auth` are informational and
/// accepted in whatever JSON shape the issuer used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<serde_json::Number>,
    // Authority labels stamped at issuance. Authorities are always re-derived
    // from the identity store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<serde_json::Value>,
}

impl ClaimSet {
    pub fn new(subject: impl Into<String>, expires_at: u64) -> Self {
        Self {
            sub: Some(subject.into()),
            exp: expires_at,
            iat: None,
            auth: None,
        }
    }

    /// Claims for `subject` issued now and valid for `ttl`.
    pub fn expiring_in(subject: impl Into<String>, ttl: chrono::Duration) -> Self {
        let now = chrono::Utc::now();
        let exp = (now + ttl).timestamp().max(0) as u64;

        Self {
            iat: Some(serde_json::Number::from(now.timestamp().max(0) as u64)),
            ..Self::new(subject, exp)
        }
    }

    /// Trimmed subject, or `None` when the claim is missing, `null` or blank.
    pub fn subject(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .map(str::trim)
            .filter(|sub| !sub.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Error)]
pub enum KeyMaterialError {
    #[error("secret key is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("secret key is empty")]
    Empty,
}

/// HMAC-SHA256 token codec.
///
/// Key material is not printable via Debug.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn from_secret(secret: &[u8], leeway_seconds: u64) -> Result<Self, KeyMaterialError> {
        if secret.is_empty() {
            return Err(KeyMaterialError::Empty);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;
        // Platform tokens carry no audience; only `exp` is mandatory.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Build from the base64 secret the platform stores in configuration.
    pub fn from_base64_secret(
        encoded: &str,
        leeway_seconds: u64,
    ) -> Result<Self, KeyMaterialError> {
        let secret = STANDARD.decode(encoded.trim())?;
        Self::from_secret(&secret, leeway_seconds)
    }

    /// Raw token from `Authorization: Bearer <token>`.
    ///
    /// Returns `None` when the header is missing, not visible ASCII, uses another
    /// scheme, or carries nothing after the prefix.
    pub fn extract(headers: &HeaderMap) -> Option<&str> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix(BEARER_PREFIX)?.trim();
        (!token.is_empty()).then_some(token)
    }

    /// `Ok(true)` for a well-formed, correctly signed, unexpired token.
    ///
    /// Any structural or signature problem is `Ok(false)`. Only a token that is
    /// otherwise valid but past `exp` yields `Err(TokenError::Expired)`.
    pub fn validate(&self, token: &str) -> Result<bool, TokenError> {
        // Claim shapes are checked by `decode_claims`; here only signature, `exp` and
        // JSON structure matter.
        let decoded =
            jsonwebtoken::decode::<serde_json::Value>(token, &self.decoding_key, &self.validation);
        match decoded {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.kind(), ErrorKind::ExpiredSignature) => {
                Err(TokenError::Expired)
            }
            Err(err) => {
                tracing::debug!(error = %err, "token failed validation");
                Ok(false)
            }
        }
    }

    /// Decode the claims of a token that already passed `validate`.
    pub fn decode_claims(&self, token: &str) -> Result<ClaimSet, TokenError> {
        jsonwebtoken::decode::<ClaimSet>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(err),
            })
    }

    pub fn encode(&self, claims: &ClaimSet) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(TokenError::Signing)
    }
}
