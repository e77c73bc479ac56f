use chrono::{DateTime, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;

/// Claims
///
/// Represents the standard payload structure carried inside a JSON Web Token
/// (JWT). These claims are signed with the server's secret and validated upon
/// every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): The UUID of the user owning the token.
    pub sub: Uuid,
    /// Expiration Time (exp): Timestamp after which the JWT must not be
    /// accepted. This is crucial for preventing replay attacks.
    pub exp: usize,
    /// Issued At (iat): Timestamp when the JWT was issued.
    pub iat: usize,
    /// Any additional claims supplied at issuance, flattened into the payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// TokenService
///
/// Issues and verifies signed bearer tokens. Signing uses HS256 with the
/// configured secret; identical claim sets produce identical tokens (no
/// nonce), so callers must not rely on token uniqueness as an identity key.
///
/// The service is pure and stateless: it holds only the secret and the
/// configured TTL, making every method safe under unbounded concurrent
/// invocation with no locking.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    /// issue
    ///
    /// Builds the claim set {sub, iat = now, exp = now + TTL} and returns the
    /// signed token string.
    pub fn issue(&self, user_id: Uuid) -> Result<String, ApiError> {
        self.issue_with_claims(user_id, Map::new())
    }

    /// issue_with_claims
    ///
    /// Same as `issue`, with caller-supplied extra claims flattened into the
    /// payload alongside the standard set.
    pub fn issue_with_claims(
        &self,
        user_id: Uuid,
        extra: Map<String, Value>,
    ) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.ttl_secs as usize,
            extra,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| ApiError::InvalidToken)
    }

    /// validate
    ///
    /// Recomputes the signature from the embedded claims and the secret key
    /// (constant-time comparison inside `jsonwebtoken`), checks that the token
    /// has not expired (zero leeway), and checks that the subject matches.
    ///
    /// Returns false on any mismatch. A syntactically malformed token
    /// classifies as invalid; this method never errors or panics.
    pub fn validate(&self, token: &str, expected_subject: Uuid) -> bool {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // The default 60s leeway would accept freshly expired tokens; the
        // expiry boundary is strict here.
        validation.leeway = 0;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => data.claims.sub == expected_subject,
            Err(_) => false,
        }
    }

    /// extract_subject
    ///
    /// Decodes the subject claim without enforcing expiry. The signature is
    /// still verified so the claims cannot be forged.
    pub fn extract_subject(&self, token: &str) -> Result<Uuid, ApiError> {
        Ok(self.decode_ignoring_expiry(token)?.claims.sub)
    }

    /// extract_expiry
    ///
    /// Decodes the expiry claim without enforcing it, so expired tokens can
    /// still be inspected.
    pub fn extract_expiry(&self, token: &str) -> Result<DateTime<Utc>, ApiError> {
        let exp = self.decode_ignoring_expiry(token)?.claims.exp;
        DateTime::<Utc>::from_timestamp(exp as i64, 0).ok_or(ApiError::InvalidToken)
    }

    /// decode
    ///
    /// Full decode used by the authentication extractor: signature and expiry
    /// are both enforced, with the expiry failure distinguished so callers can
    /// report `Expired` separately from `InvalidToken`.
    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(ApiError::Expired),
                _ => Err(ApiError::InvalidToken),
            },
        }
    }

    fn decode_ignoring_expiry(&self, token: &str) -> Result<TokenData<Claims>, ApiError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| ApiError::InvalidToken)
    }
}
