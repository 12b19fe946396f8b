//! Opaque session tokens: HS256 JWTs carrying the subject id and a fixed
//! expiry. Business rules never look inside a token beyond the subject.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: user id as a decimal string.
    sub: String,
    /// Expiration, seconds since UNIX epoch.
    exp: u64,
}

/// Issue an access token for `subject_id`, expiring after `ttl_seconds`.
pub fn issue_token(subject_id: i32, secret: &str, ttl_seconds: u64) -> anyhow::Result<String> {
    #[allow(clippy::cast_sign_loss)]
    let now = chrono::Utc::now().timestamp() as u64;

    let claims = Claims {
        sub: subject_id.to_string(),
        exp: now + ttl_seconds,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("Failed to sign token: {e}"))?;

    Ok(token)
}

/// Validate a token and extract the subject id.
pub fn verify_token(token: &str, secret: &str) -> Result<i32, TokenError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    data.claims
        .sub
        .parse::<i32>()
        .map_err(|_| TokenError::Malformed)
}
