use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use schoolhub_types::api::Claims;
use schoolhub_types::models::Role;

use crate::error::GatewayError;

/// Sign a bearer token for `user_id` that expires after `ttl`.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: Role,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Check signature and expiry. Expiry is enforced with no leeway.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, GatewayError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected credential: {}", e);
        GatewayError::InvalidCredential
    })
}
