//! JWT access/refresh token minting and verification.
//!
//! Access tokens are HS256-signed and carry the full identity claims needed
//! by the claims-only gate. Refresh tokens are signed with a separate secret
//! and carry deliberately minimal claims, so a leaked refresh token reveals
//! less.

use crate::config::JwtConfig;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in every access token.
///
/// Decoding tolerates two shapes for the user id: the current `userId` key
/// and the legacy `id` key. This is an explicit compatibility shim for
/// tokens minted by older deployments; minting always writes `userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub account_id: String,
    #[serde(alias = "id")]
    pub user_id: String,
    pub role: String,
    pub email: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

/// Minimal claims embedded in every refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub account_id: String,
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
}

/// Mints an access token for the given identity.
pub fn sign_access_token(
    account_id: &str,
    user_id: &str,
    role: &str,
    email: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        account_id: account_id.to_string(),
        user_id: user_id.to_string(),
        role: role.to_string(),
        email: email.to_string(),
        exp: now + config.access_ttl_secs,
        iat: now,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.access_secret.as_bytes()),
    )
}

/// Mints a refresh token for the given identity.
pub fn sign_refresh_token(
    account_id: &str,
    user_id: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = RefreshClaims {
        account_id: account_id.to_string(),
        user_id: user_id.to_string(),
        exp: now + config.refresh_ttl_days * 86_400,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
    )
}

/// Verifies signature and expiry of an access token.
///
/// Callers distinguish expiry from other failures via
/// [`jsonwebtoken::errors::ErrorKind::ExpiredSignature`].
pub fn verify_access_token(
    token: &str,
    config: &JwtConfig,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.access_secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(data.claims)
}

/// Verifies signature and expiry of a refresh token.
pub fn verify_refresh_token(
    token: &str,
    config: &JwtConfig,
) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.refresh_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret-long-enough-for-hmac".to_string(),
            refresh_secret: "refresh-secret-long-enough-for-hmac".to_string(),
            access_ttl_secs: 86_400,
            refresh_ttl_days: 7,
        }
    }

    #[test]
    fn access_token_round_trips() {
        let config = test_config();
        let token = sign_access_token("acc_1", "usr_1", "customer", "a@x.com", &config)
            .expect("signing should succeed");

        let claims = verify_access_token(&token, &config).expect("verification should succeed");
        assert_eq!(claims.account_id, "acc_1");
        assert_eq!(claims.user_id, "usr_1");
        assert_eq!(claims.role, "customer");
        assert_eq!(claims.email, "a@x.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn refresh_token_carries_minimal_claims() {
        let config = test_config();
        let token =
            sign_refresh_token("acc_1", "usr_1", &config).expect("signing should succeed");
        let claims = verify_refresh_token(&token, &config).expect("verification should succeed");
        assert_eq!(claims.account_id, "acc_1");
        assert_eq!(claims.user_id, "usr_1");
        assert_eq!(claims.exp - claims.iat, 7 * 86_400);
    }

    #[test]
    fn tokens_are_not_interchangeable_across_secrets() {
        let config = test_config();
        let refresh =
            sign_refresh_token("acc_1", "usr_1", &config).expect("signing should succeed");

        // A refresh token must not verify as an access token.
        assert!(verify_access_token(&refresh, &config).is_err());
    }

    #[test]
    fn expired_access_token_reports_expiry() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            account_id: "acc_1".to_string(),
            user_id: "usr_1".to_string(),
            role: "customer".to_string(),
            email: "a@x.com".to_string(),
            exp: now - 300, // well past the default 60s leeway
            iat: now - 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .expect("encoding should succeed");

        let err = verify_access_token(&token, &config).expect_err("must fail");
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn malformed_token_is_not_reported_as_expired() {
        let config = test_config();
        let err = verify_access_token("not-a-jwt", &config).expect_err("must fail");
        assert!(!matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn decode_accepts_legacy_id_key() {
        // Tokens from older deployments used `id` instead of `userId`.
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let legacy = serde_json::json!({
            "accountId": "acc_1",
            "id": "usr_legacy",
            "role": "customer",
            "email": "a@x.com",
            "exp": now + 600,
            "iat": now,
        });
        let token = encode(
            &Header::default(),
            &legacy,
            &EncodingKey::from_secret(config.access_secret.as_bytes()),
        )
        .expect("encoding should succeed");

        let claims = verify_access_token(&token, &config).expect("legacy shape must decode");
        assert_eq!(claims.user_id, "usr_legacy");
    }
}
