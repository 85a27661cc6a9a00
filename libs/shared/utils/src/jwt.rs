use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use chrono::{Utc, TimeZone};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{JwtClaims, JwtHeader, Role, User};

type HmacSha256 = Hmac<Sha256>;

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let header: JwtHeader = decode_segment(header_b64)
        .ok_or_else(|| "Invalid token header".to_string())?;
    if header.alg != "HS256" {
        debug!("Rejecting token signed with {}", header.alg);
        return Err("Unsupported token algorithm".to_string());
    }

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        "Invalid signature encoding".to_string()
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims: JwtClaims = decode_segment(claims_b64)
        .ok_or_else(|| "Invalid claims format".to_string())?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| "Token subject is not a valid user id".to_string())?;

    let role: Role = claims
        .application_role()
        .ok_or_else(|| "Token carries no application role".to_string())?
        .parse()?;

    let created_at = claims.iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id,
        email: claims.email,
        role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated for user {} ({})", user.id, user.role);
    Ok(user)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Failed to parse token segment: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_valid_token_yields_typed_user() {
        let user = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, Some(1));

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.role, Role::Doctor);
        assert_eq!(validated.email.as_deref(), Some("doc@example.com"));
    }

    #[test]
    fn test_rejections() {
        let user = TestUser::default();
        assert_eq!(
            validate_token(&JwtTestUtils::create_expired_token(&user, SECRET), SECRET).unwrap_err(),
            "Token expired"
        );
        assert!(validate_token(&JwtTestUtils::create_invalid_signature_token(&user), SECRET).is_err());
        assert!(validate_token(&JwtTestUtils::create_malformed_token(), SECRET).is_err());
        assert!(validate_token("a.b.c", "").is_err());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let token = JwtTestUtils::create_token_with_role(Uuid::new_v4(), "nurse", SECRET);
        let err = validate_token(&token, SECRET).unwrap_err();
        assert!(err.contains("Unknown role"));
    }

    #[test]
    fn test_app_metadata_role_wins() {
        let user = TestUser::admin("admin@example.com");
        let token = JwtTestUtils::create_supabase_token(&user, SECRET);
        assert_eq!(validate_token(&token, SECRET).unwrap().role, Role::Admin);
    }
}
