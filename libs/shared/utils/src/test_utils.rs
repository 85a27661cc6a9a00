use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::records::{Doctor, Patient};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: String::new(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", Role::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: Some(self.email.clone()),
            role: self.role,
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    /// Directory entry for this user when it is a doctor.
    pub fn doctor_record(&self, department: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            user_id: self.id,
            first_name: "Test".to_string(),
            last_name: "Doctor".to_string(),
            email: self.email.clone(),
            department: department.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Directory entry for this user when it is a patient.
    pub fn patient_record(&self) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            user_id: self.id,
            first_name: "Test".to_string(),
            last_name: "Patient".to_string(),
            email: self.email.clone(),
            mobile: Some("555-0100".to_string()),
            address: None,
            symptoms: Some("headache".to_string()),
            created_at: Utc::now(),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        }), secret)
    }

    /// Token shaped like the identity provider's: generic top-level role, application
    /// role under `app_metadata`.
    pub fn create_supabase_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now();
        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "aud": "authenticated",
            "app_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp()
        }), secret)
    }

    pub fn create_token_with_role(user_id: Uuid, role: &str, secret: &str) -> String {
        Self::sign(json!({
            "sub": user_id,
            "role": role,
            "exp": (Utc::now() + Duration::hours(1)).timestamp()
        }), secret)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert!(app_config.supabase_url.is_empty());
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(app_config.is_configured());
        assert!(!app_config.uses_remote_store());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, Role::Doctor);

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Role::Doctor);
        assert_eq!(user_model.id, user.id);
        assert_eq!(user.doctor_record("Cardiology").user_id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
