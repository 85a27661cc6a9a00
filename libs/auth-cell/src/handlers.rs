use std::sync::Arc;

use axum::extract::{Extension, Json, State};
use axum_extra::typed_header::{TypedHeader, TypedHeaderRejection};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SharedStore;
use shared_models::auth::{Role, TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::jwt::validate_token as decode_token;

type BearerHeader = Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>;

fn bearer(header: BearerHeader) -> Result<String, AppError> {
    match header {
        Ok(TypedHeader(Authorization(bearer))) => Ok(bearer.token().to_string()),
        Err(rejection) if rejection.is_missing() => {
            Err(AppError::Auth("Missing authorization header".to_string()))
        }
        Err(_) => Err(AppError::Auth("Invalid authorization header format".to_string())),
    }
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    header: BearerHeader,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer(header)?;
    let user = decode_token(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
        capabilities: user.role.capabilities().to_vec(),
    }))
}

/// Never fails on a bad token; answers `{"valid": false}` instead.
pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    header: BearerHeader,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = bearer(header)?;
    let valid = decode_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

pub async fn get_profile(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let profile = match user.role {
        Role::Doctor => store.find_doctor_by_user(user.id).await?.map(|doctor| json!(doctor)),
        Role::Patient => store.find_patient_by_user(user.id).await?.map(|patient| json!(patient)),
        Role::Admin => None,
    };

    Ok(Json(json!({
        "user_id": user.id,
        "email": user.email,
        "role": user.role,
        "capabilities": user.role.capabilities(),
        "profile": profile
    })))
}
