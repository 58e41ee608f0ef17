use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Validates the bearer token and stores the resulting [`User`] in the
/// request extensions for the handlers downstream.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Rejects callers whose clinic role is not among `roles`.
pub fn require_role(user: &User, roles: &[UserRole], action: &str) -> Result<(), AppError> {
    if user.has_any_role(roles) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Not allowed to {}", action)))
    }
}
