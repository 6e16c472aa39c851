use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::state::AppState;

/// Validates the bearer token and stores the caller as a `User` extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
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

    let user = validate_token(token, &state.config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Rejects callers whose token does not carry the therapist role.
pub fn require_therapist(user: &User) -> Result<(), AppError> {
    if user.is_therapist() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Therapist role required".to_string()))
    }
}
