use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::sync::Arc;
use tracing::warn;

use crate::web::models::{AuthenticatedUser, Claims};
use crate::web::{AppState, error::AppError};

/// Rejects the request with 401 unless it carries a valid user token.
pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_or_cookie_token(req.headers(), &jar).ok_or(AppError::InvalidCredentials)?;
    let user = authenticate(&token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn bearer_or_cookie_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| jar.get("token").map(|cookie| cookie.value().to_string()))
}

fn authenticate(token: &str, jwt_secret: &str) -> Result<AuthenticatedUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "Rejected user token.");
        AppError::InvalidCredentials
    })?;

    Ok(AuthenticatedUser {
        id: token_data.claims.user_id,
        username: token_data.claims.sub,
        is_moderator: token_data.claims.is_moderator,
    })
}
