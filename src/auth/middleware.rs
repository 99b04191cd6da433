use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::api_key;
use crate::AppState;

#[derive(Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// Resolves `Authorization: TOKEN <api_key>` against the `users` table and
/// inserts an `AuthUser` into request extensions. Missing/malformed header
/// or an unrecognized key both map to `401`, matching the rest of the
/// surface where auth failures never leak whether a key ever existed.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request.headers().get(header::AUTHORIZATION).and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(header) if header.starts_with("TOKEN ") => &header[6..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let user = api_key::resolve(&state.db, api_key).await.ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.user_id,
        is_admin: user.is_admin,
    });

    Ok(next.run(request).await)
}

/// Applied after `auth_middleware`; rejects non-admin callers on admin
/// routes with `403`.
pub async fn require_admin(
    axum::Extension(auth_user): axum::Extension<AuthUser>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if !auth_user.is_admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(request).await)
}
