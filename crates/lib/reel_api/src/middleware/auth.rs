//! Authentication middleware: bearer token extraction and ID token verification.

use axum::http::header::{AUTHORIZATION, VARY};
use axum::http::HeaderValue;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use reel_core::auth::Principal;
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Authorization scheme accepted on incoming requests.
pub const BEARER_SCHEME: &str = "Bearer";

/// Resolves the caller and stores a [`Principal`] in request extensions.
///
/// No `Authorization` header means [`Principal::Anonymous`]; a malformed header
/// or an invalid token is rejected with 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut response = match resolve_principal(&state, request.headers().get(AUTHORIZATION)) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    };
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Authorization"));
    response
}

fn resolve_principal(
    state: &AppState,
    header: Option<&HeaderValue>,
) -> Result<Principal, AppError> {
    let Some(header) = header else {
        return Ok(Principal::Anonymous);
    };
    let token = bearer_token(header)?;
    let claims = state.tokens.validate_id_token(token)?;
    Ok(Principal::from(claims))
}

/// Extract the credential from `Bearer <token>`.
fn bearer_token(header: &HeaderValue) -> Result<&str, AppError> {
    let malformed = || {
        debug!("malformed authorization header");
        AppError::Unauthorized("invalid or missing authentication token".into())
    };
    let value = header.to_str().map_err(|_| malformed())?;
    let (scheme, credential) = value.split_once(' ').ok_or_else(malformed)?;
    if scheme != BEARER_SCHEME || credential.is_empty() || credential.contains(' ') {
        return Err(malformed());
    }
    Ok(credential)
}

/// Rejects anonymous callers with 401.
pub async fn require_auth(request: Request, next: Next) -> Result<Response, AppError> {
    match request.extensions().get::<Principal>() {
        Some(principal) if !principal.is_anonymous() => Ok(next.run(request).await),
        _ => Err(AppError::Unauthorized(
            "you must be authenticated to access this resource".into(),
        )),
    }
}
