//! Authentication request handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use reel_core::auth::Principal;
use reel_core::models::auth::{SignInInput, SignUpInput};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    ActivationQuery, IdTokenResponse, MessageResponse, RefreshRequest, ResendActivationRequest,
    SignInResponse, TokenResponse, UserResponse,
};
use crate::services::auth;

/// `POST /api/v1/auth/users/register`
pub async fn sign_up_handler(
    State(state): State<AppState>,
    Json(body): Json<SignUpInput>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = auth::sign_up(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// `POST /api/v1/auth/users/login`
pub async fn sign_in_handler(
    State(state): State<AppState>,
    Json(body): Json<SignInInput>,
) -> AppResult<Json<SignInResponse>> {
    let (user, pair) = auth::sign_in(&state, &body).await?;
    Ok(Json(SignInResponse {
        user: UserResponse::from(&user),
        token: TokenResponse::new(pair, state.tokens.settings()),
    }))
}

/// `GET /api/v1/activate?id=&token=`
pub async fn activate_handler(
    State(state): State<AppState>,
    Query(query): Query<ActivationQuery>,
) -> AppResult<Json<UserResponse>> {
    let user = auth::activate(&state, query.id, query.token.as_deref()).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// `POST /api/v1/auth/activation`
pub async fn resend_activation_handler(
    State(state): State<AppState>,
    Json(body): Json<ResendActivationRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    auth::resend_activation(&state, &body.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new(
            "an email will be sent to you containing activation instructions",
        )),
    ))
}

/// `POST /api/v1/auth/refresh`
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<IdTokenResponse>> {
    let id_token = auth::refresh(&state, &body.refresh_token).await?;
    Ok(Json(IdTokenResponse {
        id_token,
        token_type: "Bearer".into(),
        expires_in: state.tokens.settings().id_token_ttl.as_secs(),
    }))
}

/// `POST /api/v1/auth/signout` (requires authentication)
pub async fn sign_out_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<MessageResponse>> {
    let user_id = principal
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("you must be authenticated".into()))?;
    auth::sign_out(&state, user_id).await?;
    Ok(Json(MessageResponse::new("signed out")))
}
