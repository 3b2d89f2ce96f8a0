//! Sign-up, sign-in, activation, refresh and sign-out flows.

use reel_core::auth::{AuthError, Identity};
use reel_core::mailer::MailMessage;
use reel_core::models::auth::{NewUser, SignInInput, SignUpInput, TokenPair, User};
use reel_core::validation::validate;
use tracing::{debug, info, warn};

use super::with_deadline;
use crate::AppState;
use crate::error::{AppError, AppResult};

/// Create an account and mail its activation link in the background.
pub async fn sign_up(state: &AppState, input: &SignUpInput) -> AppResult<User> {
    validate(input).map_err(AppError::Unprocessable)?;
    if !input.passwords_match() {
        return Err(AppError::BadRequest("passwords do not match".into()));
    }

    let password_hash = state.hasher.hash(&input.password)?;
    let new_user = NewUser {
        name: input.name.clone(),
        email: input.email.to_lowercase(),
        password_hash,
    };
    let timeout = state.config.request_timeout;
    let user = with_deadline(timeout, state.users.insert(&new_user))
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict("a user with this email address already exists".into())
            }
            other => other,
        })?;
    info!(user_id = user.id, "user signed up");

    let background = state.clone();
    let recipient = user.clone();
    tokio::spawn(async move {
        if let Err(e) = send_activation(&background, &recipient, false).await {
            warn!(user_id = recipient.id, error = %e, "activation email not sent");
        }
    });

    Ok(user)
}

/// Issue (or, with `replace`, reissue) an activation token and mail the link.
///
/// Reissuing works whether or not the previous token is still pending.
async fn send_activation(state: &AppState, user: &User, replace: bool) -> AppResult<()> {
    let timeout = state.config.request_timeout;
    let token = if replace {
        with_deadline(timeout, state.tokens.regenerate_activation_token(user.id)).await?
    } else {
        with_deadline(timeout, state.tokens.generate_activation_token(user.id)).await?
    };
    let message = MailMessage::activation(
        &user.email,
        &user.name,
        activation_link(&state.config.app_host, user.id, &token.plaintext),
    );
    with_deadline(timeout, state.mailer.send(&message)).await
}

/// Link a user follows to activate their account.
pub fn activation_link(app_host: &str, user_id: i64, plaintext: &str) -> String {
    format!(
        "{}/activate?id={user_id}&token={plaintext}",
        app_host.trim_end_matches('/')
    )
}

/// Check credentials and open the user's single refresh session.
pub async fn sign_in(state: &AppState, input: &SignInInput) -> AppResult<(User, TokenPair)> {
    validate(input).map_err(AppError::Unprocessable)?;
    let timeout = state.config.request_timeout;

    let found = match with_deadline(
        timeout,
        state.users.get_by_email(&input.email.to_lowercase()),
    )
    .await
    {
        Ok(found) => found,
        Err(AppError::NotFound(_)) => {
            state.hasher.dummy_verify(&input.password);
            return Err(AuthError::CredentialError.into());
        }
        Err(e) => return Err(e),
    };
    if !state.hasher.verify(&input.password, &found.password_hash)? {
        return Err(AuthError::CredentialError.into());
    }
    if !found.user.activated {
        return Err(AuthError::NotActivated.into());
    }

    let pair = with_deadline(
        timeout,
        state.tokens.new_pair_from_user(&Identity::from(&found.user)),
    )
    .await?;
    Ok((found.user, pair))
}

/// Consume an activation token and mark the user activated.
pub async fn activate(state: &AppState, user_id: Option<i64>, token: Option<&str>) -> AppResult<User> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("activation token is required".into()))?;
    let user_id = user_id
        .filter(|id| *id >= 1)
        .ok_or_else(|| AppError::BadRequest("a valid user id is required".into()))?;
    let timeout = state.config.request_timeout;

    with_deadline(timeout, state.tokens.validate_activation_token(user_id, token)).await?;
    let user = with_deadline(timeout, state.users.set_activated(user_id)).await?;

    // The account is active; a leftover token just expires.
    if let Err(e) = with_deadline(timeout, state.tokens.delete_activation_token(user_id)).await {
        warn!(user_id, error = %e, "activation token not deleted");
    }
    info!(user_id, "user activated");
    Ok(user)
}

/// Issue a fresh activation token and re-send the email.
///
/// Unknown and already-activated addresses succeed silently, so the response
/// does not reveal which accounts exist.
pub async fn resend_activation(state: &AppState, email: &str) -> AppResult<()> {
    let timeout = state.config.request_timeout;
    let found = match with_deadline(timeout, state.users.get_by_email(&email.to_lowercase())).await
    {
        Ok(found) => found,
        Err(AppError::NotFound(_)) => {
            debug!("activation resend for unknown email");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    if found.user.activated {
        debug!(user_id = found.user.id, "activation resend for active account");
        return Ok(());
    }
    send_activation(state, &found.user, true).await
}

/// Trade a live refresh token for a fresh ID token.
///
/// The refresh token must still be the user's current session; signing out
/// revokes it even before it expires.
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<String> {
    let timeout = state.config.request_timeout;
    let claims = state.tokens.validate_refresh_token(refresh_token)?;
    let user_id = with_deadline(timeout, state.tokens.verify_refresh_session(&claims)).await?;
    let user = match with_deadline(timeout, state.users.get_by_id(user_id)).await {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => return Err(AuthError::InvalidToken.into()),
        Err(e) => return Err(e),
    };
    Ok(state.tokens.issue_id_token(&Identity::from(&user))?)
}

/// Revoke the user's refresh session.
pub async fn sign_out(state: &AppState, user_id: i64) -> AppResult<()> {
    with_deadline(state.config.request_timeout, state.tokens.delete_user_tokens(user_id)).await?;
    info!(user_id, "user signed out");
    Ok(())
}
