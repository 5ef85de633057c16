//! Session route handlers: registration, password login, logout and OAuth.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use riffhouse_core::AuthProvider;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User, session_keys};
use crate::services::OAuthError;
use crate::services::auth::Registration;
use crate::services::oauth::{new_state, provider_from_path};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

async fn log_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Handle registration.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<Registration>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = state.auth().register(&form).await?;
    log_in(&session, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful", "user": user })),
    ))
}

/// Handle password login.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Json<Value>> {
    let user = state.auth().login(&form.email, &form.password).await?;
    log_in(&session, &user).await?;

    Ok(Json(json!({ "message": "Login successful", "user": user })))
}

/// Handle logout.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out" })))
}

/// The logged-in user's account.
pub async fn current(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let user = state.auth().get_user(user.id).await?;
    Ok(Json(json!({ "user": user })))
}

/// Whether anyone is logged in. Never rejects.
pub async fn check_auth(OptionalAuth(user): OptionalAuth) -> Json<Value> {
    match user {
        Some(user) => Json(json!({ "isAuthenticated": true, "user": user })),
        None => Json(json!({ "isAuthenticated": false })),
    }
}

fn enabled_provider(state: &AppState, name: &str) -> Result<AuthProvider> {
    let provider = provider_from_path(name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown sign-in provider: {name}")))?;
    if !state.oauth().is_enabled(provider) {
        return Err(OAuthError::NotConfigured.into());
    }
    Ok(provider)
}

/// Start an OAuth sign-in: remember a CSRF state and send the browser to
/// the provider.
#[instrument(skip(state, session))]
pub async fn oauth_start(
    State(state): State<AppState>,
    session: Session,
    ApiPath(provider): ApiPath<String>,
) -> Result<Response> {
    let provider = enabled_provider(&state, &provider)?;
    let csrf_state = new_state();
    session
        .insert(session_keys::OAUTH_STATE, &csrf_state)
        .await?;

    let url = state.oauth().authorization_url(provider, &csrf_state)?;
    Ok((StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response())
}

/// Finish an OAuth sign-in.
#[instrument(skip(state, session, params))]
pub async fn oauth_callback(
    State(state): State<AppState>,
    session: Session,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(params): ApiQuery<OAuthCallback>,
) -> Result<Redirect> {
    let provider = enabled_provider(&state, &provider)?;

    // One attempt per state, whatever the outcome
    let expected: Option<String> = session.remove(session_keys::OAUTH_STATE).await?;

    if let Some(error) = params.error {
        return Err(OAuthError::Denied(error).into());
    }
    match (expected, params.state) {
        (Some(expected), Some(returned)) if expected == returned => {}
        _ => return Err(OAuthError::StateMismatch.into()),
    }
    let code = params
        .code
        .ok_or_else(|| OAuthError::Denied("missing authorization code".to_owned()))?;

    let identity = state.oauth().identify(provider, &code).await?;
    let user = state.auth().oauth_sign_in(&identity).await?;
    log_in(&session, &user).await?;

    tracing::info!(user_id = %user.id, provider = %provider, "OAuth sign-in");
    Ok(Redirect::to(&state.config().absolute_url("/")))
}
