//! Account profile and role handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use riffhouse_core::{UserId, UserRole};

use super::extract::{ApiJson, ApiPath};
use crate::error::{Result, clear_sentry_user};
use crate::middleware::{RequireAdmin, RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::ProfileChanges;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: UserRole,
}

pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    let user = state.auth().get_user(user.id).await?;
    Ok(Json(json!({ "user": user })))
}

/// Update the logged-in user's profile.
///
/// The session is refreshed so a changed email shows up immediately.
#[instrument(skip(state, session, current, changes), fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> Result<Json<Value>> {
    let user = state.auth().update_profile(current.id, &changes).await?;
    if user.email != current.email {
        set_current_user(&session, &CurrentUser::from(&user)).await?;
    }
    Ok(Json(json!({ "message": "Profile updated", "user": user })))
}

/// Delete the logged-in user's account and end their session.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete_account(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Value>> {
    state.auth().delete_account(user.id).await?;
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Account deleted" })))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn set_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(user_id): ApiPath<UserId>,
    ApiJson(change): ApiJson<RoleChange>,
) -> Result<Json<Value>> {
    let user = state.auth().set_role(user_id, change.role).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "Role changed");
    Ok(Json(json!({ "message": "Role updated", "user": user })))
}
