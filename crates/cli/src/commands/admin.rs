//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Give an existing account access to the admin API
//! rh-cli admin set-role -e owner@riffhouse.example -r admin
//! ```
//!
//! The account must already exist (registered locally or through OAuth).

use riffhouse_core::{Email, UserRole};
use riffhouse_storefront::db::Repositories;
use riffhouse_storefront::services::{AuthError, AuthService};
use thiserror::Error;

use super::ConnectError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with this email.
    #[error("No account with email: {0}")]
    UserNotFound(String),

    #[error("Account error: {0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] riffhouse_storefront::db::RepositoryError),
}

/// Parse the command-line arguments before touching the database.
fn parse_args(email: &str, role: &str) -> Result<(Email, UserRole), AdminError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    Ok((email, role))
}

/// Change the role of the account registered under `email`.
///
/// The new role applies from the user's next login.
///
/// # Errors
///
/// Returns an error if the arguments are invalid, the account does not
/// exist, or the database is unreachable.
pub async fn set_role(email: &str, role: &str) -> Result<(), AdminError> {
    let (email, role) = parse_args(email, role)?;

    let repos = Repositories::postgres(super::connect().await?);
    let user = repos
        .users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    let user = AuthService::new(repos.users.as_ref())
        .set_role(user.id, role)
        .await?;

    tracing::info!(
        "Role updated! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    tracing::info!("The change applies the next time the user logs in.");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let (email, role) = parse_args("Owner@Riffhouse.example", "admin").unwrap();
        assert_eq!(role, UserRole::Admin);
        assert_eq!(email.as_str(), "owner@riffhouse.example");
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(matches!(
            parse_args("owner@riffhouse.example", "root"),
            Err(AdminError::InvalidRole(_))
        ));
        assert!(matches!(
            parse_args("not-an-email", "admin"),
            Err(AdminError::InvalidEmail(_))
        ));
    }
}
