//! Authentication service.
//!
//! Provides password registration and login, OAuth sign-in bookkeeping and
//! account management.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use tracing::instrument;

use riffhouse_core::{AuthProvider, Email, UserId, UserRole};

use crate::db::UserRepository;
use crate::models::user::{NewUser, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Largest accepted age.
const MAX_AGE: i32 = 150;

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(alias = "first_name")]
    pub first_name: String,
    #[serde(alias = "last_name", default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<i32>,
    pub password: String,
}

/// Profile edits as submitted; validated by [`AuthService::update_profile`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    #[serde(alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(alias = "last_name")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

/// Who a provider says the user is. Only verified emails get this far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub provider: AuthProvider,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository) -> Self {
        Self { users }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new local account. The user's cart is created with it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::Validation` for a blank first name or an implausible age.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let email = Email::parse(&form.email)?;
        let first_name = required_name("first name", &form.first_name)?;
        validate_age(form.age)?;
        validate_password(&form.password)?;

        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create(&NewUser {
                first_name,
                last_name: form.last_name.trim().to_owned(),
                email,
                age: form.age,
                password_hash: Some(password_hash),
                role: UserRole::User,
                provider: AuthProvider::Local,
            })
            .await
            .map_err(AuthError::from_write)?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account signs in through an OAuth provider.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password_hash = password_hash.ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // OAuth
    // =========================================================================

    /// Find the account for a provider identity, creating it on first sign-in.
    ///
    /// An existing account with the same email is reused whatever provider
    /// created it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    #[instrument(skip(self, identity), fields(provider = %identity.provider))]
    pub async fn oauth_sign_in(&self, identity: &OAuthIdentity) -> Result<User, AuthError> {
        if let Some(user) = self.users.get_by_email(&identity.email).await? {
            return Ok(user);
        }

        let first_name = if identity.first_name.trim().is_empty() {
            identity.email.local_part().to_owned()
        } else {
            identity.first_name.trim().to_owned()
        };

        let user = self
            .users
            .create(&NewUser {
                first_name,
                last_name: identity.last_name.trim().to_owned(),
                email: identity.email.clone(),
                age: None,
                password_hash: None,
                role: UserRole::User,
                provider: identity.provider,
            })
            .await
            .map_err(AuthError::from_write)?;

        tracing::info!(user_id = %user.id, "User created from OAuth sign-in");
        Ok(user)
    }

    // =========================================================================
    // Account Management
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Apply profile edits.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for blank names, an implausible age or
    /// no changes at all, `AuthError::InvalidEmail` for a malformed email and
    /// `AuthError::UserAlreadyExists` if the new email is taken.
    #[instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        changes: &ProfileChanges,
    ) -> Result<User, AuthError> {
        validate_age(changes.age)?;
        let update = ProfileUpdate {
            first_name: changes
                .first_name
                .as_deref()
                .map(|n| required_name("first name", n))
                .transpose()?,
            last_name: changes.last_name.as_deref().map(|n| n.trim().to_owned()),
            email: changes.email.as_deref().map(Email::parse).transpose()?,
            age: changes.age,
        };
        if update.is_empty() {
            return Err(AuthError::Validation("no profile changes given".to_owned()));
        }

        self.users
            .update_profile(user_id, &update)
            .await
            .map_err(AuthError::from_write)?
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete an account and its cart. Receipts are kept.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, user_id: UserId) -> Result<(), AuthError> {
        if self.users.delete(user_id).await? {
            tracing::info!(user_id = %user_id, "Account deleted");
            Ok(())
        } else {
            Err(AuthError::UserNotFound)
        }
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn set_role(&self, user_id: UserId, role: UserRole) -> Result<User, AuthError> {
        self.users
            .set_role(user_id, role)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn required_name(field: &str, value: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

fn validate_age(age: Option<i32>) -> Result<(), AuthError> {
    match age {
        Some(age) if !(0..=MAX_AGE).contains(&age) => Err(AuthError::Validation(format!(
            "age must be between 0 and {MAX_AGE}"
        ))),
        _ => Ok(()),
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
