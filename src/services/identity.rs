// src/services/identity.rs

use std::sync::Arc;

use crate::{
    error::AppError,
    models::{token::AccessToken, user::User},
    store::{NewUser, Store, StoreError, UniqueField},
    utils::{
        hash::{hash_password, verify_password},
        token::{generate_access_token, generate_public_token},
    },
};

/// How many times registration regenerates tokens after a collision.
const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Outcome of a username change request.
#[derive(Debug, Clone)]
pub enum UsernameChange {
    /// The requested name already was the current one; nothing was written.
    Unchanged(User),
    Changed(User),
}

/// Outcome of [`IdentityService::update_account`].
#[derive(Debug, Clone)]
pub struct AccountChange {
    pub user: User,
    pub username_changed: bool,
    pub password_changed: bool,
}

/// Issues credentials and answers "who is asking".
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn Store>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Registers a new account with freshly generated public and access tokens.
    pub async fn issue_credentials(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<User, AppError> {
        if username.is_empty() || password.is_empty() || email.is_empty() {
            return Err(AppError::BadRequest("Invalid input.".to_string()));
        }

        let password_hash = hash_password(password).await?;

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let new_user = NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash: password_hash.clone(),
                public_token: generate_public_token(),
                access_token: generate_access_token(),
            };

            match self.store.insert_user(new_user).await {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "Registered user {}", user.username);
                    return Ok(user);
                }
                Err(StoreError::UniqueViolation(UniqueField::Username)) => {
                    return Err(AppError::Conflict(format!(
                        "Username '{}' already exists",
                        username
                    )));
                }
                Err(StoreError::UniqueViolation(field)) => {
                    tracing::warn!("Token collision on {:?} (attempt {})", field, attempt);
                }
                Err(e) => {
                    tracing::error!("Failed to register user: {:?}", e);
                    return Err(e.into());
                }
            }
        }

        Err(AppError::InternalServerError(
            "Could not generate unique tokens".to_string(),
        ))
    }

    /// Looks up the owner of a bearer token. Unknown tokens are `Ok(None)`.
    pub async fn resolve_bearer(&self, token: &AccessToken) -> Result<Option<User>, AppError> {
        Ok(self.store.find_user_by_access_token(token).await?)
    }

    /// Verifies a username/password pair. Any mismatch is `Ok(None)`.
    pub async fn authenticate_basic(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn change_username(
        &self,
        token: &AccessToken,
        new_username: &str,
    ) -> Result<UsernameChange, AppError> {
        let change = self.update_account(token, Some(new_username), None).await?;

        if change.username_changed {
            Ok(UsernameChange::Changed(change.user))
        } else {
            Ok(UsernameChange::Unchanged(change.user))
        }
    }

    pub async fn change_password(
        &self,
        token: &AccessToken,
        new_password: &str,
    ) -> Result<(), AppError> {
        self.update_account(token, None, Some(new_password)).await?;
        Ok(())
    }

    /// Changes username and/or password of the user owning `token`.
    ///
    /// The new password is hashed before anything is written, and both fields
    /// are stored in one write, so a failed request changes neither.
    pub async fn update_account(
        &self,
        token: &AccessToken,
        new_username: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<AccountChange, AppError> {
        if new_username.is_none() && new_password.is_none() {
            return Err(AppError::BadRequest("Invalid input".to_string()));
        }
        if new_username.is_some_and(str::is_empty) {
            return Err(AppError::BadRequest("Username must not be empty.".to_string()));
        }
        if new_password.is_some_and(str::is_empty) {
            return Err(AppError::BadRequest("Password must not be empty.".to_string()));
        }

        let current = self
            .store
            .find_user_by_access_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let username = new_username.filter(|name| *name != current.username);
        let password_hash = match new_password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        if username.is_none() && password_hash.is_none() {
            return Ok(AccountChange {
                user: current,
                username_changed: false,
                password_changed: false,
            });
        }

        let updated = self
            .store
            .update_credentials(token, username, password_hash.as_deref())
            .await
            .map_err(|e| match (e, username) {
                (StoreError::UniqueViolation(UniqueField::Username), Some(name)) => {
                    AppError::Conflict(format!("Username '{}' already exists", name))
                }
                (other, _) => other.into(),
            })?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        if username.is_some() {
            tracing::info!(user_id = %updated.id, "Username changed to {}", updated.username);
        }
        if password_hash.is_some() {
            tracing::info!(user_id = %updated.id, "Password changed");
        }

        Ok(AccountChange {
            user: updated,
            username_changed: username.is_some(),
            password_changed: password_hash.is_some(),
        })
    }
}
