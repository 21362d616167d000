use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::users::{
    credential::TokenIssuer,
    dto::{LoginResponse, UpdateUserRequest, UserView},
    password::{hash_password, verify_password, PasswordError},
    repo::{StoreError, UniqueField, UserStore},
    repo_types::NewUser,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("username already taken")]
    DuplicateUsername,
    /// Same message for unknown email and wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(UniqueField::Email) => Self::DuplicateEmail,
            StoreError::Duplicate(UniqueField::Username) => Self::DuplicateUsername,
            StoreError::NotFound => Self::NotFound,
            StoreError::Storage(e) => Self::Internal(e),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(e: PasswordError) -> Self {
        Self::Internal(e.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Registration, authentication and profile rules on top of a `UserStore`.
pub struct UserService {
    store: Arc<dyn UserStore>,
    tokens: TokenIssuer,
}

/// Maps a lookup miss to `Ok(false)` so pre-checks can tell "free" from a storage failure.
fn exists<T>(res: Result<T, StoreError>) -> ServiceResult<bool> {
    match res {
        Ok(_) => Ok(true),
        Err(StoreError::NotFound) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> ServiceResult<UserView> {
        // Fast path only; the store's unique constraint decides under concurrency.
        if exists(self.store.find_by_email(email).await)? {
            warn!(email, "email already registered");
            return Err(ServiceError::DuplicateEmail);
        }
        if exists(self.store.find_by_username(username).await)? {
            warn!(username, "username already taken");
            return Err(ServiceError::DuplicateUsername);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .store
            .create(NewUser {
                email: email.to_string(),
                username: username.to_string(),
                password_hash,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(UserView::from(&user))
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginResponse> {
        let user = match self.store.find_by_email(email).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                warn!(email, "login unknown email");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let ok = verify_password(password, &user.password_hash).map_err(|e| {
            error!(error = %e, user_id = user.id, "stored password hash unreadable");
            ServiceError::from(e)
        })?;
        if !ok {
            warn!(email, user_id = user.id, "login invalid password");
            return Err(ServiceError::InvalidCredentials);
        }

        let issued = self.tokens.issue(user.id).map_err(ServiceError::Internal)?;
        info!(user_id = user.id, "user logged in");
        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: UserView::from(&user),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_id(&self, id: i64) -> ServiceResult<UserView> {
        let user = self.store.find_by_id(id).await?;
        Ok(UserView::from(&user))
    }

    /// Username changes are not re-checked against other users here; a collision
    /// only surfaces if the store's unique constraint rejects the write.
    #[instrument(skip(self, req))]
    pub async fn update_user(&self, id: i64, req: &UpdateUserRequest) -> ServiceResult<UserView> {
        let mut user = self.store.find_by_id(id).await?;

        if let Some(username) = req.new_username() {
            user.username = username.to_string();
        }
        if let Some(password) = req.new_password() {
            user.password_hash = hash_password(password)?;
        }

        let user = self.store.update(&user).await?;
        info!(user_id = user.id, "user updated");
        Ok(UserView::from(&user))
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> ServiceResult<()> {
        self.store.delete(id).await?;
        info!(user_id = id, "user soft-deleted");
        Ok(())
    }
}
