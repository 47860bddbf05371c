use std::sync::Arc;

use tracing::info;

use crate::auth::{hash_password, verify_password, TokenService};
use crate::config::AuthConfig;
use crate::domain::{NewUser, UserId};
use crate::error::{AppError, ResultExt};
use crate::models::{LoginRequest, RegisterRequest};
use crate::observability::metrics::{record, MetricName};
use crate::state::AppState;
use crate::storage::{Store, StoreError};

const USER_EXISTS: &str = "User already exists";
const PASSWORD_TOO_SHORT: &str = "Password is too short";
const REGISTER_FAILED: &str = "Error registering user";
const LOGIN_FAILED: &str = "Error logging in";

/// Use case for registration and credential login
pub struct AccountsUseCase {
    store: Arc<dyn Store>,
    tokens: Arc<TokenService>,
    policy: Arc<AuthConfig>,
}

impl AccountsUseCase {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenService>, policy: Arc<AuthConfig>) -> Self {
        Self {
            store,
            tokens,
            policy,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.store),
            Arc::clone(&state.tokens),
            Arc::clone(&state.auth),
        )
    }

    /// Create an account. The username check runs before the password
    /// check, and the UNIQUE constraint backs it up against racing inserts.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserId, AppError> {
        let existing = self
            .store
            .find_user_by_username(&request.username)
            .await
            .or_internal(REGISTER_FAILED)?;
        if existing.is_some() {
            record(MetricName::RegisterTotal, Some("duplicate"));
            return Err(AppError::Validation(USER_EXISTS.to_string()));
        }

        if request.password.chars().count() < self.policy.min_password_length {
            record(MetricName::RegisterTotal, Some("weak_password"));
            return Err(AppError::Validation(PASSWORD_TOO_SHORT.to_string()));
        }

        let password_hash = hash_password(&request.password)
            .await
            .or_internal(REGISTER_FAILED)?;

        let new_user = NewUser {
            username: request.username,
            password_hash,
            name: request.name,
            gender: request.gender,
        };
        match self.store.create_user(new_user).await {
            Ok(user_id) => {
                record(MetricName::RegisterTotal, Some("created"));
                info!(user_id, "Registered new user");
                Ok(user_id)
            }
            Err(StoreError::UsernameTaken) => {
                record(MetricName::RegisterTotal, Some("duplicate"));
                Err(AppError::Validation(USER_EXISTS.to_string()))
            }
            Err(e) => Err(e).or_internal(REGISTER_FAILED),
        }
    }

    /// Verify credentials and issue a bearer token for the user.
    pub async fn login(&self, request: LoginRequest) -> Result<String, AppError> {
        let user = self
            .store
            .find_user_by_username(&request.username)
            .await
            .or_internal(LOGIN_FAILED)?;

        let Some(user) = user else {
            record(MetricName::LoginTotal, Some("unknown_user"));
            return Err(self.credential_error("Invalid user"));
        };

        let valid = verify_password(&request.password, &user.password)
            .await
            .or_internal(LOGIN_FAILED)?;
        if !valid {
            record(MetricName::LoginTotal, Some("bad_password"));
            return Err(self.credential_error("Invalid password"));
        }

        let token = self.tokens.issue(user.user_id).or_internal(LOGIN_FAILED)?;
        record(MetricName::LoginTotal, Some("success"));
        Ok(token)
    }

    fn credential_error(&self, specific: &'static str) -> AppError {
        if self.policy.uniform_login_errors {
            AppError::InvalidCredentials("Invalid username or password")
        } else {
            AppError::InvalidCredentials(specific)
        }
    }
}
