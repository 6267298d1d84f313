//! Users and session tokens.
//!
//! Registration creates a user and opens a session in one step. Credentials
//! are not handled here; a session token is the only proof of identity.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::{SharedStore, StoreError, UserStore, ValidationErrors, validation::MSG_REQUIRED};

pub mod token;

pub use token::{generate_session_token, hash_session_token};

pub const FIELD_USERNAME: &str = "username";
pub const FIELD_EMAIL: &str = "email";

pub const USERNAME_MAX_CHARS: usize = 150;
pub const EMAIL_MAX_CHARS: usize = 254;

/// Default session lifetime: two weeks.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

const MSG_USERNAME_TAKEN: &str = "A user with that username already exists.";
const MSG_EMAIL_TAKEN: &str = "This email address is already in use.";
const MSG_USERNAME_INVALID: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const MSG_EMAIL_INVALID: &str = "Enter a valid email address.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
}

impl User {
    #[must_use]
    pub fn new(username: &str, email: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: email.to_string(),
            is_staff: false,
        }
    }
}

/// A freshly opened session. `token` is only ever returned here.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("failed to generate session token: {0}")]
    Token(#[from] rand::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for AccountError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
static USERNAME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").ok());

/// Basic `local@domain.tld` shape check.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|regex| regex.is_match(email))
}

#[must_use]
pub fn valid_username(username: &str) -> bool {
    USERNAME_RE
        .as_ref()
        .is_some_and(|regex| regex.is_match(username))
}

fn validate_registration(username: &str, email: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if username.is_empty() {
        errors.add(FIELD_USERNAME, MSG_REQUIRED);
    } else if username.chars().count() > USERNAME_MAX_CHARS {
        errors.add(
            FIELD_USERNAME,
            format!(
                "Ensure this value has at most {USERNAME_MAX_CHARS} characters (it has {}).",
                username.chars().count()
            ),
        );
    } else if !valid_username(username) {
        errors.add(FIELD_USERNAME, MSG_USERNAME_INVALID);
    }

    if email.is_empty() {
        errors.add(FIELD_EMAIL, MSG_REQUIRED);
    } else if email.chars().count() > EMAIL_MAX_CHARS || !valid_email(email) {
        errors.add(FIELD_EMAIL, MSG_EMAIL_INVALID);
    }

    errors.into_result()
}

#[derive(Clone)]
pub struct Accounts {
    store: SharedStore,
    session_ttl: Duration,
}

impl Accounts {
    #[must_use]
    pub fn new(store: SharedStore, session_ttl: Duration) -> Self {
        Self { store, session_ttl }
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Creates a user and opens their first session.
    ///
    /// # Errors
    /// `Validation` for malformed input or a taken username/email.
    pub async fn register(&self, username: &str, email: &str) -> Result<Session, AccountError> {
        let username = username.trim();
        let email = email.trim();
        validate_registration(username, email)?;

        let mut errors = ValidationErrors::new();
        if self.store.find_user_by_username(username).await?.is_some() {
            errors.add(FIELD_USERNAME, MSG_USERNAME_TAKEN);
        }
        if self.store.find_user_by_email(email).await?.is_some() {
            errors.add(FIELD_EMAIL, MSG_EMAIL_TAKEN);
        }
        errors.into_result()?;

        let user = User::new(username, email);
        match self.store.create_user(&user).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation) => {
                // Lost a race with a concurrent registration.
                let field = if self.store.find_user_by_email(email).await?.is_some() {
                    (FIELD_EMAIL, MSG_EMAIL_TAKEN)
                } else {
                    (FIELD_USERNAME, MSG_USERNAME_TAKEN)
                };
                return Err(ValidationErrors::single(field.0, field.1).into());
            }
            Err(err) => return Err(err.into()),
        }
        info!("Registered user {}", user.username);

        self.open_session(user).await
    }

    /// Issues a new session token for `user`.
    ///
    /// # Errors
    /// Token generation or store failures.
    pub async fn open_session(&self, user: User) -> Result<Session, AccountError> {
        let token = generate_session_token()?;
        self.store
            .create_session(&hash_session_token(&token), user.id, self.session_ttl)
            .await?;
        debug!("Opened session for {}", user.username);
        Ok(Session { token, user })
    }

    /// Resolves a raw session token to its user.
    ///
    /// # Errors
    /// Store failures.
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>, AccountError> {
        Ok(self
            .store
            .find_session_user(&hash_session_token(token))
            .await?)
    }

    /// Ends the session. Returns `false` when the token was unknown.
    ///
    /// # Errors
    /// Store failures.
    pub async fn logout(&self, token: &str) -> Result<bool, AccountError> {
        Ok(self.store.delete_session(&hash_session_token(token)).await?)
    }
}
