//! The auth gate: user registration, login and the tokens that scope every ledger operation to one user.
pub mod token;

use std::fmt::Debug;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;
use async_trait::async_trait;
use garde::Validate;
use serde::Deserialize;
use serde::Serialize;
use tokio::task::spawn_blocking;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::db::entity::User;
use crate::types::Identity;
use crate::types::LedgerError;
use crate::types::Result;

pub use token::TokenIssuer;

const FIELDS_REQUIRED: &str = "All fields are required.";
const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Persistence of user accounts.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Store a new user. A taken username is a [`Conflict`](LedgerError::Conflict) and leaves the existing user
    /// untouched.
    async fn create_user(&self, username: &str, password_hash: String, pharmacy_code: &str) -> Result<User>;
    async fn find_user(&self, username: &str) -> Result<Option<User>>;
}

#[allow(clippy::ptr_arg)]
fn not_blank(value: &String, _: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be empty"))
    }
    else {
        Ok(())
    }
}

#[derive(Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Registration {
    #[garde(custom(not_blank))]
    pub username:      String,
    #[garde(custom(not_blank))]
    pub password:      String,
    #[garde(custom(not_blank))]
    pub pharmacy_code: String,
}

impl Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("pharmacy_code", &self.pharmacy_code)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Credentials {
    #[garde(custom(not_blank))]
    pub username: String,
    #[garde(custom(not_blank))]
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A successful login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token:    String,
    pub username: String,
}

fn hash_password(password: String) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LedgerError::internal(format!("password hashing failed: {e}")))
}

fn password_matches(password: String, stored: String) -> Result<bool> {
    let hash = PasswordHash::new(&stored).map_err(|e| LedgerError::internal(format!("corrupt password hash: {e}")))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &hash).is_ok())
}

pub struct AuthGate<U: UserStore> {
    users:  Arc<U>,
    tokens: Arc<TokenIssuer>,
}

impl<U: UserStore> AuthGate<U> {
    pub fn new(users: Arc<U>, tokens: Arc<TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenIssuer> {
        &self.tokens
    }

    /// Create a user account and return its username.
    #[instrument(level = "debug", skip(self))]
    pub async fn register(&self, registration: Registration) -> Result<String> {
        registration
            .validate()
            .map_err(|_| LedgerError::validation(FIELDS_REQUIRED))?;

        let Registration {
            username,
            password,
            pharmacy_code,
        } = registration;

        if self.users.find_user(&username).await?.is_some() {
            warn!(username, "username is taken");
            return Err(LedgerError::Conflict("Username already exists.".to_owned()));
        }

        let password_hash = spawn_blocking(move || hash_password(password)).await??;
        let user = self.users.create_user(&username, password_hash, &pharmacy_code).await?;

        info!(user_id = user.id, username, "user registered");

        Ok(user.username)
    }

    /// Check credentials and issue a token for the user.
    #[instrument(level = "debug", skip(self))]
    pub async fn login(&self, credentials: Credentials) -> Result<Session> {
        credentials
            .validate()
            .map_err(|_| LedgerError::validation(FIELDS_REQUIRED))?;

        let Credentials { username, password } = credentials;

        let Some(user) = self.users.find_user(&username).await?
        else {
            warn!(username, "login for unknown user");
            return Err(LedgerError::Auth(INVALID_CREDENTIALS.to_owned()));
        };

        let stored = user.password.clone();
        if !spawn_blocking(move || password_matches(password, stored)).await?? {
            warn!(username, "wrong password");
            return Err(LedgerError::Auth(INVALID_CREDENTIALS.to_owned()));
        }

        let identity = Identity {
            id:       user.id,
            username: user.username,
        };
        let token = self.tokens.issue(&identity)?;

        info!(user_id = identity.id, "user logged in");

        Ok(Session {
            token,
            username: identity.username,
        })
    }
}

impl<U: UserStore> Clone for AuthGate<U> {
    fn clone(&self) -> Self {
        Self {
            users:  self.users.clone(),
            tokens: self.tokens.clone(),
        }
    }
}
