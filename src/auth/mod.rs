//! Sign-in and the cached session file.
//!
//! The backend issues a JWT through a password grant. Its `exp` claim is read
//! locally (no signature check) so an expired session can be dropped without
//! a round trip.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::User;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("access token is not a valid JWT: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    /// Unix seconds taken from the token's `exp` claim.
    pub token_expiration: i64,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

impl Session {
    pub fn new(access_token: String) -> Result<Self, AuthError> {
        let token_expiration = token_expiry(&access_token)?;
        Ok(Self {
            access_token,
            token_expiration,
            full_name: None,
            user_id: None,
            company_id: None,
        })
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.token_expiration <= now
    }

    /// The cached user, when both name and id were stored.
    pub fn user(&self) -> Option<User> {
        match (&self.full_name, &self.user_id) {
            (Some(full_name), Some(user_id)) => Some(User {
                full_name: full_name.clone(),
                user_id: user_id.clone(),
                company_id: self.company_id.clone(),
            }),
            _ => None,
        }
    }

    pub fn remember(&mut self, user: &User) {
        self.full_name = Some(user.full_name.clone());
        self.user_id = Some(user.user_id.clone());
        self.company_id = user.company_id.clone();
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

/// Reads the `exp` claim out of a JWT without verifying it.
pub fn token_expiry(token: &str) -> Result<i64, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("missing payload segment".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|err| AuthError::InvalidToken(err.to_string()))?;
    Ok(claims.exp)
}

/// Persists the session between runs.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Picks up a previous session if its token is still valid.
///
/// On success the client carries the bearer token. Returns `None` when the
/// user has to sign in again.
pub async fn restore(
    store: &SessionStore,
    api: &mut ApiClient,
    now: i64,
) -> Result<Option<(Session, User)>, AuthError> {
    let mut session = match store.load() {
        Ok(Some(session)) => session,
        Ok(None) => {
            info!("no stored session");
            return Ok(None);
        }
        Err(err) => {
            warn!(error = %err, "discarding unreadable session");
            store.clear()?;
            return Ok(None);
        }
    };

    if session.is_expired(now) {
        info!("stored token expired, clearing session");
        store.clear()?;
        return Ok(None);
    }

    api.set_token(Some(session.access_token.clone()));

    if let Some(user) = session.user() {
        return Ok(Some((session, user)));
    }

    match api.current_user().await {
        Ok(user) => {
            session.remember(&user);
            store.save(&session)?;
            Ok(Some((session, user)))
        }
        Err(err) => {
            warn!(error = %err, "could not load user for stored session");
            api.set_token(None);
            Ok(None)
        }
    }
}

/// Exchanges credentials for a token, loads the user and stores the session.
pub async fn sign_in(
    store: &SessionStore,
    api: &mut ApiClient,
    username: &str,
    password: &str,
) -> Result<(Session, User), AuthError> {
    let token = api.sign_in(username, password).await?;
    let mut session = Session::new(token)?;
    api.set_token(Some(session.access_token.clone()));

    let user = api.current_user().await?;
    session.remember(&user);
    store.save(&session)?;
    info!(user_id = %user.user_id, "signed in");

    Ok((session, user))
}

pub fn sign_out(store: &SessionStore, api: &mut ApiClient) -> Result<(), AuthError> {
    api.set_token(None);
    store.clear()?;
    info!("signed out");
    Ok(())
}
