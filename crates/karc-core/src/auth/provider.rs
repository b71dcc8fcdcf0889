//! Credential backend.

use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::password::{hash_password, verify_password};
use crate::config::{MIN_PASSWORD_LEN, SESSION_LIFETIME_DAYS};
use crate::model::{new_session_token, new_user_id, now_timestamp, Role};
use crate::services::AuthError;
use crate::store::{NewProfile, PortalDb};

/// The identity behind an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub access_token: String,
    pub user: AuthUser,
    pub expires_at: String,
    /// True the first time this identity ever signs in.
    pub first_sign_in: bool,
}

/// A still-valid access token and who it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSession {
    pub user: AuthUser,
    pub expires_at: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
    pub institution: Option<&'a str>,
}

/// Sign-up, password sign-in, sign-out, and token lookup.
pub trait IdentityProvider {
    fn sign_up(&self, request: &SignUpRequest<'_>) -> Result<IssuedSession, AuthError>;

    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError>;

    /// Revoke a token. Unknown tokens are not an error.
    fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Resolve a token to its identity. Expired or unknown tokens give `None`.
    fn get_session(&self, access_token: &str) -> Result<Option<LiveSession>, AuthError>;
}

fn backend(err: &anyhow::Error) -> AuthError {
    AuthError::BackendUnavailable(format!("{err:#}"))
}

/// A credential insert that lost a race with another sign-up for the same
/// email still reports `EmailInUse`.
fn insert_failure(err: &anyhow::Error) -> AuthError {
    let duplicate = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    });
    if duplicate {
        AuthError::EmailInUse
    } else {
        backend(err)
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        });
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail)
    }
}

/// [`IdentityProvider`] over the portal's own SQLite store.
pub struct LocalIdentityProvider<'a> {
    db: &'a PortalDb,
}

impl<'a> LocalIdentityProvider<'a> {
    #[must_use]
    pub const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// Create credentials and an unapproved profile in one transaction.
    ///
    /// Returns the new user id. Used by sign-up and by bootstrap seeding.
    pub fn register(
        &self,
        request: &SignUpRequest<'_>,
        role: Role,
    ) -> Result<AuthUser, AuthError> {
        let email = normalize_email(request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min_len: MIN_PASSWORD_LEN,
            });
        }
        if self.db.email_exists(&email).map_err(|e| backend(&e))? {
            return Err(AuthError::EmailInUse);
        }

        let hash = hash_password(request.password).map_err(|e| backend(&e))?;
        let id = new_user_id().map_err(|e| backend(&e))?;

        let tx = self
            .db
            .conn()
            .unchecked_transaction()
            .map_err(|e| AuthError::BackendUnavailable(e.to_string()))?;
        self.db
            .insert_credentials(&id, &email, &hash)
            .map_err(|e| insert_failure(&e))?;
        self.db
            .insert_profile(&NewProfile {
                id: id.clone(),
                email: email.clone(),
                full_name: request.full_name.map(str::to_string),
                institution: request.institution.map(str::to_string),
                role,
            })
            .map_err(|e| backend(&e))?;
        tx.commit()
            .map_err(|e| AuthError::BackendUnavailable(e.to_string()))?;

        tracing::info!(user_id = %id, "registered identity");
        Ok(AuthUser { id, email })
    }

    fn issue(&self, user: AuthUser) -> Result<IssuedSession, AuthError> {
        let first_sign_in = self.db.record_sign_in(&user.id).map_err(|e| backend(&e))?;
        let access_token = new_session_token().map_err(|e| backend(&e))?;
        let expires_at = (Utc::now() + Duration::days(SESSION_LIFETIME_DAYS))
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        self.db
            .insert_session(&access_token, &user.id, &expires_at)
            .map_err(|e| backend(&e))?;
        Ok(IssuedSession {
            access_token,
            user,
            expires_at,
            first_sign_in,
        })
    }
}

impl IdentityProvider for LocalIdentityProvider<'_> {
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    fn sign_up(&self, request: &SignUpRequest<'_>) -> Result<IssuedSession, AuthError> {
        let user = self.register(request, Role::Viewer)?;
        self.issue(user)
    }

    #[tracing::instrument(skip(self, password))]
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let Ok(email) = normalize_email(email) else {
            return Err(AuthError::InvalidCredentials);
        };
        let row = self
            .db
            .find_credentials(&email)
            .map_err(|e| backend(&e))?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &row.password_hash).map_err(|e| backend(&e))? {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue(AuthUser {
            id: row.id,
            email: row.email,
        })
    }

    fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.db
            .delete_session(access_token)
            .map_err(|e| backend(&e))
    }

    fn get_session(&self, access_token: &str) -> Result<Option<LiveSession>, AuthError> {
        let Some(row) = self.db.find_session(access_token).map_err(|e| backend(&e))? else {
            return Ok(None);
        };
        if row.expires_at <= now_timestamp() {
            tracing::debug!(user_id = %row.user_id, "access token expired");
            self.db
                .delete_session(&row.token)
                .map_err(|e| backend(&e))?;
            return Ok(None);
        }
        Ok(Some(LiveSession {
            user: AuthUser {
                id: row.user_id,
                email: row.email,
            },
            expires_at: row.expires_at,
        }))
    }
}
