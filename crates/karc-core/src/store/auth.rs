//! Credential and access-token rows.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::PortalDb;
use crate::model::now_timestamp;

/// Stored credentials for one identity.
#[derive(Debug, Clone)]
pub struct CredentialRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub last_sign_in_at: Option<String>,
}

/// An issued access token joined with its identity.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub expires_at: String,
}

impl PortalDb {
    pub fn insert_credentials(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO auth_users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
                params![id, email, password_hash, now_timestamp()],
            )
            .context("Failed to insert credentials")?;
        Ok(())
    }

    /// Look up credentials by email (case-insensitive).
    pub fn find_credentials(&self, email: &str) -> Result<Option<CredentialRow>> {
        self.conn
            .query_row(
                "SELECT id, email, password_hash, last_sign_in_at FROM auth_users WHERE email = ?",
                params![email],
                |row| {
                    Ok(CredentialRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                        last_sign_in_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("Failed to query credentials")
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM auth_users WHERE email = ?",
                params![email],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query auth_users")?;
        Ok(found.is_some())
    }

    /// Stamp a successful sign-in.
    ///
    /// Returns `true` when this is the identity's first sign-in.
    pub fn record_sign_in(&self, user_id: &str) -> Result<bool> {
        let previous: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT last_sign_in_at FROM auth_users WHERE id = ?",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query last sign-in")?;

        self.conn
            .execute(
                "UPDATE auth_users SET last_sign_in_at = ? WHERE id = ?",
                params![now_timestamp(), user_id],
            )
            .context("Failed to update last sign-in")?;

        Ok(matches!(previous, Some(None)))
    }

    pub fn insert_session(&self, token: &str, user_id: &str, expires_at: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
                params![token, user_id, now_timestamp(), expires_at],
            )
            .context("Failed to insert session")?;
        Ok(())
    }

    /// Look up a token. Expiry is checked by the caller.
    pub fn find_session(&self, token: &str) -> Result<Option<SessionRow>> {
        self.conn
            .query_row(
                "SELECT s.token, s.user_id, u.email, s.expires_at
                 FROM auth_sessions s
                 JOIN auth_users u ON u.id = s.user_id
                 WHERE s.token = ?",
                params![token],
                |row| {
                    Ok(SessionRow {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        email: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("Failed to query session")
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM auth_sessions WHERE token = ?", params![token])
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Remove an identity entirely. Profile and tokens cascade.
    pub fn delete_identity(&self, user_id: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM auth_users WHERE id = ?", params![user_id])
            .context("Failed to delete identity")
    }
}
