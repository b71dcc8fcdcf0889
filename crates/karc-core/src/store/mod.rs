//! SQLite-backed record store for the portal.
//!
//! Holds identities, profiles, variants and their comments, the activity
//! log, and the content tables. Every read that feeds a list view goes
//! through [`crate::query`]; the per-table modules here cover lookups and
//! writes.

#![allow(clippy::missing_errors_doc)]

mod activity;
mod auth;
mod content;
mod profiles;
mod stats;
mod variants;

pub use activity::NewActivity;
pub use auth::{CredentialRow, SessionRow};
pub use profiles::{NewProfile, ProfileUpdate};

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

/// Database holding all durable portal state.
pub struct PortalDb {
    conn: Connection,
}

impl PortalDb {
    /// Open or create a portal database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create parent directories: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        Ok(Self { conn })
    }

    /// Initialize the database schema.
    ///
    /// Creates all tables, indexes, and triggers if they don't exist.
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Decode a TEXT column into one of the model enums.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Like [`parse_column`], for nullable columns.
pub(crate) fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

// ============================================================================
// Schema SQL
// ============================================================================

const SCHEMA_SQL: &str = r"
-- CREDENTIALS
CREATE TABLE IF NOT EXISTS auth_users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_sign_in_at TEXT
);

CREATE TABLE IF NOT EXISTS auth_sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES auth_users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON auth_sessions(user_id);

-- PROFILES
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY REFERENCES auth_users(id) ON DELETE CASCADE,
    email TEXT NOT NULL,
    full_name TEXT,
    institution TEXT,
    expertise TEXT,
    role TEXT NOT NULL DEFAULT 'viewer'
        CHECK (role IN ('admin', 'researcher', 'coordinator', 'viewer', 'public')),
    approved INTEGER NOT NULL DEFAULT 0,
    approved_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_profiles_approved ON profiles(approved);

-- VARIANTS
CREATE TABLE IF NOT EXISTS variants (
    id TEXT PRIMARY KEY,
    gene TEXT NOT NULL,
    variant TEXT NOT NULL,
    sample_id TEXT,
    chromosome TEXT,
    position INTEGER,
    ref_allele TEXT,
    alt_allele TEXT,
    protein_change TEXT,
    consequence TEXT,
    transcript TEXT,
    rank TEXT,
    inheritance TEXT CHECK (inheritance IN ('de_novo', 'inherited', 'unknown')),
    status TEXT NOT NULL DEFAULT 'available'
        CHECK (status IN ('available', 'requested', 'in_progress', 'completed')),
    notes TEXT,
    type TEXT,
    significance TEXT,
    families INTEGER,
    created_by TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT,
    comment_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_variants_gene ON variants(gene);
CREATE INDEX IF NOT EXISTS idx_variants_status ON variants(status);
CREATE INDEX IF NOT EXISTS idx_variants_created ON variants(created_at);

-- COMMENTS
CREATE TABLE IF NOT EXISTS variant_comments (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    variant_id TEXT NOT NULL REFERENCES variants(id) ON DELETE CASCADE,
    author_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_variant ON variant_comments(variant_id, created_at, seq);

CREATE TRIGGER IF NOT EXISTS trg_comments_count_insert
AFTER INSERT ON variant_comments
BEGIN
    UPDATE variants SET comment_count = comment_count + 1 WHERE id = NEW.variant_id;
END;

CREATE TRIGGER IF NOT EXISTS trg_comments_count_delete
AFTER DELETE ON variant_comments
BEGIN
    UPDATE variants SET comment_count = MAX(comment_count - 1, 0) WHERE id = OLD.variant_id;
END;

-- ACTIVITY LOG (append-only)
CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    actor_id TEXT NOT NULL,
    action TEXT NOT NULL,
    detail TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_created ON activity_log(created_at);

CREATE TRIGGER IF NOT EXISTS trg_activity_no_update
BEFORE UPDATE ON activity_log
BEGIN
    SELECT RAISE(ABORT, 'activity_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS trg_activity_no_delete
BEFORE DELETE ON activity_log
BEGIN
    SELECT RAISE(ABORT, 'activity_log is append-only');
END;

-- REPORTS
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    report_type TEXT NOT NULL
        CHECK (report_type IN ('wgs_analysis', 'wes_analysis', 'clinical_summary', 'statistical', 'functional')),
    status TEXT NOT NULL DEFAULT 'draft'
        CHECK (status IN ('draft', 'in_review', 'published')),
    summary TEXT,
    file_url TEXT,
    file_name TEXT,
    author_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

-- ANNOUNCEMENTS
CREATE TABLE IF NOT EXISTS announcements (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    pinned INTEGER NOT NULL DEFAULT 0,
    author_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

-- BLOG
CREATE TABLE IF NOT EXISTS blog_posts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    subtitle TEXT,
    content TEXT NOT NULL,
    excerpt TEXT,
    published INTEGER NOT NULL DEFAULT 0,
    published_at TEXT,
    author_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT
);
";

// ============================================================================
// Tests
// ============================================================================
