//! Profile rows: self-service fields, approval, and role.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{parse_column, PortalDb};
use crate::model::{now_timestamp, Profile, Researcher, Role};
use crate::query::{Listable, SortDirection};

const PROFILE_COLUMNS: &str = "p.id, p.email, p.full_name, p.institution, p.expertise, p.role, \
     p.approved, p.approved_at, p.created_at, p.updated_at";

/// Profile created alongside new credentials.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub institution: Option<String>,
    pub role: Role,
}

/// Fields a member may edit on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub institution: Option<String>,
    pub expertise: Option<String>,
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        institution: row.get(3)?,
        expertise: row.get(4)?,
        role: parse_column(row, 5)?,
        approved: row.get(6)?,
        approved_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl PortalDb {
    /// Insert an unapproved profile.
    pub fn insert_profile(&self, profile: &NewProfile) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO profiles (id, email, full_name, institution, role, approved, created_at)
                 VALUES (?, ?, ?, ?, ?, 0, ?)",
                params![
                    profile.id,
                    profile.email,
                    profile.full_name,
                    profile.institution,
                    profile.role.as_str(),
                    now_timestamp(),
                ],
            )
            .context("Failed to insert profile")?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.id = ?");
        self.conn
            .query_row(&sql, params![id], profile_from_row)
            .optional()
            .context("Failed to query profile")
    }

    /// Overwrite the self-service fields. Returns rows changed.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE profiles SET full_name = ?, institution = ?, expertise = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    update.full_name,
                    update.institution,
                    update.expertise,
                    now_timestamp(),
                    id,
                ],
            )
            .context("Failed to update profile")
    }

    /// Approve (stamping `approved_at`) or revoke (clearing it).
    pub fn set_approval(&self, id: &str, approved: bool) -> Result<usize> {
        let now = now_timestamp();
        let approved_at = approved.then(|| now.clone());
        self.conn
            .execute(
                "UPDATE profiles SET approved = ?, approved_at = ?, updated_at = ? WHERE id = ?",
                params![approved, approved_at, now, id],
            )
            .context("Failed to update approval")
    }

    pub fn set_role(&self, id: &str, role: Role) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE profiles SET role = ?, updated_at = ? WHERE id = ?",
                params![role.as_str(), now_timestamp(), id],
            )
            .context("Failed to update role")
    }
}

/// Every profile, for member administration. Pending applicants sort first.
impl Listable for Profile {
    const KIND: &'static str = "member";
    const SOURCE: &'static str = "profiles p";
    const COLUMNS: &'static str = PROFILE_COLUMNS;
    const SEARCH_FIELDS: &'static [&'static str] =
        &["p.full_name", "p.email", "p.institution", "p.expertise"];
    const FILTER_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("role", "p.role"),
        ("approved", "CASE WHEN p.approved THEN 'true' ELSE 'false' END"),
    ];
    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("approved", "p.approved"),
        ("full_name", "p.full_name"),
        ("email", "p.email"),
        ("role", "p.role"),
        ("created_at", "p.created_at"),
    ];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("approved", SortDirection::Asc);
    const TIEBREAK: &'static str = "p.created_at DESC, p.id ASC";

    fn row_id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        profile_from_row(row)
    }
}

/// Approved members only, for the researchers roster.
impl Listable for Researcher {
    const KIND: &'static str = "researcher";
    const SOURCE: &'static str = "profiles p";
    const COLUMNS: &'static str = "p.id, p.full_name, p.role, p.institution, p.expertise";
    const SEARCH_FIELDS: &'static [&'static str] = &["p.full_name", "p.institution", "p.expertise"];
    const FILTER_FIELDS: &'static [(&'static str, &'static str)] = &[("role", "p.role")];
    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("full_name", "p.full_name"),
        ("institution", "p.institution"),
        ("role", "p.role"),
    ];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("full_name", SortDirection::Asc);
    const TIEBREAK: &'static str = "p.id ASC";
    const BASE_PREDICATE: Option<&'static str> = Some("p.approved = 1");

    fn row_id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            full_name: row.get(1)?,
            role: parse_column(row, 2)?,
            institution: row.get(3)?,
            expertise: row.get(4)?,
        })
    }
}
