//! Append-only activity rows.

use anyhow::{Context, Result};
use rusqlite::params;

use super::PortalDb;
use crate::model::{now_timestamp, ActivityEntry};

/// One entry to append.
#[derive(Debug, Clone)]
pub struct NewActivity<'a> {
    pub actor_id: &'a str,
    pub action: &'a str,
    pub detail: &'a str,
}

impl PortalDb {
    pub fn insert_activity(&self, entry: &NewActivity<'_>) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO activity_log (actor_id, action, detail, created_at) VALUES (?, ?, ?, ?)",
                params![entry.actor_id, entry.action, entry.detail, now_timestamp()],
            )
            .context("Failed to append activity")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent entries first, joined with the actor's name.
    pub fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self
            .conn
            .prepare(
                "SELECT a.id, a.actor_id, p.full_name, a.action, a.detail, a.created_at
                 FROM activity_log a
                 LEFT JOIN profiles p ON p.id = a.actor_id
                 ORDER BY a.created_at DESC, a.id DESC
                 LIMIT ?",
            )
            .context("Failed to prepare recent_activity query")?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(ActivityEntry {
                    id: row.get(0)?,
                    actor_id: row.get(1)?,
                    actor_name: row.get(2)?,
                    action: row.get(3)?,
                    detail: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .context("Failed to execute recent_activity query")?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.context("Failed to read activity row")?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::store::tests::{seed_member, test_db};

    #[test]
    fn test_recent_activity_newest_first_with_names() {
        let db = test_db();
        let actor = seed_member(&db, "ana@example.org", Role::Admin, true);
        for action in ["variant_added", "variant_updated", "variant_deleted"] {
            db.insert_activity(&NewActivity {
                actor_id: &actor,
                action,
                detail: "TP53 c.743G>A",
            })
            .unwrap();
        }

        let entries = db.recent_activity(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "variant_deleted");
        assert_eq!(entries[1].action, "variant_updated");
        assert_eq!(entries[0].actor_name.as_deref(), Some("ana"));
    }

    #[test]
    fn test_activity_rows_are_immutable() {
        let db = test_db();
        let id = db
            .insert_activity(&NewActivity {
                actor_id: "usr-1",
                action: "profile_updated",
                detail: "x",
            })
            .unwrap();
        let result = db
            .conn()
            .execute("UPDATE activity_log SET detail = 'y' WHERE id = ?", params![id]);
        assert!(result.is_err());

        let result = db
            .conn()
            .execute("DELETE FROM activity_log WHERE id = ?", params![id]);
        assert!(result.is_err());
        assert_eq!(db.recent_activity(10).unwrap().len(), 1);
    }
}
