use anyhow::{Context, Result};

use super::PortalDb;
use crate::model::PortalStats;

impl PortalDb {
    /// Headline counts for the dashboard.
    pub fn portal_stats(&self) -> Result<PortalStats> {
        self.conn
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM variants),
                    (SELECT COUNT(*) FROM profiles WHERE approved = 1),
                    (SELECT COUNT(*) FROM reports),
                    (SELECT COALESCE(SUM(families), 0) FROM variants)",
                [],
                |row| {
                    Ok(PortalStats {
                        variants: row.get(0)?,
                        researchers: row.get(1)?,
                        reports: row.get(2)?,
                        families: row.get(3)?,
                    })
                },
            )
            .context("Failed to query portal stats")
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Role, VariantDraft};
    use crate::store::tests::{seed_member, test_db};

    #[test]
    fn test_stats_on_empty_store() {
        let db = test_db();
        let stats = db.portal_stats().unwrap();
        assert_eq!(stats.variants, 0);
        assert_eq!(stats.families, 0);
    }

    #[test]
    fn test_stats_counts_approved_and_sums_families() {
        let db = test_db();
        let admin = seed_member(&db, "a@example.org", Role::Admin, true);
        seed_member(&db, "b@example.org", Role::Viewer, false);
        for families in [Some(3), None, Some(4)] {
            let draft = VariantDraft {
                gene: "G".to_string(),
                variant: "v".to_string(),
                families,
                ..VariantDraft::default()
            };
            db.insert_variant(&draft, &admin).unwrap();
        }

        let stats = db.portal_stats().unwrap();
        assert_eq!(stats.variants, 3);
        assert_eq!(stats.researchers, 1);
        assert_eq!(stats.families, 7);
    }
}
