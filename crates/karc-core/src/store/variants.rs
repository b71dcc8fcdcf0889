//! Variant rows and their comment threads.

use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{parse_column, parse_optional_column, PortalDb};
use crate::model::{new_variant_id, now_timestamp, Comment, Variant, VariantDraft};
use crate::query::{Listable, SortDirection};

const VARIANT_COLUMNS: &str = "v.id, v.gene, v.variant, v.sample_id, v.chromosome, v.position, \
     v.ref_allele, v.alt_allele, v.protein_change, v.consequence, v.transcript, v.rank, \
     v.inheritance, v.status, v.notes, v.type, v.significance, v.families, v.created_by, \
     v.created_at, v.updated_at, v.comment_count";

const COMMENT_COLUMNS: &str = "c.id, c.variant_id, c.author_id, p.full_name, c.body, c.created_at";

fn variant_from_row(row: &Row<'_>) -> rusqlite::Result<Variant> {
    Ok(Variant {
        id: row.get(0)?,
        gene: row.get(1)?,
        variant: row.get(2)?,
        sample_id: row.get(3)?,
        chromosome: row.get(4)?,
        position: row.get(5)?,
        ref_allele: row.get(6)?,
        alt_allele: row.get(7)?,
        protein_change: row.get(8)?,
        consequence: row.get(9)?,
        transcript: row.get(10)?,
        rank: row.get(11)?,
        inheritance: parse_optional_column(row, 12)?,
        status: parse_column(row, 13)?,
        notes: row.get(14)?,
        variant_type: row.get(15)?,
        significance: row.get(16)?,
        families: row.get(17)?,
        created_by: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
        comment_count: row.get(21)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        variant_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn insert_variant_on(conn: &Connection, draft: &VariantDraft, created_by: &str) -> Result<String> {
    let id = new_variant_id()?;
    conn.execute(
        "INSERT INTO variants (
            id, gene, variant, sample_id, chromosome, position, ref_allele, alt_allele,
            protein_change, consequence, transcript, rank, inheritance, status, notes,
            type, significance, families, created_by, created_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            draft.gene,
            draft.variant,
            draft.sample_id,
            draft.chromosome,
            draft.position,
            draft.ref_allele,
            draft.alt_allele,
            draft.protein_change,
            draft.consequence,
            draft.transcript,
            draft.rank,
            draft.inheritance.map(|i| i.as_str()),
            draft.status.as_str(),
            draft.notes,
            draft.variant_type,
            draft.significance,
            draft.families,
            created_by,
            now_timestamp(),
        ],
    )
    .with_context(|| format!("Failed to insert variant {} {}", draft.gene, draft.variant))?;
    Ok(id)
}

impl PortalDb {
    /// Insert one variant and return its id.
    pub fn insert_variant(&self, draft: &VariantDraft, created_by: &str) -> Result<String> {
        insert_variant_on(&self.conn, draft, created_by)
    }

    /// Insert a batch in one transaction. Any failure keeps no rows.
    pub fn insert_variants(&self, drafts: &[VariantDraft], created_by: &str) -> Result<Vec<String>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin import transaction")?;
        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            ids.push(insert_variant_on(&tx, draft, created_by)?);
        }
        tx.commit().context("Failed to commit import transaction")?;
        Ok(ids)
    }

    pub fn get_variant(&self, id: &str) -> Result<Option<Variant>> {
        let sql = format!("SELECT {VARIANT_COLUMNS} FROM variants v WHERE v.id = ?");
        self.conn
            .query_row(&sql, params![id], variant_from_row)
            .optional()
            .context("Failed to query variant")
    }

    /// Overwrite every writable field. Last write wins.
    pub fn update_variant(&self, id: &str, draft: &VariantDraft) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE variants SET
                    gene = ?, variant = ?, sample_id = ?, chromosome = ?, position = ?,
                    ref_allele = ?, alt_allele = ?, protein_change = ?, consequence = ?,
                    transcript = ?, rank = ?, inheritance = ?, status = ?, notes = ?,
                    type = ?, significance = ?, families = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    draft.gene,
                    draft.variant,
                    draft.sample_id,
                    draft.chromosome,
                    draft.position,
                    draft.ref_allele,
                    draft.alt_allele,
                    draft.protein_change,
                    draft.consequence,
                    draft.transcript,
                    draft.rank,
                    draft.inheritance.map(|i| i.as_str()),
                    draft.status.as_str(),
                    draft.notes,
                    draft.variant_type,
                    draft.significance,
                    draft.families,
                    now_timestamp(),
                    id,
                ],
            )
            .context("Failed to update variant")
    }

    /// Delete one variant. Its comments cascade.
    pub fn delete_variant(&self, id: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM variants WHERE id = ?", params![id])
            .context("Failed to delete variant")
    }

    /// Delete a set of variants in a single statement.
    pub fn delete_variants(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM variants WHERE id IN ({placeholders})");
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin bulk delete")?;
        let deleted = tx
            .execute(&sql, params_from_iter(ids.iter()))
            .context("Failed to bulk delete variants")?;
        tx.commit().context("Failed to commit bulk delete")?;
        Ok(deleted)
    }

    // ------------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------------

    pub fn insert_comment(&self, id: &str, variant_id: &str, author_id: &str, body: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO variant_comments (id, variant_id, author_id, body, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![id, variant_id, author_id, body, now_timestamp()],
            )
            .context("Failed to insert comment")?;
        Ok(())
    }

    /// Comments on a variant in conversation order.
    ///
    /// `seq` breaks ties between comments stamped in the same instant.
    pub fn list_comments(&self, variant_id: &str) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS}
             FROM variant_comments c
             LEFT JOIN profiles p ON p.id = c.author_id
             WHERE c.variant_id = ?
             ORDER BY c.created_at ASC, c.seq ASC"
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_comments query")?;
        let rows = stmt
            .query_map(params![variant_id], comment_from_row)
            .context("Failed to execute list_comments query")?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.context("Failed to read comment row")?);
        }
        Ok(results)
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS}
             FROM variant_comments c
             LEFT JOIN profiles p ON p.id = c.author_id
             WHERE c.id = ?"
        );
        self.conn
            .query_row(&sql, params![id], comment_from_row)
            .optional()
            .context("Failed to query comment")
    }

    pub fn delete_comment(&self, id: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM variant_comments WHERE id = ?", params![id])
            .context("Failed to delete comment")
    }
}

impl Listable for Variant {
    const KIND: &'static str = "variant";
    const SOURCE: &'static str = "variants v";
    const COLUMNS: &'static str = VARIANT_COLUMNS;
    const SEARCH_FIELDS: &'static [&'static str] = &[
        "v.gene",
        "v.variant",
        "v.sample_id",
        "v.protein_change",
        "v.consequence",
        "v.transcript",
    ];
    const FILTER_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("status", "v.status"),
        ("inheritance", "v.inheritance"),
        ("rank", "v.rank"),
        ("chromosome", "v.chromosome"),
        ("gene", "v.gene"),
    ];
    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("gene", "v.gene"),
        ("variant", "v.variant"),
        ("sample_id", "v.sample_id"),
        ("chromosome", "v.chromosome"),
        ("position", "v.position"),
        ("consequence", "v.consequence"),
        ("rank", "v.rank"),
        ("inheritance", "v.inheritance"),
        ("status", "v.status"),
        ("comment_count", "v.comment_count"),
        ("created_at", "v.created_at"),
        ("updated_at", "v.updated_at"),
    ];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("created_at", SortDirection::Desc);
    const TIEBREAK: &'static str = "v.id ASC";

    fn row_id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        variant_from_row(row)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Inheritance, Role, VariantStatus};
    use crate::store::tests::{seed_member, test_db};

    pub(crate) fn draft(gene: &str, variant: &str) -> VariantDraft {
        VariantDraft {
            gene: gene.to_string(),
            variant: variant.to_string(),
            ..VariantDraft::default()
        }
    }

    #[test]
    fn test_insert_and_get_variant() {
        let db = test_db();
        let author = seed_member(&db, "ana@example.org", Role::Researcher, true);
        let mut d = draft("SHANK3", "c.1234A>G");
        d.inheritance = Some(Inheritance::DeNovo);
        d.status = VariantStatus::Requested;
        d.position = Some(50_674_641);

        let id = db.insert_variant(&d, &author).unwrap();
        let v = db.get_variant(&id).unwrap().unwrap();
        assert_eq!(v.gene, "SHANK3");
        assert_eq!(v.inheritance, Some(Inheritance::DeNovo));
        assert_eq!(v.status, VariantStatus::Requested);
        assert_eq!(v.position, Some(50_674_641));
        assert_eq!(v.created_by.as_deref(), Some(author.as_str()));
        assert_eq!(v.comment_count, 0);
        assert_eq!(v.updated_at, None);
    }

    #[test]
    fn test_update_variant_last_write_wins() {
        let db = test_db();
        let author = seed_member(&db, "ana@example.org", Role::Researcher, true);
        let id = db.insert_variant(&draft("CHD8", "c.1A>T"), &author).unwrap();

        let mut first = draft("CHD8", "c.1A>T");
        first.notes = Some("first".to_string());
        let mut second = draft("CHD8", "c.1A>T");
        second.notes = Some("second".to_string());
        db.update_variant(&id, &first).unwrap();
        db.update_variant(&id, &second).unwrap();

        let v = db.get_variant(&id).unwrap().unwrap();
        assert_eq!(v.notes.as_deref(), Some("second"));
        assert!(v.updated_at.is_some());
    }

    #[test]
    fn test_insert_variants_is_all_or_nothing() {
        let db = test_db();
        let author = seed_member(&db, "ana@example.org", Role::Admin, true);
        // Empty gene passes the NOT NULL check, so poison the batch with a
        // created_by that violates the foreign key instead.
        let drafts = vec![draft("A", "1"), draft("B", "2")];
        assert!(db.insert_variants(&drafts, "usr-missing").is_err());
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM variants", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let ids = db.insert_variants(&drafts, &author).unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_delete_variants_removes_exactly_the_set() {
        let db = test_db();
        let author = seed_member(&db, "ana@example.org", Role::Admin, true);
        let a = db.insert_variant(&draft("A", "1"), &author).unwrap();
        let b = db.insert_variant(&draft("B", "2"), &author).unwrap();
        let c = db.insert_variant(&draft("C", "3"), &author).unwrap();

        let deleted = db.delete_variants(&[a.clone(), c.clone()]).unwrap();
        assert_eq!(deleted, 2);
        assert!(db.get_variant(&a).unwrap().is_none());
        assert!(db.get_variant(&b).unwrap().is_some());
        assert!(db.get_variant(&c).unwrap().is_none());
        assert_eq!(db.delete_variants(&[]).unwrap(), 0);
    }

    #[test]
    fn test_comment_count_tracks_inserts_and_deletes() {
        let db = test_db();
        let author = seed_member(&db, "ana@example.org", Role::Viewer, true);
        let id = db.insert_variant(&draft("A", "1"), &author).unwrap();

        db.insert_comment("cmt-1", &id, &author, "one").unwrap();
        db.insert_comment("cmt-2", &id, &author, "two").unwrap();
        assert_eq!(db.get_variant(&id).unwrap().unwrap().comment_count, 2);

        db.delete_comment("cmt-1").unwrap();
        assert_eq!(db.get_variant(&id).unwrap().unwrap().comment_count, 1);
    }

    #[test]
    fn test_deleting_variant_cascades_comments() {
        let db = test_db();
        let author = seed_member(&db, "ana@example.org", Role::Admin, true);
        let id = db.insert_variant(&draft("A", "1"), &author).unwrap();
        db.insert_comment("cmt-1", &id, &author, "orphan?").unwrap();

        db.delete_variant(&id).unwrap();
        assert!(db.get_comment("cmt-1").unwrap().is_none());
    }

    #[test]
    fn test_same_instant_comments_keep_submission_order() {
        let db = test_db();
        let author = seed_member(&db, "ana@example.org", Role::Viewer, true);
        let id = db.insert_variant(&draft("A", "1"), &author).unwrap();
        let stamp = "2026-03-01T10:00:00.000000Z";
        for (cid, body) in [("cmt-b", "first"), ("cmt-a", "second")] {
            db.conn()
                .execute(
                    "INSERT INTO variant_comments (id, variant_id, author_id, body, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                    params![cid, id, author, body, stamp],
                )
                .unwrap();
        }

        let bodies: Vec<String> = db
            .list_comments(&id)
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }
}
