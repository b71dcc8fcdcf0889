//! Variant service: list, create, edit, delete, bulk delete, and import.

use std::fs::File;
use std::path::Path;

use crate::activity::ActionTag;
use crate::import::{self, ImportFormat, ImportReport, ImportSchema, RowError};
use crate::model::{Variant, VariantDraft};
use crate::policy::Action;
use crate::query::{self, ListParams, Page};
use crate::selection::PendingBulkDelete;
use crate::store::PortalDb;

use super::{activity_log, authorize, required, CoreError, CoreResult, PendingDelete, ValidationError};

/// Service for variant records.
pub struct VariantService<'a> {
    db: &'a PortalDb,
}

impl<'a> VariantService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// One page of variants matching `params`.
    pub fn list(&self, actor_id: &str, params: &ListParams) -> CoreResult<Page<Variant>> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        query::query_page::<Variant>(self.db, params)
    }

    pub fn get(&self, actor_id: &str, id: &str) -> CoreResult<Variant> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        self.load(id)
    }

    #[tracing::instrument(skip(self, draft), fields(gene = %draft.gene))]
    pub fn create(&self, actor_id: &str, draft: &VariantDraft) -> CoreResult<Variant> {
        authorize(self.db, actor_id, Action::CreateRecord)?;
        validate(draft)?;

        let id = self.db.insert_variant(draft, actor_id)?;
        activity_log(self.db).record(
            actor_id,
            &ActionTag::VariantAdded,
            &format!("{} {}", draft.gene, draft.variant),
        );
        self.load(&id)
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn update(&self, actor_id: &str, id: &str, draft: &VariantDraft) -> CoreResult<Variant> {
        authorize(self.db, actor_id, Action::EditRecord)?;
        validate(draft)?;

        if self.db.update_variant(id, draft)? == 0 {
            return Err(CoreError::not_found("variant", id));
        }
        activity_log(self.db).record(
            actor_id,
            &ActionTag::VariantUpdated,
            &format!("{} {}", draft.gene, draft.variant),
        );
        self.load(id)
    }

    /// Check a single delete and describe it for confirmation.
    pub fn prepare_delete(&self, actor_id: &str, id: &str) -> CoreResult<PendingDelete<Variant>> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        let variant = self.load(id)?;
        Ok(PendingDelete::new(
            &variant.id,
            format!("{} {}", variant.gene, variant.variant),
        ))
    }

    /// Delete a confirmed variant. Its comments go with it.
    #[tracing::instrument(skip(self, pending), fields(id = %pending.id()))]
    pub fn delete(&self, actor_id: &str, pending: PendingDelete<Variant>) -> CoreResult<()> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        if self.db.delete_variant(pending.id())? == 0 {
            return Err(CoreError::not_found("variant", pending.id()));
        }
        activity_log(self.db).record(actor_id, &ActionTag::VariantDeleted, pending.summary());
        Ok(())
    }

    /// Delete every confirmed id in one store call, with one log entry.
    ///
    /// Returns how many rows were actually removed.
    #[tracing::instrument(skip(self, pending), fields(count = pending.len()))]
    pub fn bulk_delete(&self, actor_id: &str, pending: &PendingBulkDelete) -> CoreResult<usize> {
        authorize(self.db, actor_id, Action::DeleteRecordBulk)?;
        if pending.is_empty() {
            return Ok(0);
        }
        let removed = self.db.delete_variants(pending.ids())?;
        activity_log(self.db).record(
            actor_id,
            &ActionTag::VariantsBulkDeleted,
            &format!("Deleted {removed} variants"),
        );
        Ok(removed)
    }

    /// Import variants from a delimited text reader as one batch.
    ///
    /// Header problems are returned as errors and insert nothing. Any bad
    /// row, or a failed insert, fails the whole batch and is reported in
    /// the returned counts.
    #[tracing::instrument(skip(self, reader))]
    pub fn import<R: std::io::Read>(
        &self,
        actor_id: &str,
        reader: R,
        file_name: &str,
        format: ImportFormat,
        schema: ImportSchema,
    ) -> CoreResult<ImportReport> {
        authorize(self.db, actor_id, Action::BulkImport)?;
        let parsed = import::parse_variants(reader, format, schema)?;
        let total = parsed.total_rows();

        if !parsed.ignored_columns.is_empty() {
            tracing::info!(columns = ?parsed.ignored_columns, "ignoring unrecognized columns");
        }
        if !parsed.row_errors.is_empty() {
            return Ok(ImportReport::failed(total, parsed.row_errors));
        }
        if parsed.drafts.is_empty() {
            return Ok(ImportReport::succeeded(0));
        }

        if let Err(err) = self.db.insert_variants(&parsed.drafts, actor_id) {
            tracing::warn!(error = %format!("{err:#}"), "import batch rejected");
            return Ok(ImportReport::failed(
                total,
                vec![RowError {
                    line: 0,
                    message: format!("{err:#}"),
                }],
            ));
        }

        let count = parsed.drafts.len();
        activity_log(self.db).record(
            actor_id,
            &ActionTag::VariantsCsvUploaded,
            &format!("{count} variants from {file_name}"),
        );
        Ok(ImportReport::succeeded(count))
    }

    /// Import from a file, choosing the delimiter by its extension.
    pub fn import_file(
        &self,
        actor_id: &str,
        path: &Path,
        schema: ImportSchema,
    ) -> CoreResult<ImportReport> {
        let format = ImportFormat::from_path(path)?;
        let file = File::open(path).map_err(|e| ValidationError::Invalid {
            field: "file".to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.import(actor_id, file, &file_name, format, schema)
    }

    fn load(&self, id: &str) -> CoreResult<Variant> {
        self.db
            .get_variant(id)?
            .ok_or_else(|| CoreError::not_found("variant", id))
    }
}

fn validate(draft: &VariantDraft) -> CoreResult<()> {
    required(&draft.gene, "gene")?;
    required(&draft.variant, "variant")?;
    if draft.position.is_some_and(|p| p < 0) {
        return Err(ValidationError::Invalid {
            field: "position".to_string(),
            message: "must not be negative".to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariantStatus;
    use crate::selection::SelectionCoordinator;
    use crate::services::tests::{activity_count, fixture};
    use crate::store::tests::draft;

    #[test]
    fn test_researcher_creates_and_edits() {
        let f = fixture();
        let svc = f.services.variants();
        let created = svc.create(&f.researcher, &draft("TP53", "c.743G>A")).unwrap();
        assert_eq!(created.created_by.as_deref(), Some(f.researcher.as_str()));

        let mut edit = VariantDraft::from(&created);
        edit.status = VariantStatus::InProgress;
        let updated = svc.update(&f.researcher, &created.id, &edit).unwrap();
        assert_eq!(updated.status, VariantStatus::InProgress);
        assert_eq!(activity_count(&f.services), 2);
    }

    #[test]
    fn test_viewer_cannot_mutate() {
        let f = fixture();
        let svc = f.services.variants();
        let v = svc.create(&f.admin, &draft("BRCA1", "c.68_69del")).unwrap();
        let before = activity_count(&f.services);

        let err = svc.create(&f.viewer, &draft("X", "y")).unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { action: Action::CreateRecord }));
        let err = svc
            .update(&f.viewer, &v.id, &VariantDraft::from(&v))
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { action: Action::EditRecord }));
        let err = svc.prepare_delete(&f.viewer, &v.id).unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { action: Action::DeleteRecord }));

        assert!(svc.get(&f.viewer, &v.id).is_ok());
        assert_eq!(activity_count(&f.services), before);
    }

    #[test]
    fn test_pending_member_denied_dashboard() {
        let f = fixture();
        let params = ListParams::for_listable::<Variant>();
        let err = f.services.variants().list(&f.pending, &params).unwrap_err();
        assert!(matches!(err, CoreError::PendingApproval));
    }

    #[test]
    fn test_create_requires_gene_and_variant() {
        let f = fixture();
        let err = f
            .services
            .variants()
            .create(&f.admin, &draft("  ", "c.1A>G"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { field: "gene" })
        ));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let f = fixture();
        let err = f
            .services
            .variants()
            .update(&f.admin, "var-missing", &draft("A", "b"))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "variant", .. }));
    }

    #[test]
    fn test_single_delete_is_two_phase() {
        let f = fixture();
        let svc = f.services.variants();
        let v = svc.create(&f.admin, &draft("SCN2A", "c.2558G>A")).unwrap();

        let pending = svc.prepare_delete(&f.admin, &v.id).unwrap();
        assert_eq!(pending.summary(), "SCN2A c.2558G>A");
        assert!(svc.get(&f.admin, &v.id).is_ok());

        svc.delete(&f.admin, pending).unwrap();
        assert!(matches!(
            svc.get(&f.admin, &v.id),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_bulk_delete_writes_one_entry_and_clears_selection() {
        let f = fixture();
        let svc = f.services.variants();
        let ids: Vec<String> = ["A", "B", "C"]
            .iter()
            .map(|g| svc.create(&f.admin, &draft(g, "c.1A>G")).unwrap().id)
            .collect();
        let before = activity_count(&f.services);

        let mut selection = SelectionCoordinator::with_page(ids.iter().cloned());
        selection.toggle(&ids[0]);
        selection.toggle(&ids[2]);
        let pending = selection.request_bulk_delete().unwrap();

        let removed = selection
            .confirm_bulk_delete(pending, |p| svc.bulk_delete(&f.admin, p))
            .unwrap();
        assert_eq!(removed, 2);
        assert!(selection.selected().is_empty());
        assert_eq!(activity_count(&f.services), before + 1);

        let entries = f.services.db().recent_activity(1).unwrap();
        assert_eq!(entries[0].action, "variants_bulk_deleted");
        assert_eq!(entries[0].detail, "Deleted 2 variants");
        assert!(svc.get(&f.admin, &ids[1]).is_ok());
    }

    #[test]
    fn test_bulk_delete_requires_admin() {
        let f = fixture();
        let svc = f.services.variants();
        let v = svc.create(&f.admin, &draft("A", "b")).unwrap();
        let mut selection = SelectionCoordinator::with_page([v.id.clone()]);
        selection.select_all();
        let pending = selection.request_bulk_delete().unwrap();

        let result = selection.confirm_bulk_delete(pending, |p| svc.bulk_delete(&f.coordinator, p));
        assert!(matches!(
            result,
            Err(CoreError::PermissionDenied { action: Action::DeleteRecordBulk })
        ));
        assert!(selection.selected().is_empty());
        assert!(svc.get(&f.admin, &v.id).is_ok());
    }

    #[test]
    fn test_import_success_logs_once() {
        let f = fixture();
        let svc = f.services.variants();
        let data = "gene,variant,position,status\nSHANK3,c.3679dup,50721512,available\nCHD8,c.2T>C,,requested\n";
        let report = svc
            .import(&f.coordinator, data.as_bytes(), "batch.csv", ImportFormat::Csv, ImportSchema::Standard)
            .unwrap();
        assert_eq!(report.success, 2);
        assert_eq!(report.fail, 0);

        let entries = f.services.db().recent_activity(5).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "variants_csv_uploaded");
        assert_eq!(entries[0].detail, "2 variants from batch.csv");
    }

    #[test]
    fn test_import_missing_column_inserts_nothing() {
        let f = fixture();
        let svc = f.services.variants();
        let data = "gene,consequence\nSHANK3,frameshift\n";
        let err = svc
            .import(&f.admin, data.as_bytes(), "bad.csv", ImportFormat::Csv, ImportSchema::Standard)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MissingColumns { .. })
        ));
        assert_eq!(f.services.db().portal_stats().unwrap().variants, 0);
        assert_eq!(activity_count(&f.services), 0);
    }

    #[test]
    fn test_import_bad_row_fails_whole_batch() {
        let f = fixture();
        let svc = f.services.variants();
        let data = "gene,variant,position\nA,c.1A>G,100\nB,c.2A>G,not-a-number\n";
        let report = svc
            .import(&f.admin, data.as_bytes(), "mixed.csv", ImportFormat::Csv, ImportSchema::Standard)
            .unwrap();
        assert_eq!(report.success, 0);
        assert_eq!(report.fail, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(f.services.db().portal_stats().unwrap().variants, 0);
    }

    #[test]
    fn test_import_requires_bulk_import() {
        let f = fixture();
        let err = f
            .services
            .variants()
            .import(&f.researcher, "gene,variant\n".as_bytes(), "x.csv", ImportFormat::Csv, ImportSchema::Standard)
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { action: Action::BulkImport }));
    }

    #[test]
    fn test_import_file_rejects_unknown_extension() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("variants.xlsx");
        std::fs::write(&path, "gene,variant\n").unwrap();
        let err = f
            .services
            .variants()
            .import_file(&f.admin, &path, ImportSchema::Standard)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_import_file_tsv() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("variants.tsv");
        std::fs::write(&path, "gene\tvariant\nGRIN2B\tc.2459G>C\n").unwrap();
        let report = f
            .services
            .variants()
            .import_file(&f.admin, &path, ImportSchema::Standard)
            .unwrap();
        assert_eq!(report.success, 1);
    }
}
