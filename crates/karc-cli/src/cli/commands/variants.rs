//! Implementation of `karc variants` subcommands.

use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::path::Path;

use crate::cli::commands::helpers::{
    hinted, open_services, print_listing, require_confirmation, require_member,
};
use crate::cli::{ConfirmArgs, ListArgs, VariantFields};
use crate::output::{Formatter, OutputFormat};
use karc_core::import::ImportSchema;
use karc_core::model::{genomic_position_label, variant_locus_id, Variant, VariantDraft};
use karc_core::selection::SelectionCoordinator;

/// Copy the flags that were given onto `draft`.
fn apply_fields(fields: VariantFields, draft: &mut VariantDraft) {
    let VariantFields {
        sample_id,
        chromosome,
        position,
        ref_allele,
        alt_allele,
        protein_change,
        consequence,
        transcript,
        rank,
        inheritance,
        status,
        notes,
        variant_type,
        significance,
        families,
    } = fields;

    macro_rules! set {
        ($($field:ident),*) => {
            $(if $field.is_some() { draft.$field = $field; })*
        };
    }
    set!(
        sample_id,
        chromosome,
        position,
        ref_allele,
        alt_allele,
        protein_change,
        consequence,
        transcript,
        rank,
        inheritance,
        notes,
        variant_type,
        significance,
        families
    );
    if let Some(status) = status {
        draft.status = status;
    }
}

fn with_locus(variant: &Variant) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(variant)?;
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "genomic_position".to_string(),
            serde_json::json!(genomic_position_label(variant)),
        );
        map.insert(
            "locus_id".to_string(),
            serde_json::json!(variant_locus_id(variant)),
        );
    }
    Ok(value)
}

#[tracing::instrument(skip(data_dir, list, format))]
pub fn run_variants_list(
    data_dir: Option<&Path>,
    list: &ListArgs,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    print_listing(
        &formatter,
        list,
        |params| services.variants().list(&actor, params),
        "No variants found.",
        "variants",
        &[
            "karc variants show <id>",
            "karc comments list <id>",
            "karc variants list --filter status=available",
        ],
    )
}

pub fn run_variants_show(data_dir: Option<&Path>, id: &str, format: OutputFormat) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let variant = services.variants().get(&actor, id).map_err(hinted)?;
    formatter.print(&with_locus(&variant)?)
}

#[tracing::instrument(skip(data_dir, fields, format))]
pub fn run_variants_add(
    data_dir: Option<&Path>,
    gene: &str,
    variant: &str,
    fields: VariantFields,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let mut draft = VariantDraft {
        gene: gene.to_string(),
        variant: variant.to_string(),
        ..VariantDraft::default()
    };
    apply_fields(fields, &mut draft);

    let created = services.variants().create(&actor, &draft).map_err(hinted)?;
    formatter.print(&with_locus(&created)?)
}

/// Edit a variant. Fields not given keep their stored values.
#[tracing::instrument(skip(data_dir, fields, format))]
pub fn run_variants_edit(
    data_dir: Option<&Path>,
    id: &str,
    gene: Option<&str>,
    variant: Option<&str>,
    fields: VariantFields,
    format: OutputFormat,
) -> Result<()> {
    if gene.is_none() && variant.is_none() && fields == VariantFields::default() {
        bail!("Nothing to change.\n  To fix: pass at least one field, e.g. --status completed");
    }

    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let current = services.variants().get(&actor, id).map_err(hinted)?;
    let mut draft = VariantDraft::from(&current);
    if let Some(gene) = gene {
        draft.gene = gene.to_string();
    }
    if let Some(variant) = variant {
        draft.variant = variant.to_string();
    }
    apply_fields(fields, &mut draft);

    let updated = services
        .variants()
        .update(&actor, id, &draft)
        .map_err(hinted)?;
    formatter.print(&with_locus(&updated)?)
}

#[tracing::instrument(skip(data_dir, format))]
pub fn run_variants_delete(
    data_dir: Option<&Path>,
    id: &str,
    confirm: ConfirmArgs,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let pending = services.variants().prepare_delete(&actor, id).map_err(hinted)?;
    require_confirmation(
        confirm,
        &format!("variant {} and its comments", pending.summary()),
        &format!("karc variants delete {id}"),
    )?;
    let summary = pending.summary().to_string();
    services.variants().delete(&actor, pending).map_err(hinted)?;

    formatter.print(&serde_json::json!({
        "id": id,
        "deleted": summary,
    }))
}

/// Select the given ids and delete them as one confirmed batch.
#[tracing::instrument(skip(data_dir, format))]
pub fn run_variants_bulk_delete(
    data_dir: Option<&Path>,
    ids: &[String],
    confirm: ConfirmArgs,
    format: OutputFormat,
) -> Result<()> {
    let unique: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    let mut selection = SelectionCoordinator::with_page(unique.iter().copied());
    for id in &unique {
        selection.toggle(id);
    }
    let Some(pending) = selection.request_bulk_delete() else {
        bail!("No variants selected.\n  To fix: karc variants bulk-delete <id>... --yes");
    };
    require_confirmation(
        confirm,
        &format!("{} variants and their comments", pending.len()),
        &format!("karc variants bulk-delete {}", pending.ids().join(" ")),
    )?;

    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let requested = pending.len();
    let deleted = selection
        .confirm_bulk_delete(pending, |batch| services.variants().bulk_delete(&actor, batch))
        .map_err(hinted)?;

    formatter.print(&serde_json::json!({
        "requested": requested,
        "deleted": deleted,
    }))
}

/// Import a delimited file. Nothing is inserted unless every row is valid.
#[tracing::instrument(skip(data_dir, format))]
pub fn run_variants_import(
    data_dir: Option<&Path>,
    file: &Path,
    schema: ImportSchema,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let report = services
        .variants()
        .import_file(&actor, file, schema)
        .map_err(hinted)?;

    if formatter.is_json() {
        formatter.print(&report)?;
    } else if report.fail == 0 {
        println!("Imported {} variants from {}", report.success, file.display());
    } else {
        println!("Import rejected: {} row(s) not imported", report.fail);
        for err in &report.errors {
            if err.line == 0 {
                println!("  {}", err.message);
            } else {
                println!("  line {}: {}", err.line, err.message);
            }
        }
    }

    if report.fail > 0 {
        bail!("Import failed; no variants were added");
    }
    Ok(())
}
