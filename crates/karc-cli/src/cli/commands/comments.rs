//! Implementation of `karc comments` subcommands.

use anyhow::{bail, Result};
use std::path::Path;

use crate::cli::commands::helpers::{hinted, open_services, require_confirmation, require_member};
use crate::cli::ConfirmArgs;
use crate::output::{Formatter, OutputFormat};

/// List a variant's comments, oldest first.
pub fn run_comments_list(
    data_dir: Option<&Path>,
    variant_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    // Surface a missing variant instead of an empty thread.
    services.variants().get(&actor, variant_id).map_err(hinted)?;
    let comments = services
        .comments()
        .list(&actor, variant_id)
        .map_err(hinted)?;

    formatter.print_list(
        &comments,
        "No comments yet.",
        "comments",
        &[&format!("karc comments add {variant_id} -m \"...\"")],
    )
}

#[tracing::instrument(skip(data_dir, message, format))]
pub fn run_comments_add(
    data_dir: Option<&Path>,
    variant_id: &str,
    message: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let Some(message) = message else {
        bail!("No comment text.\n  To fix: karc comments add {variant_id} -m \"<text>\"");
    };

    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let comment = services
        .comments()
        .add(&actor, variant_id, message)
        .map_err(hinted)?;
    formatter.print(&serde_json::json!({
        "comment_id": comment.id,
        "variant_id": comment.variant_id,
        "author": comment.author_name,
        "body": comment.body,
    }))
}

/// Delete one of the actor's own comments.
#[tracing::instrument(skip(data_dir, format))]
pub fn run_comments_delete(
    data_dir: Option<&Path>,
    comment_id: &str,
    confirm: ConfirmArgs,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let pending = services
        .comments()
        .prepare_delete(&actor, comment_id)
        .map_err(hinted)?;
    require_confirmation(
        confirm,
        &format!("comment \"{}\"", pending.summary()),
        &format!("karc comments delete {comment_id}"),
    )?;
    services.comments().delete(&actor, pending).map_err(hinted)?;

    formatter.print_notice("deleted", &format!("Deleted comment {comment_id}"))
}
