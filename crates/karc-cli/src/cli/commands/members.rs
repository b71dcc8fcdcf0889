//! Implementation of `karc members` and `karc researchers` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{
    hinted, open_services, print_listing, require_confirmation, require_member,
};
use crate::cli::{ConfirmArgs, ListArgs};
use crate::output::{Formatter, OutputFormat};
use karc_core::model::{Profile, Role};

fn print_member(formatter: &Formatter, member: &Profile) -> Result<()> {
    formatter.print(&serde_json::json!({
        "id": member.id,
        "email": member.email,
        "name": member.display_name(),
        "role": member.role,
        "approved": member.approved,
        "approved_at": member.approved_at,
    }))
}

/// List members, pending applicants first.
pub fn run_members_list(
    data_dir: Option<&Path>,
    pending_only: bool,
    list: &ListArgs,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let mut list = list.clone();
    if pending_only {
        list.filters.push("approved=false".to_string());
    }
    print_listing(
        &formatter,
        &list,
        |params| services.members().list(&actor, params),
        "No members found.",
        "members",
        &[
            "karc members approve <id>",
            "karc members reject <id> --yes",
            "karc members role <id> <role>",
        ],
    )
}

#[tracing::instrument(skip(data_dir, format))]
pub fn run_members_approve(
    data_dir: Option<&Path>,
    member_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let member = services
        .members()
        .approve(&actor, member_id)
        .map_err(hinted)?;
    print_member(&formatter, &member)
}

#[tracing::instrument(skip(data_dir, format))]
pub fn run_members_revoke(
    data_dir: Option<&Path>,
    member_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let member = services
        .members()
        .revoke(&actor, member_id)
        .map_err(hinted)?;
    print_member(&formatter, &member)
}

/// Reject a pending applicant. Removes the account entirely.
#[tracing::instrument(skip(data_dir, format))]
pub fn run_members_reject(
    data_dir: Option<&Path>,
    member_id: &str,
    confirm: ConfirmArgs,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let pending = services
        .members()
        .prepare_reject(&actor, member_id)
        .map_err(hinted)?;
    require_confirmation(
        confirm,
        &format!("the account of {}", pending.summary()),
        &format!("karc members reject {member_id}"),
    )?;
    let summary = pending.summary().to_string();
    services.members().reject(&actor, pending).map_err(hinted)?;

    formatter.print_notice("rejected", &format!("Rejected {summary}"))
}

#[tracing::instrument(skip(data_dir, format))]
pub fn run_members_role(
    data_dir: Option<&Path>,
    member_id: &str,
    role: Role,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let member = services
        .members()
        .set_role(&actor, member_id, role)
        .map_err(hinted)?;
    print_member(&formatter, &member)
}

/// Roster of approved members.
pub fn run_researchers_list(
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
        |params| services.researchers().list(&actor, params),
        "No researchers yet.",
        "researchers",
        &["karc researchers list --filter role=coordinator"],
    )
}
